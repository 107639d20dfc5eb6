use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;

#[derive(Clone, Debug)]
pub struct GeneratorParams {
    pub grid_x: u32,
    pub grid_y: u32,
    pub layers: u8,
    /// Raw per-layer capacity in the preferred direction.
    pub capacity: u32,
    pub num_nets: usize,
    /// Longest pin-to-pin Manhattan span in gcells; 0 means unbounded.
    pub max_span: u32,
    pub tile_size: u32,
    pub seed: u64,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            grid_x: 32,
            grid_y: 32,
            layers: 2,
            capacity: 8,
            num_nets: 200,
            max_span: 12,
            tile_size: 10,
            seed: 1,
        }
    }
}

/// Writes a random two-pin benchmark in the `.gr` format. Odd layers (1-based)
/// route horizontally, even layers vertically; every net spans at least two gcells.
pub fn generate_random_gr<W: Write>(out: &mut W, params: &GeneratorParams) -> std::io::Result<()> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let w = params.grid_x.max(2);
    let h = params.grid_y.max(2);
    let layers = params.layers.max(1) as usize;
    let tile = params.tile_size.max(2);

    log::info!(
        "Generating Benchmark: {}x{}x{} grid, {} nets, capacity {}",
        w,
        h,
        layers,
        params.num_nets,
        params.capacity
    );

    // A single layer has to carry both directions.
    let horizontal: Vec<u32> = (0..layers)
        .map(|z| if z % 2 == 0 || layers == 1 { params.capacity } else { 0 })
        .collect();
    let vertical: Vec<u32> = (0..layers)
        .map(|z| if z % 2 == 1 || layers == 1 { params.capacity } else { 0 })
        .collect();

    writeln!(out, "grid {} {} {}", w, h, layers)?;
    writeln!(out, "vertical capacity {}", join(&vertical))?;
    writeln!(out, "horizontal capacity {}", join(&horizontal))?;
    writeln!(out, "minimum width {}", join(&vec![1; layers]))?;
    writeln!(out, "minimum spacing {}", join(&vec![1; layers]))?;
    writeln!(out, "via spacing {}", join(&vec![1; layers]))?;
    writeln!(out, "0 0 {} {}", tile, tile)?;
    writeln!(out)?;
    writeln!(out, "num net {}", params.num_nets)?;

    let span = if params.max_span == 0 {
        w + h
    } else {
        params.max_span.max(1)
    };

    for i in 0..params.num_nets {
        let x1 = rng.gen_range(0..w);
        let y1 = rng.gen_range(0..h);
        let (x2, y2) = loop {
            let dx = rng.gen_range(0..=span.min(w - 1)) as i64;
            let dy = rng.gen_range(0..=span.min(h - 1)) as i64;
            let x2 = (x1 as i64 + if rng.gen_bool(0.5) { dx } else { -dx }).clamp(0, w as i64 - 1);
            let y2 = (y1 as i64 + if rng.gen_bool(0.5) { dy } else { -dy }).clamp(0, h as i64 - 1);
            if (x2, y2) != (x1 as i64, y1 as i64) {
                break (x2 as u32, y2 as u32);
            }
        };

        let half = tile / 2;
        writeln!(out, "n{} {} 2 1", i, i)?;
        writeln!(out, "{} {} 1", x1 * tile + half, y1 * tile + half)?;
        writeln!(out, "{} {} 1", x2 * tile + half, y2 * tile + half)?;
    }

    writeln!(out)?;
    writeln!(out, "0")?;
    Ok(())
}

fn join(values: &[u32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
