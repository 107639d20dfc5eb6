use crate::db::core::{CapacityAdjustment, DesignDB};
use crate::geom::coord::GridCoord;
use anyhow::{Context, Result, anyhow, bail};
use std::str::FromStr;

/// Parses an ISPD-style `.gr` global routing benchmark into `db`.
pub fn parse(db: &mut DesignDB, filename: &str) -> Result<()> {
    let text = std::fs::read_to_string(filename)
        .context(format!("Failed to open GR file: {}", filename))?;
    parse_str(db, &text).context(format!("Invalid GR syntax in '{}'", filename))
}

struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
    line_no: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.lines().enumerate(),
            line_no: 0,
        }
    }

    /// Next non-blank, non-comment line split into tokens.
    fn next_tokens(&mut self) -> Option<Vec<&'a str>> {
        for (i, line) in self.inner.by_ref() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            self.line_no = i + 1;
            return Some(line.split_whitespace().collect());
        }
        None
    }

    fn expect_tokens(&mut self, what: &str) -> Result<Vec<&'a str>> {
        self.next_tokens()
            .ok_or_else(|| anyhow!("unexpected end of file, expected {}", what))
    }

    fn number<T: FromStr>(&self, token: &str) -> Result<T> {
        token
            .parse::<T>()
            .map_err(|_| anyhow!("line {}: '{}' is not a valid number", self.line_no, token))
    }
}

pub fn parse_str(db: &mut DesignDB, text: &str) -> Result<()> {
    let mut lines = Lines::new(text);

    let parts = lines.expect_tokens("grid header")?;
    if parts.len() < 4 || parts[0] != "grid" {
        bail!("line {}: expected 'grid <x> <y> <layers>'", lines.line_no);
    }
    db.grid_x = lines.number(parts[1])?;
    db.grid_y = lines.number(parts[2])?;
    let num_layers: usize = lines.number(parts[3])?;
    if db.grid_x == 0 || db.grid_y == 0 || num_layers == 0 || num_layers > u8::MAX as usize {
        bail!(
            "line {}: unusable grid size {}x{}x{}",
            lines.line_no,
            db.grid_x,
            db.grid_y,
            num_layers
        );
    }

    let vertical = layer_values(&mut lines, &["vertical", "capacity"], num_layers)?;
    let horizontal = layer_values(&mut lines, &["horizontal", "capacity"], num_layers)?;
    let min_width = layer_values(&mut lines, &["minimum", "width"], num_layers)?;
    let min_spacing = layer_values(&mut lines, &["minimum", "spacing"], num_layers)?;
    let via_spacing = layer_values(&mut lines, &["via", "spacing"], num_layers)?;

    db.layers.clear();
    for z in 0..num_layers {
        let idx = db.add_layer(vertical[z], horizontal[z]) as usize;
        db.layers[idx].min_width = min_width[z];
        db.layers[idx].min_spacing = min_spacing[z];
        db.layers[idx].via_spacing = via_spacing[z];
    }

    let parts = lines.expect_tokens("tile geometry")?;
    if parts.len() < 4 {
        bail!(
            "line {}: expected '<origin x> <origin y> <tile width> <tile height>'",
            lines.line_no
        );
    }
    db.origin_x = lines.number(parts[0])?;
    db.origin_y = lines.number(parts[1])?;
    db.tile_width = lines.number(parts[2])?;
    db.tile_height = lines.number(parts[3])?;
    if db.tile_width == 0 || db.tile_height == 0 {
        bail!("line {}: tile dimensions must be non-zero", lines.line_no);
    }

    let parts = lines.expect_tokens("net count")?;
    if parts.len() < 3 || parts[0] != "num" || parts[1] != "net" {
        bail!("line {}: expected 'num net <count>'", lines.line_no);
    }
    let num_nets: usize = lines.number(parts[2])?;

    for _ in 0..num_nets {
        let parts = lines.expect_tokens("net header")?;
        if parts.len() < 3 {
            bail!(
                "line {}: expected '<name> <id> <pins> [min width]'",
                lines.line_no
            );
        }
        let name = parts[0].to_string();
        let index: u32 = lines.number(parts[1])?;
        let num_pins: usize = lines.number(parts[2])?;
        let net_min_width: u32 = match parts.get(3) {
            Some(tok) => lines.number(tok)?,
            None => 1,
        };
        let net = db.add_net(name, index, net_min_width);

        for _ in 0..num_pins {
            let parts = lines.expect_tokens("pin")?;
            if parts.len() < 3 {
                bail!("line {}: expected '<x> <y> <layer>'", lines.line_no);
            }
            let x: u32 = lines.number(parts[0])?;
            let y: u32 = lines.number(parts[1])?;
            let layer = layer_index(&lines, parts[2], num_layers)?;
            db.add_pin(net, x, y, layer);
        }
    }

    // The adjustment section is optional.
    let Some(parts) = lines.next_tokens() else {
        log::info!(
            "GR: {} nets on a {}x{}x{} grid, no capacity adjustments",
            db.num_nets(),
            db.grid_x,
            db.grid_y,
            num_layers
        );
        return Ok(());
    };
    let num_adjustments: usize = lines.number(parts[0])?;
    for _ in 0..num_adjustments {
        let parts = lines.expect_tokens("capacity adjustment")?;
        if parts.len() < 7 {
            bail!(
                "line {}: expected '<x1> <y1> <z1> <x2> <y2> <z2> <capacity>'",
                lines.line_no
            );
        }
        let from = GridCoord::new(
            lines.number(parts[0])?,
            lines.number(parts[1])?,
            layer_index(&lines, parts[2], num_layers)?,
        );
        let to = GridCoord::new(
            lines.number(parts[3])?,
            lines.number(parts[4])?,
            layer_index(&lines, parts[5], num_layers)?,
        );
        let capacity: u32 = lines.number(parts[6])?;
        db.adjustments.push(CapacityAdjustment { from, to, capacity });
    }

    log::info!(
        "GR: {} nets on a {}x{}x{} grid, {} capacity adjustments",
        db.num_nets(),
        db.grid_x,
        db.grid_y,
        num_layers,
        db.adjustments.len()
    );
    Ok(())
}

fn layer_values(lines: &mut Lines<'_>, keyword: &[&str], num_layers: usize) -> Result<Vec<u32>> {
    let what = keyword.join(" ");
    let parts = lines.expect_tokens(&what)?;
    let matches = parts.len() >= keyword.len()
        && parts
            .iter()
            .zip(keyword)
            .all(|(a, b)| a.eq_ignore_ascii_case(b));
    if !matches {
        bail!("line {}: expected '{}'", lines.line_no, what);
    }
    let values = &parts[keyword.len()..];
    if values.len() != num_layers {
        bail!(
            "line {}: '{}' lists {} values for {} layers",
            lines.line_no,
            what,
            values.len(),
            num_layers
        );
    }
    values.iter().map(|v| lines.number(v)).collect()
}

fn layer_index(lines: &Lines<'_>, token: &str, num_layers: usize) -> Result<u8> {
    let layer: usize = lines.number(token)?;
    if layer == 0 || layer > num_layers {
        bail!(
            "line {}: layer {} outside 1..={}",
            lines.line_no,
            layer,
            num_layers
        );
    }
    Ok((layer - 1) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "\
grid 4 3 2
vertical capacity 0 20
horizontal capacity 20 0
minimum width 1 1
minimum spacing 1 1
via spacing 1 1
0 0 10 10

num net 2
n0 0 2 1
5 5 1
35 5 1
n1 1 2 1
5 25 1
15 5 2

1
1 0 1 2 0 1 4
";

    #[test]
    fn parses_header_nets_and_adjustments() {
        let mut db = DesignDB::new();
        parse_str(&mut db, SMALL).unwrap();

        assert_eq!((db.grid_x, db.grid_y, db.num_layers()), (4, 3, 2));
        assert_eq!(db.layers[0].horizontal_capacity, 20);
        assert_eq!(db.layers[1].vertical_capacity, 20);
        assert_eq!(db.layers[1].wire_pitch(), 2);
        assert_eq!((db.tile_width, db.tile_height), (10, 10));

        assert_eq!(db.num_nets(), 2);
        let n1 = db.net_by_name("n1").unwrap();
        assert_eq!(n1.index, 1);
        assert_eq!(n1.pins[1].layer, 1);
        assert_eq!(n1.pins[1].x, 15);

        assert_eq!(
            db.adjustments,
            vec![CapacityAdjustment {
                from: GridCoord::new(1, 0, 0),
                to: GridCoord::new(2, 0, 0),
                capacity: 4,
            }]
        );
    }

    #[test]
    fn adjustment_section_is_optional() {
        let text = SMALL.split("\n1\n1 0 1").next().unwrap();
        let mut db = DesignDB::new();
        parse_str(&mut db, text).unwrap();
        assert!(db.adjustments.is_empty());
        assert_eq!(db.num_nets(), 2);
    }

    #[test]
    fn rejects_layer_zero() {
        let text = SMALL.replace("35 5 1", "35 5 0");
        let mut db = DesignDB::new();
        let err = parse_str(&mut db, &text).unwrap_err();
        assert!(err.to_string().contains("layer 0"));
    }

    #[test]
    fn rejects_short_capacity_list() {
        let text = SMALL.replace("vertical capacity 0 20", "vertical capacity 0");
        let mut db = DesignDB::new();
        assert!(parse_str(&mut db, &text).is_err());
    }
}
