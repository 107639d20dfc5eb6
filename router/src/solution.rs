use crate::global_router::GlobalRouter;
use crate::grid::{EdgeKind, GridGraph};
use crate::net::Net;
use crate::utils::conversion::GridConverter;
use anyhow::{Context, Result, anyhow, bail};
use gcr_common::db::core::DesignDB;
use gcr_common::db::indices::{EdgeId, NetId};
use gcr_common::geom::coord::GridCoord;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::io::Write;

/// A straight piece of a route between two gcells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub from: GridCoord,
    pub to: GridCoord,
}

/// Splits a committed path into maximal straight runs. Consecutive lateral
/// edges of the same kind merge; every via is its own segment.
pub fn segments(grid: &GridGraph, net: &Net) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    let mut prev_kind: Option<EdgeKind> = None;
    let mut at = grid.cell_id(net.source);

    for &e in &net.path {
        let edge = grid.edge(e);
        let next = edge.other(at);
        let (from, to) = (grid.coord_of(at), grid.coord_of(next));
        if !edge.is_via() && prev_kind == Some(edge.kind) {
            if let Some(seg) = out.last_mut() {
                seg.to = to;
            }
        } else {
            out.push(Segment { from, to });
        }
        prev_kind = Some(edge.kind);
        at = next;
    }
    out
}

/// Writes every routed net in the ISPD 2008 solution format: a
/// `name id count` header, one `(x,y,z)-(x,y,z)` line per segment with
/// tile-centre coordinates and 1-based layers, then `!`.
pub fn write_routes<W: Write>(
    out: &mut W,
    design: &DesignDB,
    router: &GlobalRouter,
) -> std::io::Result<()> {
    let converter = GridConverter::from_design(design);
    let grid = router.grid();
    let mut written = 0;

    for net in router.nets().iter().filter(|n| n.routed) {
        let index = net
            .design_index
            .map(|i| design.nets[i].index)
            .unwrap_or(net.id.0);
        let segs = segments(grid, net);
        writeln!(out, "{} {} {}", net.name, index, segs.len())?;
        for seg in &segs {
            let (x1, y1) = converter.to_world(seg.from);
            let (x2, y2) = converter.to_world(seg.to);
            writeln!(
                out,
                "({},{},{})-({},{},{})",
                x1,
                y1,
                seg.from.z as u32 + 1,
                x2,
                y2,
                seg.to.z as u32 + 1
            )?;
        }
        writeln!(out, "!")?;
        written += 1;
    }

    log::info!("Wrote routes for {} nets", written);
    Ok(())
}

/// Loads an ISPD 2008 route file into `router` and commits one path per
/// listed net. Returns the number of nets loaded.
pub fn read_routes(
    router: &mut GlobalRouter,
    design: &DesignDB,
    filename: &str,
) -> Result<usize> {
    let text = std::fs::read_to_string(filename)
        .context(format!("Failed to open route file: {}", filename))?;
    read_routes_str(router, design, &text)
        .context(format!("Invalid route syntax in '{}'", filename))
}

/// Nets missing from `router` (multi-pin, single-gcell or unknown names)
/// are skipped with a warning. Nets the text does not mention keep their
/// current state.
pub fn read_routes_str(
    router: &mut GlobalRouter,
    design: &DesignDB,
    text: &str,
) -> Result<usize> {
    let converter = GridConverter::from_design(design);
    let by_name: HashMap<String, NetId> = router
        .nets()
        .iter()
        .map(|n| (n.name.clone(), n.id))
        .collect();

    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let mut loaded = 0;
    let mut skipped = 0;
    while let Some((line_no, header)) = lines.next() {
        let parts: Vec<&str> = header.split_whitespace().collect();
        if parts.len() < 3 {
            bail!("line {}: expected '<name> <id> <segments>'", line_no);
        }
        let name = parts[0];
        let count: usize = number(line_no, parts[2])?;
        let target = by_name.get(name).copied();
        if target.is_none() {
            log::warn!(
                "line {}: net '{}' is not a routable net, skipping",
                line_no,
                name
            );
            skipped += 1;
        }

        let mut edges = Vec::new();
        for _ in 0..count {
            let (line_no, seg) = lines
                .next()
                .ok_or_else(|| anyhow!("unexpected end of file in net '{}'", name))?;
            if target.is_some() {
                segment_edges(router.grid(), &converter, line_no, seg, &mut edges)?;
            }
        }
        let (end_no, end) = lines.next().ok_or_else(|| {
            anyhow!("unexpected end of file, expected '!' after net '{}'", name)
        })?;
        if end != "!" {
            bail!("line {}: expected '!' after net '{}'", end_no, name);
        }

        if let Some(id) = target {
            let mut seen = HashSet::new();
            edges.retain(|e| seen.insert(*e));
            let path = walk_from_source(router.grid(), router.net(id), edges);
            router.commit_path(id, path);
            loaded += 1;
        }
    }

    log::info!("Read routes for {} nets ({} skipped)", loaded, skipped);
    Ok(loaded)
}

fn number(line_no: usize, token: &str) -> Result<usize> {
    token
        .parse()
        .map_err(|_| anyhow!("line {}: '{}' is not a valid number", line_no, token))
}

/// Appends the gcell edges covered by one `(x,y,z)-(x,y,z)` line.
fn segment_edges(
    grid: &GridGraph,
    converter: &GridConverter,
    line_no: usize,
    text: &str,
    out: &mut Vec<EdgeId>,
) -> Result<()> {
    let (a, b) = text
        .split_once(")-(")
        .ok_or_else(|| anyhow!("line {}: expected '(x,y,z)-(x,y,z)'", line_no))?;
    let from = point(grid, converter, line_no, a)?;
    let to = point(grid, converter, line_no, b)?;

    let axes = (from.x != to.x) as u8 + (from.y != to.y) as u8 + (from.z != to.z) as u8;
    if axes > 1 {
        bail!(
            "line {}: segment {} -> {} is not axis-aligned",
            line_no,
            from,
            to
        );
    }

    let mut at = from;
    while at != to {
        let next = step_toward(at, to);
        let edge = grid
            .edge_between(grid.cell_id(at), grid.cell_id(next))
            .with_context(|| format!("line {}: no edge from {} to {}", line_no, at, next))?;
        out.push(edge);
        at = next;
    }
    Ok(())
}

fn point(
    grid: &GridGraph,
    converter: &GridConverter,
    line_no: usize,
    text: &str,
) -> Result<GridCoord> {
    let fields: Vec<&str> = text
        .trim_matches(|c| c == '(' || c == ')')
        .split(',')
        .map(str::trim)
        .collect();
    if fields.len() != 3 {
        bail!("line {}: expected '(x,y,z)', found '{}'", line_no, text);
    }
    let x = number(line_no, fields[0])?;
    let y = number(line_no, fields[1])?;
    let z = number(line_no, fields[2])?;
    if z == 0 || z > grid.num_layers() as usize {
        bail!(
            "line {}: layer {} outside 1..={}",
            line_no,
            z,
            grid.num_layers()
        );
    }
    let (x, y) = match (u32::try_from(x), u32::try_from(y)) {
        (Ok(x), Ok(y)) => (x, y),
        _ => bail!("line {}: point ({},{}) lies outside the grid", line_no, x, y),
    };
    converter
        .try_to_grid(x, y, (z - 1) as u8)
        .filter(|c| grid.contains(*c))
        .ok_or_else(|| anyhow!("line {}: point ({},{}) lies outside the grid", line_no, x, y))
}

fn step_toward(at: GridCoord, to: GridCoord) -> GridCoord {
    fn step(a: u32, b: u32) -> u32 {
        match a.cmp(&b) {
            Ordering::Less => a + 1,
            Ordering::Greater => a - 1,
            Ordering::Equal => a,
        }
    }
    GridCoord::new(
        step(at.x, to.x),
        step(at.y, to.y),
        step(at.z as u32, to.z as u32) as u8,
    )
}

/// Orders `edges` into a walk starting at the source of `net`. Edges that
/// do not form a single walk are kept in file order.
fn walk_from_source(grid: &GridGraph, net: &Net, edges: Vec<EdgeId>) -> Vec<EdgeId> {
    let mut left = edges.clone();
    let mut walk = Vec::with_capacity(edges.len());
    let mut at = grid.cell_id(net.source);
    while !left.is_empty() {
        let next = left.iter().position(|&e| {
            let (a, b) = grid.edge(e).cells();
            a == at || b == at
        });
        let Some(pos) = next else {
            log::warn!("Route of net '{}' is not a walk from its source", net.name);
            return edges;
        };
        let edge = left.swap_remove(pos);
        at = grid.edge(edge).other(at);
        walk.push(edge);
    }
    walk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::LayerRules;
    use gcr_common::db::indices::NetId;
    use gcr_common::util::config::GlobalRoutingConfig;

    fn grid() -> GridGraph {
        GridGraph::new(4, 4, vec![LayerRules::uniform(4); 2]).unwrap()
    }

    fn committed(grid: GridGraph, net: Net, walk: &[GridCoord]) -> GlobalRouter {
        let path = walk
            .windows(2)
            .map(|w| grid.edge_between(grid.cell_id(w[0]), grid.cell_id(w[1])).unwrap())
            .collect();
        let mut r = GlobalRouter::new(grid, vec![net], GlobalRoutingConfig::default());
        r.commit_path(NetId::new(0), path);
        r
    }

    #[test]
    fn collinear_edges_merge_and_vias_split() {
        let walk = [
            GridCoord::new(0, 0, 0),
            GridCoord::new(1, 0, 0),
            GridCoord::new(2, 0, 0),
            GridCoord::new(2, 0, 1),
            GridCoord::new(2, 1, 1),
            GridCoord::new(2, 2, 1),
            GridCoord::new(3, 2, 1),
        ];
        let net = Net::new(NetId::new(0), "n", walk[0], walk[6]);
        let r = committed(grid(), net, &walk);
        let segs = segments(r.grid(), &r.nets()[0]);
        assert_eq!(
            segs,
            vec![
                Segment {
                    from: walk[0],
                    to: walk[2]
                },
                Segment {
                    from: walk[2],
                    to: walk[3]
                },
                Segment {
                    from: walk[3],
                    to: walk[5]
                },
                Segment {
                    from: walk[5],
                    to: walk[6]
                },
            ]
        );
    }

    fn design() -> DesignDB {
        let mut design = DesignDB::new();
        design.grid_x = 4;
        design.grid_y = 4;
        design.tile_width = 10;
        design.tile_height = 10;
        design.add_net("net7".to_string(), 7, 1);
        design
    }

    const WALK: [GridCoord; 3] = [
        GridCoord { x: 0, y: 0, z: 0 },
        GridCoord { x: 1, y: 0, z: 0 },
        GridCoord { x: 1, y: 0, z: 1 },
    ];

    fn unrouted() -> GlobalRouter {
        let net = Net::new(NetId::new(0), "net7", WALK[0], WALK[2]);
        GlobalRouter::new(grid(), vec![net], GlobalRoutingConfig::default())
    }

    #[test]
    fn writes_ispd_solution_text() {
        let design = design();
        let walk = WALK;
        let mut net = Net::new(NetId::new(0), "net7", walk[0], walk[2]);
        net.design_index = Some(0);
        let r = committed(grid(), net, &walk);

        let mut buf = Vec::new();
        write_routes(&mut buf, &design, &r).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "net7 7 2\n(5,5,1)-(15,5,1)\n(15,5,1)-(15,5,2)\n!\n");
    }

    #[test]
    fn reads_segments_back_as_a_walk_from_the_source() {
        let design = design();
        // Segments listed from the sink end, still one walk.
        let text = "net7 7 2\n(15,5,2)-(15,5,1)\n(15,5,1)-(5,5,1)\n!\n";
        let mut r = unrouted();
        assert_eq!(read_routes_str(&mut r, &design, text).unwrap(), 1);

        let g = r.grid();
        let expected: Vec<EdgeId> = WALK
            .windows(2)
            .map(|w| g.edge_between(g.cell_id(w[0]), g.cell_id(w[1])).unwrap())
            .collect();
        let net = r.net(NetId::new(0));
        assert!(net.routed);
        assert_eq!(net.path, expected);
        assert_eq!(g.edge(expected[0]).usage, 1);
    }

    #[test]
    fn long_segment_covers_every_gcell_edge() {
        let design = design();
        let net = Net::new(
            NetId::new(0),
            "net7",
            GridCoord::new(0, 1, 1),
            GridCoord::new(0, 3, 1),
        );
        let mut r = GlobalRouter::new(grid(), vec![net], GlobalRoutingConfig::default());
        let text = "net7 7 1\n(5,15,2)-(5,35,2)\n!\n";
        read_routes_str(&mut r, &design, text).unwrap();
        assert_eq!(r.net(NetId::new(0)).path.len(), 2);
        assert_eq!(r.statistics().total_segments, 2);
    }

    #[test]
    fn unknown_nets_are_skipped() {
        let design = design();
        let text = "other 3 1\n(5,5,1)-(15,5,1)\n!\n";
        let mut r = unrouted();
        assert_eq!(read_routes_str(&mut r, &design, text).unwrap(), 0);
        assert!(!r.net(NetId::new(0)).routed);
        assert!(r.grid().edges().iter().all(|e| e.usage == 0));
    }

    #[test]
    fn off_grid_point_names_its_line() {
        let design = design();
        let text = "net7 7 1\n\n(5,5,1)-(95,5,1)\n!\n";
        let err = read_routes_str(&mut unrouted(), &design, text).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{}", err);
        assert!(err.to_string().contains("outside the grid"));
    }

    #[test]
    fn rejects_diagonal_segment_and_missing_terminator() {
        let design = design();
        let diagonal = "net7 7 1\n(5,5,1)-(15,15,1)\n!\n";
        let err = read_routes_str(&mut unrouted(), &design, diagonal).unwrap_err();
        assert!(err.to_string().contains("not axis-aligned"));

        let open = "net7 7 1\n(5,5,1)-(15,5,1)\n";
        assert!(read_routes_str(&mut unrouted(), &design, open).is_err());

        let bad_layer = "net7 7 1\n(5,5,1)-(5,5,3)\n!\n";
        let err = read_routes_str(&mut unrouted(), &design, bad_layer).unwrap_err();
        assert!(err.to_string().contains("layer 3"));
    }
}
