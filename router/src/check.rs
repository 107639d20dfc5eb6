use crate::global_router::GlobalRouter;
use crate::grid::GridGraph;
use crate::net::Net;
use gcr_common::db::indices::NetId;
use rayon::prelude::*;
use std::collections::HashSet;

/// Verifies every committed route against the grid: each routed path must be
/// a connected walk from source to sink with no repeated edge, and every
/// edge's usage and net list must match the paths that cross it.
pub fn run(router: &GlobalRouter) -> Result<(), String> {
    log::info!("Starting Route Verification...");
    let grid = router.grid();

    let mut errors: Vec<String> = router
        .nets()
        .par_iter()
        .filter(|n| n.routed)
        .filter_map(|n| check_walk(grid, n).err())
        .collect();

    let mut crossings: Vec<Vec<NetId>> = vec![Vec::new(); grid.num_edges()];
    for net in router.nets().iter().filter(|n| n.routed) {
        for e in &net.path {
            crossings[e.index()].push(net.id);
        }
    }

    errors.extend(
        grid.edges()
            .par_iter()
            .zip(crossings.par_iter_mut())
            .enumerate()
            .filter_map(|(i, (edge, expected))| {
                let mut recorded = edge.nets.clone();
                recorded.sort();
                expected.sort();
                if edge.usage as usize != expected.len() {
                    Some(format!(
                        "edge {} usage {} but {} nets cross it",
                        i,
                        edge.usage,
                        expected.len()
                    ))
                } else if recorded != *expected {
                    Some(format!(
                        "edge {} records nets {:?}, paths give {:?}",
                        i, recorded, expected
                    ))
                } else {
                    None
                }
            })
            .collect::<Vec<_>>(),
    );

    if errors.is_empty() {
        log::info!("PASS: {} routes verified.", router.nets().len());
        Ok(())
    } else {
        for e in &errors {
            log::error!("FAIL: {}", e);
        }
        Err(errors.join("; "))
    }
}

fn check_walk(grid: &GridGraph, net: &Net) -> Result<(), String> {
    let mut seen = HashSet::with_capacity(net.path.len());
    let mut at = grid.cell_id(net.source);
    for &e in &net.path {
        if !seen.insert(e) {
            return Err(format!("net '{}' repeats edge {}", net.name, e));
        }
        let (a, b) = grid.edge(e).cells();
        if a != at && b != at {
            return Err(format!(
                "net '{}' breaks at {}: edge {} does not touch it",
                net.name,
                grid.coord_of(at),
                e
            ));
        }
        at = grid.edge(e).other(at);
    }
    if grid.coord_of(at) != net.sink {
        return Err(format!(
            "net '{}' ends at {} instead of {}",
            net.name,
            grid.coord_of(at),
            net.sink
        ));
    }
    Ok(())
}
