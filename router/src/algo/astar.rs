use super::cost::CostModel;
use super::frontier::Frontier;
use crate::Cost;
use crate::error::RouterError;
use crate::grid::GridGraph;
use crate::net::Net;
use gcr_common::db::indices::{CellId, EdgeId};
use gcr_common::geom::coord::GridCoord;
use gcr_common::geom::rect::GridRect;

#[derive(Clone, Debug, PartialEq)]
pub struct RouteResult {
    /// Edges from source to destination. Empty when no route was found.
    pub path: Vec<EdgeId>,
    /// Path cost at the destination, `+inf` when no route was found.
    pub cost: Cost,
    /// Cells popped from the frontier.
    pub expanded: usize,
}

impl RouteResult {
    pub fn not_found(expanded: usize) -> Self {
        Self {
            path: Vec::new(),
            cost: Cost::INFINITY,
            expanded,
        }
    }

    pub fn is_found(&self) -> bool {
        self.cost.is_finite()
    }
}

/// Bounded A* search over a `GridGraph`. Holds the frontier between calls so
/// its tables are allocated once; no search state survives a call.
pub struct MazeRouter {
    frontier: Frontier,
}

impl MazeRouter {
    pub fn new(grid: &GridGraph) -> Self {
        Self {
            frontier: Frontier::new(grid.num_cells()),
        }
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn route(
        &mut self,
        grid: &GridGraph,
        net: &Net,
        allow_overflow: bool,
        bbox: &GridRect,
        cost: &CostModel,
    ) -> Result<RouteResult, RouterError> {
        self.route_terminals(grid, net.source, net.sink, allow_overflow, bbox, cost)
    }

    /// Searches from `source` to `dest` through cells inside `bbox` (any layer).
    /// A destination that cannot be reached is not an error: the result has
    /// an empty path and infinite cost.
    pub fn route_terminals(
        &mut self,
        grid: &GridGraph,
        source: GridCoord,
        dest: GridCoord,
        allow_overflow: bool,
        bbox: &GridRect,
        cost: &CostModel,
    ) -> Result<RouteResult, RouterError> {
        if self.frontier.capacity() != grid.num_cells() {
            self.frontier.resize(grid.num_cells());
        }
        let src = grid.cell_id(source);
        let dst = grid.cell_id(dest);

        log::trace!(
            "routeMaze {} -> {} in [{}, {}]..[{}, {}]",
            source,
            dest,
            bbox.min_x,
            bbox.min_y,
            bbox.max_x,
            bbox.max_y
        );

        let h = cost.heuristic(source, dest);
        self.frontier.set_cost(src, h, h, None);

        let mut expanded = 0;
        let mut found = false;
        while let Ok(cell) = self.frontier.pop_best() {
            expanded += 1;
            if cell == dst {
                found = true;
                break;
            }

            let path_cost = self.frontier.data_for(cell).path_cost;
            for edge in grid.neighbors(cell) {
                let next = grid.edge(edge).other(cell);
                let next_coord = grid.coord_of(next);
                if !bbox.contains(next_coord) {
                    continue;
                }
                let step = cost.edge_cost(grid, edge, allow_overflow);
                if !step.is_finite() {
                    continue;
                }
                let g = step + path_cost;
                let h = cost.heuristic(next_coord, dest);
                self.frontier.set_cost(next, h, g + h, Some(cell));
            }
        }

        let result = if found {
            self.backtrace(grid, src, dst).map(|path| RouteResult {
                path,
                cost: self.frontier.data_for(dst).path_cost,
                expanded,
            })
        } else {
            Ok(RouteResult::not_found(expanded))
        };

        self.frontier.clear();
        result
    }

    /// Follows parent links from `dst` back to `src`; returns edges source first.
    fn backtrace(
        &self,
        grid: &GridGraph,
        src: CellId,
        dst: CellId,
    ) -> Result<Vec<EdgeId>, RouterError> {
        let mut path = Vec::new();
        let mut current = dst;
        while let Some(parent) = self.frontier.data_for(current).parent {
            path.push(grid.edge_between(parent, current)?);
            current = parent;
        }
        debug_assert_eq!(current, src);
        path.reverse();
        Ok(path)
    }
}
