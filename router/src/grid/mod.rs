pub mod graph;

pub use graph::GridGraph;

use crate::Cost;
use gcr_common::db::indices::{CellId, EdgeId, NetId};
use gcr_common::geom::coord::GridCoord;

/// Neighbour directions, in the order edges are visited during search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    IncX = 0,
    IncY = 1,
    IncZ = 2,
    DecX = 3,
    DecY = 4,
    DecZ = 5,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::IncX,
        Direction::IncY,
        Direction::IncZ,
        Direction::DecX,
        Direction::DecY,
        Direction::DecZ,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Direction::IncX => Direction::DecX,
            Direction::IncY => Direction::DecY,
            Direction::IncZ => Direction::DecZ,
            Direction::DecX => Direction::IncX,
            Direction::DecY => Direction::IncY,
            Direction::DecZ => Direction::IncZ,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    /// Along x on one layer.
    Horizontal,
    /// Along y on one layer.
    Vertical,
    /// Between two layers.
    Via,
}

/// Per-layer routing rules. Capacities are in tracks; a zero capacity means
/// the layer has no edges in that direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayerRules {
    pub horizontal_capacity: u32,
    pub vertical_capacity: u32,
    pub min_width: u32,
    pub min_spacing: u32,
}

impl LayerRules {
    pub fn uniform(capacity: u32) -> Self {
        Self {
            horizontal_capacity: capacity,
            vertical_capacity: capacity,
            min_width: 1,
            min_spacing: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Cell {
    pub coord: GridCoord,
    edges: [Option<EdgeId>; 6],
}

impl Cell {
    pub fn edge(&self, dir: Direction) -> Option<EdgeId> {
        self.edges[dir as usize]
    }

    /// Incident edges in `Direction::ALL` order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.iter().flatten().copied()
    }
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub kind: EdgeKind,
    /// Tracks available; `u32::MAX` for vias, which are uncapacitated.
    pub capacity: u32,
    /// Number of nets currently routed through this edge.
    pub usage: u32,
    /// Layer of a lateral edge, lower layer of a via.
    pub layer: u8,
    pub history_cost: Cost,
    pub nets: Vec<NetId>,
    cells: [CellId; 2],
}

impl Edge {
    pub fn cells(&self) -> (CellId, CellId) {
        (self.cells[0], self.cells[1])
    }

    /// The endpoint that is not `from`.
    #[inline(always)]
    pub fn other(&self, from: CellId) -> CellId {
        if self.cells[0] == from {
            self.cells[1]
        } else {
            self.cells[0]
        }
    }

    pub fn is_via(&self) -> bool {
        self.kind == EdgeKind::Via
    }

    pub fn overflow(&self) -> u32 {
        if self.is_via() {
            0
        } else {
            self.usage.saturating_sub(self.capacity)
        }
    }

    pub fn is_overflowed(&self) -> bool {
        self.overflow() > 0
    }

    /// Whether one more net fits without overflowing.
    pub fn has_room(&self) -> bool {
        self.is_via() || self.usage < self.capacity
    }
}
