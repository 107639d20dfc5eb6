use gcr_common::db::indices::{CellId, NetId};
use gcr_common::geom::coord::GridCoord;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RouterError {
    /// Adjacency lookup between cells that are not grid neighbours.
    #[error("no edge between cells {0:?} and {1:?}")]
    NoSuchEdge(CellId, CellId),
    #[error("priority frontier is empty")]
    EmptyFrontier,
    #[error("net {0} has no route within the given constraints")]
    RouteNotFound(NetId),
    #[error("net {0} is still unrouted after rip-up and reroute")]
    CapacityExceededPermanently(NetId),
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    #[error("terminal {coord} of net '{net}' lies outside the grid")]
    TerminalOutsideGrid { net: String, coord: GridCoord },
}
