pub mod astar;
pub mod cost;
pub mod frontier;
