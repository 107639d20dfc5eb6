pub mod coord;
pub mod rect;

pub use coord::GridCoord;
pub use rect::GridRect;
