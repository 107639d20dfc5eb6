use gcr_common::db::indices::{EdgeId, NetId};
use gcr_common::geom::coord::GridCoord;
use gcr_common::geom::rect::GridRect;

/// A two-terminal connection request and its committed route.
#[derive(Clone, Debug)]
pub struct Net {
    pub id: NetId,
    pub name: String,
    /// Index of the originating `NetData` in the design, if any.
    pub design_index: Option<usize>,
    pub source: GridCoord,
    pub sink: GridCoord,
    /// Committed edges, source to sink. Empty while unrouted.
    pub path: Vec<EdgeId>,
    pub routed: bool,
}

impl Net {
    pub fn new(id: NetId, name: impl Into<String>, source: GridCoord, sink: GridCoord) -> Self {
        Self {
            id,
            name: name.into(),
            design_index: None,
            source,
            sink,
            path: Vec::new(),
            routed: false,
        }
    }

    /// x/y box spanned by the two terminals.
    pub fn terminal_box(&self) -> GridRect {
        GridRect::from_corners(self.source, self.sink)
    }
}
