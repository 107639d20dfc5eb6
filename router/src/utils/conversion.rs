use gcr_common::db::core::DesignDB;
use gcr_common::geom::coord::GridCoord;

/// Maps real coordinates onto gcells of a uniform tile grid and back.
pub struct GridConverter {
    origin_x: u64,
    origin_y: u64,
    tile_w: u64,
    tile_h: u64,
    grid_w: u32,
    grid_h: u32,
}

impl GridConverter {
    pub fn new(
        origin_x: u32,
        origin_y: u32,
        tile_w: u32,
        tile_h: u32,
        grid_w: u32,
        grid_h: u32,
    ) -> Self {
        Self {
            origin_x: origin_x as u64,
            origin_y: origin_y as u64,
            tile_w: tile_w.max(1) as u64,
            tile_h: tile_h.max(1) as u64,
            grid_w,
            grid_h,
        }
    }

    pub fn from_design(design: &DesignDB) -> Self {
        Self::new(
            design.origin_x,
            design.origin_y,
            design.tile_width,
            design.tile_height,
            design.grid_x,
            design.grid_y,
        )
    }

    /// The gcell holding `(x, y)`, or `None` when the point is off the grid.
    pub fn try_to_grid(&self, x: u32, y: u32, layer: u8) -> Option<GridCoord> {
        let (x, y) = (x as u64, y as u64);
        if x < self.origin_x || y < self.origin_y {
            return None;
        }
        let gx = (x - self.origin_x) / self.tile_w;
        let gy = (y - self.origin_y) / self.tile_h;
        if gx >= self.grid_w as u64 || gy >= self.grid_h as u64 {
            return None;
        }
        Some(GridCoord::new(gx as u32, gy as u32, layer))
    }

    /// Like `try_to_grid`, but clamps off-grid points to the nearest gcell.
    pub fn to_grid(&self, x: u32, y: u32, layer: u8) -> GridCoord {
        let gx = (x as u64).saturating_sub(self.origin_x) / self.tile_w;
        let gy = (y as u64).saturating_sub(self.origin_y) / self.tile_h;
        GridCoord::new(
            gx.min(self.grid_w.saturating_sub(1) as u64) as u32,
            gy.min(self.grid_h.saturating_sub(1) as u64) as u32,
            layer,
        )
    }

    /// Centre of the tile under `g`.
    pub fn to_world(&self, g: GridCoord) -> (u64, u64) {
        (
            self.origin_x + g.x as u64 * self.tile_w + self.tile_w / 2,
            self.origin_y + g.y as u64 * self.tile_h + self.tile_h / 2,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_points_into_tiles() {
        let conv = GridConverter::new(100, 50, 10, 20, 4, 3);
        assert_eq!(conv.try_to_grid(100, 50, 0), Some(GridCoord::new(0, 0, 0)));
        assert_eq!(conv.try_to_grid(139, 109, 1), Some(GridCoord::new(3, 2, 1)));
        assert_eq!(conv.try_to_grid(140, 60, 0), None);
        assert_eq!(conv.try_to_grid(99, 60, 0), None);
        assert_eq!(conv.to_grid(99, 500, 0), GridCoord::new(0, 2, 0));
    }

    #[test]
    fn world_point_is_tile_centre() {
        let conv = GridConverter::new(100, 50, 10, 20, 4, 3);
        assert_eq!(conv.to_world(GridCoord::new(2, 1, 0)), (125, 80));
        let (x, y) = conv.to_world(GridCoord::new(3, 2, 0));
        assert_eq!(
            conv.try_to_grid(x as u32, y as u32, 0),
            Some(GridCoord::new(3, 2, 0))
        );
    }
}
