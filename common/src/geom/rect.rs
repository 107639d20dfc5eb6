use super::coord::GridCoord;

/// Inclusive x/y box over gcells. Layers are never restricted by a box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridRect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl GridRect {
    pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn from_corners(a: GridCoord, b: GridCoord) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    /// Smallest box holding every coordinate, or `None` for an empty input.
    pub fn bounding<I: IntoIterator<Item = GridCoord>>(coords: I) -> Option<Self> {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut rect = Self::from_corners(first, first);
        for c in iter {
            rect.min_x = rect.min_x.min(c.x);
            rect.min_y = rect.min_y.min(c.y);
            rect.max_x = rect.max_x.max(c.x);
            rect.max_y = rect.max_y.max(c.y);
        }
        Some(rect)
    }

    #[inline(always)]
    pub fn contains(&self, c: GridCoord) -> bool {
        c.x >= self.min_x && c.x <= self.max_x && c.y >= self.min_y && c.y <= self.max_y
    }

    /// Grows the box by `margin` on every side, clamped to a `size_x` by `size_y` grid.
    pub fn expand(&self, margin: u32, size_x: u32, size_y: u32) -> Self {
        Self {
            min_x: self.min_x.saturating_sub(margin),
            min_y: self.min_y.saturating_sub(margin),
            max_x: self
                .max_x
                .saturating_add(margin)
                .min(size_x.saturating_sub(1)),
            max_y: self
                .max_y
                .saturating_add(margin)
                .min(size_y.saturating_sub(1)),
        }
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x
    }
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }
    pub fn half_perimeter(&self) -> u32 {
        self.width() + self.height()
    }
    pub fn area(&self) -> u64 {
        (self.width() as u64 + 1) * (self.height() as u64 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_covers_all_points() {
        let rect = GridRect::bounding([
            GridCoord::new(3, 1, 0),
            GridCoord::new(1, 4, 2),
            GridCoord::new(2, 2, 1),
        ])
        .unwrap();
        assert_eq!(rect, GridRect::new(1, 1, 3, 4));
        assert_eq!(rect.half_perimeter(), 5);
        assert_eq!(rect.area(), 12);
        assert!(GridRect::bounding(std::iter::empty()).is_none());
    }

    #[test]
    fn contains_ignores_layer() {
        let rect = GridRect::new(0, 0, 1, 1);
        assert!(rect.contains(GridCoord::new(1, 1, 7)));
        assert!(!rect.contains(GridCoord::new(2, 0, 0)));
    }

    #[test]
    fn expand_clamps_to_grid() {
        let rect = GridRect::new(1, 0, 2, 3).expand(2, 4, 5);
        assert_eq!(rect, GridRect::new(0, 0, 3, 4));
    }
}
