use std::fmt;

/// A gcell position. Ordering compares `x`, then `y`, then `z`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl GridCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_x_then_y_then_z() {
        let mut coords = vec![
            GridCoord::new(1, 0, 0),
            GridCoord::new(0, 2, 0),
            GridCoord::new(0, 1, 3),
            GridCoord::new(0, 1, 1),
        ];
        coords.sort();
        assert_eq!(
            coords,
            vec![
                GridCoord::new(0, 1, 1),
                GridCoord::new(0, 1, 3),
                GridCoord::new(0, 2, 0),
                GridCoord::new(1, 0, 0),
            ]
        );
    }

    #[test]
    fn displays_as_triple() {
        assert_eq!(GridCoord::new(3, 4, 1).to_string(), "(3, 4, 1)");
    }
}
