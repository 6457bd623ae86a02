use serde::{Deserialize, Serialize};

/// Axial neighbor offsets for pointy-top hexes, in fixed scan order.
pub const AXIAL_DIRECTIONS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

/// Axial coordinate for a pointy-top hex grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Axial {
    pub q: i32,
    pub r: i32,
}

impl Axial {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The six raw (un-canonicalized) neighbors in direction order.
    pub fn neighbors(self) -> impl Iterator<Item = Axial> {
        AXIAL_DIRECTIONS
            .iter()
            .map(move |&(dq, dr)| Axial::new(self.q + dq, self.r + dr))
    }

    /// Hex (cube) distance between two axial coordinates.
    pub fn distance(self, other: Axial) -> i32 {
        let dq = self.q - other.q;
        let dr = self.r - other.r;
        dq.abs().max(dr.abs()).max((dq + dr).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_are_unit_distance() {
        let origin = Axial::new(0, 0);
        for neighbor in origin.neighbors() {
            assert_eq!(origin.distance(neighbor), 1);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Axial::new(-4, 7);
        let b = Axial::new(12, -3);
        assert_eq!(a.distance(b), b.distance(a));
        assert_eq!(a.distance(a), 0);
    }

    #[test]
    fn distance_matches_cube_metric() {
        // (3, -2) in cube space is (3, -1, -2): max component 3.
        assert_eq!(Axial::new(0, 0).distance(Axial::new(3, -2)), 3);
        assert_eq!(Axial::new(0, 0).distance(Axial::new(2, 2)), 4);
    }
}
