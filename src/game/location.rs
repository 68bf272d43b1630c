//! Map locations and the hex topology.

use std::fmt;
use std::str::FromStr;

/// A position on the map, in offset coordinates.
///
/// Locations order lexicographically by `(x, y)`, which is what every
/// ordered container in the engine relies on for deterministic iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Location {
    /// Create a location.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Location {
    /// Formats as `x,y`, the key form the script side uses for
    /// location-keyed tables.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Location {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s.split_once(',').ok_or(())?;
        Ok(Location {
            x: x.trim().parse().map_err(|_| ())?,
            y: y.trim().parse().map_err(|_| ())?,
        })
    }
}

/// Which column parity sits half a tile higher than its neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnShift {
    /// Even-x columns are shifted up. The engine default.
    #[default]
    EvenUp,
    /// Odd-x columns are shifted up.
    OddUp,
}

/// Hex-grid adjacency in offset coordinates.
///
/// A shifted column's diagonal neighbors share its row and the row above;
/// an unshifted column's share its row and the row below.
#[derive(Debug, Clone, Copy, Default)]
pub struct HexTopology {
    shift: ColumnShift,
}

impl HexTopology {
    /// Topology with the given shift convention.
    #[must_use]
    pub const fn new(shift: ColumnShift) -> Self {
        Self { shift }
    }

    fn shifted(&self, x: i32) -> bool {
        let even = x & 1 == 0;
        match self.shift {
            ColumnShift::EvenUp => even,
            ColumnShift::OddUp => !even,
        }
    }

    /// The six hexes adjacent to `a`.
    #[must_use]
    pub fn neighbors(&self, a: Location) -> [Location; 6] {
        let dy = if self.shifted(a.x) { -1 } else { 0 };
        [
            Location::new(a.x, a.y - 1),
            Location::new(a.x + 1, a.y + dy),
            Location::new(a.x + 1, a.y + dy + 1),
            Location::new(a.x, a.y + 1),
            Location::new(a.x - 1, a.y + dy + 1),
            Location::new(a.x - 1, a.y + dy),
        ]
    }

    /// Whether `a` and `b` touch.
    #[must_use]
    pub fn adjacent(&self, a: Location, b: Location) -> bool {
        self.neighbors(a).contains(&b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_ordering_is_lexicographic() {
        assert!(Location::new(0, 5) < Location::new(1, 0));
        assert!(Location::new(1, 0) < Location::new(1, 1));
    }

    #[test]
    fn test_location_key_roundtrip() {
        let loc = Location::new(-3, 17);
        let parsed: Location = loc.to_string().parse().unwrap();
        assert_eq!(parsed, loc);
    }

    #[test]
    fn test_even_column_neighbors() {
        let topo = HexTopology::default();
        let n = topo.neighbors(Location::new(2, 2));
        for expected in [(2, 1), (3, 1), (3, 2), (2, 3), (1, 2), (1, 1)] {
            assert!(n.contains(&Location::new(expected.0, expected.1)), "{expected:?}");
        }
    }

    #[test]
    fn test_odd_column_neighbors() {
        let topo = HexTopology::default();
        let n = topo.neighbors(Location::new(1, 1));
        for expected in [(1, 0), (2, 1), (2, 2), (1, 2), (0, 2), (0, 1)] {
            assert!(n.contains(&Location::new(expected.0, expected.1)), "{expected:?}");
        }
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let topo = HexTopology::default();
        for x in -2..3 {
            for y in -2..3 {
                let a = Location::new(x, y);
                for b in topo.neighbors(a) {
                    assert!(topo.adjacent(b, a), "{a} <-> {b}");
                }
            }
        }
    }

    #[test]
    fn test_negative_columns_have_parity() {
        let topo = HexTopology::default();
        // -1 is an odd column under either sign convention
        let n = topo.neighbors(Location::new(-1, 0));
        assert!(n.contains(&Location::new(0, 0)));
        assert!(n.contains(&Location::new(0, 1)));
    }

    #[test]
    fn test_odd_up_convention_mirrors() {
        let topo = HexTopology::new(ColumnShift::OddUp);
        let n = topo.neighbors(Location::new(1, 1));
        assert!(n.contains(&Location::new(0, 0)));
        assert!(n.contains(&Location::new(2, 0)));
    }
}
