//! The terrain map and movement-cost composition.

use std::collections::BTreeMap;

use crate::game::Location;

/// Opaque terrain code, e.g. `"Gg"` or `"forest"`.
pub type TerrainId = String;

/// Mapping from map location to terrain.
///
/// Locations absent from the map are off-map; pathfinding treats them as
/// impassable.
#[derive(Debug, Clone, Default)]
pub struct TerrainMap {
    tiles: BTreeMap<Location, TerrainId>,
}

impl TerrainMap {
    /// An empty (fully off-map) map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `loc` is on the map.
    #[must_use]
    pub fn contains(&self, loc: Location) -> bool {
        self.tiles.contains_key(&loc)
    }

    /// Terrain at `loc`, if on-map.
    #[must_use]
    pub fn get(&self, loc: Location) -> Option<&str> {
        self.tiles.get(&loc).map(String::as_str)
    }

    /// Set the terrain at `loc`, returning the previous terrain.
    pub fn set(&mut self, loc: Location, terrain: impl Into<TerrainId>) -> Option<TerrainId> {
        self.tiles.insert(loc, terrain.into())
    }

    /// Remove `loc` from the map (make it off-map).
    pub fn remove(&mut self, loc: Location) -> Option<TerrainId> {
        self.tiles.remove(&loc)
    }

    /// Number of on-map hexes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the map has no hexes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Iterate over hexes in location order.
    pub fn iter(&self) -> impl Iterator<Item = (Location, &str)> {
        self.tiles.iter().map(|(loc, t)| (*loc, t.as_str()))
    }

    /// Compose the map with a per-terrain cost table into a per-hex cost
    /// table. Hexes whose terrain is not in `costs` get `missing`.
    #[must_use]
    pub fn movement_costs(
        &self,
        costs: &BTreeMap<TerrainId, u32>,
        missing: u32,
    ) -> BTreeMap<Location, u32> {
        self.tiles
            .iter()
            .map(|(loc, terrain)| (*loc, costs.get(terrain).copied().unwrap_or(missing)))
            .collect()
    }

    /// Like [`movement_costs`](Self::movement_costs), but hexes with
    /// unlisted terrain are omitted entirely.
    #[must_use]
    pub fn movement_costs_strict(
        &self,
        costs: &BTreeMap<TerrainId, u32>,
    ) -> BTreeMap<Location, u32> {
        self.tiles
            .iter()
            .filter_map(|(loc, terrain)| costs.get(terrain).map(|c| (*loc, *c)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TerrainMap {
        let mut map = TerrainMap::new();
        map.set(Location::new(0, 0), "grass");
        map.set(Location::new(1, 0), "hills");
        map.set(Location::new(2, 0), "swamp");
        map
    }

    #[test]
    fn test_set_get_remove() {
        let mut map = sample();
        assert_eq!(map.get(Location::new(1, 0)), Some("hills"));
        assert!(map.contains(Location::new(0, 0)));
        map.remove(Location::new(0, 0));
        assert!(!map.contains(Location::new(0, 0)));
    }

    #[test]
    fn test_movement_costs_with_default() {
        let map = sample();
        let costs: BTreeMap<TerrainId, u32> =
            [("grass".to_string(), 1), ("hills".to_string(), 2)].into();
        let by_hex = map.movement_costs(&costs, 9);
        assert_eq!(by_hex[&Location::new(0, 0)], 1);
        assert_eq!(by_hex[&Location::new(1, 0)], 2);
        assert_eq!(by_hex[&Location::new(2, 0)], 9);
    }

    #[test]
    fn test_movement_costs_strict_omits_unlisted() {
        let map = sample();
        let costs: BTreeMap<TerrainId, u32> = [("grass".to_string(), 1)].into();
        let by_hex = map.movement_costs_strict(&costs);
        assert_eq!(by_hex.len(), 1);
        assert!(by_hex.contains_key(&Location::new(0, 0)));
    }
}
