//! Pathfinding query inputs and outputs.

use std::collections::BTreeMap;

use crate::game::{AllyOracle, Location, SideId, Sides, TerrainMap, UnitIndex, UnitOracle};

/// A borrowed per-hex movement-cost function.
pub type CostFn<'a> = &'a dyn Fn(Location) -> u32;

/// Per-hex record in a shortest-path tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathNode {
    /// Movement remaining on arrival.
    pub moves_left: u32,
    /// Full turns remaining after the current one.
    pub turns_left: u32,
    /// The hex this one was entered from. The root points at itself.
    pub pred: Location,
}

/// Shortest-path tree: reached hex to its node.
///
/// Every non-root entry's predecessor is also an entry; the root's
/// self-loop terminates path reconstruction.
pub type SpTree = BTreeMap<Location, PathNode>;

/// A path, destination first, start last.
pub type Path = Vec<Location>;

/// Inputs of one pathfinding computation.
///
/// Everything is borrowed; a query never takes ownership of game state and
/// never mutates it beyond the interior memo caches.
pub struct PathQuery<'a> {
    /// Where the walker starts.
    pub start: Location,
    /// Per-hex movement cost. Hexes cost 1 when absent.
    pub cost: Option<CostFn<'a>>,
    /// Override cost applied only while the walker is still in the turn it
    /// started in. Models slowed units.
    pub first_turn_cost: Option<CostFn<'a>>,
    /// Movement remaining this turn.
    pub moves: u32,
    /// Full turns remaining after this one.
    pub turns: u32,
    /// Movement granted at the start of each later turn.
    pub max_moves: u32,
    /// The side doing the moving. When unset, other units are ignored.
    pub moving_side: Option<SideId>,
    /// The side whose knowledge limits the search. When unset, the walker
    /// sees everything.
    pub viewing_side: Option<SideId>,
    /// Whether zones of control are ignored (skirmishers).
    pub ignore_zoc: bool,
    /// The terrain map; hexes off this map are impassable.
    pub terrain: &'a TerrainMap,
    /// Units that may block movement or exert control.
    pub units: &'a UnitIndex,
    /// Per-side vision caches.
    pub sides: &'a Sides,
    /// Alliance truth, consulted through the sides cache's memo.
    pub allies: &'a dyn AllyOracle,
    /// Refresh path for dirty unit caches.
    pub refresh: Option<&'a dyn UnitOracle>,
}

impl PathQuery<'_> {
    pub(crate) fn cost_at(&self, loc: Location) -> u32 {
        match self.cost {
            Some(cost) => cost(loc),
            None => 1,
        }
    }
}
