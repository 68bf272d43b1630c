//! The unit index: one record per live unit, reachable by id and location.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::game::{Location, SideId};

/// Unit identifier, assigned by the host on construction.
pub type UnitId = u32;

/// The slice of a unit the pathfinder cares about.
///
/// These fields are a cache of script-owned truth; a record whose cache has
/// been invalidated refreshes them through a [`UnitOracle`] before they are
/// read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitFacts {
    /// Owning side.
    pub side: SideId,
    /// Whether the unit is hiding (invisible to enemies outside fog range).
    pub hidden: bool,
    /// Whether the unit projects a zone of control on adjacent hexes.
    pub emits_zoc: bool,
    /// Where the script currently places the unit. May differ from the
    /// index position until the index catches up.
    pub location: Location,
}

/// Refreshes a unit's cached facts from the script-side truth.
///
/// Returning `None` means the unit no longer exists on the script side.
pub trait UnitOracle {
    /// Current facts for `id`.
    fn unit_facts(&self, id: UnitId) -> Option<UnitFacts>;
}

impl<F> UnitOracle for F
where
    F: Fn(UnitId) -> Option<UnitFacts>,
{
    fn unit_facts(&self, id: UnitId) -> Option<UnitFacts> {
        self(id)
    }
}

/// One unit in the index.
#[derive(Debug)]
pub struct UnitRec {
    id: UnitId,
    location: Location,
    facts: RefCell<Option<UnitFacts>>,
}

impl UnitRec {
    /// A record with a fresh cache.
    #[must_use]
    pub fn new(id: UnitId, facts: UnitFacts) -> Self {
        Self {
            id,
            location: facts.location,
            facts: RefCell::new(Some(facts)),
        }
    }

    /// The unit's id.
    #[must_use]
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// The location this record is indexed under.
    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }

    /// Invalidate the cached facts.
    pub fn mark_dirty(&self) {
        *self.facts.borrow_mut() = None;
    }

    /// Whether the cache needs a refresh.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.facts.borrow().is_none()
    }

    /// Replace the cached facts with known-fresh values.
    pub fn set_facts(&self, facts: UnitFacts) {
        *self.facts.borrow_mut() = Some(facts);
    }

    /// The cached facts, refreshing through `oracle` when dirty.
    ///
    /// `None` when the cache is dirty and no oracle is available, or the
    /// oracle reports the unit gone.
    pub fn facts(&self, oracle: Option<&dyn UnitOracle>) -> Option<UnitFacts> {
        let mut slot = self.facts.borrow_mut();
        if slot.is_none() {
            if let Some(oracle) = oracle {
                *slot = oracle.unit_facts(self.id);
            }
        }
        *slot
    }
}

/// Dual-indexed unit collection: ordered-unique by id, unique by location.
///
/// The invariant is that no two live units share a location; inserting onto
/// an occupied hex displaces the previous occupant.
#[derive(Debug, Default)]
pub struct UnitIndex {
    by_id: BTreeMap<UnitId, UnitRec>,
    by_loc: BTreeMap<Location, UnitId>,
}

impl UnitIndex {
    /// An empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a unit, returning whatever previously occupied its hex.
    pub fn insert(&mut self, rec: UnitRec) -> Option<UnitRec> {
        self.remove(rec.id);
        let displaced = match self.by_loc.get(&rec.location) {
            Some(&occupant) => self.remove(occupant),
            None => None,
        };
        self.by_loc.insert(rec.location, rec.id);
        self.by_id.insert(rec.id, rec);
        displaced
    }

    /// Remove a unit by id.
    pub fn remove(&mut self, id: UnitId) -> Option<UnitRec> {
        let rec = self.by_id.remove(&id)?;
        self.by_loc.remove(&rec.location);
        Some(rec)
    }

    /// Move a unit to a new hex, displacing any occupant there.
    ///
    /// Returns `false` if the unit is unknown.
    pub fn relocate(&mut self, id: UnitId, to: Location) -> bool {
        let Some(mut rec) = self.remove(id) else {
            return false;
        };
        rec.location = to;
        if let Some(facts) = rec.facts.get_mut().as_mut() {
            facts.location = to;
        }
        self.insert(rec);
        true
    }

    /// Look up by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&UnitRec> {
        self.by_id.get(&id)
    }

    /// Look up by location.
    #[must_use]
    pub fn at(&self, loc: Location) -> Option<&UnitRec> {
        self.by_loc.get(&loc).and_then(|id| self.by_id.get(id))
    }

    /// Number of live units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterate over records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitRec> {
        self.by_id.values()
    }

    /// Invalidate one unit's cache.
    pub fn mark_dirty(&self, id: UnitId) {
        if let Some(rec) = self.by_id.get(&id) {
            rec.mark_dirty();
        }
    }

    /// Invalidate every unit's cache.
    pub fn mark_all_dirty(&self) {
        for rec in self.by_id.values() {
            rec.mark_dirty();
        }
    }
}
