//! Per-side vision state and the alliance cache.

use std::cell::RefCell;
use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::game::Location;

/// Side identifier. Sides are keyed with positive integers script-side.
pub type SideId = u32;

/// Answers the pairwise alliance question from script-side truth.
///
/// The oracle runs while native queries hold the game state borrowed, so an
/// implementation must only read script state, never write game tables.
pub trait AllyOracle {
    /// Whether sides `a` and `b` share a team.
    fn are_allied(&self, a: SideId, b: SideId) -> bool;
}

impl<F> AllyOracle for F
where
    F: Fn(SideId, SideId) -> bool,
{
    fn are_allied(&self, a: SideId, b: SideId) -> bool {
        self(a, b)
    }
}

/// Cached per-side vision state.
///
/// Everything here speeds up native vision checks; the authoritative side
/// data lives script-side. Fog covers units (default covered), shroud
/// covers the map itself (default revealed).
#[derive(Debug, Default)]
pub struct Sides {
    share_vision: BTreeMap<SideId, bool>,
    share_maps: BTreeMap<SideId, bool>,
    fog: BTreeMap<SideId, BTreeMap<Location, bool>>,
    fog_override: BTreeMap<SideId, BTreeMap<Location, bool>>,
    shroud: BTreeMap<SideId, BTreeMap<Location, bool>>,
    ally_cache: RefCell<FxHashMap<(SideId, SideId), bool>>,
}

impl Sides {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record whether `side` shares what it sees with its allies.
    pub fn set_share_vision(&mut self, side: SideId, share: bool) {
        self.share_vision.insert(side, share);
    }

    /// Record whether `side` shares its explored map with its allies.
    pub fn set_share_maps(&mut self, side: SideId, share: bool) {
        self.share_maps.insert(side, share);
    }

    /// Set the fog state of one hex for one side.
    pub fn set_fog(&mut self, side: SideId, loc: Location, fogged: bool) {
        self.fog.entry(side).or_default().insert(loc, fogged);
    }

    /// Set or clear a fog override for one hex.
    pub fn set_fog_override(&mut self, side: SideId, loc: Location, fogged: Option<bool>) {
        let table = self.fog_override.entry(side).or_default();
        match fogged {
            Some(value) => {
                table.insert(loc, value);
            }
            None => {
                table.remove(&loc);
            }
        }
    }

    /// Set the shroud state of one hex for one side.
    pub fn set_shroud(&mut self, side: SideId, loc: Location, shrouded: bool) {
        self.shroud.entry(side).or_default().insert(loc, shrouded);
    }

    /// Drop every memoized alliance answer.
    ///
    /// The memo is monotonic between calls: entries are never individually
    /// invalidated. The host clears it at turn boundaries and whenever a
    /// side is reassigned.
    pub fn clear_ally_cache(&self) {
        self.ally_cache.borrow_mut().clear();
    }

    /// Raw fog state: covered unless the table says otherwise.
    #[must_use]
    pub fn true_fog(&self, loc: Location, side: SideId) -> bool {
        self.fog
            .get(&side)
            .and_then(|t| t.get(&loc))
            .copied()
            .unwrap_or(true)
    }

    /// The fog override for a hex, if one is set.
    #[must_use]
    pub fn get_fog_override(&self, loc: Location, side: SideId) -> Option<bool> {
        self.fog_override.get(&side).and_then(|t| t.get(&loc)).copied()
    }

    /// Fog state after applying any override.
    #[must_use]
    pub fn override_adjusted_fog(&self, loc: Location, side: SideId) -> bool {
        self.get_fog_override(loc, side)
            .unwrap_or_else(|| self.true_fog(loc, side))
    }

    /// Raw shroud state: revealed unless the table says otherwise.
    #[must_use]
    pub fn true_shroud(&self, loc: Location, side: SideId) -> bool {
        self.shroud
            .get(&side)
            .and_then(|t| t.get(&loc))
            .copied()
            .unwrap_or(false)
    }

    /// Memoized alliance check.
    ///
    /// Keys are canonicalized `(min, max)`, so the cache answers both
    /// directions from one probe; symmetry of the underlying team
    /// assignment is the script's obligation. The diagonal is always
    /// allied and never consults the oracle.
    pub fn are_allied(&self, a: SideId, b: SideId, oracle: &dyn AllyOracle) -> bool {
        if a == b {
            return true;
        }
        let key = (a.min(b), a.max(b));
        if let Some(&answer) = self.ally_cache.borrow().get(&key) {
            return answer;
        }
        let answer = oracle.are_allied(key.0, key.1);
        self.ally_cache.borrow_mut().insert(key, answer);
        answer
    }

    /// Fog for `side` at `loc` after vision sharing with allies.
    pub fn ally_adjusted_fog(&self, loc: Location, side: SideId, oracle: &dyn AllyOracle) -> bool {
        if !self.override_adjusted_fog(loc, side) {
            return false;
        }
        for (&other, &shares) in &self.share_vision {
            if shares
                && self.are_allied(side, other, oracle)
                && !self.override_adjusted_fog(loc, other)
            {
                return false;
            }
        }
        true
    }

    /// Shroud for `side` at `loc` after map sharing with allies.
    pub fn ally_adjusted_shroud(
        &self,
        loc: Location,
        side: SideId,
        oracle: &dyn AllyOracle,
    ) -> bool {
        if !self.true_shroud(loc, side) {
            return false;
        }
        for (&other, &shares) in &self.share_maps {
            if shares && self.are_allied(side, other, oracle) && !self.true_shroud(loc, other) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const L: Location = Location::new(3, 3);

    #[test]
    fn test_fog_defaults_covered() {
        let sides = Sides::new();
        assert!(sides.true_fog(L, 1));
        assert!(!sides.true_shroud(L, 1));
    }

    #[test]
    fn test_fog_override_wins() {
        let mut sides = Sides::new();
        sides.set_fog(1, L, true);
        sides.set_fog_override(1, L, Some(false));
        assert!(!sides.override_adjusted_fog(L, 1));
        sides.set_fog_override(1, L, None);
        assert!(sides.override_adjusted_fog(L, 1));
    }

    #[test]
    fn test_diagonal_is_allied_without_oracle() {
        let sides = Sides::new();
        let oracle = |_: SideId, _: SideId| panic!("diagonal must not probe");
        assert!(sides.are_allied(2, 2, &oracle));
    }

    #[test]
    fn test_ally_memo_probes_once_per_pair() {
        let sides = Sides::new();
        let probes = Cell::new(0);
        let oracle = |a: SideId, b: SideId| {
            probes.set(probes.get() + 1);
            a == 1 && b == 2
        };
        assert!(sides.are_allied(1, 2, &oracle));
        assert!(sides.are_allied(2, 1, &oracle));
        assert_eq!(probes.get(), 1);

        sides.clear_ally_cache();
        assert!(sides.are_allied(1, 2, &oracle));
        assert_eq!(probes.get(), 2);
    }

    #[test]
    fn test_shared_vision_lifts_fog_for_ally() {
        let mut sides = Sides::new();
        // side 2 sees the hex and shares vision
        sides.set_share_vision(2, true);
        sides.set_fog(2, L, false);
        let allied = |_a: SideId, _b: SideId| true;
        assert!(!sides.ally_adjusted_fog(L, 1, &allied));

        let hostile = |_a: SideId, _b: SideId| false;
        sides.clear_ally_cache();
        assert!(sides.ally_adjusted_fog(L, 1, &hostile));
    }

    #[test]
    fn test_unshared_vision_does_not_lift_fog() {
        let mut sides = Sides::new();
        sides.set_share_vision(2, false);
        sides.set_fog(2, L, false);
        let allied = |_a: SideId, _b: SideId| true;
        assert!(sides.ally_adjusted_fog(L, 1, &allied));
    }

    #[test]
    fn test_shared_maps_lift_shroud() {
        let mut sides = Sides::new();
        sides.set_shroud(1, L, true);
        sides.set_shroud(2, L, false);
        sides.set_share_maps(2, true);
        let allied = |_a: SideId, _b: SideId| true;
        assert!(!sides.ally_adjusted_shroud(L, 1, &allied));
    }

    #[test]
    fn test_own_sight_short_circuits_sharing() {
        let mut sides = Sides::new();
        sides.set_fog(1, L, false);
        let oracle = |_: SideId, _: SideId| panic!("own sight must not probe allies");
        assert!(!sides.ally_adjusted_fog(L, 1, &oracle));
    }
}
