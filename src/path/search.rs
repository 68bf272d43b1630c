//! The turn-aware best-first search and its owning context.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::QueryError;
use crate::game::{HexTopology, Location};
use crate::path::query::{Path, PathNode, PathQuery, SpTree};

/// Owns the movement graph: topology plus tunnels, and the memoized
/// default-cost metric used as a planning heuristic.
#[derive(Debug, Default)]
pub struct PathContext {
    topology: HexTopology,
    tunnels: BTreeMap<Location, BTreeSet<Location>>,
    heuristic_cache: RefCell<FxHashMap<(Location, Location), u32>>,
}

/// One frontier entry. Orders by `(turns_left, moves_left)` descending with
/// insertion order as the tiebreak, so the heap pops the node that
/// preserves the most movement first and output is stable across runs.
#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    loc: Location,
    node: PathNode,
    seq: u64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.node
            .turns_left
            .cmp(&other.node.turns_left)
            .then(self.node.moves_left.cmp(&other.node.moves_left))
            .then(other.seq.cmp(&self.seq))
    }
}

impl PathContext {
    /// A context over the given topology with no tunnels.
    #[must_use]
    pub fn new(topology: HexTopology) -> Self {
        Self {
            topology,
            tunnels: BTreeMap::new(),
            heuristic_cache: RefCell::new(FxHashMap::default()),
        }
    }

    /// The underlying topology.
    #[must_use]
    pub fn topology(&self) -> &HexTopology {
        &self.topology
    }

    /// Hexes reachable from `a` in one step: the six topological neighbors
    /// plus any tunnel exits.
    #[must_use]
    pub fn neighbors(&self, a: Location) -> Vec<Location> {
        let mut result: Vec<Location> = self.topology.neighbors(a).to_vec();
        if let Some(exits) = self.tunnels.get(&a) {
            result.extend(exits.iter().copied());
        }
        result
    }

    /// Whether a walker at `a` can step to `b`.
    ///
    /// Tunnels are directed: a tunnel from `a` to `b` does not imply one
    /// from `b` to `a`.
    #[must_use]
    pub fn adjacent(&self, a: Location, b: Location) -> bool {
        self.topology.adjacent(a, b)
            || self.tunnels.get(&a).is_some_and(|exits| exits.contains(&b))
    }

    /// Add a directed tunnel. Returns whether the tunnel set changed; any
    /// change empties the heuristic cache.
    pub fn add_tunnel(&mut self, a: Location, b: Location) -> bool {
        let added = self.tunnels.entry(a).or_default().insert(b);
        if added {
            trace!(%a, %b, "tunnel added, heuristic cache dropped");
            self.heuristic_cache.borrow_mut().clear();
        }
        added
    }

    /// Remove a directed tunnel. Returns whether the tunnel set changed;
    /// any change empties the heuristic cache.
    pub fn remove_tunnel(&mut self, a: Location, b: Location) -> bool {
        let removed = match self.tunnels.get_mut(&a) {
            Some(exits) => {
                let removed = exits.remove(&b);
                if exits.is_empty() {
                    self.tunnels.remove(&a);
                }
                removed
            }
            None => false,
        };
        if removed {
            trace!(%a, %b, "tunnel removed, heuristic cache dropped");
            self.heuristic_cache.borrow_mut().clear();
        }
        removed
    }

    /// Compute the shortest-path tree for `query`.
    ///
    /// With a destination, the computation stops as soon as the destination
    /// is popped and only the branch from destination back to the root is
    /// returned; without one, the full reachable tree is.
    #[must_use]
    pub fn compute_tree(&self, query: &PathQuery<'_>, destination: Option<Location>) -> SpTree {
        let mut tree = SpTree::new();
        let mut heap = BinaryHeap::new();
        let mut seq = 0u64;
        heap.push(HeapEntry {
            loc: query.start,
            node: PathNode {
                moves_left: query.moves,
                turns_left: query.turns,
                pred: query.start,
            },
            seq,
        });

        while let Some(entry) = heap.pop() {
            let loc = entry.loc;
            if tree.contains_key(&loc) {
                // a better entry for this hex was already expanded
                continue;
            }

            if destination == Some(loc) {
                return branch_to_root(&tree, loc, entry.node);
            }

            tree.insert(loc, entry.node);

            for neighbor in self.neighbors(loc) {
                if tree.contains_key(&neighbor) {
                    continue;
                }
                if !query.terrain.contains(neighbor) {
                    continue; // off-map
                }
                if let Some(viewer) = query.viewing_side {
                    if query.sides.ally_adjusted_shroud(neighbor, viewer, query.allies) {
                        continue; // the walker does not know this hex exists
                    }
                }

                let mut used_override = false;
                let mut cost = match (query.first_turn_cost, entry.node.turns_left == query.turns) {
                    (Some(first), true) => {
                        used_override = true;
                        first(neighbor)
                    }
                    _ => query.cost_at(neighbor),
                };

                let mut turns_left = entry.node.turns_left;
                let mut moves_left = entry.node.moves_left;

                if cost > moves_left && turns_left > 0 {
                    turns_left -= 1;
                    moves_left = query.max_moves;
                    if used_override {
                        // the step lands in a later turn, so the first-turn
                        // cost no longer applies
                        cost = query.cost_at(neighbor);
                    }
                }
                if cost > moves_left {
                    continue;
                }
                moves_left -= cost;

                if query.moving_side.is_some() {
                    if visible_enemy(neighbor, query, false) {
                        continue; // an enemy already stands there
                    }
                    if !query.ignore_zoc && moves_left > 0 {
                        for watcher in self.topology.neighbors(neighbor) {
                            if visible_enemy(watcher, query, true) {
                                moves_left = 0;
                                break;
                            }
                        }
                    }
                }

                seq += 1;
                heap.push(HeapEntry {
                    loc: neighbor,
                    node: PathNode {
                        moves_left,
                        turns_left,
                        pred: loc,
                    },
                    seq,
                });
            }
        }
        tree
    }

    /// Every hex the walker can reach.
    #[must_use]
    pub fn reachable_hexes(&self, query: &PathQuery<'_>) -> BTreeSet<Location> {
        self.compute_tree(query, None).keys().copied().collect()
    }

    /// One path per reachable hex, each destination first, start last.
    #[must_use]
    pub fn reachable_hexes_with_paths(&self, query: &PathQuery<'_>) -> Vec<Path> {
        let tree = self.compute_tree(query, None);
        tree.keys().map(|&loc| unwind(&tree, loc)).collect()
    }

    /// The path to `destination`, destination first, start last. Empty when
    /// the destination is unreachable.
    #[must_use]
    pub fn shortest_path(&self, destination: Location, query: &PathQuery<'_>) -> Path {
        let tree = self.compute_tree(query, Some(destination));
        unwind(&tree, destination)
    }

    /// How many turns reaching `destination` consumes: zero iff the
    /// destination is the start.
    pub fn shortest_path_distance(
        &self,
        destination: Location,
        query: &PathQuery<'_>,
    ) -> Result<u32, QueryError> {
        if destination == query.start {
            return Ok(0);
        }
        let tree = self.compute_tree(query, Some(destination));
        tree.get(&destination)
            .map(|node| query.turns - node.turns_left + 1)
            .ok_or(QueryError::Unreachable { destination })
    }

    /// Memoized unit-cost distance over the bare movement graph, ignoring
    /// terrain, units and vision. Cleared whenever the tunnel set changes.
    ///
    /// Tunnels are directed, so the metric is ordered: `(a, b)` and
    /// `(b, a)` are cached separately.
    #[must_use]
    pub fn heuristic_distance(&self, a: Location, b: Location) -> u32 {
        if a == b {
            return 0;
        }
        if let Some(&answer) = self.heuristic_cache.borrow().get(&(a, b)) {
            return answer;
        }
        let answer = self.bare_distance(a, b);
        self.heuristic_cache.borrow_mut().insert((a, b), answer);
        answer
    }

    /// Breadth-first unit-cost distance on topology + tunnels. The graph is
    /// connected, so the search always terminates.
    fn bare_distance(&self, a: Location, b: Location) -> u32 {
        let mut seen = BTreeSet::from([a]);
        let mut frontier = VecDeque::from([(a, 0u32)]);
        while let Some((loc, dist)) = frontier.pop_front() {
            for neighbor in self.neighbors(loc) {
                if neighbor == b {
                    return dist + 1;
                }
                if seen.insert(neighbor) {
                    frontier.push_back((neighbor, dist + 1));
                }
            }
        }
        unreachable!("hex topology is connected")
    }
}

/// Whether a unit at `loc` blocks the querying side's movement (or, with
/// `must_exert_zoc`, projects control over it).
fn visible_enemy(loc: Location, query: &PathQuery<'_>, must_exert_zoc: bool) -> bool {
    let Some(moving) = query.moving_side else {
        return false;
    };
    let Some(rec) = query.units.at(loc) else {
        return false;
    };
    let Some(facts) = rec.facts(query.refresh) else {
        return false; // gone script-side
    };
    if facts.location != loc {
        return false; // moved away during refresh
    }
    if must_exert_zoc && !facts.emits_zoc {
        return false;
    }
    if query.sides.are_allied(facts.side, moving, query.allies) {
        return false; // only enemies block
    }
    match query.viewing_side {
        None => true, // the walker sees all
        Some(viewer) => {
            (!facts.hidden || query.sides.are_allied(facts.side, viewer, query.allies))
                && !query.sides.ally_adjusted_fog(loc, viewer, query.allies)
        }
    }
}

/// Walk predecessors from `loc` to the root. Destination first, start last;
/// empty when `loc` is not in the tree.
fn unwind(tree: &SpTree, loc: Location) -> Path {
    let Some(mut node) = tree.get(&loc).copied() else {
        return Vec::new();
    };
    let mut current = loc;
    let mut path = vec![current];
    while node.pred != current {
        current = node.pred;
        path.push(current);
        match tree.get(&current) {
            Some(next) => node = *next,
            None => break, // tree invariant violated upstream; stop short
        }
    }
    path
}

/// Rebuild the sub-tree holding only the branch from `loc` to the root.
fn branch_to_root(tree: &SpTree, loc: Location, node: PathNode) -> SpTree {
    let mut branch = SpTree::new();
    let mut current = (loc, node);
    while current.1.pred != current.0 {
        branch.insert(current.0, current.1);
        let pred = current.1.pred;
        match tree.get(&pred) {
            Some(next) => current = (pred, *next),
            None => return branch,
        }
    }
    // the root self-loop keeps the tree invariant intact
    branch.insert(current.0, current.1);
    branch
}
