//! The owning engine handle.
//!
//! One `Engine` is one loaded scenario: it owns the interpreter, the native
//! game-state caches and the pathfinder for its whole lifetime. Write
//! operations go through the script's event machinery; read queries borrow
//! the native state directly.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use mlua::{Function, Value};
use tracing::{debug, info};

use crate::error::{QueryError, ReportError, ScriptError};
use crate::game::{
    Controller, EventResult, Label, Location, Phase, SideId, SideResult, UnitId,
};
use crate::gml::{Config, Node};
use crate::path::{CostFn, Path, PathQuery};
use crate::script::bridge;
use crate::script::host::{self, load_chunk, LuaAllies, LuaUnits};

/// Native-side description of a movement query. The script-side unit
/// supplies the numbers; the engine supplies the borrowed game state.
#[derive(Debug, Clone, Default)]
pub struct MoveSpec {
    /// Where the walker starts.
    pub start: Location,
    /// Movement remaining this turn.
    pub moves: u32,
    /// Full turns remaining after this one.
    pub turns: u32,
    /// Movement granted at the start of each later turn.
    pub max_moves: u32,
    /// The side doing the moving; `None` ignores other units entirely.
    pub moving_side: Option<SideId>,
    /// The side whose knowledge limits the search; `None` sees everything.
    pub viewing_side: Option<SideId>,
    /// Whether zones of control are ignored.
    pub ignore_zoc: bool,
    /// Per-hex movement costs. Hexes absent from the table cost 1.
    pub costs: Option<BTreeMap<Location, u32>>,
    /// Costs applied only while the walker is still in its starting turn.
    pub first_turn_costs: Option<BTreeMap<Location, u32>>,
}

/// A loaded scenario.
pub struct Engine {
    lua: mlua::Lua,
    state: std::rc::Rc<std::cell::RefCell<host::HostState>>,
}

impl Engine {
    /// Construct a host around `script` and walk the startup phases.
    ///
    /// The script text is the init environment (see `data/init.lua` for the
    /// reference one): it assembles the game tables whose writes call back
    /// into the engine. Construction fires the `preload`, `prestart` and
    /// `start` events in order and leaves the scenario in the play phase.
    pub fn new(script: &str) -> Result<Self, ScriptError> {
        let (lua, state) = host::boot(script)?;
        let mut engine = Self { lua, state };
        for (phase, event) in [
            (Phase::Preload, "preload"),
            (Phase::Prestart, "prestart"),
            (Phase::Start, "start"),
        ] {
            engine.state.borrow_mut().phase = phase;
            let result = engine.fire_event(event);
            if let Some(error) = result.error {
                debug!(event, error = %error, "startup event failed");
            }
        }
        engine.state.borrow_mut().phase = Phase::Play;
        info!("scenario entered play phase");
        Ok(engine)
    }

    //
    // Write access
    //

    /// Compile and run a script fragment under a protected call.
    ///
    /// Never terminates the process; failures come back as diagnostics. The
    /// outcome flags are conservative: a fragment that ran at all is assumed
    /// to have changed state and to be non-undoable.
    pub fn execute(&mut self, code: &str) -> EventResult {
        let chunk = match load_chunk(&self.lua, code, "execute") {
            Ok(chunk) => chunk,
            // nothing ran, so nothing changed
            Err(e) => return EventResult::failed(e.to_string()),
        };
        match host::call_chunk(&chunk) {
            Ok(()) => EventResult {
                error: None,
                game_state_changed: true,
                undoable: false,
            },
            // the fragment may have half-run before failing
            Err(e) => EventResult {
                error: Some(e.to_string()),
                game_state_changed: true,
                undoable: false,
            },
        }
    }

    /// Fire a named event through the script's event machinery.
    pub fn fire_event(&mut self, name: &str) -> EventResult {
        self.call_script_handler("fire_event", name)
    }

    /// Execute a command described as a config. Each body in the config is
    /// dispatched by the script's `do_command` handler.
    pub fn do_command(&mut self, command: &[Node]) -> EventResult {
        let encoded = match bridge::push_config(&self.lua, command) {
            Ok(table) => table,
            Err(e) => return EventResult::failed(ScriptError::from_call(&e).to_string()),
        };
        self.call_script_handler("do_command", encoded)
    }

    /// Run the scripted AI for the current side. Fails without touching the
    /// game when the current side is not AI-controlled.
    pub fn execute_ai_turn(&mut self) -> EventResult {
        let (side, controller) = {
            let state = self.state.borrow();
            let controller = state
                .side_meta
                .get(&state.current_side)
                .map(|meta| meta.controller)
                .unwrap_or_default();
            (state.current_side, controller)
        };
        if controller != Controller::Ai {
            return EventResult::failed(format!("side {side} is not AI-controlled"));
        }
        self.call_script_handler("ai_turn", side)
    }

    /// End the current side's turn: fire the turn events, advance the side
    /// cursor, and flush the per-turn caches.
    pub fn end_turn(&mut self) -> EventResult {
        if !self.can_end_turn() {
            return EventResult::failed("cannot end the turn outside the play phase");
        }
        let ending = self.fire_event("side turn end");
        let wrapped = {
            let mut state = self.state.borrow_mut();
            // turn boundaries are the flush points for the memo caches
            state.sides.clear_ally_cache();
            state.units.mark_all_dirty();
            let next = state
                .side_meta
                .range(state.current_side + 1..)
                .map(|(&side, _)| side)
                .next();
            let wrapped = next.is_none();
            state.current_side = next
                .or_else(|| state.side_meta.keys().next().copied())
                .unwrap_or(1);
            if wrapped {
                state.turn += 1;
            }
            if state
                .side_meta
                .values()
                .any(|meta| meta.result != SideResult::None)
            {
                state.phase = Phase::End;
            }
            wrapped
        };
        let mut result = ending.merge(self.fire_event("side turn"));
        if wrapped {
            result = result.merge(self.fire_event("new turn"));
        }
        // advancing the cursor is itself a non-undoable state change
        result.game_state_changed = true;
        result.undoable = false;
        result
    }

    /// Add a directed tunnel to the movement graph.
    pub fn add_tunnel(&mut self, a: Location, b: Location) -> bool {
        self.state.borrow_mut().pathfinder.add_tunnel(a, b)
    }

    /// Remove a directed tunnel from the movement graph.
    pub fn remove_tunnel(&mut self, a: Location, b: Location) -> bool {
        self.state.borrow_mut().pathfinder.remove_tunnel(a, b)
    }

    /// Update one hex of a side's shroud.
    pub fn set_shroud(&mut self, side: SideId, loc: Location, shrouded: bool) {
        self.state.borrow_mut().sides.set_shroud(side, loc, shrouded);
    }

    /// Update one hex of a side's fog.
    pub fn set_fog(&mut self, side: SideId, loc: Location, fogged: bool) {
        self.state.borrow_mut().sides.set_fog(side, loc, fogged);
    }

    /// Set or clear a fog override on one hex.
    pub fn set_fog_override(&mut self, side: SideId, loc: Location, fogged: Option<bool>) {
        self.state
            .borrow_mut()
            .sides
            .set_fog_override(side, loc, fogged);
    }

    //
    // Read-only access
    //

    /// Current turn number, counted from 1.
    #[must_use]
    pub fn turn_number(&self) -> u32 {
        self.state.borrow().turn
    }

    /// The side whose turn it is.
    #[must_use]
    pub fn current_side_playing(&self) -> SideId {
        self.state.borrow().current_side
    }

    /// Number of sides in the scenario.
    #[must_use]
    pub fn nteams(&self) -> usize {
        self.state.borrow().side_meta.len()
    }

    /// Whether `end_turn` is currently legal.
    #[must_use]
    pub fn can_end_turn(&self) -> bool {
        self.state.borrow().phase == Phase::Play
    }

    /// The scenario's lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    /// The recorded result for a side.
    #[must_use]
    pub fn side_result(&self, side: SideId) -> SideResult {
        self.state
            .borrow()
            .side_meta
            .get(&side)
            .map(|meta| meta.result)
            .unwrap_or_default()
    }

    /// Who controls a side.
    #[must_use]
    pub fn side_controller(&self, side: SideId) -> Controller {
        self.state
            .borrow()
            .side_meta
            .get(&side)
            .map(|meta| meta.controller)
            .unwrap_or_default()
    }

    /// Whether a hex is on the map.
    #[must_use]
    pub fn is_on_map(&self, loc: Location) -> bool {
        self.state.borrow().terrain.contains(loc)
    }

    /// Whether a walker at `a` could step to `b` (topology or tunnel).
    #[must_use]
    pub fn is_adjacent(&self, a: Location, b: Location) -> bool {
        self.state.borrow().pathfinder.adjacent(a, b)
    }

    /// Ally-adjusted fog for a side at a hex.
    #[must_use]
    pub fn is_fogged(&self, loc: Location, side: SideId) -> bool {
        let state = self.state.borrow();
        state
            .sides
            .ally_adjusted_fog(loc, side, &LuaAllies { lua: &self.lua })
    }

    /// Ally-adjusted shroud for a side at a hex.
    #[must_use]
    pub fn is_shrouded(&self, loc: Location, side: SideId) -> bool {
        let state = self.state.borrow();
        state
            .sides
            .ally_adjusted_shroud(loc, side, &LuaAllies { lua: &self.lua })
    }

    /// The unit occupying a hex, if any.
    #[must_use]
    pub fn unit_at(&self, loc: Location) -> Option<UnitId> {
        self.state.borrow().units.at(loc).map(|rec| rec.id())
    }

    /// The owner of a village, if the village exists and is captured.
    #[must_use]
    pub fn village_owner(&self, loc: Location) -> Option<SideId> {
        self.state
            .borrow()
            .villages
            .get(&loc)
            .and_then(|village| village.owner)
    }

    /// The label pinned to a hex, if any.
    #[must_use]
    pub fn label(&self, loc: Location) -> Option<Label> {
        self.state.borrow().labels.get(&loc).cloned()
    }

    /// Evaluate a script expression with the game in a read-only state and
    /// convert the result to a config.
    ///
    /// `viewing_side` is published to the script as a global of the same
    /// name. Not mutating the game from report expressions is a script-side
    /// obligation.
    pub fn evaluate(&self, code: &str, viewing_side: SideId) -> Result<Config, ReportError> {
        self.lua
            .globals()
            .set("viewing_side", viewing_side)
            .map_err(|e| ReportError::Script(ScriptError::from_call(&e)))?;
        let value: Value = self
            .lua
            .load(format!("return ({code})"))
            .set_name("evaluate")
            .eval()
            .map_err(|e| ReportError::Script(ScriptError::from_call(&e)))?;
        Ok(bridge::config_from_value(&value)?)
    }

    /// Evaluate the theme item `name` for a viewing side.
    pub fn read_report(&self, name: &str, viewing_side: SideId) -> Result<Config, ReportError> {
        self.evaluate(&format!("themes.{name}"), viewing_side)
    }

    /// Everything the scenario has printed, plus host milestones.
    #[must_use]
    pub fn log(&self) -> String {
        self.state.borrow().log.contents().to_string()
    }

    /// Attach or detach a live mirror of the command log.
    pub fn set_external_log(&self, sink: Option<Box<dyn Write>>) {
        self.state.borrow_mut().log.set_external(sink);
    }

    //
    // Movement queries
    //

    /// Every hex the described walker can reach.
    #[must_use]
    pub fn reachable_hexes(&self, spec: &MoveSpec) -> BTreeSet<Location> {
        self.with_query(spec, |ctx, query| ctx.reachable_hexes(query))
    }

    /// One path per reachable hex, each destination first, start last.
    #[must_use]
    pub fn reachable_hexes_with_paths(&self, spec: &MoveSpec) -> Vec<Path> {
        self.with_query(spec, |ctx, query| ctx.reachable_hexes_with_paths(query))
    }

    /// The path to `destination`, destination first, start last; empty when
    /// unreachable.
    #[must_use]
    pub fn shortest_path(&self, destination: Location, spec: &MoveSpec) -> Path {
        self.with_query(spec, |ctx, query| ctx.shortest_path(destination, query))
    }

    /// How many turns reaching `destination` consumes.
    pub fn shortest_path_distance(
        &self,
        destination: Location,
        spec: &MoveSpec,
    ) -> Result<u32, QueryError> {
        self.with_query(spec, |ctx, query| {
            ctx.shortest_path_distance(destination, query)
        })
    }

    /// Memoized default-cost distance between two hexes.
    #[must_use]
    pub fn heuristic_distance(&self, a: Location, b: Location) -> u32 {
        self.state.borrow().pathfinder.heuristic_distance(a, b)
    }

    fn with_query<R>(
        &self,
        spec: &MoveSpec,
        run: impl FnOnce(&crate::path::PathContext, &PathQuery<'_>) -> R,
    ) -> R {
        let state = self.state.borrow();
        let allies = LuaAllies { lua: &self.lua };
        let refresh = LuaUnits { lua: &self.lua };
        let primary = |loc: Location| {
            spec.costs
                .as_ref()
                .map_or(1, |m| m.get(&loc).copied().unwrap_or(1))
        };
        let first = |loc: Location| {
            spec.first_turn_costs
                .as_ref()
                .map_or(1, |m| m.get(&loc).copied().unwrap_or(1))
        };
        let query = PathQuery {
            start: spec.start,
            cost: spec.costs.as_ref().map(|_| &primary as CostFn<'_>),
            first_turn_cost: spec
                .first_turn_costs
                .as_ref()
                .map(|_| &first as CostFn<'_>),
            moves: spec.moves,
            turns: spec.turns,
            max_moves: spec.max_moves,
            moving_side: spec.moving_side,
            viewing_side: spec.viewing_side,
            ignore_zoc: spec.ignore_zoc,
            terrain: &state.terrain,
            units: &state.units,
            sides: &state.sides,
            allies: &allies,
            refresh: Some(&refresh),
        };
        run(&state.pathfinder, &query)
    }

    fn call_script_handler<A>(&self, name: &str, args: A) -> EventResult
    where
        A: mlua::IntoLuaMulti,
    {
        let handler: Option<Function> = match self.lua.globals().get(name) {
            Ok(handler) => handler,
            Err(e) => return EventResult::failed(ScriptError::from_call(&e).to_string()),
        };
        let Some(handler) = handler else {
            return EventResult::failed(format!("no {name} handler installed"));
        };
        match handler.call::<(Option<bool>, Option<bool>)>(args) {
            Ok((changed, undoable)) => EventResult {
                error: None,
                // trust the handler's report where it gives one, fall back
                // to the conservative reading where it does not
                game_state_changed: changed.unwrap_or(true),
                undoable: undoable.unwrap_or(false),
            },
            Err(e) => EventResult {
                error: Some(ScriptError::from_call(&e).to_string()),
                game_state_changed: true,
                undoable: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        handled = {}
        function fire_event(name)
            handled[#handled + 1] = name
            return false, true
        end
    "#;

    #[test]
    fn test_new_walks_startup_phases() {
        let engine = Engine::new(MINIMAL).unwrap();
        assert_eq!(engine.phase(), Phase::Play);
        assert_eq!(engine.turn_number(), 1);
        assert!(engine.can_end_turn());
    }

    #[test]
    fn test_startup_event_order() {
        let mut engine = Engine::new(MINIMAL).unwrap();
        let result = engine.execute(
            "assert(handled[1] == 'preload' and handled[2] == 'prestart' and handled[3] == 'start')",
        );
        assert_eq!(result.error, None);
    }

    #[test]
    fn test_execute_flags_are_conservative() {
        let mut engine = Engine::new(MINIMAL).unwrap();

        let ok = engine.execute("x = 1");
        assert_eq!(ok.error, None);
        assert!(ok.game_state_changed);
        assert!(!ok.undoable);

        let load_err = engine.execute("this is not lua");
        assert!(load_err.error.is_some());
        assert!(!load_err.game_state_changed);
        assert!(load_err.undoable);

        let run_err = engine.execute("y = 2 error('boom')");
        assert!(run_err.error.is_some());
        assert!(run_err.game_state_changed);
        assert!(!run_err.undoable);
    }

    #[test]
    fn test_missing_handler_reports_error() {
        let mut engine = Engine::new("").unwrap();
        let result = engine.fire_event("turn refresh");
        assert!(result.error.unwrap().contains("fire_event"));
    }

    #[test]
    fn test_ai_turn_requires_ai_controller() {
        let mut engine = Engine::new(MINIMAL).unwrap();
        let result = engine.execute_ai_turn();
        assert!(result.error.unwrap().contains("not AI-controlled"));
    }

    #[test]
    fn test_evaluate_returns_config() {
        let engine = Engine::new("themes = { turn = { { side = '1' } } }").unwrap();
        let config = engine.read_report("turn", 1).unwrap();
        assert_eq!(config.len(), 1);
    }
}
