//! The Lua host: interpreter setup, engine callbacks, command log.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use mlua::{Function, Lua, LuaOptions, StdLib, Table, Value, Variadic};
use tracing::debug;

use crate::error::ScriptError;
use crate::game::{
    Controller, HexTopology, Label, Location, Phase, SideId, SideResult, Sides, TerrainMap,
    UnitFacts, UnitId, UnitIndex, UnitOracle, Village,
};
use crate::game::{split_list, AllyOracle};
use crate::path::PathContext;

const HOST_SIGNATURE: &str = concat!("thane engine v", env!("CARGO_PKG_VERSION"), " (Lua 5.4)");

/// The back-pointer stored in the interpreter's app-data slot.
///
/// Written exactly once, in [`boot`], and never replaced; every native
/// callback recovers its host through it in O(1) with no global state.
pub(crate) struct HostSlot(Rc<RefCell<HostState>>);

/// Recover the host from the interpreter a callback was invoked on.
pub(crate) fn host(lua: &Lua) -> mlua::Result<Rc<RefCell<HostState>>> {
    lua.app_data_ref::<HostSlot>()
        .map(|slot| Rc::clone(&slot.0))
        .ok_or_else(|| mlua::Error::RuntimeError("interpreter has no host attached".into()))
}

/// Append-only log of everything the script prints plus host milestones,
/// optionally mirrored to an external sink.
#[derive(Default)]
pub struct CommandLog {
    buf: String,
    external: Option<Box<dyn Write>>,
}

impl fmt::Debug for CommandLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLog")
            .field("len", &self.buf.len())
            .field("mirrored", &self.external.is_some())
            .finish()
    }
}

impl CommandLog {
    /// Append text, mirroring to the external sink if one is attached.
    pub fn append(&mut self, text: &str) {
        self.buf.push_str(text);
        if let Some(sink) = &mut self.external {
            let _ = sink.write_all(text.as_bytes());
        }
    }

    /// Everything logged so far.
    #[must_use]
    pub fn contents(&self) -> &str {
        &self.buf
    }

    /// Attach or detach the external mirror.
    pub fn set_external(&mut self, sink: Option<Box<dyn Write>>) {
        self.external = sink;
    }
}

/// Per-side metadata mirrored from the script when a side is constructed.
#[derive(Debug, Clone, Default)]
pub(crate) struct SideMeta {
    pub(crate) teams: String,
    pub(crate) controller: Controller,
    pub(crate) result: SideResult,
}

/// Everything the host owns natively for the lifetime of one interpreter.
#[derive(Debug)]
pub(crate) struct HostState {
    pub(crate) log: CommandLog,
    pub(crate) terrain: TerrainMap,
    pub(crate) units: UnitIndex,
    pub(crate) sides: Sides,
    pub(crate) pathfinder: PathContext,
    pub(crate) side_meta: BTreeMap<SideId, SideMeta>,
    pub(crate) villages: BTreeMap<Location, Village>,
    pub(crate) labels: BTreeMap<Location, Label>,
    pub(crate) phase: Phase,
    pub(crate) turn: u32,
    pub(crate) current_side: SideId,
    next_unit_id: UnitId,
}

impl HostState {
    fn new() -> Self {
        Self {
            log: CommandLog::default(),
            terrain: TerrainMap::new(),
            units: UnitIndex::new(),
            sides: Sides::new(),
            pathfinder: PathContext::new(HexTopology::default()),
            side_meta: BTreeMap::new(),
            villages: BTreeMap::new(),
            labels: BTreeMap::new(),
            phase: Phase::Initial,
            turn: 1,
            current_side: 1,
            next_unit_id: 1,
        }
    }

    fn print(&mut self, pieces: &[String]) {
        self.log.append(&pieces.join("\t"));
        self.log.append("\n");
    }

    fn allocate_unit_id(&mut self) -> UnitId {
        let id = self.next_unit_id;
        self.next_unit_id += 1;
        id
    }

    fn register_unit(&mut self, id: UnitId, facts: UnitFacts) {
        self.next_unit_id = self.next_unit_id.max(id + 1);
        self.units
            .insert(crate::game::UnitRec::new(id, facts));
    }

    fn update_unit(&mut self, id: UnitId, facts: UnitFacts) {
        if self.units.get(id).is_none() {
            self.register_unit(id, facts);
            return;
        }
        self.units.relocate(id, facts.location);
        if let Some(rec) = self.units.get(id) {
            rec.set_facts(facts);
        }
    }

    fn construct_side(&mut self, side: SideId, meta: SideMeta, vision: bool, maps: bool) {
        debug!(side, "side constructed");
        self.side_meta.insert(side, meta);
        self.sides.set_share_vision(side, vision);
        self.sides.set_share_maps(side, maps);
        // reassigning a side may change alliances; memoized answers are stale
        self.sides.clear_ally_cache();
    }
}

/// Build the interpreter, wire the host in, and run the init script.
pub(crate) fn boot(script: &str) -> Result<(Lua, Rc<RefCell<HostState>>), ScriptError> {
    // `debug` is only reachable through the unsafe constructor; it is pruned
    // to the traceback/getinfo subset immediately below.
    let lua = unsafe { Lua::unsafe_new_with(StdLib::ALL_SAFE | StdLib::DEBUG, LuaOptions::default()) };
    let state = Rc::new(RefCell::new(HostState::new()));
    lua.set_app_data(HostSlot(Rc::clone(&state)));

    state.borrow_mut().log.append("adding standard libraries\n");
    prune_stdlib(&lua).map_err(|e| ScriptError::from_call(&e))?;

    state.borrow_mut().log.append("redirecting print\n");
    redirect_print(&lua).map_err(|e| ScriptError::from_call(&e))?;

    state
        .borrow_mut()
        .log
        .append(&format!("initializing {HOST_SIGNATURE}\n"));
    register_engine_callbacks(&lua).map_err(|e| ScriptError::from_call(&e))?;

    let chunk = load_chunk(&lua, script, "init")?;
    call_chunk(&chunk)?;

    // The init script has wired the callbacks into the game tables'
    // metatables; the raw `engine` table disappears from the public surface.
    let empty = lua.create_table().map_err(|e| ScriptError::from_call(&e))?;
    lua.globals()
        .set("engine", empty)
        .map_err(|e| ScriptError::from_call(&e))?;

    debug!("script host booted");
    Ok((lua, state))
}

/// Compile a chunk, classifying failures.
pub(crate) fn load_chunk(lua: &Lua, code: &str, name: &str) -> Result<Function, ScriptError> {
    lua.load(code)
        .set_name(name)
        .into_function()
        .map_err(|e| ScriptError::from_load(&e))
}

/// Run a compiled chunk under a protected call, classifying failures.
pub(crate) fn call_chunk(chunk: &Function) -> Result<(), ScriptError> {
    chunk.call::<()>(()).map_err(|e| ScriptError::from_call(&e))
}

/// Reduce the standard library to the curated subset: `os` keeps only the
/// clock, `debug` keeps only introspection, and nothing can touch the
/// filesystem.
fn prune_stdlib(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();
    keep_only(&globals, "os", &["clock", "date", "time", "difftime"])?;
    keep_only(&globals, "debug", &["traceback", "getinfo"])?;
    for name in ["io", "package", "utf8", "require", "dofile", "loadfile"] {
        globals.set(name, Value::Nil)?;
    }
    Ok(())
}

fn keep_only(globals: &Table, name: &str, keep: &[&str]) -> mlua::Result<()> {
    let Some(table) = globals.get::<Option<Table>>(name)? else {
        return Ok(());
    };
    let mut drop = Vec::new();
    for pair in table.clone().pairs::<String, Value>() {
        let (key, _) = pair?;
        if !keep.contains(&key.as_str()) {
            drop.push(key);
        }
    }
    for key in drop {
        table.set(key, Value::Nil)?;
    }
    Ok(())
}

/// Point `print` at the host's command log.
fn redirect_print(lua: &Lua) -> mlua::Result<()> {
    let print = lua.create_function(|lua, args: Variadic<Value>| {
        let state = host(lua)?;
        let pieces: Vec<String> = args.iter().map(display_value).collect();
        state.borrow_mut().print(&pieces);
        Ok(())
    })?;
    lua.globals().set("print", print)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.to_string_lossy().to_string(),
        other => format!("<{}>", other.type_name()),
    }
}

/// Install the `engine` table of native callbacks the init script builds the
/// game tables from.
fn register_engine_callbacks(lua: &Lua) -> mlua::Result<()> {
    let engine = lua.create_table()?;
    engine.set("construct_side", lua.create_function(engine_construct_side)?)?;
    engine.set("construct_unit", lua.create_function(engine_construct_unit)?)?;
    engine.set("is_map_location", lua.create_function(engine_is_map_location)?)?;
    engine.set("update_label", lua.create_function(engine_update_label)?)?;
    engine.set("update_terrain", lua.create_function(engine_update_terrain)?)?;
    engine.set("update_unit", lua.create_function(engine_update_unit)?)?;
    engine.set("update_village", lua.create_function(engine_update_village)?)?;
    lua.globals().set("engine", engine)
}

/// `engine.construct_side(key, value)`: mirror a side's metadata natively
/// and hand the table back for the script to store.
fn engine_construct_side(lua: &Lua, (key, value): (SideId, Table)) -> mlua::Result<Table> {
    let state = host(lua)?;
    let teams: String = value.get::<Option<String>>("teams")?.unwrap_or_default();
    let controller = value
        .get::<Option<String>>("controller")?
        .as_deref()
        .and_then(Controller::parse)
        .unwrap_or_default();
    let result = value
        .get::<Option<String>>("result")?
        .as_deref()
        .and_then(SideResult::parse)
        .unwrap_or_default();
    let share_vision: bool = value.get::<Option<bool>>("share_vision")?.unwrap_or(false);
    let share_maps: bool = value.get::<Option<bool>>("share_maps")?.unwrap_or(false);
    state.borrow_mut().construct_side(
        key,
        SideMeta {
            teams,
            controller,
            result,
        },
        share_vision,
        share_maps,
    );
    Ok(value)
}

/// `engine.construct_unit(u)`: register a unit, assigning an id and
/// normalizing its location key.
fn engine_construct_unit(lua: &Lua, unit: Table) -> mlua::Result<Table> {
    let state = host(lua)?;
    let facts = unit_facts_from_table(&unit)?;
    let id = match unit.get::<Option<UnitId>>("id")? {
        Some(id) => id,
        None => {
            let id = state.borrow_mut().allocate_unit_id();
            unit.set("id", id)?;
            id
        }
    };
    unit.set("location", facts.location.to_string())?;
    state.borrow_mut().register_unit(id, facts);
    Ok(unit)
}

/// `engine.is_map_location(v)`: whether a value is a location key.
fn engine_is_map_location(_lua: &Lua, value: Value) -> mlua::Result<bool> {
    Ok(match &value {
        Value::String(s) => s.to_string_lossy().to_string().parse::<Location>().is_ok(),
        _ => false,
    })
}

/// `engine.update_label(key, value)`: maintain the native label registry.
fn engine_update_label(lua: &Lua, (key, value): (String, Option<Table>)) -> mlua::Result<()> {
    let state = host(lua)?;
    let loc = parse_location(&key)?;
    let mut state = state.borrow_mut();
    match value {
        Some(table) => {
            let text: String = table.get::<Option<String>>("text")?.unwrap_or_default();
            let owner: Option<SideId> = table.get("owner")?;
            state.labels.insert(loc, Label { text, owner });
        }
        None => {
            state.labels.remove(&loc);
        }
    }
    Ok(())
}

/// `engine.update_terrain(key, value)`: write through to the terrain map.
fn engine_update_terrain(lua: &Lua, (key, value): (String, Option<String>)) -> mlua::Result<()> {
    let state = host(lua)?;
    let loc = parse_location(&key)?;
    let mut state = state.borrow_mut();
    match value {
        Some(terrain) => {
            state.terrain.set(loc, terrain);
        }
        None => {
            state.terrain.remove(loc);
        }
    }
    Ok(())
}

/// `engine.update_unit(u)`: refresh a unit's native cache from its table.
fn engine_update_unit(lua: &Lua, unit: Table) -> mlua::Result<()> {
    let state = host(lua)?;
    let id: UnitId = unit
        .get::<Option<UnitId>>("id")?
        .ok_or_else(|| mlua::Error::RuntimeError("update_unit needs a unit with an id".into()))?;
    let facts = unit_facts_from_table(&unit)?;
    state.borrow_mut().update_unit(id, facts);
    Ok(())
}

/// `engine.update_village(key, value)`: maintain the native village
/// registry.
fn engine_update_village(lua: &Lua, (key, value): (String, Option<Table>)) -> mlua::Result<()> {
    let state = host(lua)?;
    let loc = parse_location(&key)?;
    let mut state = state.borrow_mut();
    match value {
        Some(table) => {
            let owner: Option<SideId> = table.get("owner")?;
            state.villages.insert(loc, Village { owner });
        }
        None => {
            state.villages.remove(&loc);
        }
    }
    Ok(())
}

fn parse_location(key: &str) -> mlua::Result<Location> {
    key.parse()
        .map_err(|()| mlua::Error::RuntimeError(format!("not a map location: {key}")))
}

fn unit_facts_from_table(unit: &Table) -> mlua::Result<UnitFacts> {
    let location = match unit.get::<Option<String>>("location")? {
        Some(key) => Some(parse_location(&key)?),
        None => {
            let x: Option<i32> = unit.get("x")?;
            let y: Option<i32> = unit.get("y")?;
            match (x, y) {
                (Some(x), Some(y)) => Some(Location::new(x, y)),
                _ => None,
            }
        }
    };
    let location = location.ok_or_else(|| {
        mlua::Error::RuntimeError("unit needs a location key (\"x,y\") or x/y fields".into())
    })?;
    Ok(UnitFacts {
        side: unit.get::<Option<SideId>>("side")?.unwrap_or(1),
        hidden: unit.get::<Option<bool>>("hidden")?.unwrap_or(false),
        emits_zoc: unit.get::<Option<bool>>("zoc")?.unwrap_or(true),
        location,
    })
}

/// Alliance oracle backed by the script's `Sides` table: two sides are
/// allied when their comma-separated `teams` lists share a name.
///
/// Runs while native queries hold the host borrowed, so it must only read
/// script state; the shipped environment's table reads never re-enter the
/// engine callbacks.
pub(crate) struct LuaAllies<'a> {
    pub(crate) lua: &'a Lua,
}

impl AllyOracle for LuaAllies<'_> {
    fn are_allied(&self, a: SideId, b: SideId) -> bool {
        let Some(teams_a) = side_teams(self.lua, a) else {
            return false;
        };
        let Some(teams_b) = side_teams(self.lua, b) else {
            return false;
        };
        let names_b = split_list(&teams_b);
        split_list(&teams_a)
            .iter()
            .any(|name| names_b.contains(name))
    }
}

fn side_teams(lua: &Lua, side: SideId) -> Option<String> {
    let sides: Table = lua.globals().get("Sides").ok()?;
    let entry = sides.get::<Option<Table>>(side).ok()??;
    entry.get::<Option<String>>("teams").ok()?
}

/// Unit-cache refresh backed by the script's `Units` table.
pub(crate) struct LuaUnits<'a> {
    pub(crate) lua: &'a Lua,
}

impl UnitOracle for LuaUnits<'_> {
    fn unit_facts(&self, id: UnitId) -> Option<UnitFacts> {
        let units: Table = self.lua.globals().get("Units").ok()?;
        let entry = units.get::<Option<Table>>(id).ok()??;
        let location: Location = entry
            .get::<Option<String>>("location")
            .ok()??
            .parse()
            .ok()?;
        Some(UnitFacts {
            side: entry.get::<Option<SideId>>("side").ok()?.unwrap_or(1),
            hidden: entry.get::<Option<bool>>("hidden").ok()?.unwrap_or(false),
            emits_zoc: entry.get::<Option<bool>>("zoc").ok()?.unwrap_or(true),
            location,
        })
    }
}
