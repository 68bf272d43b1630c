//! End-to-end tests of the engine over the reference init script.
//!
//! Run with: cargo test script_host

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use thane::game::{Controller, Location, Phase, SideResult};
use thane::gml::{Body, Node};
use thane::{Engine, MoveSpec};

const INIT: &str = include_str!("../data/init.lua");

fn engine() -> Engine {
    Engine::new(INIT).unwrap()
}

fn loc(x: i32, y: i32) -> Location {
    Location::new(x, y)
}

/// Run a fragment that must succeed.
fn run(engine: &mut Engine, code: &str) {
    let result = engine.execute(code);
    assert_eq!(result.error, None, "fragment failed: {code}");
}

#[test]
fn test_map_assignment_reaches_native_terrain() {
    let mut engine = engine();
    run(&mut engine, "Map['1,1'] = 'grass'");
    assert!(engine.is_on_map(loc(1, 1)));
    assert!(!engine.is_on_map(loc(2, 2)));

    run(&mut engine, "Map['1,1'] = nil");
    assert!(!engine.is_on_map(loc(1, 1)));
}

#[test]
fn test_bad_map_key_is_a_script_error() {
    let mut engine = engine();
    let result = engine.execute("Map['somewhere'] = 'grass'");
    assert!(result.error.unwrap().contains("location"));
}

#[test]
fn test_units_add_registers_natively() {
    let mut engine = engine();
    run(&mut engine, "u = Units.add({ x = 2, y = 2, side = 1 })");
    assert_eq!(engine.unit_at(loc(2, 2)), Some(1));
    // the unit is reachable by id and by location key script-side
    run(&mut engine, "assert(Units[1].location == '2,2')");
    run(&mut engine, "assert(Units['2,2'].id == 1)");
    run(&mut engine, "assert(u.copy == nil)");
}

#[test]
fn test_unit_notify_relocates() {
    let mut engine = engine();
    run(&mut engine, "u = Units.add({ x = 2, y = 2, side = 1 })");
    run(&mut engine, "u.location = '0,0' Units.notify(u)");
    assert_eq!(engine.unit_at(loc(0, 0)), Some(1));
    assert_eq!(engine.unit_at(loc(2, 2)), None);
}

#[test]
fn test_sides_mirror_controller_and_teams() {
    let mut engine = engine();
    run(
        &mut engine,
        "Sides[1] = { teams = 'north', controller = 'human' }\n\
         Sides[2] = { teams = 'north, islanders', controller = 'ai' }",
    );
    assert_eq!(engine.nteams(), 2);
    assert_eq!(engine.side_controller(1), Controller::Human);
    assert_eq!(engine.side_controller(2), Controller::Ai);
    assert_eq!(engine.side_result(1), SideResult::None);
}

#[test]
fn test_vision_sharing_through_script_teams() {
    let mut engine = engine();
    run(
        &mut engine,
        "Sides[1] = { teams = 'north' }\n\
         Sides[2] = { teams = 'north', share_vision = true }\n\
         Sides[3] = { teams = 'south', share_vision = true }",
    );
    let spot = loc(4, 4);
    // side 2 (an ally) sees the hex: side 1 benefits
    engine.set_fog(2, spot, false);
    assert!(!engine.is_fogged(spot, 1));
    // side 3 (hostile) seeing a hex does not help side 1
    let other = loc(5, 5);
    engine.set_fog(3, other, false);
    assert!(engine.is_fogged(other, 1));
}

#[test]
fn test_shroud_sharing_through_script_teams() {
    let mut engine = engine();
    run(
        &mut engine,
        "Sides[1] = { teams = 'north' }\n\
         Sides[2] = { teams = 'north', share_maps = true }",
    );
    let spot = loc(1, 2);
    engine.set_shroud(1, spot, true);
    assert!(!engine.is_shrouded(spot, 1), "ally's open map lifts the shroud");
    engine.set_shroud(2, spot, true);
    // both maps closed now, but the memoized alliance is already cached;
    // the shroud tables are read live
    assert!(engine.is_shrouded(spot, 1));
}

#[test]
fn test_event_handlers_drive_game_tables() {
    let mut engine = engine();
    run(
        &mut engine,
        "on_event('alarm', function()\n\
           Map['0,0'] = 'castle'\n\
           return true, false\n\
         end)",
    );
    let result = engine.fire_event("alarm");
    assert_eq!(result.error, None);
    assert!(result.game_state_changed);
    assert!(!result.undoable);
    assert!(engine.is_on_map(loc(0, 0)));

    // an unhandled event reports itself unchanged and undoable
    let idle = engine.fire_event("nothing listens to this");
    assert_eq!(idle.error, None);
    assert!(!idle.game_state_changed);
    assert!(idle.undoable);
}

#[test]
fn test_do_command_dispatches_bodies_as_events() {
    let mut engine = engine();
    run(
        &mut engine,
        "placed = nil\n\
         on_event('place_terrain', function(args)\n\
           for _, node in ipairs(args) do\n\
             for key, value in pairs(node) do placed = key .. '=' .. value end\n\
           end\n\
           return true, true\n\
         end)",
    );
    let mut body = Body::new("place_terrain");
    body.children.push(Node::Attribute(thane::gml::Attribute::new(
        "terrain", "keep",
    )));
    let result = engine.do_command(&[Node::Body(body)]);
    assert_eq!(result.error, None);
    assert!(result.game_state_changed);
    run(&mut engine, "assert(placed == 'terrain=keep')");
}

#[test]
fn test_end_turn_cycles_sides_and_counts_turns() {
    let mut engine = engine();
    run(
        &mut engine,
        "Sides[1] = { teams = 'a' } Sides[2] = { teams = 'b' }",
    );
    assert_eq!(engine.turn_number(), 1);
    assert_eq!(engine.current_side_playing(), 1);

    let result = engine.end_turn();
    assert_eq!(result.error, None);
    assert_eq!(engine.current_side_playing(), 2);
    assert_eq!(engine.turn_number(), 1);

    engine.end_turn();
    assert_eq!(engine.current_side_playing(), 1);
    assert_eq!(engine.turn_number(), 2);
}

#[test]
fn test_ai_turn_gate() {
    let mut engine = engine();
    run(
        &mut engine,
        "Sides[1] = { teams = 'a', controller = 'human' }\n\
         Sides[2] = { teams = 'b', controller = 'ai' }\n\
         on_event('ai turn', function(side) ai_ran = side return true, false end)",
    );
    let refused = engine.execute_ai_turn();
    assert!(refused.error.unwrap().contains("not AI-controlled"));

    engine.end_turn();
    let result = engine.execute_ai_turn();
    assert_eq!(result.error, None);
    run(&mut engine, "assert(ai_ran == 2)");
}

#[test]
fn test_recorded_result_ends_the_scenario() {
    let mut engine = engine();
    run(
        &mut engine,
        "Sides[1] = { teams = 'a', result = 'victory' } Sides[2] = { teams = 'b' }",
    );
    assert_eq!(engine.side_result(1), SideResult::Victory);
    assert_eq!(engine.phase(), Phase::Play);
    engine.end_turn();
    assert_eq!(engine.phase(), Phase::End);
    assert!(!engine.can_end_turn());
    let refused = engine.end_turn();
    assert!(refused.error.is_some());
}

#[test]
fn test_villages_and_labels() {
    let mut engine = engine();
    run(&mut engine, "Villages['3,3'] = { owner = 2 }");
    assert_eq!(engine.village_owner(loc(3, 3)), Some(2));

    run(&mut engine, "Labels['3,3'] = { text = 'the old mill', owner = 1 }");
    let label = engine.label(loc(3, 3)).unwrap();
    assert_eq!(label.text, "the old mill");
    assert_eq!(label.owner, Some(1));

    run(&mut engine, "Villages['3,3'] = nil");
    assert_eq!(engine.village_owner(loc(3, 3)), None);
}

#[test]
fn test_schedule_layout_is_checked() {
    let mut engine = engine();
    run(&mut engine, "Schedule[1] = { id = 'dawn', lawful_bonus = 0 }");
    let bad = engine.execute("Schedule[2] = { id = 42 }");
    assert!(bad.error.is_some());
}

#[test]
fn test_movement_query_through_script_state() {
    let mut engine = engine();
    run(
        &mut engine,
        "Sides[1] = { teams = 'a' } Sides[2] = { teams = 'b' }\n\
         for x = 0, 2 do for y = 0, 2 do Map[x .. ',' .. y] = 'grass' end end\n\
         Units.add({ x = 1, y = 2, side = 2 })",
    );
    let spec = MoveSpec {
        start: loc(1, 1),
        moves: 2,
        turns: 0,
        max_moves: 2,
        moving_side: Some(1),
        ..MoveSpec::default()
    };
    let reached = engine.reachable_hexes(&spec);
    assert!(!reached.contains(&loc(1, 2)), "enemy hex is blocked");
    assert!(reached.contains(&loc(1, 0)));
}

#[test]
fn test_stale_unit_cache_refreshes_after_end_turn() {
    let mut engine = engine();
    run(
        &mut engine,
        "Sides[1] = { teams = 'a' } Sides[2] = { teams = 'b' }\n\
         for x = 0, 2 do for y = 0, 3 do Map[x .. ',' .. y] = 'grass' end end\n\
         u = Units.add({ x = 1, y = 2, side = 2 })",
    );
    // the script quietly edits the unit's position without notifying
    run(&mut engine, "u.location = '1,3'");
    // end_turn invalidates the native caches; the next query refreshes
    // through the script and finds the old hex vacated
    engine.end_turn();
    let spec = MoveSpec {
        start: loc(1, 1),
        moves: 1,
        turns: 0,
        max_moves: 1,
        moving_side: Some(1),
        ..MoveSpec::default()
    };
    let reached = engine.reachable_hexes(&spec);
    assert!(
        reached.contains(&loc(1, 2)),
        "vacated hex must be enterable again: {reached:?}"
    );
}

#[test]
fn test_read_report() {
    let engine = engine();
    let report = engine.read_report("turn", 1).unwrap();
    assert_eq!(report.len(), 1);
    match &report[0] {
        Node::Body(body) => assert_eq!(body.name, "turn_report"),
        other => panic!("expected body, got {other:?}"),
    }
}

#[test]
fn test_log_collects_prints_and_milestones() {
    let mut engine = engine();
    run(&mut engine, "print('the bridge is out')");
    let log = engine.log();
    assert!(log.contains("adding standard libraries"));
    assert!(log.contains("the bridge is out\n"));
}

#[test]
fn test_tunnels_affect_engine_queries() {
    let mut engine = engine();
    run(
        &mut engine,
        "for x = 0, 5 do for y = 0, 5 do Map[x .. ',' .. y] = 'cave' end end",
    );
    let a = loc(0, 0);
    let b = loc(5, 5);
    let walk = engine.heuristic_distance(a, b);
    assert!(walk > 1);
    assert!(engine.add_tunnel(a, b));
    assert!(engine.is_adjacent(a, b));
    assert_eq!(engine.heuristic_distance(a, b), 1);
    assert!(engine.remove_tunnel(a, b));
    assert_eq!(engine.heuristic_distance(a, b), walk);
}
