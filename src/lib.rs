// Allow unwrap and terse literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Thane: a headless rules engine for hex-tiled, turn-based strategy games.
//!
//! This crate loads a scenario described in a declarative markup ("GML"),
//! runs its game logic in an embedded, sandboxed Lua environment, and
//! answers pathfinding and vision queries natively. It is designed for:
//! - Deterministic, replayable rule evaluation
//! - Script-owned game rules with a small native core
//! - Fast turn-aware pathfinding with fog, shroud and zones of control
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │          Front ends (CLI)           │
//! ├─────────────────────────────────────┤
//! │     Engine handle / game state      │
//! ├──────────────────┬──────────────────┤
//! │   Pathfinding    │  Script host     │
//! │   (native)       │  (mlua, Lua 5.4) │
//! ├──────────────────┴──────────────────┤
//! │        GML parser / bridge          │
//! └─────────────────────────────────────┘
//! ```

pub mod engine;
pub mod error;
pub mod game;
pub mod gml;
pub mod path;
pub mod script;

pub use engine::{Engine, MoveSpec};
pub use error::{
    ParseError, PreprocessError, QueryError, ReportError, ScriptError, ShapeError,
};

// Re-export key game types at crate root for convenience
pub use game::{
    Controller, EventResult, HexTopology, Location, Phase, SideId, SideResult, UnitId,
};
pub use gml::{parse, parse_config, preprocess, Body, Config, Node};
pub use path::{PathContext, PathQuery};
