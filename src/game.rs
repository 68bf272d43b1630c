//! Native game-state containers.
//!
//! The script owns the truth about the game; these types hold the parts the
//! engine must answer queries about without crossing the script boundary:
//! the terrain map, the unit index, and the per-side vision caches. Where a
//! field mirrors script-side state it is an explicit cache with a refresh
//! path, never a second authority.

mod location;
mod sides;
mod terrain;
mod types;
mod units;

pub use location::{ColumnShift, HexTopology, Location};
pub use sides::{AllyOracle, SideId, Sides};
pub use terrain::{TerrainId, TerrainMap};
pub use types::{split_list, Controller, EventResult, Label, Phase, SideResult, Village};
pub use units::{UnitFacts, UnitId, UnitIndex, UnitOracle, UnitRec};
