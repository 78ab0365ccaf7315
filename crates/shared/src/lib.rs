//! Pure map logic for ReplAIced: box placement, camera, minimap projection,
//! and the attacker/target selection flow. No I/O lives here.

pub mod attack;
pub mod camera;
pub mod config;
pub mod coords;
pub mod models;
pub mod placement;
pub mod selection;
