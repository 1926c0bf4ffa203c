//! Sangoku Tactics - turn-based grid battle engine
//!
//! An in-memory library driven by a host game loop. The host builds a
//! battle from combatant snapshots, starts turns, submits unit actions
//! (or lets the AI act) and reads a report when the battle ends.

pub mod battle;
pub mod core;
