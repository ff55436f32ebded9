//! Falling-block puzzle engine.
//!
//! The simulation is a pure state machine driven by millisecond timestamps
//! and discrete [`game::Action`]s. Clocks, key polling and drawing live
//! behind the traits in [`app`].

pub mod app;
pub mod config;
pub mod game;
pub mod grid;
pub mod piece;
pub mod source;
pub mod timing;
