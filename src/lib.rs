//! # Dosewatch Library
//!
//! Internal library for the dosewatch binary.
//!
//! This library exists to enable testing of the reminder engine and provide a
//! clean separation between CLI dispatch (main.rs) and application logic.
//!
//! ## Architecture
//!
//! - **Entry Point**: [`Dosewatch`] acquires resources and runs the daemon
//! - **Core Logic**: `core` holds the engine loop, the alarm scheduler, the
//!   dose status resolver, snoozes and adherence statistics
//! - **Model & Store**: `model` types and the `store` that persists them
//! - **Emitters**: `emitter` rings the terminal and sends desktop notifications
//! - **Configuration**: `config` for TOML settings with hot reload
//! - **Commands**: `commands` for the one-shot CLI subcommands
//! - **Infrastructure**: signals, instance lock and the control socket in
//!   `io`; injectable clocks in `time`; logging in `common`

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod common;

pub mod args;
pub mod commands;
pub mod config;
pub mod core;
pub mod emitter;
pub mod error;
pub mod io;
pub mod model;
pub mod store;
pub mod time;

mod dosewatch;

#[cfg(any(test, feature = "testing-support"))]
pub mod testing;

pub use dosewatch::Dosewatch;
pub use error::ReminderError;
