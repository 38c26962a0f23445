//! Relay server for synchronized phone light shows.
//!
//! The server keeps room membership per event, authorizes the registered host
//! connection to broadcast effects, answers time-sync probes with its own clock
//! and fans effects and participant counts out to every room member.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
