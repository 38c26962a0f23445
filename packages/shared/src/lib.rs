//! Code shared between the Flashcrowd relay server and its clients.
//!
//! - `logger`: tracing subscriber setup for the binaries
//! - `time`: clock abstraction (epoch milliseconds) used for time sync
//! - `protocol`: JSON wire messages exchanged over the WebSocket

pub mod logger;
pub mod protocol;
pub mod time;
