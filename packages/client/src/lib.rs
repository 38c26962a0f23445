//! Flashcrowd client: clock sync, effect scheduling and light output.
//!
//! Attendees only follow the effects the relay broadcasts. Hosts additionally
//! compose effects at the prompt and dispatch them through [`dispatcher`].

pub mod command;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod output;
pub mod runner;
pub mod scheduler;
pub mod session;
pub mod time_sync;
pub mod ui;

pub use config::ClientConfig;
pub use error::ClientError;
pub use runner::run_client;
