//! Data Transfer Objects for the HTTP API.
//!
//! WebSocket messages live in `flashcrowd_shared::protocol`; only the REST
//! surface has its own DTOs.

pub mod conversion;
pub mod http;
