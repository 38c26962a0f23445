//! Infrastructure 層
//!
//! ドメイン層が定義する trait（`EventStore`, `MessagePusher`）の具体的な実装と、
//! HTTP API の DTO を提供します。

pub mod dto;
pub mod message_pusher;
pub mod repository;
