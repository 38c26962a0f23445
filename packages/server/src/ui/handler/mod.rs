//! Request handlers.

mod http;
mod websocket;

pub use http::{
    create_event, debug_room_state, get_event, get_event_by_pin, get_event_stats, health_check,
};
pub use websocket::websocket_handler;
