//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    domain::MessagePusher,
    usecase::{CreateEventUseCase, GetEventUseCase, RelayRouter, TimeSyncUseCase},
};

use super::{
    handler::{
        create_event, debug_room_state, get_event, get_event_by_pin, get_event_stats,
        health_check, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Flashcrowd relay server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     relay_router,
///     time_sync_usecase,
///     create_event_usecase,
///     get_event_usecase,
///     message_pusher,
/// );
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    app_state: Arc<AppState>,
}

impl Server {
    pub fn new(
        relay_router: RelayRouter,
        time_sync_usecase: Arc<TimeSyncUseCase>,
        create_event_usecase: Arc<CreateEventUseCase>,
        get_event_usecase: Arc<GetEventUseCase>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            app_state: Arc::new(AppState {
                relay_router,
                time_sync_usecase,
                create_event_usecase,
                get_event_usecase,
                message_pusher,
            }),
        }
    }

    /// Build the axum router with every endpoint
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/events", post(create_event))
            .route("/api/events/{event_id}", get(get_event))
            .route("/api/events/{event_id}/stats", get(get_event_stats))
            .route("/api/events/join/{pin}", get(get_event_by_pin))
            .route("/debug/rooms/{event_id}", get(debug_room_state))
            .layer(TraceLayer::new_for_http())
            .with_state(self.app_state.clone())
    }

    /// Bind to `host:port` and serve until Ctrl+C
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Flashcrowd relay listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }
}
