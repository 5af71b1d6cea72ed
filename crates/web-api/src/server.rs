use crate::handlers;
use axum::{
    routing::{get, post},
    Router,
};
use perp_bot_core::TradeNotifier;
use perp_bot_executor::TradeExecutor;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<TradeExecutor>,
    pub notifier: Option<Arc<dyn TradeNotifier>>,
}

pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    #[must_use]
    pub fn new(executor: Arc<TradeExecutor>, notifier: Option<Arc<dyn TradeNotifier>>) -> Self {
        Self {
            state: AppState { executor, notifier },
        }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/positions/open", post(handlers::open_position))
            .route("/api/positions/close", post(handlers::close_position))
            .route("/api/wallet/:user_id", get(handlers::get_wallet))
            .route("/api/trades", get(handlers::list_trades))
            .route("/health", get(handlers::health))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the gateway listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve
    /// requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("web API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
