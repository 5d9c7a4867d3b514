//! HTTP surface and request orchestration for the quote service.
//!
//! Each request runs its own deadline chain: the upstream fetch is bounded
//! by a deadline derived at receipt, the store append by an independent
//! sibling deadline, and the terminal state (processed vs. cancelled by
//! timeout) is decided by re-checking the request deadline after both steps
//! resolve.

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::core::{Deadline, QuotePayload, RateProvider};
use crate::error::FetchError;
use crate::providers::awesome_api::AwesomeApiProvider;
use crate::store::QuoteStore;

/// Budget for the upstream fetch, derived fresh per request.
pub const FETCH_BUDGET: Duration = Duration::from_millis(200);

/// Budget for the store append. A sibling of the fetch budget, not a slice
/// of its remainder: the append may proceed even when the fetch consumed
/// most of its own budget.
pub const STORE_BUDGET: Duration = Duration::from_millis(50);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn RateProvider>,
    pub store: Arc<QuoteStore>,
    pub pair: String,
    pub fetch_budget: Duration,
    pub store_budget: Duration,
}

impl AppState {
    pub fn new(provider: Arc<dyn RateProvider>, store: Arc<QuoteStore>, pair: String) -> Self {
        Self {
            provider,
            store,
            pair,
            fetch_budget: FETCH_BUDGET,
            store_budget: STORE_BUDGET,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/quote", get(quote_handler))
        .with_state(state)
}

/// Run the service on the configured address until the task is dropped.
pub async fn run(config: &ServerConfig) -> Result<()> {
    let provider = Arc::new(AwesomeApiProvider::new(&config.upstream_base_url));
    let data_path = config.resolve_data_path()?;
    let store = Arc::new(QuoteStore::open(&data_path));
    let state = AppState::new(provider, store, config.pair.clone());

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!(address = %config.bind_address, "quote service listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn quote_handler(State(state): State<AppState>) -> Response {
    info!("request started");
    let request_deadline = Deadline::after(state.fetch_budget);

    debug!(pair = %state.pair, "fetching upstream quote");
    let quote = match state.provider.fetch(&state.pair, request_deadline).await {
        Ok(quote) => quote,
        Err(FetchError::Timeout) => {
            warn!("upstream fetch timed out");
            info!("request cancelled by timeout");
            return (StatusCode::REQUEST_TIMEOUT, "request cancelled by timeout").into_response();
        }
        Err(err) => {
            error!(error = %err, "upstream fetch failed");
            info!("request finished with error");
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch quote").into_response();
        }
    };

    // Best-effort persistence under its own sibling deadline; failure never
    // blocks the response already in flight.
    debug!(value = %quote, "persisting quote");
    match state
        .store
        .append(quote, Deadline::after(state.store_budget))
        .await
    {
        Ok(id) => debug!(id, "quote persisted"),
        Err(err) => warn!(error = %err, "could not persist quote"),
    }

    // The two terminal states are mutually exclusive: a request whose
    // deadline has elapsed is cancelled even though the quote was obtained
    // and the write was attempted.
    if request_deadline.is_elapsed() {
        info!("request cancelled by timeout");
        (StatusCode::REQUEST_TIMEOUT, "request cancelled by timeout").into_response()
    } else {
        info!("request processed");
        (StatusCode::OK, Json(QuotePayload { quote: quote.value })).into_response()
    }
}
