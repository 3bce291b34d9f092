//! Signing Service
//!
//! HTTP facade over the threshold (MPC) and single-key (Ed25519) signing
//! cores: single-mode wallets under `/wallets/*`, threshold-mode wallets
//! under `/mpc/wallets/*`. Split into a library (this crate) and a thin
//! `main.rs` binary so the router can be exercised in-process by
//! integration tests via `tower::ServiceExt::oneshot`, without binding a
//! real socket.

pub mod auth;
pub mod config;
pub mod routes;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use config::Config;
use dashmap::DashMap;
use serde_json::Value;
use share_store::FileShareStore;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tss_core::coordinator::TssCoordinator;
use tss_core::ed25519::Ed25519Signer;
use tss_core::types::ThresholdWallet;

/// Non-secret bookkeeping alongside a wallet's stored key material: when it
/// was created and whatever caller-supplied metadata it was tagged with.
/// Neither field is persisted in the Share Store, so it does not survive a
/// restart — see `DESIGN.md`.
pub struct WalletMeta {
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub metadata: Option<Value>,
}

pub struct AppState {
    pub config: Config,
    pub ed25519: Ed25519Signer<FileShareStore>,
    pub coordinator: TssCoordinator<FileShareStore>,
    pub wallet_registry: DashMap<String, WalletMeta>,
    pub mpc_wallets: DashMap<String, ThresholdWallet>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let ed25519_store = FileShareStore::new(config.share_store_path.clone());
        let coordinator_store = FileShareStore::new(config.share_store_path.clone());
        Self {
            ed25519: Ed25519Signer::new(ed25519_store),
            coordinator: TssCoordinator::new(coordinator_store),
            wallet_registry: DashMap::new(),
            mpc_wallets: DashMap::new(),
            config,
        }
    }
}

/// Build the full router: public `GET` routes, API-key-gated `POST`
/// routes, and the CORS/tracing layers, matching the endpoint table in the
/// governing specification's external-interfaces section.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mutating_routes = Router::new()
        .route("/wallets/generate", post(routes::wallets_generate))
        .route("/wallets/sign-order", post(routes::wallets_sign_order))
        .route("/wallets/sign", post(routes::wallets_sign))
        .route("/mpc/wallets/generate", post(routes::mpc_wallets_generate))
        .route(
            "/mpc/wallets/sign-order",
            post(routes::mpc_wallets_sign_order),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(routes::health))
        .route("/mpc/status", get(routes::mpc_status))
        .route(
            "/wallets/:walletId/public-key",
            get(routes::wallets_public_key),
        )
        .merge(mutating_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
