mod config;
mod error;
mod routes;
mod state;
mod wire;

use std::sync::Arc;

use inference_engine::bundled;
use inference_engine::RuleBase;

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();

    let (rule_base, goals) = match &config.rule_base_path {
        Some(path) => {
            let base = RuleBase::load_json(path).expect("load rule base from EXPERT_SERVER_RULE_BASE");
            (base, bundled::visa_goals())
        }
        None => (bundled::visa_rule_base(), bundled::visa_goals()),
    };

    let state = Arc::new(AppState::new(rule_base, goals));
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("bind listener");

    tracing::info!(addr = %config.bind_addr, "expert-server listening");
    axum::serve(listener, app).await.expect("serve");
}
