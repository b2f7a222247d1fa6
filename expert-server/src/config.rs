//! Server configuration loaded from the environment.

use std::path::PathBuf;

pub struct ServerConfig {
    pub bind_addr: String,
    pub rule_base_path: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("EXPERT_SERVER_BIND").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            rule_base_path: std::env::var("EXPERT_SERVER_RULE_BASE")
                .ok()
                .map(PathBuf::from),
        }
    }
}
