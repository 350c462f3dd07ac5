use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL for the account ledger and audit trail
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub chain: ChainConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// Session token verification settings.
///
/// The secret itself is read from the named environment variable at startup,
/// never from the config file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionConfig {
    pub jwt_secret_env: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            jwt_secret_env: "CUSTODIA_JWT_SECRET".to_string(),
        }
    }
}

/// Chain settlement settings.
///
/// `authority_secret_env` names the environment variable holding the
/// hex-encoded signing authority keypair. The key material is loaded once at
/// process start and held only in memory.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub usdc_mint: String,
    pub authority_secret_env: String,
    pub confirm_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            // USDC mint (devnet)
            usdc_mint: "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU".to_string(),
            authority_secret_env: "CUSTODIA_AUTHORITY_SECRET".to_string(),
            confirm_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}
