//! Custodia server entry point
//!
//! Startup order matters: configuration, logging, signing authority (once,
//! memory only), persistence, coordinators, gateway.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use custodia::chain::{ChainClient, SigningAuthority, SolanaRpcChainClient};
use custodia::config::AppConfig;
use custodia::core_types::{AccountId, Currency};
use custodia::gateway::{self, state::AppState};
use custodia::ledger::{BalanceLedger, MemLedger, PgLedger};
use custodia::logging;
use custodia::persistence;
use custodia::recorder::{MemRecorder, PgRecorder, TransactionRecorder};
use custodia::session::{JwtSessionResolver, SessionResolver, StaticSessionResolver};
use custodia::settlement::{
    AlertSink, ExternalSettlementCoordinator, InternalTransferCoordinator,
    MemReconciliationQueue, MemSettlementStore, PgReconciliationQueue, PgSettlementStore,
    ReconciliationQueue, SettlementStore, TracingAlertSink,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::args().nth(1).unwrap_or_else(|| "dev".to_string());
    let config = AppConfig::load(&env);
    let _log_guard = logging::init_logging(&config);

    info!(env = %env, "Starting custodia");

    // The signing authority is process-wide: read once, held in memory,
    // never reconstructed per request.
    let authority = Arc::new(SigningAuthority::from_env(
        &config.chain.authority_secret_env,
    )?);
    info!(authority = %authority.address(), "Signing authority loaded");

    let chain: Arc<dyn ChainClient> = Arc::new(SolanaRpcChainClient::new(
        &config.chain.rpc_url,
        &config.chain.usdc_mint,
        authority,
    )?);
    let confirm_timeout = Duration::from_secs(config.chain.confirm_timeout_secs);
    let alerts: Arc<dyn AlertSink> = Arc::new(TracingAlertSink);

    let sessions: Arc<dyn SessionResolver>;
    let ledger: Arc<dyn BalanceLedger>;
    let recorder: Arc<dyn TransactionRecorder>;
    let attempts: Arc<dyn SettlementStore>;
    let reconciliation: Arc<dyn ReconciliationQueue>;

    match &config.postgres_url {
        Some(url) => {
            let pool = persistence::connect(url).await?;
            persistence::schema::ensure_schema(&pool).await?;

            let jwt_secret = std::env::var(&config.session.jwt_secret_env).with_context(|| {
                format!("Session JWT secret not set ({})", config.session.jwt_secret_env)
            })?;

            sessions = Arc::new(JwtSessionResolver::new(&jwt_secret));
            ledger = Arc::new(PgLedger::new(pool.clone()));
            recorder = Arc::new(PgRecorder::new(pool.clone()));
            attempts = Arc::new(PgSettlementStore::new(pool.clone()));
            reconciliation = Arc::new(PgReconciliationQueue::new(pool));
        }
        None => {
            warn!("No postgres_url configured; running demo mode with in-memory stores");

            let mem_ledger = Arc::new(MemLedger::new());
            mem_ledger.insert_account(
                AccountId(1),
                "demo@example.com",
                1_000_000_000, // 1000 USDC
                Currency::Usdc,
            );

            sessions = Arc::new(StaticSessionResolver::new(AccountId(1)));
            ledger = mem_ledger;
            recorder = Arc::new(MemRecorder::new());
            attempts = Arc::new(MemSettlementStore::new());
            reconciliation = Arc::new(MemReconciliationQueue::new());
        }
    }

    let internal = Arc::new(InternalTransferCoordinator::new(
        ledger.clone(),
        recorder.clone(),
        reconciliation.clone(),
        alerts.clone(),
    ));
    let external = Arc::new(ExternalSettlementCoordinator::new(
        ledger.clone(),
        recorder.clone(),
        attempts,
        chain,
        reconciliation,
        alerts,
        confirm_timeout,
    ));

    let state = Arc::new(AppState::new(sessions, ledger, recorder, internal, external));

    gateway::run_server(&config.gateway.host, config.gateway.port, state).await
}
