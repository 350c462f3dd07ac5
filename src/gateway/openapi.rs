//! OpenAPI / Swagger UI documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::handlers::{
    BalanceResponse, ExternalTransferRequest, ExternalTransferResponse, HealthResponse,
    InternalTransferRequest, InternalTransferResponse, TransactionView, TransactionsResponse,
};

/// Session JWT bearer authentication security scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_jwt",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Main API documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Custodia Wallet Engine API",
        version = "1.0.0",
        description = "Custodial wallet transfer and settlement engine: internal ledger transfers and on-chain USDC settlement.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::transfer::internal_transfer,
        crate::gateway::handlers::transfer::external_transfer,
        crate::gateway::handlers::transfer::get_external_transfer,
        crate::gateway::handlers::account::get_balance,
        crate::gateway::handlers::account::list_transactions,
    ),
    components(schemas(
        HealthResponse,
        InternalTransferRequest,
        InternalTransferResponse,
        ExternalTransferRequest,
        ExternalTransferResponse,
        BalanceResponse,
        TransactionView,
        TransactionsResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "System", description = "Service health"),
        (name = "Transfer", description = "Internal transfers and external settlements"),
        (name = "Account", description = "Balance and transaction history")
    )
)]
pub struct ApiDoc;
