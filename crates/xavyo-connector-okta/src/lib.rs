//! # Okta Connector
//!
//! Okta management API resources as query engine tables.
//!
//! ## Tables
//!
//! | Table | Source | Parent |
//! |-------|--------|--------|
//! | `okta_signon_policy` | `/api/v1/policies?type=OKTA_SIGN_ON` | - |
//! | `okta_password_policy` | `/api/v1/policies?type=PASSWORD` | - |
//! | `okta_mfa_policy` | `/api/v1/policies?type=MFA_ENROLL` | - |
//! | `okta_factor` | `/api/v1/users/{id}/factors` | users |
//! | `okta_app_assigned_user` | `/api/v1/apps/{id}/users` | applications |
//!
//! ## Example
//!
//! ```ignore
//! use xavyo_connector_okta::{OktaConfig, OktaConnector};
//! use xavyo_query::prelude::*;
//!
//! let connector = OktaConnector::new(
//!     OktaConfig::new("https://dev-123456.okta.com", token),
//!     EngineConfig::default(),
//! )?;
//! let ctx = QueryContext::new()
//!     .with_columns(["id", "user_name", "factor_type"])
//!     .with_qualifier("user_id", Qualifier::eq("00u1abcd"));
//! let rows = connector.collect("okta_factor", &ctx).await?;
//! ```

pub mod client;
pub mod config;
pub mod families;
pub mod tables;

pub use client::OktaClient;
pub use config::OktaConfig;

use std::sync::Arc;
use tracing::instrument;
use xavyo_query::prelude::*;

/// Query engine bound to one Okta organization and the table catalog.
#[derive(Debug, Clone)]
pub struct OktaConnector {
    engine: QueryEngine,
}

impl OktaConnector {
    /// Create a connector.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if either configuration is invalid.
    pub fn new(config: OktaConfig, engine_config: EngineConfig) -> QueryResult<Self> {
        let client = OktaClient::new(&config)?;
        Self::with_client(Arc::new(client), engine_config)
    }

    /// Create a connector over any client serving the Okta API shape.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the engine configuration is invalid.
    pub fn with_client(
        client: Arc<dyn ResourceClient>,
        engine_config: EngineConfig,
    ) -> QueryResult<Self> {
        Ok(Self {
            engine: QueryEngine::new(client, engine_config)?,
        })
    }

    /// Tables served by this connector.
    #[must_use]
    pub fn tables(&self) -> Vec<TableDefinition> {
        tables::catalog()
    }

    /// Run a query against a named table, streaming rows to `emitter`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTable` for a name outside the catalog, otherwise the
    /// first fatal query error.
    #[instrument(skip(self, ctx, emitter))]
    pub async fn query(
        &self,
        table: &str,
        ctx: &QueryContext,
        emitter: &dyn RowEmitter,
    ) -> QueryResult<QueryStatsSnapshot> {
        let table = tables::table(table)?;
        self.engine.execute(&table, ctx, emitter).await
    }

    /// Run a query against a named table and collect its rows.
    ///
    /// # Errors
    ///
    /// See [`OktaConnector::query`].
    pub async fn collect(&self, table: &str, ctx: &QueryContext) -> QueryResult<Vec<NormalizedRow>> {
        let table = tables::table(table)?;
        self.engine.collect(&table, ctx).await
    }
}
