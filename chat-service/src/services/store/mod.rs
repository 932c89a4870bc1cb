//! Remote data store access.
//!
//! Records are owned by the hosted database's schema, so rows travel as
//! `serde_json::Value` objects. `DataStore` exposes the handful of PostgREST
//! operations the repositories need.

pub mod mock;
pub mod supabase;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use mock::MockDataStore;
pub use supabase::SupabaseStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Data store not configured: {0}")]
    NotConfigured(String),

    #[error("Record not found")]
    NotFound,

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Sort direction for `Query::order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Row selection: equality filters, optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub filters: Vec<(String, String)>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST query-string parameters for this selection.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|(column, value)| (column.clone(), format!("eq.{}", value)))
            .collect();

        if let Some(order) = &self.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }
}

#[async_trait]
pub trait DataStore: Send + Sync {
    /// All rows of `table` matching `query`.
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, StoreError>;

    /// Exactly one row; zero or several matches is `StoreError::NotFound`.
    async fn select_single(&self, table: &str, query: &Query) -> Result<Value, StoreError>;

    /// Insert one record and return the stored rows.
    async fn insert(&self, table: &str, record: &Value) -> Result<Vec<Value>, StoreError>;

    /// Apply `changes` to matching rows and return them.
    async fn update(
        &self,
        table: &str,
        query: &Query,
        changes: &Value,
    ) -> Result<Vec<Value>, StoreError>;

    async fn delete(&self, table: &str, query: &Query) -> Result<(), StoreError>;

    /// Connectivity probe: read at most one row from the `test` table.
    async fn health_check(&self) -> Result<Vec<Value>, StoreError> {
        self.select("test", &Query::new().limit(1)).await
    }
}
