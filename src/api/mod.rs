// ============================================================================
// HTTP API
// ============================================================================
//
// Competing implementations of "list orders" and "list simple orders":
//
//   v1   - relations resolved one by one, aggregate returned as is
//   v2   - relations resolved one by one, mapped to DTOs (N+1 lookups)
//   v3   - fetch join, mapped to DTOs (one round trip)
//   v3.1 - fetch join with offset/limit (simple orders only)
//
// ============================================================================

pub mod dto;
pub mod error;
mod orders;
mod simple_orders;

use std::sync::Arc;

use actix_web::web;
use serde::Deserialize;

use crate::domain::order::{Order, OrderStatus};
use crate::metrics::{self, Metrics};
use crate::repository::{LookupCounts, LookupSession, OrderSearch, OrderStore, StoreError};

pub use error::ApiError;

pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub metrics: Arc<Metrics>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/v1/orders", web::get().to(orders::orders_v1))
        .route("/api/v2/orders", web::get().to(orders::orders_v2))
        .route("/api/v2/orders/{id}", web::get().to(orders::order_v2))
        .route("/api/v3/orders", web::get().to(orders::orders_v3))
        .route("/api/orders-with-items", web::get().to(orders::orders_v3))
        .route("/api/v1/simple-orders", web::get().to(simple_orders::simple_orders_v1))
        .route("/api/v2/simple-orders", web::get().to(simple_orders::simple_orders_v2))
        .route("/api/v3/simple-orders", web::get().to(simple_orders::simple_orders_v3))
        .route("/api/v3.1/simple-orders", web::get().to(simple_orders::simple_orders_v3_1))
        .route("/metrics", web::get().to(metrics::metrics_handler))
        .route("/health", web::get().to(metrics::health_handler));
}

/// `?status=&name=` as received. Blank values count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub status: Option<String>,
    pub name: Option<String>,
}

impl TryFrom<SearchParams> for OrderSearch {
    type Error = ApiError;

    fn try_from(params: SearchParams) -> Result<Self, Self::Error> {
        let order_status = match params.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<OrderStatus>()
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?,
            ),
        };

        Ok(Self {
            member_name: params.name,
            order_status,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Clone, Copy)]
enum Resolve {
    /// Member and delivery.
    Header,
    /// Member, delivery and items.
    All,
}

/// Resolve unloaded relations order by order. Returns the lookups issued.
async fn resolve_relations(
    store: &dyn OrderStore,
    orders: &mut [Order],
    scope: Resolve,
) -> Result<LookupCounts, StoreError> {
    let mut session = LookupSession::new(store);
    for order in orders.iter_mut() {
        match scope {
            Resolve::Header => session.resolve_header(order).await?,
            Resolve::All => session.resolve_all(order).await?,
        }
    }
    tracing::debug!(
        ?scope,
        orders = orders.len(),
        lookups = session.lookups(),
        "relations resolved"
    );
    Ok(session.counts())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use actix_web::web;

    use super::AppState;
    use crate::metrics::Metrics;
    use crate::repository::MemoryOrderStore;
    use crate::seed;

    pub async fn seeded_state() -> (web::Data<AppState>, Arc<MemoryOrderStore>) {
        let store = Arc::new(MemoryOrderStore::new());
        seed::load_demo_data(store.as_ref()).await.unwrap();

        let state = web::Data::new(AppState {
            store: store.clone(),
            metrics: Arc::new(Metrics::new().unwrap()),
        });
        (state, store)
    }
}
