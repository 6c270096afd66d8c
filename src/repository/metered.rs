use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::domain::order::{Delivery, Item, Member, NewItem, NewOrder, Order, OrderItem};
use crate::metrics::Metrics;

use super::{OrderQuery, OrderStore, StoreError};

/// Wraps a store and records one Prometheus sample per round trip.
pub struct MeteredStore {
    inner: Arc<dyn OrderStore>,
    metrics: Arc<Metrics>,
}

impl MeteredStore {
    pub fn new(inner: Arc<dyn OrderStore>, metrics: Arc<Metrics>) -> Self {
        Self { inner, metrics }
    }

    async fn observe<T, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let started = Instant::now();
        let result = call.await;
        let elapsed = started.elapsed();

        self.metrics
            .record_store_query(operation, elapsed.as_secs_f64(), result.is_ok());

        match &result {
            Ok(_) => tracing::debug!(operation, elapsed_ms = elapsed.as_millis() as u64, "store call"),
            Err(e) => tracing::warn!(operation, error = %e, "store call failed"),
        }

        result
    }
}

#[async_trait]
impl OrderStore for MeteredStore {
    async fn find_all_by_search(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
        self.observe("find_all_by_search", self.inner.find_all_by_search(query))
            .await
    }

    async fn find_all_with_member_delivery(
        &self,
        query: &OrderQuery,
    ) -> Result<Vec<Order>, StoreError> {
        self.observe(
            "find_all_with_member_delivery",
            self.inner.find_all_with_member_delivery(query),
        )
        .await
    }

    async fn find_all_with_items(&self) -> Result<Vec<Order>, StoreError> {
        self.observe("find_all_with_items", self.inner.find_all_with_items())
            .await
    }

    async fn find_one(&self, id: i64) -> Result<Option<Order>, StoreError> {
        self.observe("find_one", self.inner.find_one(id)).await
    }

    async fn find_member(&self, id: i64) -> Result<Option<Member>, StoreError> {
        self.observe("find_member", self.inner.find_member(id)).await
    }

    async fn find_delivery(&self, id: i64) -> Result<Option<Delivery>, StoreError> {
        self.observe("find_delivery", self.inner.find_delivery(id)).await
    }

    async fn find_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StoreError> {
        self.observe("find_order_items", self.inner.find_order_items(order_id))
            .await
    }

    async fn find_item(&self, id: i64) -> Result<Option<Item>, StoreError> {
        self.observe("find_item", self.inner.find_item(id)).await
    }

    async fn save_member(&self, name: &str) -> Result<Member, StoreError> {
        self.observe("save_member", self.inner.save_member(name)).await
    }

    async fn save_item(&self, item: NewItem) -> Result<Item, StoreError> {
        self.observe("save_item", self.inner.save_item(item)).await
    }

    async fn save_order(&self, order: NewOrder) -> Result<i64, StoreError> {
        self.observe("save_order", self.inner.save_order(order)).await
    }
}
