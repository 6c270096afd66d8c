// ============================================================================
// Order Repository
// ============================================================================
//
// Retrieval modes:
//   1. find_all_by_search            - filtered, relations unloaded
//   2. find_all_with_member_delivery - filtered, member + delivery fetched
//   3. find_all_with_items           - unfiltered, everything fetched,
//                                      parent rows de-duplicated
//   4. mode 2 with `OrderQuery::paged`
//
// Mode 3 takes no query on purpose: joining a one-to-many relation multiplies
// rows, so an offset/limit at the store would cut through orders.
//
// ============================================================================

mod fetch_join;
mod memory;
mod metered;
mod postgres;
mod search;
mod session;

use async_trait::async_trait;

use crate::domain::order::{
    Delivery, Item, Member, NewItem, NewOrder, Order, OrderError, OrderItem,
};

pub use memory::MemoryOrderStore;
pub use metered::MeteredStore;
pub use postgres::PgOrderStore;
pub use search::{OrderQuery, OrderSearch};
pub use session::{LookupCounts, LookupSession};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("not enough stock for item {item_id}: requested {requested}, available {available}")]
    NotEnoughStock {
        item_id: i64,
        requested: i32,
        available: i32,
    },

    #[error("invalid order: {0}")]
    InvalidOrder(#[from] OrderError),

    #[error("data corruption: {0}")]
    DataCorruption(String),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Mode 1: filtered orders with member, delivery and items unloaded.
    async fn find_all_by_search(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError>;

    /// Modes 2 and 4: filtered orders with member and delivery loaded.
    async fn find_all_with_member_delivery(
        &self,
        query: &OrderQuery,
    ) -> Result<Vec<Order>, StoreError>;

    /// Mode 3: every order with member, delivery, items and item details loaded.
    async fn find_all_with_items(&self) -> Result<Vec<Order>, StoreError>;

    async fn find_one(&self, id: i64) -> Result<Option<Order>, StoreError>;

    async fn find_member(&self, id: i64) -> Result<Option<Member>, StoreError>;

    async fn find_delivery(&self, id: i64) -> Result<Option<Delivery>, StoreError>;

    /// Items of one order, with `item` unloaded.
    async fn find_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StoreError>;

    async fn find_item(&self, id: i64) -> Result<Option<Item>, StoreError>;

    async fn save_member(&self, name: &str) -> Result<Member, StoreError>;

    async fn save_item(&self, item: NewItem) -> Result<Item, StoreError>;

    /// Prices each line from the item's current price and takes it out of stock.
    async fn save_order(&self, order: NewOrder) -> Result<i64, StoreError>;
}
