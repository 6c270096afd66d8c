use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use tokio::sync::RwLock;

use crate::domain::order::{
    Delivery, DeliveryStatus, Item, Member, NewItem, NewOrder, Order, OrderItem, OrderStatus,
    Relation,
};

use super::fetch_join::{collapse, FetchJoinRow};
use super::{OrderQuery, OrderStore, StoreError};

// ============================================================================
// In-memory Order Store
// ============================================================================
//
// Tables are kept normalized (orders reference members/deliveries by id) so
// each retrieval mode has to do the same joins the SQL store does. Every
// trait call counts as one round trip.
//
// ============================================================================

#[derive(Debug, Clone)]
struct OrderRow {
    id: i64,
    member_id: i64,
    delivery_id: i64,
    order_date: NaiveDateTime,
    status: OrderStatus,
}

impl OrderRow {
    fn unloaded(&self) -> Order {
        Order {
            id: self.id,
            member: Relation::unloaded(self.member_id),
            order_items: Relation::unloaded(self.id),
            delivery: Relation::unloaded(self.delivery_id),
            order_date: self.order_date,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    item_id: i64,
    order_price: i32,
    count: i32,
}

impl OrderItemRow {
    fn unloaded(&self) -> OrderItem {
        OrderItem {
            id: self.id,
            item: Relation::unloaded(self.item_id),
            order_price: self.order_price,
            count: self.count,
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    members: BTreeMap<i64, Member>,
    items: BTreeMap<i64, Item>,
    deliveries: BTreeMap<i64, Delivery>,
    orders: BTreeMap<i64, OrderRow>,
    order_items: BTreeMap<i64, OrderItemRow>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Orders inner-joined with their member and filtered by `query`.
    fn filtered<'a>(&'a self, query: &'a OrderQuery) -> impl Iterator<Item = (&'a OrderRow, &'a Member)> + 'a {
        self.orders.values().filter_map(move |row| {
            let member = self.members.get(&row.member_id)?;
            query.matches(&row.unloaded(), member).then_some((row, member))
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    tables: RwLock<Tables>,
    round_trips: AtomicUsize,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls served so far.
    #[cfg(test)]
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::Relaxed)
    }

    fn hit(&self, operation: &str) {
        let n = self.round_trips.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(operation, round_trips = n, "memory store call");
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn find_all_by_search(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
        self.hit("find_all_by_search");
        let tables = self.tables.read().await;

        Ok(query.apply_window(tables.filtered(query).map(|(row, _)| row.unloaded())))
    }

    async fn find_all_with_member_delivery(
        &self,
        query: &OrderQuery,
    ) -> Result<Vec<Order>, StoreError> {
        self.hit("find_all_with_member_delivery");
        let tables = self.tables.read().await;

        let joined = tables.filtered(query).filter_map(|(row, member)| {
            let delivery = tables.deliveries.get(&row.delivery_id)?;
            let mut order = row.unloaded();
            order.member = Relation::Loaded(member.clone());
            order.delivery = Relation::Loaded(delivery.clone());
            Some(order)
        });

        Ok(query.apply_window(joined))
    }

    async fn find_all_with_items(&self) -> Result<Vec<Order>, StoreError> {
        self.hit("find_all_with_items");
        let tables = self.tables.read().await;

        let mut rows = Vec::new();
        for order in tables.orders.values() {
            let (Some(member), Some(delivery)) = (
                tables.members.get(&order.member_id),
                tables.deliveries.get(&order.delivery_id),
            ) else {
                continue;
            };

            for line in tables.order_items.values().filter(|l| l.order_id == order.id) {
                let Some(item) = tables.items.get(&line.item_id) else {
                    continue;
                };
                rows.push(FetchJoinRow {
                    order_id: order.id,
                    order_date: order.order_date,
                    order_status: order.status.as_str().to_string(),
                    member_id: member.id,
                    member_name: member.name.clone(),
                    delivery_id: delivery.id,
                    city: delivery.address.city.clone(),
                    street: delivery.address.street.clone(),
                    zipcode: delivery.address.zipcode.clone(),
                    delivery_status: delivery.status.as_str().to_string(),
                    order_item_id: line.id,
                    order_price: line.order_price,
                    count: line.count,
                    item_id: item.id,
                    item_name: item.name.clone(),
                    item_price: item.price,
                    stock_quantity: item.stock_quantity,
                });
            }
        }

        tracing::debug!(joined_rows = rows.len(), "fetch join produced rows");
        collapse(rows)
    }

    async fn find_one(&self, id: i64) -> Result<Option<Order>, StoreError> {
        self.hit("find_one");
        Ok(self.tables.read().await.orders.get(&id).map(OrderRow::unloaded))
    }

    async fn find_member(&self, id: i64) -> Result<Option<Member>, StoreError> {
        self.hit("find_member");
        Ok(self.tables.read().await.members.get(&id).cloned())
    }

    async fn find_delivery(&self, id: i64) -> Result<Option<Delivery>, StoreError> {
        self.hit("find_delivery");
        Ok(self.tables.read().await.deliveries.get(&id).cloned())
    }

    async fn find_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StoreError> {
        self.hit("find_order_items");
        Ok(self
            .tables
            .read()
            .await
            .order_items
            .values()
            .filter(|line| line.order_id == order_id)
            .map(OrderItemRow::unloaded)
            .collect())
    }

    async fn find_item(&self, id: i64) -> Result<Option<Item>, StoreError> {
        self.hit("find_item");
        Ok(self.tables.read().await.items.get(&id).cloned())
    }

    async fn save_member(&self, name: &str) -> Result<Member, StoreError> {
        self.hit("save_member");
        let mut tables = self.tables.write().await;

        let member = Member {
            id: tables.next_id(),
            name: name.to_string(),
        };
        tables.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn save_item(&self, item: NewItem) -> Result<Item, StoreError> {
        self.hit("save_item");
        let mut tables = self.tables.write().await;

        let item = Item {
            id: tables.next_id(),
            name: item.name,
            price: item.price,
            stock_quantity: item.stock_quantity,
        };
        tables.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn save_order(&self, order: NewOrder) -> Result<i64, StoreError> {
        self.hit("save_order");
        order.validate()?;
        let mut tables = self.tables.write().await;

        if !tables.members.contains_key(&order.member_id) {
            return Err(StoreError::NotFound { entity: "member", id: order.member_id });
        }

        // Check every line before touching stock so a failure leaves no trace.
        let mut priced = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let item = tables
                .items
                .get(&line.item_id)
                .ok_or(StoreError::NotFound { entity: "item", id: line.item_id })?;
            let already_taken: i32 = priced
                .iter()
                .filter(|(id, _, _)| *id == line.item_id)
                .map(|(_, _, count)| *count)
                .sum();
            if item.stock_quantity - already_taken < line.count {
                return Err(StoreError::NotEnoughStock {
                    item_id: item.id,
                    requested: line.count,
                    available: item.stock_quantity - already_taken,
                });
            }
            priced.push((item.id, item.price, line.count));
        }

        let delivery_id = tables.next_id();
        tables.deliveries.insert(
            delivery_id,
            Delivery {
                id: delivery_id,
                address: order.address,
                status: DeliveryStatus::Ready,
            },
        );

        let order_id = tables.next_id();
        tables.orders.insert(
            order_id,
            OrderRow {
                id: order_id,
                member_id: order.member_id,
                delivery_id,
                order_date: Local::now().naive_local(),
                status: OrderStatus::Ordered,
            },
        );

        for (item_id, price, count) in priced {
            if let Some(item) = tables.items.get_mut(&item_id) {
                item.stock_quantity -= count;
            }
            let id = tables.next_id();
            tables.order_items.insert(
                id,
                OrderItemRow {
                    id,
                    order_id,
                    item_id,
                    order_price: price,
                    count,
                },
            );
        }

        tracing::debug!(order_id, member_id = order.member_id, "order saved");
        Ok(order_id)
    }
}

#[cfg(test)]
impl MemoryOrderStore {
    pub async fn set_status(&self, order_id: i64, status: OrderStatus) {
        if let Some(row) = self.tables.write().await.orders.get_mut(&order_id) {
            row.status = status;
        }
    }
}
