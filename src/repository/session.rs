use std::collections::HashMap;

use crate::domain::order::{Delivery, Item, Member, Order, OrderItem, Relation};

use super::{OrderStore, StoreError};

// ============================================================================
// Lookup Session - request-scoped identity map
// ============================================================================
//
// Resolves unloaded relations one lookup at a time. This is the N+1 cost
// model made visible: N orders resolved for member and delivery cost up to
// 2N lookups on top of the query that produced them. Keys already seen in
// this session are answered from the map and cost nothing.
//
// ============================================================================

/// Lookups issued per relation kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LookupCounts {
    pub member: usize,
    pub delivery: usize,
    pub order_items: usize,
    pub item: usize,
}

impl LookupCounts {
    pub fn total(&self) -> usize {
        self.member + self.delivery + self.order_items + self.item
    }

    /// `(relation, lookups)` pairs, labelled the way metrics export them.
    pub fn by_relation(&self) -> [(&'static str, usize); 4] {
        [
            ("member", self.member),
            ("delivery", self.delivery),
            ("order_items", self.order_items),
            ("item", self.item),
        ]
    }
}

pub struct LookupSession<'a> {
    store: &'a dyn OrderStore,
    members: HashMap<i64, Member>,
    deliveries: HashMap<i64, Delivery>,
    items: HashMap<i64, Item>,
    order_items: HashMap<i64, Vec<OrderItem>>,
    lookups: LookupCounts,
}

impl<'a> LookupSession<'a> {
    pub fn new(store: &'a dyn OrderStore) -> Self {
        Self {
            store,
            members: HashMap::new(),
            deliveries: HashMap::new(),
            items: HashMap::new(),
            order_items: HashMap::new(),
            lookups: LookupCounts::default(),
        }
    }

    /// Store lookups issued by this session so far.
    pub fn lookups(&self) -> usize {
        self.lookups.total()
    }

    pub fn counts(&self) -> LookupCounts {
        self.lookups
    }

    pub async fn resolve_member(&mut self, order: &mut Order) -> Result<(), StoreError> {
        let Some(id) = order.member.key() else {
            return Ok(());
        };

        if !self.members.contains_key(&id) {
            self.lookups.member += 1;
            let member = self
                .store
                .find_member(id)
                .await?
                .ok_or(StoreError::NotFound { entity: "member", id })?;
            self.members.insert(id, member);
        }

        order.member = Relation::Loaded(self.members[&id].clone());
        Ok(())
    }

    pub async fn resolve_delivery(&mut self, order: &mut Order) -> Result<(), StoreError> {
        let Some(id) = order.delivery.key() else {
            return Ok(());
        };

        if !self.deliveries.contains_key(&id) {
            self.lookups.delivery += 1;
            let delivery = self
                .store
                .find_delivery(id)
                .await?
                .ok_or(StoreError::NotFound { entity: "delivery", id })?;
            self.deliveries.insert(id, delivery);
        }

        order.delivery = Relation::Loaded(self.deliveries[&id].clone());
        Ok(())
    }

    /// Load the order's items and then each item's details.
    pub async fn resolve_items(&mut self, order: &mut Order) -> Result<(), StoreError> {
        let mut lines = match order.order_items.key() {
            Some(order_id) => {
                if !self.order_items.contains_key(&order_id) {
                    self.lookups.order_items += 1;
                    let lines = self.store.find_order_items(order_id).await?;
                    self.order_items.insert(order_id, lines);
                }
                self.order_items[&order_id].clone()
            }
            None => match &order.order_items {
                Relation::Loaded(lines) => lines.clone(),
                Relation::Unloaded { .. } => Vec::new(),
            },
        };

        for line in &mut lines {
            let Some(id) = line.item.key() else {
                continue;
            };
            if !self.items.contains_key(&id) {
                self.lookups.item += 1;
                let item = self
                    .store
                    .find_item(id)
                    .await?
                    .ok_or(StoreError::NotFound { entity: "item", id })?;
                self.items.insert(id, item);
            }
            line.item = Relation::Loaded(self.items[&id].clone());
        }

        order.order_items = Relation::Loaded(lines);
        Ok(())
    }

    /// Member and delivery.
    pub async fn resolve_header(&mut self, order: &mut Order) -> Result<(), StoreError> {
        self.resolve_member(order).await?;
        self.resolve_delivery(order).await
    }

    /// Member, delivery, items and item details.
    pub async fn resolve_all(&mut self, order: &mut Order) -> Result<(), StoreError> {
        self.resolve_header(order).await?;
        self.resolve_items(order).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Address, NewItem, NewOrder, NewOrderLine};
    use crate::repository::{MemoryOrderStore, OrderQuery};
    use crate::seed;

    #[tokio::test]
    async fn test_resolving_two_orders_costs_two_lookups_each() {
        let store = MemoryOrderStore::new();
        seed::load_demo_data(&store).await.unwrap();

        let mut orders = store.find_all_by_search(&OrderQuery::new()).await.unwrap();
        let before = store.round_trips();

        let mut session = LookupSession::new(&store);
        for order in &mut orders {
            session.resolve_header(order).await.unwrap();
        }

        assert_eq!(session.lookups(), 4);
        assert_eq!(
            session.counts(),
            LookupCounts { member: 2, delivery: 2, order_items: 0, item: 0 }
        );
        assert_eq!(store.round_trips() - before, 4);
        assert!(orders.iter().all(|o| o.member.is_loaded() && o.delivery.is_loaded()));
    }

    #[tokio::test]
    async fn test_shared_member_is_looked_up_once() {
        let store = MemoryOrderStore::new();
        let member = store.save_member("kim").await.unwrap();
        let book = store
            .save_item(NewItem { name: "BOOK".into(), price: 1000, stock_quantity: 10 })
            .await
            .unwrap();
        for _ in 0..3 {
            store
                .save_order(NewOrder {
                    member_id: member.id,
                    address: Address::new("Seoul", "1", "1111"),
                    lines: vec![NewOrderLine { item_id: book.id, count: 1 }],
                })
                .await
                .unwrap();
        }

        let mut orders = store.find_all_by_search(&OrderQuery::new()).await.unwrap();
        let mut session = LookupSession::new(&store);
        for order in &mut orders {
            session.resolve_member(order).await.unwrap();
        }

        assert_eq!(orders.len(), 3);
        assert_eq!(session.lookups(), 1);
    }

    #[tokio::test]
    async fn test_resolve_all_loads_items_and_item_details() {
        let store = MemoryOrderStore::new();
        seed::load_demo_data(&store).await.unwrap();

        let mut orders = store.find_all_by_search(&OrderQuery::new()).await.unwrap();
        let mut session = LookupSession::new(&store);
        for order in &mut orders {
            session.resolve_all(order).await.unwrap();
        }

        // 2 orders x (member + delivery + item list + 2 items)
        assert_eq!(session.lookups(), 10);
        assert_eq!(
            session.counts(),
            LookupCounts { member: 2, delivery: 2, order_items: 2, item: 4 }
        );
        for order in &orders {
            let lines = order.order_items.get().unwrap();
            assert_eq!(lines.len(), 2);
            assert!(lines.iter().all(|line| line.item.is_loaded()));
        }
    }

    #[tokio::test]
    async fn test_loaded_relations_cost_nothing() {
        let store = MemoryOrderStore::new();
        seed::load_demo_data(&store).await.unwrap();

        let mut orders = store.find_all_with_items().await.unwrap();
        let mut session = LookupSession::new(&store);
        for order in &mut orders {
            session.resolve_all(order).await.unwrap();
        }

        assert_eq!(session.lookups(), 0);
    }

    #[tokio::test]
    async fn test_missing_member_is_not_found() {
        let store = MemoryOrderStore::new();
        let mut order = Order {
            id: 1,
            member: Relation::unloaded(99),
            order_items: Relation::unloaded(1),
            delivery: Relation::unloaded(1),
            order_date: chrono::Local::now().naive_local(),
            status: crate::domain::order::OrderStatus::Ordered,
        };

        let mut session = LookupSession::new(&store);
        let err = session.resolve_member(&mut order).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "member", id: 99 }));
    }
}
