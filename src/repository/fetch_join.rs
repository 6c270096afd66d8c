use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::domain::order::{
    Address, Delivery, Item, Member, Order, OrderItem, OrderStatus, Relation,
};

use super::StoreError;

// ============================================================================
// Fetch-join row collapsing
// ============================================================================
//
// Joining orders with their items yields one row per item, so an order with
// two items appears twice. Rows are folded back into one Order per order id,
// keeping the order in which ids first appear.
//
// ============================================================================

/// One flattened row of `orders ⋈ member ⋈ delivery ⋈ order_item ⋈ item`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FetchJoinRow {
    pub order_id: i64,
    pub order_date: NaiveDateTime,
    pub order_status: String,
    pub member_id: i64,
    pub member_name: String,
    pub delivery_id: i64,
    pub city: String,
    pub street: String,
    pub zipcode: String,
    pub delivery_status: String,
    pub order_item_id: i64,
    pub order_price: i32,
    pub count: i32,
    pub item_id: i64,
    pub item_name: String,
    pub item_price: i32,
    pub stock_quantity: i32,
}

impl FetchJoinRow {
    fn order_item(&self) -> OrderItem {
        OrderItem {
            id: self.order_item_id,
            item: Relation::Loaded(Item {
                id: self.item_id,
                name: self.item_name.clone(),
                price: self.item_price,
                stock_quantity: self.stock_quantity,
            }),
            order_price: self.order_price,
            count: self.count,
        }
    }

    fn into_order(self) -> Result<Order, StoreError> {
        let first_item = self.order_item();
        Ok(Order {
            id: self.order_id,
            member: Relation::Loaded(Member {
                id: self.member_id,
                name: self.member_name,
            }),
            order_items: Relation::Loaded(vec![first_item]),
            delivery: Relation::Loaded(Delivery {
                id: self.delivery_id,
                address: Address {
                    city: self.city,
                    street: self.street,
                    zipcode: self.zipcode,
                },
                status: parse_column("delivery.status", &self.delivery_status)?,
            }),
            order_date: self.order_date,
            status: parse_column::<OrderStatus>("orders.status", &self.order_status)?,
        })
    }
}

/// Collapse repeated parent rows into distinct orders.
pub fn collapse(rows: Vec<FetchJoinRow>) -> Result<Vec<Order>, StoreError> {
    let mut orders: Vec<Order> = Vec::new();
    let mut positions: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        if let Some(&pos) = positions.get(&row.order_id) {
            let line = row.order_item();
            if let Relation::Loaded(items) = &mut orders[pos].order_items {
                items.push(line);
            }
            continue;
        }

        positions.insert(row.order_id, orders.len());
        orders.push(row.into_order()?);
    }

    Ok(orders)
}

pub(crate) fn parse_column<T>(column: &str, value: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| StoreError::DataCorruption(format!("{column}: {e}")))
}
