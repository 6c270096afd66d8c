use chrono::NaiveDateTime;
use serde::Serialize;

use super::relation::Relation;
use super::value_objects::{Address, DeliveryStatus, OrderStatus};

// ============================================================================
// Order Aggregate
// ============================================================================
//
// Order is the root; OrderItems are owned by it. Member, Delivery and Item
// are referenced through `Relation`, so each retrieval mode states exactly
// what it has loaded. References point one way only: a Member does not list
// its Orders, so serializing an Order can never cycle.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub member: Relation<Member>,
    pub order_items: Relation<Vec<OrderItem>>,
    pub delivery: Relation<Delivery>,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub id: i64,
    pub address: Address,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub item: Relation<Item>,
    pub order_price: i32,
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub price: i32,
    pub stock_quantity: i32,
}
