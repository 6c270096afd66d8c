use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::order::{Address, Order, OrderItem, OrderStatus};

// ============================================================================
// Response DTOs
// ============================================================================
//
// Flat, caller-facing shapes. Building one never triggers a lookup: the
// relations it reads must already be loaded, otherwise the conversion fails
// with `PresentError::RelationNotLoaded`.
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PresentError {
    #[error("order {order_id}: {relation} is not loaded")]
    RelationNotLoaded {
        order_id: i64,
        relation: &'static str,
    },
}

/// Order without item detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleOrderDto {
    pub order_id: i64,
    pub name: String,
    pub order_date: NaiveDateTime,
    pub order_status: OrderStatus,
    pub address: Address,
}

/// Order with its items.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub order_id: i64,
    pub name: String,
    pub order_date: NaiveDateTime,
    pub order_status: OrderStatus,
    pub address: Address,
    pub order_items: Vec<OrderItemDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDto {
    pub item_name: String,
    pub order_price: i32,
    pub count: i32,
}

fn not_loaded(order: &Order, relation: &'static str) -> PresentError {
    PresentError::RelationNotLoaded {
        order_id: order.id,
        relation,
    }
}

impl TryFrom<&Order> for SimpleOrderDto {
    type Error = PresentError;

    fn try_from(order: &Order) -> Result<Self, Self::Error> {
        let member = order.member.get().ok_or_else(|| not_loaded(order, "member"))?;
        let delivery = order
            .delivery
            .get()
            .ok_or_else(|| not_loaded(order, "delivery"))?;

        Ok(Self {
            order_id: order.id,
            name: member.name.clone(),
            order_date: order.order_date,
            order_status: order.status,
            address: delivery.address.clone(),
        })
    }
}

impl TryFrom<&Order> for OrderDto {
    type Error = PresentError;

    fn try_from(order: &Order) -> Result<Self, Self::Error> {
        let header = SimpleOrderDto::try_from(order)?;
        let lines = order
            .order_items
            .get()
            .ok_or_else(|| not_loaded(order, "orderItems"))?;

        let order_items = lines
            .iter()
            .map(|line| item_dto(order, line))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            order_id: header.order_id,
            name: header.name,
            order_date: header.order_date,
            order_status: header.order_status,
            address: header.address,
            order_items,
        })
    }
}

fn item_dto(order: &Order, line: &OrderItem) -> Result<OrderItemDto, PresentError> {
    let item = line.item.get().ok_or_else(|| not_loaded(order, "item"))?;
    Ok(OrderItemDto {
        item_name: item.name.clone(),
        order_price: line.order_price,
        count: line.count,
    })
}

/// Convert every order, failing on the first that is not sufficiently loaded.
pub fn present<'a, T>(orders: impl IntoIterator<Item = &'a Order>) -> Result<Vec<T>, PresentError>
where
    T: TryFrom<&'a Order, Error = PresentError>,
{
    orders.into_iter().map(T::try_from).collect()
}
