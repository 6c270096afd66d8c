use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domain::order::{
    Address, Delivery, Item, Member, NewItem, NewOrder, Order, OrderItem, Relation,
};

use super::fetch_join::{collapse, parse_column, FetchJoinRow};
use super::{OrderQuery, OrderStore, StoreError};

// ============================================================================
// PostgreSQL Order Store
// ============================================================================
//
// Tables: member, item, delivery, orders, order_item (see migrations/).
// Filtered queries are assembled with `sqlx::QueryBuilder`; every value is a
// bound parameter.
//
// ============================================================================

const SELECT_ORDERS: &str = "SELECT o.order_id, o.member_id, o.delivery_id, o.order_date, o.status \
     FROM orders o JOIN member m ON m.member_id = o.member_id";

const SELECT_ORDERS_WITH_MEMBER_DELIVERY: &str = "SELECT o.order_id, o.order_date, o.status, \
     m.member_id, m.name AS member_name, \
     d.delivery_id, d.city, d.street, d.zipcode, d.status AS delivery_status \
     FROM orders o \
     JOIN member m ON m.member_id = o.member_id \
     JOIN delivery d ON d.delivery_id = o.delivery_id";

const SELECT_ORDERS_WITH_ITEMS: &str = "SELECT o.order_id, o.order_date, o.status AS order_status, \
     m.member_id, m.name AS member_name, \
     d.delivery_id, d.city, d.street, d.zipcode, d.status AS delivery_status, \
     oi.order_item_id, oi.order_price, oi.count, \
     i.item_id, i.name AS item_name, i.price AS item_price, i.stock_quantity \
     FROM orders o \
     JOIN member m ON m.member_id = o.member_id \
     JOIN delivery d ON d.delivery_id = o.delivery_id \
     JOIN order_item oi ON oi.order_id = o.order_id \
     JOIN item i ON i.item_id = oi.item_id \
     ORDER BY o.order_id, oi.order_item_id";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRecord {
    order_id: i64,
    member_id: i64,
    delivery_id: i64,
    order_date: NaiveDateTime,
    status: String,
}

impl TryFrom<OrderRecord> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.order_id,
            member: Relation::unloaded(row.member_id),
            order_items: Relation::unloaded(row.order_id),
            delivery: Relation::unloaded(row.delivery_id),
            order_date: row.order_date,
            status: parse_column("orders.status", &row.status)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderMemberDeliveryRecord {
    order_id: i64,
    order_date: NaiveDateTime,
    status: String,
    member_id: i64,
    member_name: String,
    delivery_id: i64,
    city: String,
    street: String,
    zipcode: String,
    delivery_status: String,
}

impl TryFrom<OrderMemberDeliveryRecord> for Order {
    type Error = StoreError;

    fn try_from(row: OrderMemberDeliveryRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.order_id,
            member: Relation::Loaded(Member {
                id: row.member_id,
                name: row.member_name,
            }),
            order_items: Relation::unloaded(row.order_id),
            delivery: Relation::Loaded(Delivery {
                id: row.delivery_id,
                address: Address {
                    city: row.city,
                    street: row.street,
                    zipcode: row.zipcode,
                },
                status: parse_column("delivery.status", &row.delivery_status)?,
            }),
            order_date: row.order_date,
            status: parse_column("orders.status", &row.status)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRecord {
    member_id: i64,
    name: String,
}

impl From<MemberRecord> for Member {
    fn from(row: MemberRecord) -> Self {
        Self {
            id: row.member_id,
            name: row.name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeliveryRecord {
    delivery_id: i64,
    city: String,
    street: String,
    zipcode: String,
    status: String,
}

impl TryFrom<DeliveryRecord> for Delivery {
    type Error = StoreError;

    fn try_from(row: DeliveryRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.delivery_id,
            address: Address {
                city: row.city,
                street: row.street,
                zipcode: row.zipcode,
            },
            status: parse_column("delivery.status", &row.status)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRecord {
    order_item_id: i64,
    item_id: i64,
    order_price: i32,
    count: i32,
}

impl From<OrderItemRecord> for OrderItem {
    fn from(row: OrderItemRecord) -> Self {
        Self {
            id: row.order_item_id,
            item: Relation::unloaded(row.item_id),
            order_price: row.order_price,
            count: row.count,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRecord {
    item_id: i64,
    name: String,
    price: i32,
    stock_quantity: i32,
}

impl From<ItemRecord> for Item {
    fn from(row: ItemRecord) -> Self {
        Self {
            id: row.item_id,
            name: row.name,
            price: row.price,
            stock_quantity: row.stock_quantity,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    fn filtered<'q>(select: &'q str, query: &OrderQuery) -> QueryBuilder<'q, Postgres> {
        let mut builder = QueryBuilder::new(select);
        query.push_where(&mut builder);
        builder.push(" ORDER BY o.order_id");
        query.push_window(&mut builder);
        builder
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn find_all_by_search(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
        tracing::debug!(jpql = %query.to_jpql(), "find_all_by_search");

        let mut builder = Self::filtered(SELECT_ORDERS, query);
        let rows: Vec<OrderRecord> = builder.build_query_as().fetch_all(&self.pool).await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn find_all_with_member_delivery(
        &self,
        query: &OrderQuery,
    ) -> Result<Vec<Order>, StoreError> {
        tracing::debug!(
            jpql = %query.to_jpql(),
            offset = query.window().offset,
            limit = query.window().limit,
            "find_all_with_member_delivery"
        );

        let mut builder = Self::filtered(SELECT_ORDERS_WITH_MEMBER_DELIVERY, query);
        let rows: Vec<OrderMemberDeliveryRecord> =
            builder.build_query_as().fetch_all(&self.pool).await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn find_all_with_items(&self) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<FetchJoinRow> = sqlx::query_as(SELECT_ORDERS_WITH_ITEMS)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(joined_rows = rows.len(), "fetch join produced rows");
        collapse(rows)
    }

    async fn find_one(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRecord> = sqlx::query_as(
            "SELECT order_id, member_id, delivery_id, order_date, status \
             FROM orders WHERE order_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn find_member(&self, id: i64) -> Result<Option<Member>, StoreError> {
        let row: Option<MemberRecord> =
            sqlx::query_as("SELECT member_id, name FROM member WHERE member_id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Member::from))
    }

    async fn find_delivery(&self, id: i64) -> Result<Option<Delivery>, StoreError> {
        let row: Option<DeliveryRecord> = sqlx::query_as(
            "SELECT delivery_id, city, street, zipcode, status \
             FROM delivery WHERE delivery_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Delivery::try_from).transpose()
    }

    async fn find_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StoreError> {
        let rows: Vec<OrderItemRecord> = sqlx::query_as(
            "SELECT order_item_id, item_id, order_price, count \
             FROM order_item WHERE order_id = $1 ORDER BY order_item_id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    async fn find_item(&self, id: i64) -> Result<Option<Item>, StoreError> {
        let row: Option<ItemRecord> = sqlx::query_as(
            "SELECT item_id, name, price, stock_quantity FROM item WHERE item_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Item::from))
    }

    async fn save_member(&self, name: &str) -> Result<Member, StoreError> {
        let row: MemberRecord =
            sqlx::query_as("INSERT INTO member (name) VALUES ($1) RETURNING member_id, name")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;

        Ok(row.into())
    }

    async fn save_item(&self, item: NewItem) -> Result<Item, StoreError> {
        let row: ItemRecord = sqlx::query_as(
            "INSERT INTO item (name, price, stock_quantity) VALUES ($1, $2, $3) \
             RETURNING item_id, name, price, stock_quantity",
        )
        .bind(&item.name)
        .bind(item.price)
        .bind(item.stock_quantity)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn save_order(&self, order: NewOrder) -> Result<i64, StoreError> {
        order.validate()?;
        let mut tx = self.pool.begin().await?;

        let member: Option<i64> =
            sqlx::query_scalar("SELECT member_id FROM member WHERE member_id = $1")
                .bind(order.member_id)
                .fetch_optional(&mut *tx)
                .await?;
        if member.is_none() {
            return Err(StoreError::NotFound { entity: "member", id: order.member_id });
        }

        let mut priced = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let price: Option<i32> = sqlx::query_scalar(
                "UPDATE item SET stock_quantity = stock_quantity - $1 \
                 WHERE item_id = $2 AND stock_quantity >= $1 RETURNING price",
            )
            .bind(line.count)
            .bind(line.item_id)
            .fetch_optional(&mut *tx)
            .await?;

            match price {
                Some(price) => priced.push((line.item_id, price, line.count)),
                None => {
                    let available: Option<i32> = sqlx::query_scalar(
                        "SELECT stock_quantity FROM item WHERE item_id = $1",
                    )
                    .bind(line.item_id)
                    .fetch_optional(&mut *tx)
                    .await?;

                    // Dropping `tx` rolls back the stock already taken.
                    return Err(match available {
                        Some(available) => StoreError::NotEnoughStock {
                            item_id: line.item_id,
                            requested: line.count,
                            available,
                        },
                        None => StoreError::NotFound { entity: "item", id: line.item_id },
                    });
                }
            }
        }

        let delivery_id: i64 = sqlx::query_scalar(
            "INSERT INTO delivery (city, street, zipcode, status) VALUES ($1, $2, $3, 'READY') \
             RETURNING delivery_id",
        )
        .bind(&order.address.city)
        .bind(&order.address.street)
        .bind(&order.address.zipcode)
        .fetch_one(&mut *tx)
        .await?;

        let order_id: i64 = sqlx::query_scalar(
            "INSERT INTO orders (member_id, delivery_id, order_date, status) \
             VALUES ($1, $2, $3, 'ORDERED') RETURNING order_id",
        )
        .bind(order.member_id)
        .bind(delivery_id)
        .bind(Local::now().naive_local())
        .fetch_one(&mut *tx)
        .await?;

        for (item_id, price, count) in priced {
            sqlx::query(
                "INSERT INTO order_item (order_id, item_id, order_price, count) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(order_id)
            .bind(item_id)
            .bind(price)
            .bind(count)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(order_id, member_id = order.member_id, "order saved");
        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{DeliveryStatus, OrderStatus};
    use crate::repository::OrderSearch;
    use chrono::NaiveDate;

    fn order_date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn member_delivery_row(status: &str, delivery_status: &str) -> OrderMemberDeliveryRecord {
        OrderMemberDeliveryRecord {
            order_id: 7,
            order_date: order_date(),
            status: status.into(),
            member_id: 3,
            member_name: "userA".into(),
            delivery_id: 5,
            city: "Seoul".into(),
            street: "1".into(),
            zipcode: "1111".into(),
            delivery_status: delivery_status.into(),
        }
    }

    #[test]
    fn test_paged_query_orders_before_window() {
        let query = OrderQuery::new().paged(0, 1);
        let builder = PgOrderStore::filtered(SELECT_ORDERS_WITH_MEMBER_DELIVERY, &query);

        assert!(builder.sql().starts_with(SELECT_ORDERS_WITH_MEMBER_DELIVERY));
        assert!(!builder.sql().contains("WHERE"));
        assert!(builder.sql().ends_with(" ORDER BY o.order_id LIMIT $1 OFFSET $2"));
    }

    #[test]
    fn test_filtered_query_places_where_before_order_by() {
        let query = OrderQuery::from_search(&OrderSearch {
            member_name: Some("kim".into()),
            order_status: Some(OrderStatus::Ordered),
        });
        let builder = PgOrderStore::filtered(SELECT_ORDERS, &query);

        assert_eq!(
            builder.sql(),
            format!(
                "{SELECT_ORDERS} WHERE o.status = $1 AND m.name LIKE $2 \
                 ORDER BY o.order_id LIMIT $3 OFFSET $4"
            )
        );
    }

    #[test]
    fn test_order_record_leaves_relations_unloaded() {
        let order = Order::try_from(OrderRecord {
            order_id: 7,
            member_id: 3,
            delivery_id: 5,
            order_date: order_date(),
            status: "CANCELED".into(),
        })
        .unwrap();

        assert_eq!(order.id, 7);
        assert_eq!(order.status, OrderStatus::Canceled);
        assert_eq!(order.member, Relation::unloaded(3));
        assert_eq!(order.delivery, Relation::unloaded(5));
        assert_eq!(order.order_items, Relation::unloaded(7));
    }

    #[test]
    fn test_member_delivery_record_loads_header() {
        let order = Order::try_from(member_delivery_row("ORDERED", "READY")).unwrap();

        assert_eq!(
            order.member,
            Relation::Loaded(Member { id: 3, name: "userA".into() })
        );
        let delivery = order.delivery.get().unwrap();
        assert_eq!(delivery.id, 5);
        assert_eq!(delivery.address, Address::new("Seoul", "1", "1111"));
        assert_eq!(delivery.status, DeliveryStatus::Ready);
        assert_eq!(order.order_items, Relation::unloaded(7));
    }

    #[test]
    fn test_bad_status_is_data_corruption() {
        let err = Order::try_from(OrderRecord {
            order_id: 1,
            member_id: 1,
            delivery_id: 1,
            order_date: order_date(),
            status: "SHIPPED".into(),
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::DataCorruption(ref msg) if msg.starts_with("orders.status")));

        let err = Order::try_from(member_delivery_row("ORDERED", "LOST")).unwrap_err();
        assert!(matches!(err, StoreError::DataCorruption(ref msg) if msg.starts_with("delivery.status")));

        let err = Delivery::try_from(DeliveryRecord {
            delivery_id: 1,
            city: "Busan".into(),
            street: "2".into(),
            zipcode: "2222".into(),
            status: "".into(),
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::DataCorruption(_)));
    }

    #[test]
    fn test_delivery_record_maps_address() {
        let delivery = Delivery::try_from(DeliveryRecord {
            delivery_id: 2,
            city: "Busan".into(),
            street: "2".into(),
            zipcode: "2222".into(),
            status: "COMP".into(),
        })
        .unwrap();

        assert_eq!(delivery.id, 2);
        assert_eq!(delivery.address.city, "Busan");
        assert_eq!(delivery.status, DeliveryStatus::Comp);
    }
}
