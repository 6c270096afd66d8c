use crate::domain::order::{Address, NewItem, NewOrder, NewOrderLine};
use crate::repository::{OrderQuery, OrderStore, StoreError};

// ============================================================================
// Demo data
// ============================================================================
//
// Two members, one order each, two books per order. Skipped when the store
// already holds orders.
//
// ============================================================================

struct DemoOrder {
    member: &'static str,
    city: &'static str,
    street: &'static str,
    zipcode: &'static str,
    books: [(&'static str, i32, i32); 2],
}

const DEMO_ORDERS: [DemoOrder; 2] = [
    DemoOrder {
        member: "userA",
        city: "Seoul",
        street: "1",
        zipcode: "1111",
        books: [("JPA1 BOOK", 10000, 1), ("JPA2 BOOK", 20000, 2)],
    },
    DemoOrder {
        member: "userB",
        city: "Busan",
        street: "2",
        zipcode: "2222",
        books: [("SPRING1 BOOK", 20000, 3), ("SPRING2 BOOK", 40000, 4)],
    },
];

const DEMO_STOCK: i32 = 100;

/// Returns the number of orders created.
pub async fn load_demo_data(store: &dyn OrderStore) -> Result<usize, StoreError> {
    if !store.find_all_by_search(&OrderQuery::new().paged(0, 1)).await?.is_empty() {
        tracing::info!("store already holds orders, skipping demo data");
        return Ok(0);
    }

    let mut created = 0;
    for demo in &DEMO_ORDERS {
        let member = store.save_member(demo.member).await?;

        let mut lines = Vec::with_capacity(demo.books.len());
        for (name, price, count) in demo.books {
            let item = store
                .save_item(NewItem {
                    name: name.to_string(),
                    price,
                    stock_quantity: DEMO_STOCK,
                })
                .await?;
            lines.push(NewOrderLine { item_id: item.id, count });
        }

        let order_id = store
            .save_order(NewOrder {
                member_id: member.id,
                address: Address::new(demo.city, demo.street, demo.zipcode),
                lines,
            })
            .await?;

        tracing::debug!(order_id, member = demo.member, "demo order created");
        created += 1;
    }

    tracing::info!(orders = created, "demo data loaded");
    Ok(created)
}
