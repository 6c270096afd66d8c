use actix_web::web;

use crate::domain::order::Order;
use crate::repository::{OrderQuery, OrderSearch};

use super::dto::{present, OrderDto};
use super::{resolve_relations, ApiError, AppState, Resolve, SearchParams};

/// v1: aggregate exposed directly, every relation resolved first.
pub async fn orders_v1(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> Result<web::Json<Vec<Order>>, ApiError> {
    let query = OrderQuery::from_search(&OrderSearch::try_from(params.into_inner())?);
    let mut orders = state.store.find_all_by_search(&query).await?;
    let lookups = resolve_relations(state.store.as_ref(), &mut orders, Resolve::All).await?;

    tracing::info!(
        endpoint = "v1_orders",
        orders = orders.len(),
        lookups = lookups.total(),
        "orders resolved lazily"
    );
    state.metrics.record_lookups("v1_orders", &lookups);
    state.metrics.record_orders_returned("v1_orders", orders.len());

    Ok(web::Json(orders))
}

/// v2: DTOs over lazily resolved relations; costs one lookup per unseen key.
pub async fn orders_v2(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> Result<web::Json<Vec<OrderDto>>, ApiError> {
    let query = OrderQuery::from_search(&OrderSearch::try_from(params.into_inner())?);
    let mut orders = state.store.find_all_by_search(&query).await?;
    let lookups = resolve_relations(state.store.as_ref(), &mut orders, Resolve::All).await?;

    tracing::info!(
        endpoint = "v2_orders",
        orders = orders.len(),
        lookups = lookups.total(),
        "orders resolved lazily"
    );
    state.metrics.record_lookups("v2_orders", &lookups);
    state.metrics.record_orders_returned("v2_orders", orders.len());

    Ok(web::Json(present(&orders)?))
}

pub async fn order_v2(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<web::Json<OrderDto>, ApiError> {
    let id = path.into_inner();
    let mut order = state
        .store
        .find_one(id)
        .await?
        .ok_or(ApiError::OrderNotFound(id))?;
    let lookups =
        resolve_relations(state.store.as_ref(), std::slice::from_mut(&mut order), Resolve::All)
            .await?;

    tracing::debug!(order_id = id, lookups = lookups.total(), "order resolved lazily");
    state.metrics.record_lookups("v2_order", &lookups);

    Ok(web::Json(OrderDto::try_from(&order)?))
}

/// v3: fetch join with items. No pagination.
pub async fn orders_v3(
    state: web::Data<AppState>,
) -> Result<web::Json<Vec<OrderDto>>, ApiError> {
    let orders = state.store.find_all_with_items().await?;

    tracing::info!(endpoint = "v3_orders", orders = orders.len(), "orders fetched with items");
    state.metrics.record_orders_returned("v3_orders", orders.len());

    Ok(web::Json(present(&orders)?))
}
