use actix_web::web;

use crate::domain::order::Order;
use crate::repository::{OrderQuery, OrderSearch};

use super::dto::{present, SimpleOrderDto};
use super::{resolve_relations, ApiError, AppState, PageParams, Resolve, SearchParams};

// Order -> Member is many-to-one and Order -> Delivery one-to-one, so joining
// them never multiplies rows and pagination stays safe.

/// v1: aggregate exposed directly. Items stay unloaded and serialize as null.
pub async fn simple_orders_v1(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> Result<web::Json<Vec<Order>>, ApiError> {
    let query = OrderQuery::from_search(&OrderSearch::try_from(params.into_inner())?);
    let mut orders = state.store.find_all_by_search(&query).await?;
    let lookups = resolve_relations(state.store.as_ref(), &mut orders, Resolve::Header).await?;

    tracing::info!(
        endpoint = "v1_simple_orders",
        orders = orders.len(),
        lookups = lookups.total(),
        "orders resolved lazily"
    );
    state.metrics.record_lookups("v1_simple_orders", &lookups);
    state.metrics.record_orders_returned("v1_simple_orders", orders.len());

    Ok(web::Json(orders))
}

/// v2: DTOs over lazily resolved member and delivery. Up to 2N extra lookups.
pub async fn simple_orders_v2(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> Result<web::Json<Vec<SimpleOrderDto>>, ApiError> {
    let query = OrderQuery::from_search(&OrderSearch::try_from(params.into_inner())?);
    let mut orders = state.store.find_all_by_search(&query).await?;
    let lookups = resolve_relations(state.store.as_ref(), &mut orders, Resolve::Header).await?;

    tracing::info!(
        endpoint = "v2_simple_orders",
        orders = orders.len(),
        lookups = lookups.total(),
        "orders resolved lazily"
    );
    state.metrics.record_lookups("v2_simple_orders", &lookups);
    state.metrics.record_orders_returned("v2_simple_orders", orders.len());

    Ok(web::Json(present(&orders)?))
}

/// v3: member and delivery fetched with the orders.
pub async fn simple_orders_v3(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> Result<web::Json<Vec<SimpleOrderDto>>, ApiError> {
    let query = OrderQuery::from_search(&OrderSearch::try_from(params.into_inner())?);
    let orders = state.store.find_all_with_member_delivery(&query).await?;

    tracing::info!(endpoint = "v3_simple_orders", orders = orders.len(), "orders fetched with member and delivery");
    state.metrics.record_orders_returned("v3_simple_orders", orders.len());

    Ok(web::Json(present(&orders)?))
}

/// v3.1: v3 with `offset`/`limit`.
pub async fn simple_orders_v3_1(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
    page: web::Query<PageParams>,
) -> Result<web::Json<Vec<SimpleOrderDto>>, ApiError> {
    let query = OrderQuery::from_search(&OrderSearch::try_from(params.into_inner())?)
        .paged(page.offset, page.limit);
    let orders = state.store.find_all_with_member_delivery(&query).await?;

    tracing::info!(
        endpoint = "v3_1_simple_orders",
        offset = query.window().offset,
        limit = query.window().limit,
        orders = orders.len(),
        "page fetched with member and delivery"
    );
    state.metrics.record_orders_returned("v3_1_simple_orders", orders.len());

    Ok(web::Json(present(&orders)?))
}
