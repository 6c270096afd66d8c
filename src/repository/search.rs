use sqlx::{Postgres, QueryBuilder};

use crate::domain::order::{Member, Order, OrderStatus};

// ============================================================================
// Order Search - typed predicate builder
// ============================================================================
//
// Filters are collected as typed predicates and conjoined with AND. A filter
// that was not provided is simply absent from the list; it never shows up as
// a `true` or `%` clause. Every query is capped at `MAX_RESULTS` rows.
//
// ============================================================================

pub const MAX_RESULTS: i64 = 1000;

/// Caller-supplied filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderSearch {
    pub member_name: Option<String>,
    pub order_status: Option<OrderStatus>,
}

impl OrderSearch {
    /// Member name filter, if it contains any non-whitespace text.
    pub fn member_name_filter(&self) -> Option<&str> {
        self.member_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderPredicate {
    StatusEq(OrderStatus),
    MemberNameLike(String),
}

impl OrderPredicate {
    fn same_kind(&self, other: &OrderPredicate) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    fn jpql(&self) -> &'static str {
        match self {
            OrderPredicate::StatusEq(_) => "o.status = :status",
            OrderPredicate::MemberNameLike(_) => "m.name like :name",
        }
    }

    fn push_sql(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self {
            OrderPredicate::StatusEq(status) => {
                builder.push("o.status = ").push_bind(status.as_str());
            }
            OrderPredicate::MemberNameLike(name) => {
                builder
                    .push("m.name LIKE ")
                    .push_bind(format!("%{}%", escape_like(name)));
            }
        }
    }

    fn matches(&self, order: &Order, member: &Member) -> bool {
        match self {
            OrderPredicate::StatusEq(status) => order.status == *status,
            OrderPredicate::MemberNameLike(name) => member.name.contains(name.as_str()),
        }
    }
}

/// Offset/limit window applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: i64,
    pub limit: i64,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: MAX_RESULTS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderQuery {
    predicates: Vec<OrderPredicate>,
    window: Window,
}

impl OrderQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_search(search: &OrderSearch) -> Self {
        let mut query = Self::new();

        if let Some(status) = search.order_status {
            query = query.and(OrderPredicate::StatusEq(status));
        }
        if let Some(name) = search.member_name_filter() {
            query = query.and(OrderPredicate::MemberNameLike(name.to_string()));
        }

        query
    }

    /// Add a predicate. One of the same kind already present is replaced.
    pub fn and(mut self, predicate: OrderPredicate) -> Self {
        match self.predicates.iter_mut().find(|p| p.same_kind(&predicate)) {
            Some(existing) => *existing = predicate,
            None => self.predicates.push(predicate),
        }
        self
    }

    /// Restrict to a page. `limit` is clamped to `1..=MAX_RESULTS`.
    pub fn paged(mut self, offset: i64, limit: i64) -> Self {
        self.window = Window {
            offset: offset.max(0),
            limit: limit.clamp(1, MAX_RESULTS),
        };
        self
    }

    #[cfg(test)]
    pub fn predicates(&self) -> &[OrderPredicate] {
        &self.predicates
    }

    pub fn window(&self) -> Window {
        self.window
    }

    /// Canonical JPQL-style rendering, used for logging.
    pub fn to_jpql(&self) -> String {
        let mut jpql = String::from("select o from Order o join o.member m");
        for (i, predicate) in self.predicates.iter().enumerate() {
            jpql.push_str(if i == 0 { " where " } else { " and " });
            jpql.push_str(predicate.jpql());
        }
        jpql
    }

    /// Append ` WHERE ...` for the predicates. Expects `o` and `m` aliases.
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        for (i, predicate) in self.predicates.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            predicate.push_sql(builder);
        }
    }

    /// Append ` LIMIT .. OFFSET ..` for the window.
    pub fn push_window(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder
            .push(" LIMIT ")
            .push_bind(self.window.limit)
            .push(" OFFSET ")
            .push_bind(self.window.offset);
    }

    pub fn matches(&self, order: &Order, member: &Member) -> bool {
        self.predicates.iter().all(|p| p.matches(order, member))
    }

    /// Apply the window to an already filtered, ordered sequence.
    pub fn apply_window<T>(&self, rows: impl IntoIterator<Item = T>) -> Vec<T> {
        // Both bounds are non-negative after `paged`/`default`.
        rows.into_iter()
            .skip(self.window.offset as usize)
            .take(self.window.limit as usize)
            .collect()
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::Relation;
    use chrono::NaiveDate;

    fn search(status: Option<OrderStatus>, name: Option<&str>) -> OrderSearch {
        OrderSearch {
            member_name: name.map(str::to_string),
            order_status: status,
        }
    }

    fn order(status: OrderStatus) -> Order {
        Order {
            id: 1,
            member: Relation::unloaded(1),
            order_items: Relation::unloaded(1),
            delivery: Relation::unloaded(1),
            order_date: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            status,
        }
    }

    fn member(name: &str) -> Member {
        Member {
            id: 1,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_no_filters_yields_no_conditions_and_cap() {
        let query = OrderQuery::from_search(&OrderSearch::default());

        assert!(query.predicates().is_empty());
        assert_eq!(query.window().limit, MAX_RESULTS);
        assert_eq!(query.window().offset, 0);
        assert_eq!(query.to_jpql(), "select o from Order o join o.member m");
    }

    #[test]
    fn test_status_with_empty_name_yields_single_condition() {
        let query = OrderQuery::from_search(&search(Some(OrderStatus::Ordered), Some("")));

        assert_eq!(query.predicates(), &[OrderPredicate::StatusEq(OrderStatus::Ordered)]);
        assert_eq!(
            query.to_jpql(),
            "select o from Order o join o.member m where o.status = :status"
        );
    }

    #[test]
    fn test_whitespace_name_is_treated_as_absent() {
        let query = OrderQuery::from_search(&search(None, Some("   ")));
        assert!(query.predicates().is_empty());
    }

    #[test]
    fn test_name_only_yields_like_condition() {
        let query = OrderQuery::from_search(&search(None, Some("kim")));

        assert_eq!(query.predicates(), &[OrderPredicate::MemberNameLike("kim".into())]);
        assert_eq!(
            query.to_jpql(),
            "select o from Order o join o.member m where m.name like :name"
        );
    }

    #[test]
    fn test_both_filters_are_conjoined() {
        let query = OrderQuery::from_search(&search(Some(OrderStatus::Canceled), Some("lee")));

        assert_eq!(query.predicates().len(), 2);
        assert_eq!(
            query.to_jpql(),
            "select o from Order o join o.member m where o.status = :status and m.name like :name"
        );
        assert_eq!(query.window().limit, MAX_RESULTS);
    }

    #[test]
    fn test_predicate_set_independent_of_insertion_order() {
        let status = OrderPredicate::StatusEq(OrderStatus::Ordered);
        let name = OrderPredicate::MemberNameLike("kim".into());

        let a = OrderQuery::new().and(status.clone()).and(name.clone());
        let b = OrderQuery::new().and(name.clone()).and(status.clone());

        assert_eq!(a.predicates().len(), b.predicates().len());
        for predicate in a.predicates() {
            assert!(b.predicates().contains(predicate));
        }
    }

    #[test]
    fn test_same_kind_predicate_replaces_previous() {
        let query = OrderQuery::new()
            .and(OrderPredicate::StatusEq(OrderStatus::Ordered))
            .and(OrderPredicate::StatusEq(OrderStatus::Canceled));

        assert_eq!(query.predicates(), &[OrderPredicate::StatusEq(OrderStatus::Canceled)]);
    }

    #[test]
    fn test_paged_clamps_window() {
        let query = OrderQuery::new().paged(-5, 50_000);
        assert_eq!(query.window(), Window { offset: 0, limit: MAX_RESULTS });

        let query = OrderQuery::new().paged(3, 0);
        assert_eq!(query.window(), Window { offset: 3, limit: 1 });
    }

    #[test]
    fn test_apply_window() {
        let query = OrderQuery::new().paged(1, 2);
        assert_eq!(query.apply_window(vec![1, 2, 3, 4]), vec![2, 3]);
    }

    #[test]
    fn test_matches_evaluates_all_predicates() {
        let query = OrderQuery::from_search(&search(Some(OrderStatus::Ordered), Some("im")));

        assert!(query.matches(&order(OrderStatus::Ordered), &member("kim")));
        assert!(!query.matches(&order(OrderStatus::Canceled), &member("kim")));
        assert!(!query.matches(&order(OrderStatus::Ordered), &member("lee")));
    }

    #[test]
    fn test_sql_rendering_binds_parameters() {
        let query = OrderQuery::from_search(&search(Some(OrderStatus::Ordered), Some("kim")));
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT o.order_id FROM orders o JOIN member m ON m.member_id = o.member_id",
        );
        query.push_where(&mut builder);
        query.push_window(&mut builder);

        assert_eq!(
            builder.sql(),
            "SELECT o.order_id FROM orders o JOIN member m ON m.member_id = o.member_id \
             WHERE o.status = $1 AND m.name LIKE $2 LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("kim"), "kim");
    }
}
