// ============================================================================
// Domain Layer
// ============================================================================
//
// Entities read by the query paths. Storage and presentation live in
// `repository` and `api`; nothing here touches the database or HTTP.
//
// ============================================================================

pub mod order;
