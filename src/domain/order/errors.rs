// ============================================================================
// Order Domain Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    #[error("Unknown delivery status: {0}")]
    UnknownDeliveryStatus(String),

    #[error("Order must contain at least one item")]
    EmptyItems,

    #[error("Invalid item count: {0}")]
    InvalidCount(i32),
}
