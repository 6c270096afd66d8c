// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (OrderStatus, DeliveryStatus, Address)
// - Relation (explicitly loaded association)
// - Aggregate (Order, OrderItem) and referenced entities (Member, Delivery, Item)
// - Placement inputs used for seeding (NewOrder, NewItem)
// - Errors (OrderError)
//
// ============================================================================

pub mod value_objects;
pub mod relation;
pub mod aggregate;
pub mod commands;
pub mod errors;

pub use value_objects::*;
pub use relation::*;
pub use aggregate::*;
pub use commands::*;
pub use errors::*;
