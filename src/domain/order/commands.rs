use super::errors::OrderError;
use super::value_objects::Address;

// ============================================================================
// Order Placement Inputs
// ============================================================================
//
// Only used to seed the store; the query paths never write.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub price: i32,
    pub stock_quantity: i32,
}

#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub item_id: i64,
    pub count: i32,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub member_id: i64,
    pub address: Address,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.lines.is_empty() {
            return Err(OrderError::EmptyItems);
        }

        for line in &self.lines {
            if line.count <= 0 {
                return Err(OrderError::InvalidCount(line.count));
            }
        }

        Ok(())
    }
}
