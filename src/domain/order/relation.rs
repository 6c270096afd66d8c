use serde::{Serialize, Serializer};

// ============================================================================
// Relation - explicitly loaded association
// ============================================================================
//
// A relation is either just a foreign key (`Unloaded`) or the resolved value
// (`Loaded`). Nothing resolves on access: callers go through a
// `LookupSession` or pick a retrieval mode that loads what they need.
//
// An unloaded relation serializes as `null`.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Relation<T> {
    Unloaded { key: i64 },
    Loaded(T),
}

impl<T> Relation<T> {
    pub fn unloaded(key: i64) -> Self {
        Relation::Unloaded { key }
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Relation::Loaded(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Relation::Loaded(value) => Some(value),
            Relation::Unloaded { .. } => None,
        }
    }

    /// Foreign key of an unloaded relation.
    pub fn key(&self) -> Option<i64> {
        match self {
            Relation::Unloaded { key } => Some(*key),
            Relation::Loaded(_) => None,
        }
    }
}

impl<T: Serialize> Serialize for Relation<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Relation::Loaded(value) => value.serialize(serializer),
            Relation::Unloaded { .. } => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unloaded_relation_exposes_key_only() {
        let relation: Relation<String> = Relation::unloaded(7);
        assert!(!relation.is_loaded());
        assert_eq!(relation.key(), Some(7));
        assert_eq!(relation.get(), None);
    }

    #[test]
    fn test_loaded_relation_exposes_value() {
        let relation = Relation::Loaded("kim".to_string());
        assert!(relation.is_loaded());
        assert_eq!(relation.key(), None);
        assert_eq!(relation.get().map(String::as_str), Some("kim"));
    }

    #[test]
    fn test_unloaded_relation_serializes_as_null() {
        let relation: Relation<Vec<i32>> = Relation::unloaded(1);
        assert_eq!(serde_json::to_value(&relation).unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn test_loaded_relation_serializes_transparently() {
        let relation = Relation::Loaded(vec![1, 2]);
        assert_eq!(serde_json::to_value(&relation).unwrap(), serde_json::json!([1, 2]));
    }
}
