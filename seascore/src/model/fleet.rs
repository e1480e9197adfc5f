use serde::{Deserialize, Serialize};

/// Name of the single fleet used when a series declares none.
pub const DEFAULT_FLEET_NAME: &str = "Default";

/// A group of competitors racing together in a column.
///
/// Ordered fleets (Gold before Silver) rank structurally: everybody in a
/// better fleet ranks ahead of everybody in a worse one. Unordered fleets
/// (qualification groups) are compared only through scores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fleet {
    name: String,
    /// Lower is better; `None` for fleets without a structural rank.
    ordering: Option<u32>,
}

impl Fleet {
    /// An unordered fleet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ordering: None,
        }
    }

    /// A fleet with a structural rank; lower ordering is better.
    pub fn ordered(name: impl Into<String>, ordering: u32) -> Self {
        Self {
            name: name.into(),
            ordering: Some(ordering),
        }
    }

    pub fn default_fleet() -> Self {
        Self::new(DEFAULT_FLEET_NAME)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ordering(&self) -> Option<u32> {
        self.ordering
    }

    pub fn is_ordered(&self) -> bool {
        self.ordering.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fleet_constructors() {
        assert!(!Fleet::new("Yellow").is_ordered());
        assert_eq!(Fleet::ordered("Gold", 1).ordering(), Some(1));
        assert_eq!(Fleet::default_fleet().name(), DEFAULT_FLEET_NAME);
    }
}
