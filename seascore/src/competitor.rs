//! Competitor identity.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A boat (or team) taking part in a regatta.
///
/// Identity is the `id`; the name is carried along for display only, so two
/// values with the same id but different names compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competitor {
    id: String,
    name: String,
}

impl Competitor {
    /// Create a competitor with a stable id and a display name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Create a competitor whose id doubles as its name (sail numbers, mostly).
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Competitor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Competitor {}

impl Hash for Competitor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Competitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
