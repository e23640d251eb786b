//! Resource categories
//!
//! Maps a fully-qualified Azure resource type onto one coarse category using
//! ordered, case-insensitive substring rules. The first rule that matches wins.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Compute,
    Networking,
    Storage,
    Security,
    Databases,
    Other,
}

/// Ordered matching rules. `Other` is the fallback and has no rule.
const RULES: &[(Category, &[&str])] = &[
    (Category::Compute, &["compute", "managedclusters"]),
    (Category::Networking, &["network", "publicip", "loadbalancer"]),
    (Category::Storage, &["storage", "disk"]),
    (Category::Security, &["security", "managedidentity"]),
    (Category::Databases, &["sql", "database"]),
];

impl Category {
    /// All categories, in snapshot key order
    pub const ALL: [Category; 6] = [
        Category::Compute,
        Category::Networking,
        Category::Storage,
        Category::Security,
        Category::Databases,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Compute => "compute",
            Category::Networking => "networking",
            Category::Storage => "storage",
            Category::Security => "security",
            Category::Databases => "databases",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Categorize a resource by its type string
pub fn categorize(resource_type: &str) -> Category {
    let lowered = resource_type.to_lowercase();

    RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| lowered.contains(n)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}
