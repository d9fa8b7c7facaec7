//! Fixed category enumeration for posts and subscriptions

use bson::Bson;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::BoardError;

/// Post category
///
/// Stored and transmitted by display name, e.g. `"Health and Wellness"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Academic Resources")]
    AcademicResources,
    #[serde(rename = "Career Services")]
    CareerServices,
    Campus,
    Culture,
    #[serde(rename = "Local Community Resources")]
    LocalCommunityResources,
    Social,
    Sports,
    #[serde(rename = "Health and Wellness")]
    HealthAndWellness,
    Technology,
    Travel,
    Alumni,
}

impl Category {
    /// Every category, in navigation order
    pub const ALL: [Category; 11] = [
        Category::AcademicResources,
        Category::CareerServices,
        Category::Campus,
        Category::Culture,
        Category::LocalCommunityResources,
        Category::Social,
        Category::Sports,
        Category::HealthAndWellness,
        Category::Technology,
        Category::Travel,
        Category::Alumni,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AcademicResources => "Academic Resources",
            Category::CareerServices => "Career Services",
            Category::Campus => "Campus",
            Category::Culture => "Culture",
            Category::LocalCommunityResources => "Local Community Resources",
            Category::Social => "Social",
            Category::Sports => "Sports",
            Category::HealthAndWellness => "Health and Wellness",
            Category::Technology => "Technology",
            Category::Travel => "Travel",
            Category::Alumni => "Alumni",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| BoardError::BadRequest(format!("Unknown category: {s}")))
    }
}

impl From<Category> for Bson {
    fn from(category: Category) -> Self {
        Bson::String(category.as_str().to_string())
    }
}
