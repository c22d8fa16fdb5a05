use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::CoreError;

/// Catalog identifier. Numeric server ids are carried as strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(Self)
    }
}

/// Accepts `"42"` and `42` alike; the backend issues integer ids while
/// locally created records use strings.
pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Signed(n) => n.to_string(),
        Raw::Unsigned(n) => n.to_string(),
    })
}

impl ProductId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Shampoo,
    Conditioner,
    Treatment,
    Styling,
    Color,
    Skincare,
    Tools,
    Accessories,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Shampoo,
        Category::Conditioner,
        Category::Treatment,
        Category::Styling,
        Category::Color,
        Category::Skincare,
        Category::Tools,
        Category::Accessories,
        Category::Other,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Shampoo => "shampoo",
            Category::Conditioner => "conditioner",
            Category::Treatment => "treatment",
            Category::Styling => "styling",
            Category::Color => "color",
            Category::Skincare => "skincare",
            Category::Tools => "tools",
            Category::Accessories => "accessories",
            Category::Other => "other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "category",
                value: s.to_owned(),
            })
    }
}

/// A sellable item as published by the catalog service.
///
/// The storefront accepts both the backend's snake_case names and the
/// camelCase names the browser client used for the merchandising flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Nonnegative, currency-implicit (yen in the live catalog).
    pub price: Decimal,
    pub category: Category,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub fragrance: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "stock_quantity")]
    pub stock: u32,
    /// Average review score, 0.0 to 5.0.
    #[serde(default)]
    pub rating: f32,
    #[serde(default = "default_true", alias = "isActive")]
    pub is_active: bool,
    #[serde(default, alias = "isNew")]
    pub is_new: bool,
    #[serde(default, alias = "isPopular")]
    pub is_popular: bool,
    #[serde(default, alias = "isLimited")]
    pub is_limited: bool,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// Freezes the fields a trial request carries.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            category: Some(self.category),
        }
    }

    /// Case-insensitive match over name, description and tags.
    #[must_use]
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

/// Product fields copied into a trial request at submission time.
///
/// Later catalog edits never reach an existing snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub category: Option<Category>,
}
