//! Entity records and the static schema describing their fields.
//!
//! `Review` is the join entity between `Customer` and `Item`; it only stores
//! foreign keys, the collection side of each relationship is computed by
//! lookup (see [`crate::graph::EntityGraph`]).

mod schema;

pub use schema::{EntityKind, FieldDef, FieldKind};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{Result, ReviewgraphError};

/// Common surface of the three record types.
pub trait Entity {
    const KIND: EntityKind;

    fn id(&self) -> i64;

    /// Value of a column (scalar or foreign key), `None` if `name` is not a column.
    fn column(&self, name: &str) -> Option<Value>;
}

/// A customer who writes reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
}

/// A reviewable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

/// A review joining one customer to one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub item_id: Option<i64>,
}

/// Prices are stored as SQLite REAL and emitted as JSON numbers, so NaN and
/// the infinities are refused wherever an item is created or updated.
pub fn validate_price(price: f64) -> Result<()> {
    if price.is_finite() {
        Ok(())
    } else {
        Err(ReviewgraphError::InvalidInput(format!(
            "Item price must be a finite number, got {}",
            price
        )))
    }
}

impl Entity for Customer {
    const KIND: EntityKind = EntityKind::Customer;

    fn id(&self) -> i64 {
        self.id
    }

    fn column(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.clone().into()),
            _ => None,
        }
    }
}

impl Entity for Item {
    const KIND: EntityKind = EntityKind::Item;

    fn id(&self) -> i64 {
        self.id
    }

    fn column(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.clone().into()),
            "price" => Some(self.price.into()),
            _ => None,
        }
    }
}

impl Entity for Review {
    const KIND: EntityKind = EntityKind::Review;

    fn id(&self) -> i64 {
        self.id
    }

    fn column(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.into()),
            "comment" => Some(self.comment.clone().into()),
            "customer_id" => Some(self.customer_id.into()),
            "item_id" => Some(self.item_id.into()),
            _ => None,
        }
    }
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Customer {}, {}>", self.id, self.name)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Item {}, {}, {}>", self.id, self.name, self.price)
    }
}
