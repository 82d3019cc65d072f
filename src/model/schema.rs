use std::fmt;
use std::str::FromStr;

use crate::error::ReviewgraphError;

/// The three entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Customer,
    Item,
    Review,
}

/// How a declared field is stored and navigated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain column.
    Scalar,
    /// Foreign key column referring to the given entity.
    ForeignKey(EntityKind),
    /// Many-to-one relationship.
    ToOne(EntityKind),
    /// One-to-many relationship.
    ToMany(EntityKind),
    /// Collection computed through a join entity (association proxy).
    Derived(EntityKind),
}

impl FieldKind {
    /// Entity reached by navigating this field, if it is navigable.
    pub fn target(self) -> Option<EntityKind> {
        match self {
            FieldKind::ToOne(k) | FieldKind::ToMany(k) | FieldKind::Derived(k) => Some(k),
            FieldKind::Scalar | FieldKind::ForeignKey(_) => None,
        }
    }

    /// Foreign keys and derived views only appear when a rule asks for them.
    pub fn serialized_by_default(self) -> bool {
        !matches!(self, FieldKind::ForeignKey(_) | FieldKind::Derived(_))
    }
}

/// A declared field on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef { name, kind }
}

const CUSTOMER_FIELDS: &[FieldDef] = &[
    field("id", FieldKind::Scalar),
    field("name", FieldKind::Scalar),
    field("reviews", FieldKind::ToMany(EntityKind::Review)),
    field("items", FieldKind::Derived(EntityKind::Item)),
];

const ITEM_FIELDS: &[FieldDef] = &[
    field("id", FieldKind::Scalar),
    field("name", FieldKind::Scalar),
    field("price", FieldKind::Scalar),
    field("reviews", FieldKind::ToMany(EntityKind::Review)),
];

const REVIEW_FIELDS: &[FieldDef] = &[
    field("id", FieldKind::Scalar),
    field("comment", FieldKind::Scalar),
    field("customer_id", FieldKind::ForeignKey(EntityKind::Customer)),
    field("item_id", FieldKind::ForeignKey(EntityKind::Item)),
    field("customer", FieldKind::ToOne(EntityKind::Customer)),
    field("item", FieldKind::ToOne(EntityKind::Item)),
];

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Customer, EntityKind::Item, EntityKind::Review];

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Customer => "Customer",
            EntityKind::Item => "Item",
            EntityKind::Review => "Review",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Customer => "customers",
            EntityKind::Item => "items",
            EntityKind::Review => "reviews",
        }
    }

    /// Declared fields in output order.
    pub fn fields(self) -> &'static [FieldDef] {
        match self {
            EntityKind::Customer => CUSTOMER_FIELDS,
            EntityKind::Item => ITEM_FIELDS,
            EntityKind::Review => REVIEW_FIELDS,
        }
    }

    pub fn field(self, name: &str) -> Option<&'static FieldDef> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Rules applied whenever a record of this type is serialized, scoped to
    /// the path at which the record was reached. They break the
    /// back-reference cycles of the two bidirectional relationships.
    pub fn serialize_rules(self) -> &'static [&'static str] {
        match self {
            EntityKind::Customer => &["-reviews.customer"],
            EntityKind::Item => &["-reviews.item"],
            EntityKind::Review => &["-customer.reviews", "-item.reviews"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = ReviewgraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" | "customers" => Ok(EntityKind::Customer),
            "item" | "items" => Ok(EntityKind::Item),
            "review" | "reviews" => Ok(EntityKind::Review),
            other => Err(ReviewgraphError::InvalidInput(format!(
                "Unknown entity type '{}' (expected customer, item or review)",
                other
            ))),
        }
    }
}
