//! Arena-style entity graph.
//!
//! Records are stored by integer id and relationships are resolved by
//! lookup at read time. Only `Review` holds references (its foreign keys);
//! `Customer.reviews`, `Item.reviews` and the derived `Customer.items` view
//! are computed from them, so both sides of a relationship always agree.

mod table;

use serde_json::Value;

use crate::error::{Result, ReviewgraphError};
use crate::model::{validate_price, Customer, Entity, EntityKind, Item, Review};
use table::Table;

/// A borrowed record of any entity type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Record<'a> {
    Customer(&'a Customer),
    Item(&'a Item),
    Review(&'a Review),
}

impl<'a> Record<'a> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Customer(_) => EntityKind::Customer,
            Record::Item(_) => EntityKind::Item,
            Record::Review(_) => EntityKind::Review,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Record::Customer(c) => c.id(),
            Record::Item(i) => i.id(),
            Record::Review(r) => r.id(),
        }
    }

    pub fn column(&self, name: &str) -> Option<Value> {
        match self {
            Record::Customer(c) => c.column(name),
            Record::Item(i) => i.column(name),
            Record::Review(r) => r.column(name),
        }
    }
}

impl<'a> From<&'a Customer> for Record<'a> {
    fn from(c: &'a Customer) -> Self {
        Record::Customer(c)
    }
}

impl<'a> From<&'a Item> for Record<'a> {
    fn from(i: &'a Item) -> Self {
        Record::Item(i)
    }
}

impl<'a> From<&'a Review> for Record<'a> {
    fn from(r: &'a Review) -> Self {
        Record::Review(r)
    }
}

/// Result of navigating a relationship field.
#[derive(Debug, Clone, PartialEq)]
pub enum Related<'a> {
    /// To-one; `None` when the foreign key is null.
    One(Option<Record<'a>>),
    /// To-many or derived collection, in insertion order.
    Many(Vec<Record<'a>>),
}

/// In-memory store of customers, items and reviews.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    customers: Table<Customer>,
    items: Table<Item>,
    reviews: Table<Review>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from already-persisted rows.
    ///
    /// Review references are not checked here; a dangling foreign key is
    /// reported when it is navigated.
    pub fn from_rows(
        customers: impl IntoIterator<Item = Customer>,
        items: impl IntoIterator<Item = Item>,
        reviews: impl IntoIterator<Item = Review>,
    ) -> Result<Self> {
        let mut graph = Self::new();
        for c in customers {
            graph.customers.insert(c)?;
        }
        for i in items {
            graph.insert_item(i)?;
        }
        for r in reviews {
            graph.reviews.insert(r)?;
        }
        Ok(graph)
    }

    // ---- construction ----

    pub fn insert_customer(&mut self, customer: Customer) -> Result<()> {
        self.customers.insert(customer)
    }

    pub fn insert_item(&mut self, item: Item) -> Result<()> {
        validate_price(item.price)?;
        self.items.insert(item)
    }

    pub fn insert_review(&mut self, review: Review) -> Result<()> {
        self.check_refs(review.customer_id, review.item_id)?;
        self.reviews.insert(review)
    }

    pub fn new_customer(&mut self, name: impl Into<String>) -> Result<i64> {
        let id = self.customers.next_id()?;
        self.customers.insert(Customer { id, name: name.into() })?;
        Ok(id)
    }

    pub fn new_item(&mut self, name: impl Into<String>, price: f64) -> Result<i64> {
        validate_price(price)?;
        let id = self.items.next_id()?;
        self.items.insert(Item { id, name: name.into(), price })?;
        Ok(id)
    }

    pub fn new_review(
        &mut self,
        comment: Option<String>,
        customer_id: Option<i64>,
        item_id: Option<i64>,
    ) -> Result<i64> {
        let id = self.reviews.next_id()?;
        self.insert_review(Review { id, comment, customer_id, item_id })?;
        Ok(id)
    }

    // ---- lookup ----

    pub fn customer(&self, id: i64) -> Result<&Customer> {
        self.customers.get(id)
    }

    pub fn item(&self, id: i64) -> Result<&Item> {
        self.items.get(id)
    }

    pub fn review(&self, id: i64) -> Result<&Review> {
        self.reviews.get(id)
    }

    pub fn record(&self, kind: EntityKind, id: i64) -> Result<Record<'_>> {
        Ok(match kind {
            EntityKind::Customer => Record::Customer(self.customer(id)?),
            EntityKind::Item => Record::Item(self.item(id)?),
            EntityKind::Review => Record::Review(self.review(id)?),
        })
    }

    pub fn customers(&self) -> impl Iterator<Item = &Customer> + '_ {
        self.customers.iter()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.items.iter()
    }

    pub fn reviews(&self) -> impl Iterator<Item = &Review> + '_ {
        self.reviews.iter()
    }

    /// All records of one type, in insertion order.
    pub fn records(&self, kind: EntityKind) -> Vec<Record<'_>> {
        match kind {
            EntityKind::Customer => self.customers().map(Record::from).collect(),
            EntityKind::Item => self.items().map(Record::from).collect(),
            EntityKind::Review => self.reviews().map(Record::from).collect(),
        }
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Customer => self.customers.len(),
            EntityKind::Item => self.items.len(),
            EntityKind::Review => self.reviews.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        EntityKind::ALL.iter().all(|&k| self.len(k) == 0)
    }

    // ---- relationships ----

    /// `Customer.reviews`
    pub fn customer_reviews(&self, customer_id: i64) -> Result<Vec<&Review>> {
        self.customers.get(customer_id)?;
        Ok(self
            .reviews
            .iter()
            .filter(|r| r.customer_id == Some(customer_id))
            .collect())
    }

    /// `Item.reviews`
    pub fn item_reviews(&self, item_id: i64) -> Result<Vec<&Review>> {
        self.items.get(item_id)?;
        Ok(self
            .reviews
            .iter()
            .filter(|r| r.item_id == Some(item_id))
            .collect())
    }

    /// `Review.customer`
    pub fn review_customer(&self, review: &Review) -> Result<Option<&Customer>> {
        match review.customer_id {
            None => Ok(None),
            Some(id) => self.customers.get(id).map(Some).map_err(|_| {
                ReviewgraphError::Integrity(format!(
                    "Review {} refers to missing Customer {}",
                    review.id, id
                ))
            }),
        }
    }

    /// `Review.item`
    pub fn review_item(&self, review: &Review) -> Result<Option<&Item>> {
        match review.item_id {
            None => Ok(None),
            Some(id) => self.items.get(id).map(Some).map_err(|_| {
                ReviewgraphError::Integrity(format!(
                    "Review {} refers to missing Item {}",
                    review.id, id
                ))
            }),
        }
    }

    /// Derived `Customer.items`: the item of each of the customer's reviews,
    /// in review order, duplicates kept. Reviews without an item are skipped.
    pub fn customer_items(&self, customer_id: i64) -> Result<Vec<&Item>> {
        let mut items = Vec::new();
        for review in self.customer_reviews(customer_id)? {
            if let Some(item) = self.review_item(review)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Append to the derived `Customer.items` view: creates one review linking
    /// the customer to the item, with no comment. Returns the new review id.
    pub fn append_customer_item(&mut self, customer_id: i64, item_id: i64) -> Result<i64> {
        self.customers.get(customer_id)?;
        self.items.get(item_id)?;
        let id = self.new_review(None, Some(customer_id), Some(item_id))?;
        log::debug!("Customer {} gained item {} via review {}", customer_id, item_id, id);
        Ok(id)
    }

    /// Navigate a relationship or derived field of `record`.
    pub fn related<'a>(&'a self, record: Record<'a>, field: &str) -> Result<Related<'a>> {
        match (record, field) {
            (Record::Customer(c), "reviews") => Ok(Related::Many(
                self.customer_reviews(c.id)?.into_iter().map(Record::from).collect(),
            )),
            (Record::Customer(c), "items") => Ok(Related::Many(
                self.customer_items(c.id)?.into_iter().map(Record::from).collect(),
            )),
            (Record::Item(i), "reviews") => Ok(Related::Many(
                self.item_reviews(i.id)?.into_iter().map(Record::from).collect(),
            )),
            (Record::Review(r), "customer") => {
                Ok(Related::One(self.review_customer(r)?.map(Record::from)))
            }
            (Record::Review(r), "item") => Ok(Related::One(self.review_item(r)?.map(Record::from))),
            (record, field) => Err(ReviewgraphError::InvalidInput(format!(
                "{} has no relationship '{}'",
                record.kind(),
                field
            ))),
        }
    }

    // ---- mutation ----

    /// Re-point `Review.customer`; the old and new `Customer.reviews` follow.
    pub fn set_review_customer(&mut self, review_id: i64, customer_id: Option<i64>) -> Result<()> {
        self.check_refs(customer_id, None)?;
        self.reviews.get_mut(review_id)?.customer_id = customer_id;
        Ok(())
    }

    /// Re-point `Review.item`; the old and new `Item.reviews` follow.
    pub fn set_review_item(&mut self, review_id: i64, item_id: Option<i64>) -> Result<()> {
        self.check_refs(None, item_id)?;
        self.reviews.get_mut(review_id)?.item_id = item_id;
        Ok(())
    }

    pub fn set_review_comment(&mut self, review_id: i64, comment: Option<String>) -> Result<()> {
        self.reviews.get_mut(review_id)?.comment = comment;
        Ok(())
    }

    pub fn rename_customer(&mut self, customer_id: i64, name: impl Into<String>) -> Result<()> {
        self.customers.get_mut(customer_id)?.name = name.into();
        Ok(())
    }

    pub fn update_item(&mut self, item_id: i64, name: impl Into<String>, price: f64) -> Result<()> {
        validate_price(price)?;
        let item = self.items.get_mut(item_id)?;
        item.name = name.into();
        item.price = price;
        Ok(())
    }

    /// Fails while any review still refers to the customer.
    pub fn remove_customer(&mut self, customer_id: i64) -> Result<Customer> {
        let referencing = self.customer_reviews(customer_id)?.len();
        if referencing > 0 {
            return Err(ReviewgraphError::Integrity(format!(
                "Customer {} is still referenced by {} review(s)",
                customer_id, referencing
            )));
        }
        self.customers.remove(customer_id)
    }

    /// Fails while any review still refers to the item.
    pub fn remove_item(&mut self, item_id: i64) -> Result<Item> {
        let referencing = self.item_reviews(item_id)?.len();
        if referencing > 0 {
            return Err(ReviewgraphError::Integrity(format!(
                "Item {} is still referenced by {} review(s)",
                item_id, referencing
            )));
        }
        self.items.remove(item_id)
    }

    pub fn remove_review(&mut self, review_id: i64) -> Result<Review> {
        self.reviews.remove(review_id)
    }

    /// Debug representation, e.g. `<Review 1, Nice, Ana, Mug>`.
    pub fn describe(&self, kind: EntityKind, id: i64) -> Result<String> {
        match kind {
            EntityKind::Customer => Ok(self.customer(id)?.to_string()),
            EntityKind::Item => Ok(self.item(id)?.to_string()),
            EntityKind::Review => {
                let review = self.review(id)?;
                let customer = self.review_customer(review)?.map(|c| c.name.as_str());
                let item = self.review_item(review)?.map(|i| i.name.as_str());
                Ok(format!(
                    "<Review {}, {}, {}, {}>",
                    review.id,
                    review.comment.as_deref().unwrap_or("-"),
                    customer.unwrap_or("-"),
                    item.unwrap_or("-"),
                ))
            }
        }
    }

    fn check_refs(&self, customer_id: Option<i64>, item_id: Option<i64>) -> Result<()> {
        if let Some(id) = customer_id {
            if !self.customers.contains(id) {
                return Err(ReviewgraphError::Integrity(format!(
                    "Customer {} does not exist",
                    id
                )));
            }
        }
        if let Some(id) = item_id {
            if !self.items.contains(id) {
                return Err(ReviewgraphError::Integrity(format!("Item {} does not exist", id)));
            }
        }
        Ok(())
    }
}
