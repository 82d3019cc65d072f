use rusqlite::{params, OptionalExtension};

use super::{
    customer_from_row, ensure_exists, expect_changed, query_all, review_from_row,
    CUSTOMER_COLUMNS, REVIEW_COLUMNS,
};
use crate::db::Db;
use crate::error::{Result, ReviewgraphError};
use crate::model::{Customer, EntityKind, Item, Review};

pub async fn insert_customer(db: &Db, name: &str) -> Result<Customer> {
    let name = name.to_string();
    let customer = db
        .with_connection(move |conn| {
            conn.execute("INSERT INTO customers (name) VALUES (?1)", params![name])
                .map_err(ReviewgraphError::from_sqlite)?;
            Ok(Customer { id: conn.last_insert_rowid(), name })
        })
        .await?;
    log::debug!("Inserted {}", customer);
    Ok(customer)
}

pub async fn get_customer(db: &Db, id: i64) -> Result<Customer> {
    db.with_connection(move |conn| {
        conn.query_row(
            &format!("SELECT {} FROM customers WHERE id = ?1", CUSTOMER_COLUMNS),
            [id],
            customer_from_row,
        )
        .optional()?
        .ok_or(ReviewgraphError::NotFound { entity: EntityKind::Customer.name(), id })
    })
    .await
}

pub async fn list_customers(db: &Db) -> Result<Vec<Customer>> {
    db.with_connection(|conn| {
        query_all(
            conn,
            &format!("SELECT {} FROM customers ORDER BY id", CUSTOMER_COLUMNS),
            [],
            customer_from_row,
        )
    })
    .await
}

pub async fn update_customer(db: &Db, customer: &Customer) -> Result<()> {
    let customer = customer.clone();
    db.with_connection(move |conn| {
        let changed = conn
            .execute(
                "UPDATE customers SET name = ?1 WHERE id = ?2",
                params![customer.name, customer.id],
            )
            .map_err(ReviewgraphError::from_sqlite)?;
        expect_changed(changed, EntityKind::Customer, customer.id)
    })
    .await
}

/// Fails with an integrity error while reviews still refer to the customer.
pub async fn delete_customer(db: &Db, id: i64) -> Result<()> {
    db.with_connection(move |conn| {
        let changed = conn
            .execute("DELETE FROM customers WHERE id = ?1", [id])
            .map_err(ReviewgraphError::from_sqlite)?;
        expect_changed(changed, EntityKind::Customer, id)
    })
    .await
}

/// `Customer.reviews`, in insertion order.
pub async fn customer_reviews(db: &Db, customer_id: i64) -> Result<Vec<Review>> {
    db.with_connection(move |conn| {
        ensure_exists(conn, EntityKind::Customer, customer_id)?;
        query_all(
            conn,
            &format!(
                "SELECT {} FROM reviews WHERE customer_id = ?1 ORDER BY id",
                REVIEW_COLUMNS
            ),
            [customer_id],
            review_from_row,
        )
    })
    .await
}

/// Derived `Customer.items`: one entry per review that has an item,
/// duplicates kept, in review order. A review whose item row is gone
/// (written with foreign keys off) is an integrity error, not a gap.
pub async fn customer_items(db: &Db, customer_id: i64) -> Result<Vec<Item>> {
    db.with_connection(move |conn| {
        ensure_exists(conn, EntityKind::Customer, customer_id)?;
        let mut stmt = conn.prepare(
            "SELECT reviews.id, reviews.item_id, items.id, items.name, items.price \
             FROM reviews LEFT JOIN items ON items.id = reviews.item_id \
             WHERE reviews.customer_id = ?1 \
             ORDER BY reviews.id",
        )?;
        let mut rows = stmt.query([customer_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let review_id: i64 = row.get(0)?;
            let item_id: Option<i64> = row.get(1)?;
            let found: Option<i64> = row.get(2)?;
            match (item_id, found) {
                (None, _) => continue,
                (Some(_), Some(id)) => items.push(Item {
                    id,
                    name: row.get(3)?,
                    price: row.get(4)?,
                }),
                (Some(missing), None) => {
                    return Err(ReviewgraphError::Integrity(format!(
                        "Review {} refers to missing Item {}",
                        review_id, missing
                    )))
                }
            }
        }
        Ok(items)
    })
    .await
}

/// Append an item to the customer's derived `items` view by creating a
/// review with no comment.
pub async fn append_customer_item(db: &Db, customer_id: i64, item_id: i64) -> Result<Review> {
    let review = db
        .with_connection(move |conn| {
            ensure_exists(conn, EntityKind::Customer, customer_id)?;
            ensure_exists(conn, EntityKind::Item, item_id)?;
            conn.execute(
                "INSERT INTO reviews (comment, customer_id, item_id) VALUES (NULL, ?1, ?2)",
                params![customer_id, item_id],
            )
            .map_err(ReviewgraphError::from_sqlite)?;
            Ok(Review {
                id: conn.last_insert_rowid(),
                comment: None,
                customer_id: Some(customer_id),
                item_id: Some(item_id),
            })
        })
        .await?;
    log::debug!(
        "Customer {} gained item {} via review {}",
        customer_id,
        item_id,
        review.id
    );
    Ok(review)
}
