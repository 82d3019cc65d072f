//! SQLite persistence for customers, items and reviews.
//!
//! Every call opens its own connection on a blocking task via
//! [`Db::with_connection`]. Foreign key violations surface as
//! [`ReviewgraphError::Integrity`], missing rows as
//! [`ReviewgraphError::NotFound`].

mod customers;
mod items;
mod reviews;

pub use customers::{
    append_customer_item, customer_items, customer_reviews, delete_customer, get_customer,
    insert_customer, list_customers, update_customer,
};
pub use items::{delete_item, get_item, insert_item, item_reviews, list_items, update_item};
pub use reviews::{delete_review, get_review, insert_review, list_reviews, update_review};

use rusqlite::{Connection, Row};

use crate::db::Db;
use crate::error::{Result, ReviewgraphError};
use crate::graph::EntityGraph;
use crate::model::{Customer, EntityKind, Item, Review};

const CUSTOMER_COLUMNS: &str = "id, name";
const ITEM_COLUMNS: &str = "id, name, price";
const REVIEW_COLUMNS: &str = "id, comment, customer_id, item_id";

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
    })
}

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        comment: row.get(1)?,
        customer_id: row.get(2)?,
        item_id: row.get(3)?,
    })
}

/// Run `sql` and map every row, preserving query order.
fn query_all<T, P>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>>
where
    P: rusqlite::Params,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Fail with NotFound unless `kind`/`id` has a row.
fn ensure_exists(conn: &Connection, kind: EntityKind, id: i64) -> Result<()> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?1", kind.table());
    let exists = conn.prepare(&sql)?.exists([id])?;
    if exists {
        Ok(())
    } else {
        Err(ReviewgraphError::NotFound { entity: kind.name(), id })
    }
}

/// Map "no row changed" to NotFound.
fn expect_changed(changed: usize, kind: EntityKind, id: i64) -> Result<()> {
    if changed == 0 {
        Err(ReviewgraphError::NotFound { entity: kind.name(), id })
    } else {
        Ok(())
    }
}

/// Load every row into an [`EntityGraph`], each table ordered by id.
pub async fn load_graph(db: &Db) -> Result<EntityGraph> {
    let (customers, items, reviews) = db
        .with_connection(|conn| {
            let customers = query_all(
                conn,
                &format!("SELECT {} FROM customers ORDER BY id", CUSTOMER_COLUMNS),
                [],
                customer_from_row,
            )?;
            let items = query_all(
                conn,
                &format!("SELECT {} FROM items ORDER BY id", ITEM_COLUMNS),
                [],
                item_from_row,
            )?;
            let reviews = query_all(
                conn,
                &format!("SELECT {} FROM reviews ORDER BY id", REVIEW_COLUMNS),
                [],
                review_from_row,
            )?;
            Ok((customers, items, reviews))
        })
        .await?;

    log::debug!(
        "Loaded graph: {} customers, {} items, {} reviews",
        customers.len(),
        items.len(),
        reviews.len()
    );
    EntityGraph::from_rows(customers, items, reviews)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::db::migrate;
    use tempfile::TempDir;

    /// Fresh migrated database in a temp dir; keep the TempDir alive.
    pub async fn migrated_db() -> (Db, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("test.db"));
        db.with_connection(migrate::run_migrations)
            .await
            .unwrap();
        (db, temp_dir)
    }
}
