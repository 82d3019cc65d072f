use rusqlite::{params, OptionalExtension};

use super::{
    ensure_exists, expect_changed, item_from_row, query_all, review_from_row, ITEM_COLUMNS,
    REVIEW_COLUMNS,
};
use crate::db::Db;
use crate::error::{Result, ReviewgraphError};
use crate::model::{validate_price, EntityKind, Item, Review};

pub async fn insert_item(db: &Db, name: &str, price: f64) -> Result<Item> {
    validate_price(price)?;
    let name = name.to_string();
    let item = db
        .with_connection(move |conn| {
            conn.execute(
                "INSERT INTO items (name, price) VALUES (?1, ?2)",
                params![name, price],
            )
            .map_err(ReviewgraphError::from_sqlite)?;
            Ok(Item { id: conn.last_insert_rowid(), name, price })
        })
        .await?;
    log::debug!("Inserted {}", item);
    Ok(item)
}

pub async fn get_item(db: &Db, id: i64) -> Result<Item> {
    db.with_connection(move |conn| {
        conn.query_row(
            &format!("SELECT {} FROM items WHERE id = ?1", ITEM_COLUMNS),
            [id],
            item_from_row,
        )
        .optional()?
        .ok_or(ReviewgraphError::NotFound { entity: EntityKind::Item.name(), id })
    })
    .await
}

pub async fn list_items(db: &Db) -> Result<Vec<Item>> {
    db.with_connection(|conn| {
        query_all(
            conn,
            &format!("SELECT {} FROM items ORDER BY id", ITEM_COLUMNS),
            [],
            item_from_row,
        )
    })
    .await
}

pub async fn update_item(db: &Db, item: &Item) -> Result<()> {
    validate_price(item.price)?;
    let item = item.clone();
    db.with_connection(move |conn| {
        let changed = conn
            .execute(
                "UPDATE items SET name = ?1, price = ?2 WHERE id = ?3",
                params![item.name, item.price, item.id],
            )
            .map_err(ReviewgraphError::from_sqlite)?;
        expect_changed(changed, EntityKind::Item, item.id)
    })
    .await
}

/// Fails with an integrity error while reviews still refer to the item.
pub async fn delete_item(db: &Db, id: i64) -> Result<()> {
    db.with_connection(move |conn| {
        let changed = conn
            .execute("DELETE FROM items WHERE id = ?1", [id])
            .map_err(ReviewgraphError::from_sqlite)?;
        expect_changed(changed, EntityKind::Item, id)
    })
    .await
}

/// `Item.reviews`, in insertion order.
pub async fn item_reviews(db: &Db, item_id: i64) -> Result<Vec<Review>> {
    db.with_connection(move |conn| {
        ensure_exists(conn, EntityKind::Item, item_id)?;
        query_all(
            conn,
            &format!(
                "SELECT {} FROM reviews WHERE item_id = ?1 ORDER BY id",
                REVIEW_COLUMNS
            ),
            [item_id],
            review_from_row,
        )
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::migrated_db;
    use crate::store::{insert_customer, insert_review};

    #[tokio::test]
    async fn test_item_crud() {
        let (db, _temp) = migrated_db().await;

        let mug = insert_item(&db, "Mug", 9.99).await.unwrap();
        assert_eq!(get_item(&db, mug.id).await.unwrap(), mug);

        let repriced = Item { price: 12.5, ..mug.clone() };
        update_item(&db, &repriced).await.unwrap();
        assert_eq!(get_item(&db, mug.id).await.unwrap().price, 12.5);
        assert_eq!(list_items(&db).await.unwrap().len(), 1);

        delete_item(&db, mug.id).await.unwrap();
        assert!(list_items(&db).await.unwrap().is_empty());
        assert!(matches!(
            delete_item(&db, mug.id).await,
            Err(ReviewgraphError::NotFound { entity: "Item", .. })
        ));
    }

    #[tokio::test]
    async fn test_non_finite_price_rejected() {
        let (db, _temp) = migrated_db().await;
        assert!(matches!(
            insert_item(&db, "Void", f64::NAN).await,
            Err(ReviewgraphError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_update_to_non_finite_price_rejected() {
        let (db, _temp) = migrated_db().await;
        let mug = insert_item(&db, "Mug", 9.99).await.unwrap();

        let err = update_item(&db, &Item { price: f64::INFINITY, ..mug.clone() })
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewgraphError::InvalidInput(_)), "got {err:?}");
        assert_eq!(get_item(&db, mug.id).await.unwrap().price, 9.99);
    }

    #[tokio::test]
    async fn test_item_reviews_empty_and_filled() {
        let (db, _temp) = migrated_db().await;
        let mug = insert_item(&db, "Mug", 9.99).await.unwrap();
        assert!(item_reviews(&db, mug.id).await.unwrap().is_empty());

        let ana = insert_customer(&db, "Ana").await.unwrap();
        let review = insert_review(&db, Some("Nice"), Some(ana.id), Some(mug.id)).await.unwrap();
        assert_eq!(item_reviews(&db, mug.id).await.unwrap(), vec![review]);
    }

    #[tokio::test]
    async fn test_delete_referenced_item_is_integrity_error() {
        let (db, _temp) = migrated_db().await;
        let mug = insert_item(&db, "Mug", 9.99).await.unwrap();
        insert_review(&db, None, None, Some(mug.id)).await.unwrap();

        assert!(matches!(
            delete_item(&db, mug.id).await,
            Err(ReviewgraphError::Integrity(_))
        ));
    }
}
