use rusqlite::{params, OptionalExtension};

use super::{expect_changed, query_all, review_from_row, REVIEW_COLUMNS};
use crate::db::Db;
use crate::error::{Result, ReviewgraphError};
use crate::model::{EntityKind, Review};

/// Insert a review; unknown customer or item ids fail with an integrity error.
pub async fn insert_review(
    db: &Db,
    comment: Option<&str>,
    customer_id: Option<i64>,
    item_id: Option<i64>,
) -> Result<Review> {
    let comment = comment.map(str::to_string);
    let review = db
        .with_connection(move |conn| {
            conn.execute(
                "INSERT INTO reviews (comment, customer_id, item_id) VALUES (?1, ?2, ?3)",
                params![comment, customer_id, item_id],
            )
            .map_err(ReviewgraphError::from_sqlite)?;
            Ok(Review {
                id: conn.last_insert_rowid(),
                comment,
                customer_id,
                item_id,
            })
        })
        .await?;
    log::debug!("Inserted review {}", review.id);
    Ok(review)
}

pub async fn get_review(db: &Db, id: i64) -> Result<Review> {
    db.with_connection(move |conn| {
        conn.query_row(
            &format!("SELECT {} FROM reviews WHERE id = ?1", REVIEW_COLUMNS),
            [id],
            review_from_row,
        )
        .optional()?
        .ok_or(ReviewgraphError::NotFound { entity: EntityKind::Review.name(), id })
    })
    .await
}

pub async fn list_reviews(db: &Db) -> Result<Vec<Review>> {
    db.with_connection(|conn| {
        query_all(
            conn,
            &format!("SELECT {} FROM reviews ORDER BY id", REVIEW_COLUMNS),
            [],
            review_from_row,
        )
    })
    .await
}

/// Overwrite comment and both foreign keys. Re-pointing a review moves it
/// between the customers' (or items') review collections.
pub async fn update_review(db: &Db, review: &Review) -> Result<()> {
    let review = review.clone();
    db.with_connection(move |conn| {
        let changed = conn
            .execute(
                "UPDATE reviews SET comment = ?1, customer_id = ?2, item_id = ?3 WHERE id = ?4",
                params![review.comment, review.customer_id, review.item_id, review.id],
            )
            .map_err(ReviewgraphError::from_sqlite)?;
        expect_changed(changed, EntityKind::Review, review.id)
    })
    .await
}

pub async fn delete_review(db: &Db, id: i64) -> Result<()> {
    db.with_connection(move |conn| {
        let changed = conn.execute("DELETE FROM reviews WHERE id = ?1", [id])?;
        expect_changed(changed, EntityKind::Review, id)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::migrated_db;
    use crate::store::{customer_reviews, insert_customer, insert_item};

    #[tokio::test]
    async fn test_review_crud() {
        let (db, _temp) = migrated_db().await;
        let ana = insert_customer(&db, "Ana").await.unwrap();
        let mug = insert_item(&db, "Mug", 9.99).await.unwrap();

        let review = insert_review(&db, Some("Nice"), Some(ana.id), Some(mug.id)).await.unwrap();
        assert_eq!(get_review(&db, review.id).await.unwrap(), review);

        let edited = Review { comment: None, ..review.clone() };
        update_review(&db, &edited).await.unwrap();
        assert_eq!(get_review(&db, review.id).await.unwrap().comment, None);

        delete_review(&db, review.id).await.unwrap();
        assert!(list_reviews(&db).await.unwrap().is_empty());
        assert!(matches!(
            get_review(&db, review.id).await,
            Err(ReviewgraphError::NotFound { entity: "Review", .. })
        ));
    }

    #[tokio::test]
    async fn test_review_with_unknown_customer_rejected() {
        let (db, _temp) = migrated_db().await;
        let mug = insert_item(&db, "Mug", 9.99).await.unwrap();

        let err = insert_review(&db, Some("Who?"), Some(42), Some(mug.id)).await.unwrap_err();
        assert!(matches!(err, ReviewgraphError::Integrity(_)), "got {err:?}");
        assert!(list_reviews(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repoint_review_moves_between_customers() {
        let (db, _temp) = migrated_db().await;
        let ana = insert_customer(&db, "Ana").await.unwrap();
        let bo = insert_customer(&db, "Bo").await.unwrap();
        let review = insert_review(&db, Some("Nice"), Some(ana.id), None).await.unwrap();

        update_review(&db, &Review { customer_id: Some(bo.id), ..review.clone() })
            .await
            .unwrap();

        assert!(customer_reviews(&db, ana.id).await.unwrap().is_empty());
        assert_eq!(customer_reviews(&db, bo.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repoint_review_to_missing_item_rejected() {
        let (db, _temp) = migrated_db().await;
        let review = insert_review(&db, None, None, None).await.unwrap();
        let err = update_review(&db, &Review { item_id: Some(9), ..review })
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewgraphError::Integrity(_)));
    }
}
