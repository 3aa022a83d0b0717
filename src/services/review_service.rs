use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::reviews::{CreateReviewRequest, ReviewList, ReviewWithAuthor, UpdateReviewRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Review,
    response::{ApiResponse, Meta},
};

pub async fn create_review(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    validate_rating(payload.rating)?;
    if payload.comment.trim().is_empty() {
        return Err(AppError::BadRequest("Comment is required".into()));
    }

    let mut txn = pool.begin().await?;

    let restaurant: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM restaurants WHERE id = $1")
        .bind(payload.restaurant_id)
        .fetch_optional(&mut *txn)
        .await?;
    if restaurant.is_none() {
        return Err(AppError::BadRequest("Restaurant not found".into()));
    }

    // One review per (user, restaurant); also enforced by a unique index.
    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM reviews WHERE user_id = $1 AND restaurant_id = $2")
            .bind(user.user_id)
            .bind(payload.restaurant_id)
            .fetch_optional(&mut *txn)
            .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "You have already reviewed this restaurant".into(),
        ));
    }

    let review: Review = sqlx::query_as(
        r#"
        INSERT INTO reviews (id, user_id, restaurant_id, rating, comment, images)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.restaurant_id)
    .bind(payload.rating)
    .bind(payload.comment.trim())
    .bind(payload.images.unwrap_or_default())
    .fetch_one(&mut *txn)
    .await?;

    recompute_rating(&mut txn, payload.restaurant_id).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "review_create",
        Some("reviews"),
        Some(serde_json::json!({ "review_id": review.id, "restaurant_id": review.restaurant_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Review created", review, Some(Meta::empty())))
}

pub async fn list_for_restaurant(
    pool: &DbPool,
    restaurant_id: Uuid,
) -> AppResult<ApiResponse<ReviewList>> {
    let reviews: Vec<ReviewWithAuthor> = sqlx::query_as(
        r#"
        SELECT rv.id, rv.user_id, u.name AS user_name, u.avatar AS user_avatar,
               rv.restaurant_id, rv.rating, rv.comment, rv.images, rv.created_at
        FROM reviews rv
        JOIN users u ON u.id = rv.user_id
        WHERE rv.restaurant_id = $1
        ORDER BY rv.created_at DESC
        "#,
    )
    .bind(restaurant_id)
    .fetch_all(pool)
    .await?;

    let total = reviews.len() as i64;
    let meta = Meta::new(1, total, total);
    Ok(ApiResponse::success(
        "Ok",
        ReviewList { items: reviews },
        Some(meta),
    ))
}

pub async fn update_review(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    if let Some(rating) = payload.rating {
        validate_rating(rating)?;
    }
    if let Some(comment) = payload.comment.as_deref() {
        if comment.trim().is_empty() {
            return Err(AppError::BadRequest("Comment is required".into()));
        }
    }

    let mut txn = pool.begin().await?;

    let existing: Option<Review> = sqlx::query_as("SELECT * FROM reviews WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *txn)
        .await?;
    let existing = match existing {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    // Only the author may edit; admins may delete but not rewrite.
    if existing.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let rating = payload.rating.unwrap_or(existing.rating);
    let comment = payload
        .comment
        .map(|c| c.trim().to_string())
        .unwrap_or(existing.comment);
    let images = payload.images.unwrap_or(existing.images);

    let review: Review = sqlx::query_as(
        r#"
        UPDATE reviews
        SET rating = $2, comment = $3, images = $4, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(rating)
    .bind(comment)
    .bind(images)
    .fetch_one(&mut *txn)
    .await?;

    recompute_rating(&mut txn, review.restaurant_id).await?;
    txn.commit().await?;

    Ok(ApiResponse::success("Review updated", review, Some(Meta::empty())))
}

pub async fn delete_review(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let mut txn = pool.begin().await?;

    let existing: Option<Review> = sqlx::query_as("SELECT * FROM reviews WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *txn)
        .await?;
    let existing = match existing {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    if existing.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::Forbidden);
    }

    sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(id)
        .execute(&mut *txn)
        .await?;

    recompute_rating(&mut txn, existing.restaurant_id).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "review_delete",
        Some("reviews"),
        Some(serde_json::json!({ "review_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Review deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Overwrite the restaurant's stored rating aggregate from its reviews.
/// A single statement, so the aggregate and the triggering write commit
/// together and concurrent reviews cannot leave a stale average behind.
/// Average is 0 when the review set is empty.
async fn recompute_rating(
    txn: &mut Transaction<'_, Postgres>,
    restaurant_id: Uuid,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE restaurants r
        SET rating_average = agg.avg_rating,
            rating_count = agg.review_count
        FROM (
            SELECT COALESCE(AVG(rating)::DOUBLE PRECISION, 0) AS avg_rating,
                   COUNT(*)::INT AS review_count
            FROM reviews
            WHERE restaurant_id = $1
        ) AS agg
        WHERE r.id = $1
        "#,
    )
    .bind(restaurant_id)
    .execute(&mut **txn)
    .await?;
    Ok(())
}

fn validate_rating(rating: i32) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".into(),
        ));
    }
    Ok(())
}
