use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    pub restaurant_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReviewRequest {
    pub rating: Option<i32>,
    pub comment: Option<String>,
    pub images: Option<Vec<String>>,
}

/// Review joined with the author's public fields.
#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct ReviewWithAuthor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_avatar: Option<String>,
    pub restaurant_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub images: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewList {
    pub items: Vec<ReviewWithAuthor>,
}
