use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::users::{
        AddressList, AddressRequest, FavoriteRestaurant, Profile, UpdateAddressRequest,
        UpdateProfileRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Address, User},
    response::{ApiResponse, Meta},
};

pub fn router() -> Router<DbPool> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/addresses", post(add_address))
        .route("/addresses/{address_id}", put(update_address))
        .route("/addresses/{address_id}", delete(remove_address))
        .route("/favorites/{restaurant_id}", post(add_favorite))
        .route("/favorites/{restaurant_id}", delete(remove_favorite))
}

#[utoipa::path(
    get,
    path = "/api/users/profile",
    responses(
        (status = 200, description = "Own profile with addresses and favorites", body = ApiResponse<Profile>),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_profile(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let record = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(&pool)
        .await?;
    let record = match record {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    let addresses = sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE user_id = $1 ORDER BY position, created_at",
    )
    .bind(user.user_id)
    .fetch_all(&pool)
    .await?;

    let favorites = favorite_restaurants(&pool, user.user_id).await?;

    let data = Profile {
        user: record,
        addresses,
        favorites,
    };
    Ok(Json(ApiResponse::success("Profile", data, None)))
}

#[utoipa::path(
    put,
    path = "/api/users/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<User>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_profile(
    State(pool): State<DbPool>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(&pool)
        .await?;
    let existing = match existing {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    let updated = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET name = $2, phone = $3, avatar = $4
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user.user_id)
    .bind(payload.name.unwrap_or(existing.name))
    .bind(payload.phone.unwrap_or(existing.phone))
    .bind(payload.avatar.or(existing.avatar))
    .fetch_one(&pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "Profile updated",
        updated,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/users/addresses",
    request_body = AddressRequest,
    responses(
        (status = 201, description = "Address added", body = ApiResponse<AddressList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn add_address(
    State(pool): State<DbPool>,
    user: AuthUser,
    Json(payload): Json<AddressRequest>,
) -> AppResult<Json<ApiResponse<AddressList>>> {
    if payload.street.trim().is_empty() || payload.city.trim().is_empty() {
        return Err(AppError::BadRequest("Street and city are required".into()));
    }

    sqlx::query(
        r#"
        INSERT INTO addresses (id, user_id, label, street, city, state, zip_code, country, position)
        VALUES ($1, $2, COALESCE($3, ''), $4, $5, COALESCE($6, ''), COALESCE($7, ''), COALESCE($8, ''),
                (SELECT COALESCE(MAX(position) + 1, 0) FROM addresses WHERE user_id = $2))
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.label)
    .bind(payload.street.trim())
    .bind(payload.city.trim())
    .bind(payload.state)
    .bind(payload.zip_code)
    .bind(payload.country)
    .execute(&pool)
    .await?;

    let items = list_addresses(&pool, user.user_id).await?;
    Ok(Json(ApiResponse::success(
        "Address added",
        AddressList { items },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    put,
    path = "/api/users/addresses/{address_id}",
    params(
        ("address_id" = Uuid, Path, description = "Address ID")
    ),
    request_body = UpdateAddressRequest,
    responses(
        (status = 200, description = "Address updated", body = ApiResponse<AddressList>),
        (status = 404, description = "Address not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_address(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(address_id): Path<Uuid>,
    Json(payload): Json<UpdateAddressRequest>,
) -> AppResult<Json<ApiResponse<AddressList>>> {
    let existing = sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE id = $1 AND user_id = $2",
    )
    .bind(address_id)
    .bind(user.user_id)
    .fetch_optional(&pool)
    .await?;
    let existing = match existing {
        Some(a) => a,
        None => return Err(AppError::NotFound),
    };

    sqlx::query(
        r#"
        UPDATE addresses
        SET label = $2, street = $3, city = $4, state = $5, zip_code = $6, country = $7
        WHERE id = $1
        "#,
    )
    .bind(address_id)
    .bind(payload.label.unwrap_or(existing.label))
    .bind(payload.street.unwrap_or(existing.street))
    .bind(payload.city.unwrap_or(existing.city))
    .bind(payload.state.unwrap_or(existing.state))
    .bind(payload.zip_code.unwrap_or(existing.zip_code))
    .bind(payload.country.unwrap_or(existing.country))
    .execute(&pool)
    .await?;

    let items = list_addresses(&pool, user.user_id).await?;
    Ok(Json(ApiResponse::success(
        "Address updated",
        AddressList { items },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/users/addresses/{address_id}",
    params(
        ("address_id" = Uuid, Path, description = "Address ID")
    ),
    responses(
        (status = 200, description = "Address removed", body = ApiResponse<AddressList>),
        (status = 404, description = "Address not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn remove_address(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(address_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AddressList>>> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(address_id)
        .bind(user.user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    let items = list_addresses(&pool, user.user_id).await?;
    Ok(Json(ApiResponse::success(
        "Address removed",
        AddressList { items },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/users/favorites/{restaurant_id}",
    params(
        ("restaurant_id" = Uuid, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 200, description = "Added to favorites"),
        (status = 400, description = "Restaurant not found"),
        (status = 409, description = "Already in favorites"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn add_favorite(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(restaurant_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let restaurant: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM restaurants WHERE id = $1")
        .bind(restaurant_id)
        .fetch_optional(&pool)
        .await?;
    if restaurant.is_none() {
        return Err(AppError::BadRequest("Restaurant not found".into()));
    }

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM favorites WHERE user_id = $1 AND restaurant_id = $2")
            .bind(user.user_id)
            .bind(restaurant_id)
            .fetch_optional(&pool)
            .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Restaurant already in favorites".into()));
    }

    sqlx::query("INSERT INTO favorites (id, user_id, restaurant_id) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(user.user_id)
        .bind(restaurant_id)
        .execute(&pool)
        .await?;

    Ok(Json(ApiResponse::success(
        "Added to favorites",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/users/favorites/{restaurant_id}",
    params(
        ("restaurant_id" = Uuid, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 200, description = "Removed from favorites"),
        (status = 404, description = "Favorite not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn remove_favorite(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(restaurant_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND restaurant_id = $2")
        .bind(user.user_id)
        .bind(restaurant_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(ApiResponse::success(
        "Removed from favorites",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}

async fn list_addresses(pool: &DbPool, user_id: Uuid) -> AppResult<Vec<Address>> {
    let items = sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE user_id = $1 ORDER BY position, created_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

async fn favorite_restaurants(
    pool: &DbPool,
    user_id: Uuid,
) -> AppResult<Vec<FavoriteRestaurant>> {
    let items = sqlx::query_as::<_, FavoriteRestaurant>(
        r#"
        SELECT r.id, r.name, r.image, r.city, r.rating_average, r.rating_count
        FROM favorites f
        JOIN restaurants r ON r.id = f.restaurant_id
        WHERE f.user_id = $1
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}
