use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::restaurants::{
        CreateMenuItemRequest, CreateRestaurantRequest, RestaurantList, RestaurantWithMenu,
        UpdateMenuItemRequest, UpdateRestaurantRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ROLE_ADMIN, ROLE_OWNER, ensure_owner_or_admin, ensure_role_in},
    models::{MenuItem, Restaurant},
    response::{ApiResponse, Meta},
    routes::params::{RestaurantQuery, RestaurantSort},
};

pub fn router() -> Router<DbPool> {
    Router::new()
        .route("/", get(list_restaurants).post(create_restaurant))
        .route("/{id}", get(get_restaurant))
        .route("/{id}", put(update_restaurant))
        .route("/{id}", delete(delete_restaurant))
        .route("/{id}/menu", post(add_menu_item))
        .route("/{id}/menu/{item_id}", put(update_menu_item))
        .route("/{id}/menu/{item_id}", delete(remove_menu_item))
}

#[utoipa::path(
    get,
    path = "/api/restaurants",
    params(
        ("cuisine" = Option<String>, Query, description = "Filter by cuisine, substring match"),
        ("city" = Option<String>, Query, description = "Filter by city, substring match"),
        ("search" = Option<String>, Query, description = "Search name, description and cuisine"),
        ("sort" = Option<String>, Query, description = "Sort: rating, newest"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "List active restaurants", body = ApiResponse<RestaurantList>)
    ),
    tag = "Restaurants"
)]
pub async fn list_restaurants(
    State(pool): State<DbPool>,
    Query(query): Query<RestaurantQuery>,
) -> AppResult<Json<ApiResponse<RestaurantList>>> {
    let (page, limit, offset) = query.pagination().normalize();
    let sort = query.sort.unwrap_or(RestaurantSort::Newest);

    let filter = r#"
        FROM restaurants
        WHERE is_active = TRUE
          AND ($1::TEXT IS NULL OR cuisine ILIKE '%' || $1 || '%')
          AND ($2::TEXT IS NULL OR city ILIKE '%' || $2 || '%')
          AND ($3::TEXT IS NULL
               OR name ILIKE '%' || $3 || '%'
               OR description ILIKE '%' || $3 || '%'
               OR cuisine ILIKE '%' || $3 || '%')
    "#;

    let sql = format!(
        "SELECT * {filter} ORDER BY {} LIMIT $4 OFFSET $5",
        sort.as_order_clause()
    );
    let items = sqlx::query_as::<_, Restaurant>(&sql)
        .bind(&query.cuisine)
        .bind(&query.city)
        .bind(&query.search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&pool)
        .await?;

    let count_sql = format!("SELECT COUNT(*) {filter}");
    let total: (i64,) = sqlx::query_as(&count_sql)
        .bind(&query.cuisine)
        .bind(&query.city)
        .bind(&query.search)
        .fetch_one(&pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    let data = RestaurantList { items };
    Ok(Json(ApiResponse::success("Restaurants", data, Some(meta))))
}

#[utoipa::path(
    get,
    path = "/api/restaurants/{id}",
    params(
        ("id" = Uuid, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 200, description = "Get restaurant with menu", body = ApiResponse<RestaurantWithMenu>),
        (status = 404, description = "Restaurant not found"),
    ),
    tag = "Restaurants"
)]
pub async fn get_restaurant(
    Path(id): Path<Uuid>,
    State(pool): State<DbPool>,
) -> AppResult<Json<ApiResponse<RestaurantWithMenu>>> {
    let restaurant = sqlx::query_as::<_, Restaurant>("SELECT * FROM restaurants WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    let restaurant = match restaurant {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    let menu = sqlx::query_as::<_, MenuItem>(
        "SELECT * FROM menu_items WHERE restaurant_id = $1 ORDER BY position, created_at",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let data = RestaurantWithMenu { restaurant, menu };
    Ok(Json(ApiResponse::success("Restaurant", data, None)))
}

#[utoipa::path(
    post,
    path = "/api/restaurants",
    request_body = CreateRestaurantRequest,
    responses(
        (status = 201, description = "Create restaurant", body = ApiResponse<Restaurant>),
        (status = 403, description = "Requires owner or admin role"),
    ),
    security(("bearer_auth" = [])),
    tag = "Restaurants"
)]
pub async fn create_restaurant(
    State(pool): State<DbPool>,
    user: AuthUser,
    Json(payload): Json<CreateRestaurantRequest>,
) -> AppResult<Json<ApiResponse<Restaurant>>> {
    ensure_role_in(&user, &[ROLE_OWNER, ROLE_ADMIN])?;

    if payload.name.trim().is_empty() || payload.description.trim().is_empty() {
        return Err(AppError::BadRequest("Name and description are required".into()));
    }

    let id = Uuid::new_v4();
    let restaurant = sqlx::query_as::<_, Restaurant>(
        r#"
        INSERT INTO restaurants (
            id, owner_id, name, description, cuisine, phone, email,
            street, city, state, zip_code, country, image,
            price_range, delivery_time, minimum_order
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                COALESCE($14, '$$'), COALESCE($15, '30-40 mins'), COALESCE($16, 0))
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user.user_id)
    .bind(payload.name.trim())
    .bind(payload.description.trim())
    .bind(payload.cuisine)
    .bind(payload.phone)
    .bind(payload.email)
    .bind(payload.street.unwrap_or_default())
    .bind(payload.city.unwrap_or_default())
    .bind(payload.state.unwrap_or_default())
    .bind(payload.zip_code.unwrap_or_default())
    .bind(payload.country.unwrap_or_default())
    .bind(payload.image)
    .bind(payload.price_range)
    .bind(payload.delivery_time)
    .bind(payload.minimum_order)
    .fetch_one(&pool)
    .await?;

    if let Err(err) = log_audit(
        &pool,
        Some(user.user_id),
        "restaurant_create",
        Some("restaurants"),
        Some(serde_json::json!({ "restaurant_id": restaurant.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(Json(ApiResponse::success(
        "Restaurant created",
        restaurant,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    put,
    path = "/api/restaurants/{id}",
    params(
        ("id" = Uuid, Path, description = "Restaurant ID")
    ),
    request_body = UpdateRestaurantRequest,
    responses(
        (status = 200, description = "Updated restaurant", body = ApiResponse<Restaurant>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Restaurant not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Restaurants"
)]
pub async fn update_restaurant(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRestaurantRequest>,
) -> AppResult<Json<ApiResponse<Restaurant>>> {
    let existing = sqlx::query_as::<_, Restaurant>("SELECT * FROM restaurants WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    let existing = match existing {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    ensure_owner_or_admin(&user, existing.owner_id)?;

    // owner_id and the rating aggregate are not client-writable.
    let restaurant = sqlx::query_as::<_, Restaurant>(
        r#"
        UPDATE restaurants
        SET name = $2, description = $3, cuisine = $4, phone = $5, email = $6,
            street = $7, city = $8, state = $9, zip_code = $10, country = $11,
            image = $12, price_range = $13, delivery_time = $14,
            minimum_order = $15, is_active = $16
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.name.unwrap_or(existing.name))
    .bind(payload.description.unwrap_or(existing.description))
    .bind(payload.cuisine.unwrap_or(existing.cuisine))
    .bind(payload.phone.unwrap_or(existing.phone))
    .bind(payload.email.or(existing.email))
    .bind(payload.street.unwrap_or(existing.street))
    .bind(payload.city.unwrap_or(existing.city))
    .bind(payload.state.unwrap_or(existing.state))
    .bind(payload.zip_code.unwrap_or(existing.zip_code))
    .bind(payload.country.unwrap_or(existing.country))
    .bind(payload.image.or(existing.image))
    .bind(payload.price_range.unwrap_or(existing.price_range))
    .bind(payload.delivery_time.unwrap_or(existing.delivery_time))
    .bind(payload.minimum_order.unwrap_or(existing.minimum_order))
    .bind(payload.is_active.unwrap_or(existing.is_active))
    .fetch_one(&pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "Updated",
        restaurant,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/restaurants/{id}",
    params(
        ("id" = Uuid, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 200, description = "Deleted restaurant"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Restaurant not found"),
        (status = 409, description = "Restaurant has order history"),
    ),
    security(("bearer_auth" = [])),
    tag = "Restaurants"
)]
pub async fn delete_restaurant(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let owner: Option<(Uuid,)> = sqlx::query_as("SELECT owner_id FROM restaurants WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    let owner_id = match owner {
        Some((owner_id,)) => owner_id,
        None => return Err(AppError::NotFound),
    };

    ensure_owner_or_admin(&user, owner_id)?;

    // The order ledger keeps a foreign key to the restaurant and is never
    // destroyed with it; a listing with order history cannot be deleted.
    let orders: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE restaurant_id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await?;
    if orders.0 > 0 {
        return Err(AppError::Conflict(
            "Restaurant has order history and cannot be deleted".into(),
        ));
    }

    // Destructive delete; menu, reviews and favorites cascade.
    sqlx::query("DELETE FROM restaurants WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if let Err(err) = log_audit(
        &pool,
        Some(user.user_id),
        "restaurant_delete",
        Some("restaurants"),
        Some(serde_json::json!({ "restaurant_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(Json(ApiResponse::success(
        "Restaurant deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/restaurants/{id}/menu",
    params(
        ("id" = Uuid, Path, description = "Restaurant ID")
    ),
    request_body = CreateMenuItemRequest,
    responses(
        (status = 201, description = "Menu item added", body = ApiResponse<MenuItem>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Restaurant not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Restaurants"
)]
pub async fn add_menu_item(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateMenuItemRequest>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    authorize_restaurant(&pool, &user, id).await?;

    if payload.price < 0 {
        return Err(AppError::BadRequest("Price cannot be negative".into()));
    }

    let item = sqlx::query_as::<_, MenuItem>(
        r#"
        INSERT INTO menu_items (id, restaurant_id, name, description, price, category, image, is_available, position)
        VALUES ($1, $2, $3, $4, $5, COALESCE($6, ''), $7, COALESCE($8, TRUE),
                (SELECT COALESCE(MAX(position) + 1, 0) FROM menu_items WHERE restaurant_id = $2))
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(id)
    .bind(payload.name)
    .bind(payload.description)
    .bind(payload.price)
    .bind(payload.category)
    .bind(payload.image)
    .bind(payload.is_available)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "Menu item added",
        item,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    put,
    path = "/api/restaurants/{id}/menu/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Restaurant ID"),
        ("item_id" = Uuid, Path, description = "Menu item ID")
    ),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Menu item updated", body = ApiResponse<MenuItem>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Restaurants"
)]
pub async fn update_menu_item(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateMenuItemRequest>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    authorize_restaurant(&pool, &user, id).await?;

    let existing = sqlx::query_as::<_, MenuItem>(
        "SELECT * FROM menu_items WHERE id = $1 AND restaurant_id = $2",
    )
    .bind(item_id)
    .bind(id)
    .fetch_optional(&pool)
    .await?;
    let existing = match existing {
        Some(item) => item,
        None => return Err(AppError::NotFound),
    };

    if let Some(price) = payload.price {
        if price < 0 {
            return Err(AppError::BadRequest("Price cannot be negative".into()));
        }
    }

    let item = sqlx::query_as::<_, MenuItem>(
        r#"
        UPDATE menu_items
        SET name = $2, description = $3, price = $4, category = $5,
            image = $6, is_available = $7
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(item_id)
    .bind(payload.name.unwrap_or(existing.name))
    .bind(payload.description.or(existing.description))
    .bind(payload.price.unwrap_or(existing.price))
    .bind(payload.category.unwrap_or(existing.category))
    .bind(payload.image.or(existing.image))
    .bind(payload.is_available.unwrap_or(existing.is_available))
    .fetch_one(&pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "Menu item updated",
        item,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/restaurants/{id}/menu/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Restaurant ID"),
        ("item_id" = Uuid, Path, description = "Menu item ID")
    ),
    responses(
        (status = 200, description = "Menu item removed"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Restaurants"
)]
pub async fn remove_menu_item(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    authorize_restaurant(&pool, &user, id).await?;

    let result = sqlx::query("DELETE FROM menu_items WHERE id = $1 AND restaurant_id = $2")
        .bind(item_id)
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(ApiResponse::success(
        "Menu item removed",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}

async fn authorize_restaurant(pool: &DbPool, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let owner: Option<(Uuid,)> = sqlx::query_as("SELECT owner_id FROM restaurants WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match owner {
        Some((owner_id,)) => ensure_owner_or_admin(user, owner_id),
        None => Err(AppError::NotFound),
    }
}
