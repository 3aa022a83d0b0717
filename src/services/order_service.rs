use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::orders::{
        OrderList, OrderSummary, OrderWithItems, PlaceOrderRequest, UpdateOrderStatusRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner_or_admin},
    models::{Order, OrderItem, OrderStatus},
    response::{ApiResponse, Meta},
};

/// Place an order: menu items are re-priced from the live menu inside one
/// transaction and the name/price/image are snapshotted into order_items.
/// The snapshot is never recomputed, even if the menu changes later.
pub async fn place_order(
    pool: &DbPool,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Order has no items".into()));
    }

    let mut txn = pool.begin().await?;

    let restaurant: Option<(Uuid, bool)> =
        sqlx::query_as("SELECT id, is_active FROM restaurants WHERE id = $1")
            .bind(payload.restaurant_id)
            .fetch_optional(&mut *txn)
            .await?;
    match restaurant {
        Some((_, true)) => {}
        Some((_, false)) => {
            return Err(AppError::BadRequest("Restaurant is not accepting orders".into()));
        }
        None => return Err(AppError::BadRequest("Restaurant not found".into())),
    }

    #[derive(sqlx::FromRow)]
    struct MenuRow {
        id: Uuid,
        name: String,
        price: i64,
        image: Option<String>,
        is_available: bool,
    }

    let mut total_amount: i64 = 0;
    let mut snapshots: Vec<(MenuRow, i32)> = Vec::with_capacity(payload.items.len());

    for line in &payload.items {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest("Quantity must be positive".into()));
        }
        let row: Option<MenuRow> = sqlx::query_as(
            r#"
            SELECT id, name, price, image, is_available
            FROM menu_items
            WHERE id = $1 AND restaurant_id = $2
            "#,
        )
        .bind(line.menu_item_id)
        .bind(payload.restaurant_id)
        .fetch_optional(&mut *txn)
        .await?;

        let row = match row {
            Some(r) if r.is_available => r,
            Some(_) => {
                return Err(AppError::BadRequest(format!(
                    "Menu item {} is unavailable",
                    line.menu_item_id
                )));
            }
            None => {
                return Err(AppError::BadRequest(format!(
                    "Menu item {} not found",
                    line.menu_item_id
                )));
            }
        };

        total_amount += row.price * (line.quantity as i64);
        snapshots.push((row, line.quantity));
    }

    let order_id = Uuid::new_v4();
    let address = &payload.delivery_address;

    let order: Order = sqlx::query_as(
        r#"
        INSERT INTO orders (
            id, user_id, restaurant_id, total_amount, status, payment_method,
            special_instructions, delivery_street, delivery_city,
            delivery_state, delivery_zip_code, delivery_country
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(user.user_id)
    .bind(payload.restaurant_id)
    .bind(total_amount)
    .bind(OrderStatus::Pending.as_str())
    .bind(&payload.payment_method)
    .bind(&payload.special_instructions)
    .bind(&address.street)
    .bind(&address.city)
    .bind(address.state.as_deref().unwrap_or(""))
    .bind(address.zip_code.as_deref().unwrap_or(""))
    .bind(address.country.as_deref().unwrap_or(""))
    .fetch_one(&mut *txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(snapshots.len());
    for (row, quantity) in &snapshots {
        let item: OrderItem = sqlx::query_as(
            r#"
            INSERT INTO order_items (id, order_id, menu_item_id, name, price, image, quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order.id)
        .bind(row.id)
        .bind(&row.name)
        .bind(row.price)
        .bind(&row.image)
        .bind(quantity)
        .fetch_one(&mut *txn)
        .await?;
        items.push(item);
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "order_place",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "total_amount": total_amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order placed",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let orders: Vec<OrderSummary> = sqlx::query_as(
        r#"
        SELECT o.id, o.restaurant_id, r.name AS restaurant_name,
               r.image AS restaurant_image, r.city AS restaurant_city,
               o.total_amount, o.status, o.payment_method,
               o.delivered_at, o.created_at
        FROM orders o
        JOIN restaurants r ON r.id = o.restaurant_id
        WHERE o.user_id = $1
        ORDER BY o.created_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    let total = orders.len() as i64;
    let meta = Meta::new(1, total, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    // Visible to the buyer, the restaurant's owner, or an admin.
    if order.user_id != user.user_id {
        let owner_id = restaurant_owner(pool, order.restaurant_id).await?;
        ensure_owner_or_admin(user, owner_id)?;
    }

    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at",
    )
    .bind(order.id)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

/// Advance an order along the fulfilment graph. Only the restaurant's owner
/// or an admin may do this; illegal edges are rejected and leave the order
/// untouched.
pub async fn update_status(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let mut txn = pool.begin().await?;

    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let owner_id = restaurant_owner(pool, order.restaurant_id).await?;
    ensure_owner_or_admin(user, owner_id)?;

    let current = OrderStatus::parse(&order.status)?;
    let next = payload.status;
    if !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot change status from {} to {}",
            current.as_str(),
            next.as_str()
        )));
    }

    let delivered_at = if next == OrderStatus::Delivered {
        Some(Utc::now())
    } else {
        order.delivered_at
    };

    let order: Order = sqlx::query_as(
        r#"
        UPDATE orders
        SET status = $2, delivered_at = $3, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(order.id)
    .bind(next.as_str())
    .bind(delivered_at)
    .fetch_one(&mut *txn)
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Status updated", order, Some(Meta::empty())))
}

async fn restaurant_owner(pool: &DbPool, restaurant_id: Uuid) -> AppResult<Uuid> {
    let owner: Option<(Uuid,)> = sqlx::query_as("SELECT owner_id FROM restaurants WHERE id = $1")
        .bind(restaurant_id)
        .fetch_optional(pool)
        .await?;
    match owner {
        Some((id,)) => Ok(id),
        None => Err(AppError::NotFound),
    }
}
