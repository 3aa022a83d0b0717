use axum_food_ordering_api::{
    dto::orders::{
        DeliveryAddress, OrderLineRequest, PlaceOrderRequest, UpdateOrderStatusRequest,
    },
    error::AppError,
    models::OrderStatus,
    services::order_service,
};

mod common;
use common::{create_menu_item, create_restaurant, create_user, setup_pool};

fn place_request(
    restaurant_id: uuid::Uuid,
    items: Vec<OrderLineRequest>,
) -> PlaceOrderRequest {
    PlaceOrderRequest {
        restaurant_id,
        items,
        delivery_address: DeliveryAddress {
            street: "1 Main St".into(),
            city: "Testville".into(),
            state: None,
            zip_code: None,
            country: None,
        },
        payment_method: "cash".into(),
        special_instructions: None,
    }
}

// Order placement snapshots live menu prices; later menu edits never change
// the stored total.
#[tokio::test]
async fn order_total_is_snapshotted_at_checkout() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await? else {
        return Ok(());
    };

    let owner = create_user(&pool, "owner", "owner@example.com").await?;
    let buyer = create_user(&pool, "customer", "buyer@example.com").await?;
    let restaurant_id = create_restaurant(&pool, owner.user_id).await?;
    let pizza = create_menu_item(&pool, restaurant_id, "Pizza", 1000).await?;
    let soda = create_menu_item(&pool, restaurant_id, "Soda", 300).await?;

    let resp = order_service::place_order(
        &pool,
        &buyer,
        place_request(
            restaurant_id,
            vec![
                OrderLineRequest {
                    menu_item_id: pizza,
                    quantity: 2,
                },
                OrderLineRequest {
                    menu_item_id: soda,
                    quantity: 3,
                },
            ],
        ),
    )
    .await?;
    let placed = resp.data.unwrap();
    assert_eq!(placed.order.total_amount, 2 * 1000 + 3 * 300);
    assert_eq!(placed.order.status, "pending");
    assert!(placed.order.delivered_at.is_none());
    assert_eq!(placed.items.len(), 2);

    // Raise the pizza price; the stored order must not move.
    sqlx::query("UPDATE menu_items SET price = 9999 WHERE id = $1")
        .bind(pizza)
        .execute(&pool)
        .await?;

    let fetched = order_service::get_order(&pool, &buyer, placed.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(fetched.order.total_amount, 2900);
    let pizza_line = fetched
        .items
        .iter()
        .find(|i| i.menu_item_id == Some(pizza))
        .unwrap();
    assert_eq!(pizza_line.price, 1000);

    Ok(())
}

#[tokio::test]
async fn unknown_or_unavailable_items_are_rejected() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await? else {
        return Ok(());
    };

    let owner = create_user(&pool, "owner", "owner@example.com").await?;
    let buyer = create_user(&pool, "customer", "buyer@example.com").await?;
    let restaurant_id = create_restaurant(&pool, owner.user_id).await?;
    let dish = create_menu_item(&pool, restaurant_id, "Dish", 500).await?;

    let err = order_service::place_order(
        &pool,
        &buyer,
        place_request(
            restaurant_id,
            vec![OrderLineRequest {
                menu_item_id: uuid::Uuid::new_v4(),
                quantity: 1,
            }],
        ),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    sqlx::query("UPDATE menu_items SET is_available = FALSE WHERE id = $1")
        .bind(dish)
        .execute(&pool)
        .await?;

    let err = order_service::place_order(
        &pool,
        &buyer,
        place_request(
            restaurant_id,
            vec![OrderLineRequest {
                menu_item_id: dish,
                quantity: 1,
            }],
        ),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = order_service::place_order(&pool, &buyer, place_request(restaurant_id, vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn status_follows_the_fulfilment_graph() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await? else {
        return Ok(());
    };

    let owner = create_user(&pool, "owner", "owner@example.com").await?;
    let buyer = create_user(&pool, "customer", "buyer@example.com").await?;
    let restaurant_id = create_restaurant(&pool, owner.user_id).await?;
    let dish = create_menu_item(&pool, restaurant_id, "Dish", 500).await?;

    let order = order_service::place_order(
        &pool,
        &buyer,
        place_request(
            restaurant_id,
            vec![OrderLineRequest {
                menu_item_id: dish,
                quantity: 1,
            }],
        ),
    )
    .await?
    .data
    .unwrap()
    .order;

    // Skipping straight to delivered is illegal.
    let err = order_service::update_status(
        &pool,
        &owner,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Delivered,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Walk the legal path; delivered_at stays null until the terminal edge.
    for status in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::OutForDelivery,
    ] {
        let updated =
            order_service::update_status(&pool, &owner, order.id, UpdateOrderStatusRequest { status })
                .await?
                .data
                .unwrap();
        assert_eq!(updated.status, status.as_str());
        assert!(updated.delivered_at.is_none());
    }

    let delivered = order_service::update_status(
        &pool,
        &owner,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Delivered,
        },
    )
    .await?
    .data
    .unwrap();
    assert!(delivered.delivered_at.is_some());

    // Terminal state: no reverting, no cancelling.
    for status in [OrderStatus::Pending, OrderStatus::Cancelled] {
        let err = order_service::update_status(
            &pool,
            &owner,
            order.id,
            UpdateOrderStatusRequest { status },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    Ok(())
}

#[tokio::test]
async fn order_access_is_gated_by_role_and_ownership() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await? else {
        return Ok(());
    };

    let owner = create_user(&pool, "owner", "owner@example.com").await?;
    let buyer = create_user(&pool, "customer", "buyer@example.com").await?;
    let stranger = create_user(&pool, "customer", "stranger@example.com").await?;
    let admin = create_user(&pool, "admin", "admin@example.com").await?;
    let restaurant_id = create_restaurant(&pool, owner.user_id).await?;
    let dish = create_menu_item(&pool, restaurant_id, "Dish", 500).await?;

    let order = order_service::place_order(
        &pool,
        &buyer,
        place_request(
            restaurant_id,
            vec![OrderLineRequest {
                menu_item_id: dish,
                quantity: 1,
            }],
        ),
    )
    .await?
    .data
    .unwrap()
    .order;

    // Buyer, restaurant owner and admin can read; a stranger cannot.
    assert!(order_service::get_order(&pool, &buyer, order.id).await.is_ok());
    assert!(order_service::get_order(&pool, &owner, order.id).await.is_ok());
    assert!(order_service::get_order(&pool, &admin, order.id).await.is_ok());
    let err = order_service::get_order(&pool, &stranger, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    // Only the restaurant owner or admin may move status; the buyer may not.
    let err = order_service::update_status(
        &pool,
        &buyer,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Confirmed,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let updated = order_service::update_status(
        &pool,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Confirmed,
        },
    )
    .await?;
    assert_eq!(updated.data.unwrap().status, "confirmed");

    // Buyer's history lists the order with the restaurant joined in.
    let list = order_service::list_orders(&pool, &buyer).await?.data.unwrap();
    assert_eq!(list.items.len(), 1);
    assert_eq!(list.items[0].restaurant_name, "Test Kitchen");

    Ok(())
}
