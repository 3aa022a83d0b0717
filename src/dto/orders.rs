use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, OrderStatus};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub restaurant_id: Uuid,
    pub items: Vec<OrderLineRequest>,
    pub delivery_address: DeliveryAddress,
    pub payment_method: String,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderLineRequest {
    pub menu_item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct DeliveryAddress {
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Order joined with the restaurant summary shown in the buyer's history.
#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub restaurant_name: String,
    pub restaurant_image: Option<String>,
    pub restaurant_city: String,
    pub total_amount: i64,
    pub status: String,
    pub payment_method: String,
    pub delivered_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderSummary>,
}
