use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{MenuItem, Restaurant};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRestaurantRequest {
    pub name: String,
    pub description: String,
    pub cuisine: String,
    pub phone: String,
    pub email: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub image: Option<String>,
    pub price_range: Option<String>,
    pub delivery_time: Option<String>,
    pub minimum_order: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRestaurantRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cuisine: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub image: Option<String>,
    pub price_range: Option<String>,
    pub delivery_time: Option<String>,
    pub minimum_order: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMenuItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub category: Option<String>,
    pub image: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMenuItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantList {
    pub items: Vec<Restaurant>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantWithMenu {
    pub restaurant: Restaurant,
    pub menu: Vec<MenuItem>,
}
