use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        orders::{OrderList, OrderSummary, OrderWithItems},
        restaurants::{RestaurantList, RestaurantWithMenu},
        reviews::{ReviewList, ReviewWithAuthor},
        users::{AddressList, FavoriteRestaurant, Profile},
    },
    models::{Address, MenuItem, Order, OrderItem, OrderStatus, Restaurant, Review, User},
    response::{ApiResponse, Meta},
    routes::{auth, health, orders, params, restaurants, reviews, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        restaurants::list_restaurants,
        restaurants::get_restaurant,
        restaurants::create_restaurant,
        restaurants::update_restaurant,
        restaurants::delete_restaurant,
        restaurants::add_menu_item,
        restaurants::update_menu_item,
        restaurants::remove_menu_item,
        orders::place_order,
        orders::list_orders,
        orders::get_order,
        orders::update_status,
        reviews::create_review,
        reviews::list_for_restaurant,
        reviews::update_review,
        reviews::delete_review,
        users::get_profile,
        users::update_profile,
        users::add_address,
        users::update_address,
        users::remove_address,
        users::add_favorite,
        users::remove_favorite
    ),
    components(
        schemas(
            User,
            Address,
            Restaurant,
            MenuItem,
            Review,
            Order,
            OrderItem,
            OrderStatus,
            RestaurantList,
            RestaurantWithMenu,
            OrderList,
            OrderSummary,
            OrderWithItems,
            ReviewList,
            ReviewWithAuthor,
            Profile,
            AddressList,
            FavoriteRestaurant,
            params::Pagination,
            params::RestaurantQuery,
            Meta,
            ApiResponse<Restaurant>,
            ApiResponse<RestaurantList>,
            ApiResponse<RestaurantWithMenu>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<ReviewList>,
            ApiResponse<Profile>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Restaurants", description = "Restaurant and menu endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Reviews", description = "Review endpoints"),
        (name = "Users", description = "Profile, address and favorite endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
