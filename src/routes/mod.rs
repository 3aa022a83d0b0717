use axum::Router;

use crate::db::DbPool;

pub mod auth;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod restaurants;
pub mod reviews;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<DbPool> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/restaurants", restaurants::router())
        .nest("/orders", orders::router())
        .nest("/reviews", reviews::router())
        .nest("/users", users::router())
}
