use axum_food_ordering_api::{db::DbPool, middleware::auth::AuthUser};
use uuid::Uuid;

/// Connects, migrates and truncates, or returns None when no database is
/// configured so the suite can be skipped.
pub async fn setup_pool() -> anyhow::Result<Option<DbPool>> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(None);
            }
        };

    let pool = axum_food_ordering_api::db::create_pool(&database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Clean tables between runs
    sqlx::query(
        "TRUNCATE TABLE order_items, orders, reviews, favorites, menu_items, restaurants, addresses, audit_logs, users RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await?;

    Ok(Some(pool))
}

pub async fn create_user(pool: &DbPool, role: &str, email: &str) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, phone, role) VALUES ($1, $2, $3, 'dummy', '', $4)",
    )
    .bind(id)
    .bind(email.split('@').next().unwrap_or("user"))
    .bind(email)
    .bind(role)
    .execute(pool)
    .await?;

    Ok(AuthUser {
        user_id: id,
        role: role.into(),
    })
}

pub async fn create_restaurant(pool: &DbPool, owner_id: Uuid) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO restaurants (id, owner_id, name, description, cuisine, phone, city)
        VALUES ($1, $2, 'Test Kitchen', 'A restaurant for testing', 'Fusion', '555-0101', 'Testville')
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn create_menu_item(
    pool: &DbPool,
    restaurant_id: Uuid,
    name: &str,
    price: i64,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO menu_items (id, restaurant_id, name, price) VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(restaurant_id)
    .bind(name)
    .bind(price)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn rating_of(pool: &DbPool, restaurant_id: Uuid) -> anyhow::Result<(f64, i32)> {
    let row: (f64, i32) =
        sqlx::query_as("SELECT rating_average, rating_count FROM restaurants WHERE id = $1")
            .bind(restaurant_id)
            .fetch_one(pool)
            .await?;
    Ok(row)
}
