use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum_food_ordering_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "Admin", "admin@example.com", "admin123", "admin").await?;
    let owner_id = ensure_user(&pool, "Olive Owner", "owner@example.com", "owner123", "owner").await?;
    let customer_id =
        ensure_user(&pool, "Carl Customer", "customer@example.com", "customer123", "customer")
            .await?;
    seed_restaurant(&pool, owner_id).await?;

    println!("Seed completed. Admin: {admin_id}, Owner: {owner_id}, Customer: {customer_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, phone, role)
        VALUES ($1, $2, $3, $4, '', $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    // If user already exists, fetch id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_restaurant(pool: &sqlx::PgPool, owner_id: Uuid) -> anyhow::Result<()> {
    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM restaurants WHERE owner_id = $1 LIMIT 1")
            .bind(owner_id)
            .fetch_optional(pool)
            .await?;
    let restaurant_id = match existing {
        Some((id,)) => id,
        None => {
            let id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO restaurants (id, owner_id, name, description, cuisine, phone, city)
                VALUES ($1, $2, 'Trattoria Ferris', 'Wood-fired pizza and fresh pasta', 'Italian',
                        '555-0100', 'Springfield')
                "#,
            )
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;
            id
        }
    };

    let menu = [
        ("Margherita", 119000_i64, "Pizza"),
        ("Quattro Formaggi", 149000, "Pizza"),
        ("Tagliatelle al Ragu", 132000, "Pasta"),
        ("Tiramisu", 65000, "Dessert"),
    ];

    for (i, (name, price, category)) in menu.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO menu_items (id, restaurant_id, name, price, category, position)
            SELECT $1, $2, $3, $4, $5, $6
            WHERE NOT EXISTS (
                SELECT 1 FROM menu_items WHERE restaurant_id = $2 AND name = $3
            )
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(restaurant_id)
        .bind(name)
        .bind(price)
        .bind(category)
        .bind(i as i32)
        .execute(pool)
        .await?;
    }

    println!("Seeded restaurant and menu");
    Ok(())
}
