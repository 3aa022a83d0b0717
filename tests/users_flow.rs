use axum::extract::{Path, State};
use axum_food_ordering_api::{
    dto::users::{AddressRequest, UpdateAddressRequest, UpdateProfileRequest},
    error::AppError,
    routes::users,
};

mod common;
use common::{create_restaurant, create_user, setup_pool};

fn address(label: &str, street: &str) -> AddressRequest {
    AddressRequest {
        label: Some(label.into()),
        street: street.into(),
        city: "Testville".into(),
        state: None,
        zip_code: None,
        country: None,
    }
}

#[tokio::test]
async fn profile_updates_keep_unset_fields() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await? else {
        return Ok(());
    };

    let alice = create_user(&pool, "customer", "alice@example.com").await?;

    let updated = users::update_profile(
        State(pool.clone()),
        alice.clone(),
        axum::Json(UpdateProfileRequest {
            name: Some("Alice Cooper".into()),
            phone: None,
            avatar: None,
        }),
    )
    .await?
    .0
    .data
    .unwrap();
    assert_eq!(updated.name, "Alice Cooper");
    assert_eq!(updated.email, "alice@example.com");

    let again = users::update_profile(
        State(pool.clone()),
        alice.clone(),
        axum::Json(UpdateProfileRequest {
            name: None,
            phone: Some("555-0199".into()),
            avatar: None,
        }),
    )
    .await?
    .0
    .data
    .unwrap();
    assert_eq!(again.name, "Alice Cooper");
    assert_eq!(again.phone, "555-0199");

    let profile = users::get_profile(State(pool.clone()), alice.clone())
        .await?
        .0
        .data
        .unwrap();
    assert_eq!(profile.user.name, "Alice Cooper");
    assert!(profile.addresses.is_empty());
    assert!(profile.favorites.is_empty());

    Ok(())
}

#[tokio::test]
async fn addresses_are_ordered_and_scoped_to_their_owner() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await? else {
        return Ok(());
    };

    let alice = create_user(&pool, "customer", "alice@example.com").await?;
    let bob = create_user(&pool, "customer", "bob@example.com").await?;

    let err = users::add_address(
        State(pool.clone()),
        alice.clone(),
        axum::Json(address("Home", "   ")),
    )
    .await
    .map(|_| ())
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    users::add_address(
        State(pool.clone()),
        alice.clone(),
        axum::Json(address("Home", "1 Main St")),
    )
    .await?;
    let list = users::add_address(
        State(pool.clone()),
        alice.clone(),
        axum::Json(address("Work", "9 Office Rd")),
    )
    .await?
    .0
    .data
    .unwrap();

    // Insertion order is preserved via the position column.
    assert_eq!(list.items.len(), 2);
    assert_eq!(list.items[0].label, "Home");
    assert_eq!(list.items[1].label, "Work");
    let home = list.items[0].id;

    // Bob cannot edit or delete Alice's address.
    let patch = UpdateAddressRequest {
        label: None,
        street: Some("2 Main St".into()),
        city: None,
        state: None,
        zip_code: None,
        country: None,
    };
    let err = users::update_address(
        State(pool.clone()),
        bob.clone(),
        Path(home),
        axum::Json(patch),
    )
    .await
    .map(|_| ())
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = users::remove_address(State(pool.clone()), bob.clone(), Path(home))
        .await
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let list = users::update_address(
        State(pool.clone()),
        alice.clone(),
        Path(home),
        axum::Json(UpdateAddressRequest {
            label: None,
            street: Some("2 Main St".into()),
            city: None,
            state: None,
            zip_code: None,
            country: None,
        }),
    )
    .await?
    .0
    .data
    .unwrap();
    assert_eq!(list.items[0].street, "2 Main St");
    assert_eq!(list.items[0].label, "Home");

    let list = users::remove_address(State(pool.clone()), alice.clone(), Path(home))
        .await?
        .0
        .data
        .unwrap();
    assert_eq!(list.items.len(), 1);
    assert_eq!(list.items[0].label, "Work");

    Ok(())
}

#[tokio::test]
async fn favorites_reject_duplicates_and_unknown_restaurants() -> anyhow::Result<()> {
    let Some(pool) = setup_pool().await? else {
        return Ok(());
    };

    let owner = create_user(&pool, "owner", "owner@example.com").await?;
    let alice = create_user(&pool, "customer", "alice@example.com").await?;
    let restaurant_id = create_restaurant(&pool, owner.user_id).await?;

    let err = users::add_favorite(
        State(pool.clone()),
        alice.clone(),
        Path(uuid::Uuid::new_v4()),
    )
    .await
    .map(|_| ())
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    users::add_favorite(State(pool.clone()), alice.clone(), Path(restaurant_id)).await?;

    let err = users::add_favorite(State(pool.clone()), alice.clone(), Path(restaurant_id))
        .await
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let profile = users::get_profile(State(pool.clone()), alice.clone())
        .await?
        .0
        .data
        .unwrap();
    assert_eq!(profile.favorites.len(), 1);
    assert_eq!(profile.favorites[0].id, restaurant_id);

    users::remove_favorite(State(pool.clone()), alice.clone(), Path(restaurant_id)).await?;

    let err = users::remove_favorite(State(pool.clone()), alice.clone(), Path(restaurant_id))
        .await
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}
