use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError};

pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_OWNER: &str = "owner";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Owner-or-admin policy: a mutation is permitted only for the resource's
/// owning user or an admin.
pub fn ensure_owner_or_admin(user: &AuthUser, owner_id: Uuid) -> Result<(), AppError> {
    if user.user_id != owner_id && !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_role_in(user: &AuthUser, roles: &[&str]) -> Result<(), AppError> {
    if !roles.contains(&user.role.as_str()) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::BadRequest("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))?;

        if !auth_str.starts_with("Bearer ") {
            return Err(AppError::BadRequest("Invalid Authorization scheme".into()));
        }
        let token = auth_str.trim_start_matches("Bearer ").trim();

        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::BadRequest("Invalid or expired token".into()))?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::BadRequest("Invalid user id in token".into()))?;

        Ok(AuthUser {
            user_id,
            role: decoded.claims.role.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role: role.into(),
        }
    }

    #[test]
    fn owner_may_mutate_own_resource() {
        let u = user(ROLE_OWNER);
        assert!(ensure_owner_or_admin(&u, u.user_id).is_ok());
    }

    #[test]
    fn admin_may_mutate_any_resource() {
        let admin = user(ROLE_ADMIN);
        assert!(ensure_owner_or_admin(&admin, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn stranger_is_forbidden() {
        let u = user(ROLE_CUSTOMER);
        assert!(matches!(
            ensure_owner_or_admin(&u, Uuid::new_v4()),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn role_gate_checks_membership() {
        let u = user(ROLE_CUSTOMER);
        assert!(ensure_role_in(&u, &[ROLE_CUSTOMER, ROLE_ADMIN]).is_ok());
        assert!(ensure_role_in(&u, &[ROLE_OWNER, ROLE_ADMIN]).is_err());
    }
}
