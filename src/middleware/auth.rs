use axum::{
    extract::{FromRef, FromRequestParts},
    http::header,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    domain::{Capability, Role},
    dto::auth::Claims,
    entity::Users,
    error::AppError,
    state::AppState,
};

/// The caller, resolved against the users table on every request so a
/// role change takes effect without a new token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub role: Role,
}

pub fn ensure_capability(user: &AuthUser, capability: Capability) -> Result<(), AppError> {
    if !user.role.permits(capability) {
        tracing::debug!(user_id = %user.user_id, role = %user.role, ?capability, "access denied");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_capability(user, Capability::Administer)
}

pub fn jwt_secret() -> Result<String, AppError> {
    std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &S,
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

        let secret = jwt_secret()?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::BadRequest("Invalid or expired token".into()))?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::BadRequest("Invalid user id in token".into()))?;
        let session_id = Uuid::parse_str(&decoded.claims.sid)
            .map_err(|_| AppError::BadRequest("Invalid session id in token".into()))?;

        let app = AppState::from_ref(state);
        let user = Users::find_by_id(user_id).one(&app.orm).await?.ok_or_else(|| {
            AppError::Integrity(format!(
                "authenticated principal {} has no domain user",
                decoded.claims.email
            ))
        })?;
        let role = user
            .role
            .parse::<Role>()
            .map_err(|e| AppError::Integrity(format!("user {}: {e}", user.id)))?;

        Ok(AuthUser {
            user_id,
            session_id,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn gate_rejects_wrong_role() {
        assert!(matches!(
            ensure_capability(&user(Role::Courier), Capability::Purchase),
            Err(AppError::Forbidden)
        ));
        assert!(ensure_capability(&user(Role::Buyer), Capability::Purchase).is_ok());
    }

    #[test]
    fn only_admins_pass_admin_gate() {
        assert!(ensure_admin(&user(Role::Admin)).is_ok());
        for role in [Role::Buyer, Role::Seller, Role::Courier] {
            assert!(ensure_admin(&user(role)).is_err());
        }
    }
}
