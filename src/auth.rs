use axum::extract::FromRequestParts;
use axum_extra::extract::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use http::HeaderMap;
use http::request::Parts;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use crate::models::{Role, Training};
use crate::settings::Settings;
use crate::store::RosterError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Verified caller forwarded by the identity gateway. The gateway owns
/// credentials and token issuance; this service only checks the shared
/// service token and reads the asserted id/role headers.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

pub fn authenticate(
    settings: &Settings,
    auth: Option<Authorization<Bearer>>,
    user_id: Option<&str>,
    role: Option<&str>,
) -> Result<Identity, ApiError> {
    match auth {
        Some(bearer) if bearer.token() == settings.auth_token => {}
        _ => {
            return Err(ApiError::Unauthorized(
                "Invalid authentication token".into(),
            ));
        }
    }

    let user_id = user_id
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or_else(|| ApiError::Unauthorized("missing or malformed x-user-id header".into()))?;
    let role = role
        .and_then(|value| value.parse::<Role>().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing or malformed x-user-role header".into()))?;

    Ok(Identity { user_id, role })
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth =
            Option::<TypedHeader<Authorization<Bearer>>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized("invalid authorization header".into()))?;
        authenticate(
            &state.settings,
            auth.map(|TypedHeader(bearer)| bearer),
            header_str(&parts.headers, USER_ID_HEADER),
            header_str(&parts.headers, USER_ROLE_HEADER),
        )
    }
}

/// One authorization predicate per operation class, so every Forbidden
/// outcome is produced here rather than ad hoc at call sites.
pub fn ensure_role(identity: &Identity, role: Role) -> Result<(), RosterError> {
    if identity.role == role {
        Ok(())
    } else {
        Err(match role {
            Role::Admin => RosterError::Forbidden("admin role required"),
            Role::Trainer => RosterError::Forbidden("trainer role required"),
            Role::Player => RosterError::Forbidden("player role required"),
        })
    }
}

/// A training may only be edited, deleted or audited by the trainer
/// who created it.
pub fn ensure_training_owner(identity: &Identity, training: &Training) -> Result<(), RosterError> {
    ensure_role(identity, Role::Trainer)?;
    if training.trainer_id == identity.user_id {
        Ok(())
    } else {
        Err(RosterError::Forbidden("not the owner of this training"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(token: &str) -> Settings {
        Settings {
            debug: false,
            auth_token: token.to_string(),
            enable_swagger: true,
            port: 8080,
            notifier_base_url: None,
        }
    }

    #[test]
    fn test_authenticate_valid() {
        let settings = settings("secret");
        let auth = Authorization::bearer("secret").unwrap();
        let id = Uuid::new_v4();
        let identity =
            authenticate(&settings, Some(auth), Some(&id.to_string()), Some("trainer")).unwrap();
        assert_eq!(identity.user_id, id);
        assert_eq!(identity.role, Role::Trainer);
    }

    #[test]
    fn test_authenticate_bad_token() {
        let settings = settings("secret");
        let auth = Authorization::bearer("wrong").unwrap();
        let id = Uuid::new_v4().to_string();
        assert!(authenticate(&settings, Some(auth), Some(&id), Some("player")).is_err());
        assert!(authenticate(&settings, None, Some(&id), Some("player")).is_err());
    }

    #[test]
    fn test_authenticate_malformed_identity() {
        let settings = settings("secret");
        let id = Uuid::new_v4().to_string();

        let auth = Authorization::bearer("secret").unwrap();
        assert!(authenticate(&settings, Some(auth), None, Some("player")).is_err());

        let auth = Authorization::bearer("secret").unwrap();
        assert!(authenticate(&settings, Some(auth), Some("not-a-uuid"), Some("player")).is_err());

        let auth = Authorization::bearer("secret").unwrap();
        assert!(authenticate(&settings, Some(auth), Some(&id), Some("coach")).is_err());
    }

    #[test]
    fn test_ensure_role() {
        let identity = Identity {
            user_id: Uuid::new_v4(),
            role: Role::Player,
        };
        assert!(ensure_role(&identity, Role::Player).is_ok());
        assert_eq!(
            ensure_role(&identity, Role::Trainer),
            Err(RosterError::Forbidden("trainer role required"))
        );
    }
}
