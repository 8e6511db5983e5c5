use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::middleware::policy::{is_staff, Permission};
use crate::models::enums::Role;
use crate::utils::error::AppError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Structure qui contient les infos de l'utilisateur authentifié
/// Utilisée comme extracteur dans les routes protégées
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// Vérifie la permission dans la table des rôles
    pub fn authorize(&self, permission: Permission) -> Result<(), AppError> {
        if permission.allows(self.role) {
            Ok(())
        } else {
            warn!(user_id = self.user_id, role = ?self.role, ?permission, "permission denied");
            Err(AppError::Forbidden)
        }
    }

    /// Le personnel passe, sinon il faut être le propriétaire
    pub fn ensure_owner(&self, owner_id: i32) -> Result<(), AppError> {
        if is_staff(self.role) || self.user_id == owner_id {
            Ok(())
        } else {
            warn!(user_id = self.user_id, owner_id, "ownership check failed");
            Err(AppError::Forbidden)
        }
    }

    pub fn is_staff(&self) -> bool {
        is_staff(self.role)
    }
}

/// Jeton depuis "Authorization: Bearer <token>" ou depuis le cookie de session
fn extract_token(req: &HttpRequest) -> Result<String, AppError> {
    if let Some(header) = req.headers().get("Authorization") {
        let value = header
            .to_str()
            .map_err(|_| AppError::InvalidToken("Invalid Authorization header".to_string()))?;
        return value
            .strip_prefix("Bearer ")
            .map(|t| t.trim().to_string())
            .ok_or_else(|| {
                AppError::InvalidToken(
                    "Invalid Authorization format (expected: Bearer <token>)".to_string(),
                )
            });
    }

    req.cookie(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::Unauthorized)
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state missing".to_string()))?;

    let token = extract_token(req)?;
    let claims = state.tokens.verify_token(&token)?;

    Ok(AuthUser {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

/// Implémentation de FromRequest pour AuthUser
/// Cela permet à Actix-Web d'extraire automatiquement AuthUser des requêtes
impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).map_err(Error::from))
    }
}
