use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::{info, warn};
use validator::Validate;

use crate::middleware::auth::SESSION_COOKIE;
use crate::middleware::AuthUser;
use crate::models::dto::{AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest};
use crate::models::enums::Role;
use crate::models::users::{self, ActiveModel as UserActiveModel, Column as UserColumn, Entity as Users};
use crate::utils::error::{AppError, AppResult};
use crate::utils::password;
use crate::AppState;

/// Cookie de session HttpOnly portant le jeton
fn session_cookie(state: &AppState, token: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .secure(state.config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(state.tokens.ttl().num_seconds()))
        .finish()
}

/// PBKDF2 est coûteux: on le sort du thread de l'exécuteur
async fn hash_blocking(plain: String) -> AppResult<String> {
    web::block(move || password::hash_password(&plain))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))?
}

async fn verify_blocking(plain: String, stored: String) -> AppResult<bool> {
    web::block(move || password::verify_password(&plain, &stored))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))?
}

/// POST /api/auth/register - Créer un compte (PUBLIC)
#[post("/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let request = body.into_inner();
    request.validate()?;

    // les rôles du personnel ne s'obtiennent que par un administrateur
    let role = request.role.unwrap_or(Role::User);
    if !matches!(role, Role::User | Role::Client | Role::Contributor) {
        return Err(AppError::Validation(
            "role: must be USER, CLIENT or CONTRIBUTOR".to_string(),
        ));
    }

    let email = request.email.trim().to_lowercase();
    let existing = Users::find()
        .filter(UserColumn::Email.eq(email.as_str()))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let user = UserActiveModel {
        email: Set(email),
        password_hash: Set(hash_blocking(request.password).await?),
        nom: Set(request.nom.trim().to_string()),
        prenom: Set(request.prenom.trim().to_string()),
        role: Set(role),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let token = state.tokens.generate_token(user.id, &user.email, user.role)?;
    info!(user_id = user.id, role = ?user.role, "account registered");

    Ok(HttpResponse::Created()
        .cookie(session_cookie(&state, &token))
        .json(AuthResponse { token, user }))
}

/// POST /api/auth/login - Se connecter (PUBLIC)
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let request = body.into_inner();
    let email = request.email.trim().to_lowercase();

    let user = match Users::find()
        .filter(UserColumn::Email.eq(email.as_str()))
        .one(&state.db)
        .await?
    {
        Some(user) => user,
        None => {
            warn!(email = %email, "login with unknown email");
            return Err(AppError::InvalidCredentials);
        }
    };

    if !verify_blocking(request.password, user.password_hash.clone()).await? {
        warn!(user_id = user.id, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = state.tokens.generate_token(user.id, &user.email, user.role)?;
    info!(user_id = user.id, "user logged in");

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&state, &token))
        .json(AuthResponse { token, user }))
}

/// POST /api/auth/logout - Efface le cookie de session
#[post("/logout")]
pub async fn logout() -> HttpResponse {
    let removal = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::ZERO)
        .finish();

    HttpResponse::Ok()
        .cookie(removal)
        .json(serde_json::json!({ "message": "Logged out" }))
}

/// GET /api/auth/me - Compte de l'utilisateur connecté
#[get("/me")]
pub async fn me(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let user: users::Model = Users::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", auth_user.user_id)))?;

    Ok(HttpResponse::Ok().json(user))
}

/// POST /api/auth/change-password
#[post("/change-password")]
pub async fn change_password(
    auth_user: AuthUser,
    body: web::Json<ChangePasswordRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let request = body.into_inner();
    request.validate()?;

    let user = Users::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", auth_user.user_id)))?;

    if !verify_blocking(request.current_password, user.password_hash.clone()).await? {
        return Err(AppError::InvalidCredentials);
    }

    let mut active: UserActiveModel = user.into();
    active.password_hash = Set(hash_blocking(request.new_password).await?);
    active.update(&state.db).await?;

    info!(user_id = auth_user.user_id, "password changed");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Password updated" })))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(register)
            .service(login)
            .service(logout)
            .service(me)
            .service(change_password),
    );
}
