use actix_web::{get, patch, web, HttpResponse};
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use tracing::info;

use crate::middleware::{AuthUser, Permission};
use crate::models::dto::UpdateRoleRequest;
use crate::models::enums::Role;
use crate::models::users::{ActiveModel as UserActiveModel, Column as UserColumn, Entity as Users};
use crate::utils::error::{AppError, AppResult};
use crate::AppState;

/// GET /api/admin/users
#[get("/users")]
pub async fn list_users(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageUsers)?;
    let users = Users::find()
        .order_by_asc(UserColumn::Nom)
        .order_by_asc(UserColumn::Prenom)
        .all(&state.db)
        .await?;
    Ok(HttpResponse::Ok().json(users))
}

/// PATCH /api/admin/users/{id}/role - Seul moyen d'obtenir un rôle du personnel
#[patch("/users/{id}/role")]
pub async fn update_role(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<UpdateRoleRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageUsers)?;
    let id = path.into_inner();
    let role = body.into_inner().role;

    // garde au moins l'administrateur courant
    if id == auth_user.user_id && role != Role::Admin {
        return Err(AppError::Conflict("An administrator cannot demote themselves".to_string()));
    }

    let user = Users::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;
    let previous = user.role;

    let mut active: UserActiveModel = user.into();
    active.role = Set(role);
    let updated = active.update(&state.db).await?;

    info!(user_id = id, from = ?previous, to = ?role, changed_by = auth_user.user_id, "role updated");
    Ok(HttpResponse::Ok().json(updated))
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_users).service(update_role);
}
