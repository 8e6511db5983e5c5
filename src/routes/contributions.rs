use actix_web::{get, post, web, HttpResponse};

use crate::middleware::{AuthUser, Permission};
use crate::models::dto::CreateContributionRequest;
use crate::services::contribution_service::ContributionService;
use crate::utils::error::AppResult;
use crate::AppState;

/// POST /api/contributions - Ouvre un paiement de contribution
#[post("/contributions")]
pub async fn create_contribution(
    auth_user: AuthUser,
    body: web::Json<CreateContributionRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::Contribute)?;
    let created = ContributionService::create(&state.db, &state.payments, &auth_user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

#[get("/contributions/mine")]
pub async fn my_contributions(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::Contribute)?;
    Ok(HttpResponse::Ok().json(ContributionService::list_for_user(&state.db, auth_user.user_id).await?))
}

/// POST /api/contributions/{id}/confirm - Statut final auprès du processeur
#[post("/contributions/{id}/confirm")]
pub async fn confirm_contribution(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::Contribute)?;
    let contribution =
        ContributionService::confirm(&state.db, &state.payments, &auth_user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(contribution))
}

/// GET /api/admin/contributions - Toutes les contributions (ADMIN)
#[get("/contributions")]
pub async fn list_contributions(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ViewContributions)?;
    Ok(HttpResponse::Ok().json(ContributionService::list(&state.db).await?))
}

pub fn contributions_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_contribution)
        .service(my_contributions)
        .service(confirm_contribution);
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_contributions);
}
