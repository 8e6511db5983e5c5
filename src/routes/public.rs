use actix_web::{get, web, HttpResponse};
use chrono::Utc;

use crate::services::contribution_service::ContributionService;
use crate::services::diplome_service::DiplomeService;
use crate::utils::error::AppResult;
use crate::AppState;

/// GET /api/public/qr/{code} - Fiche d'inspection ou diplôme (PUBLIC)
#[get("/qr/{code}")]
pub async fn lookup_qr(path: web::Path<String>, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let lookup = DiplomeService::lookup_qr(&state.db, &path.into_inner(), Utc::now().date_naive()).await?;
    Ok(HttpResponse::Ok().json(lookup))
}

/// GET /api/public/crowdfunding - Objectif, total collecté et messages (PUBLIC)
#[get("/crowdfunding")]
pub async fn crowdfunding(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let summary = ContributionService::summary(&state.db, state.config.crowdfunding_goal).await?;
    Ok(HttpResponse::Ok().json(summary))
}

pub fn public_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/public").service(lookup_qr).service(crowdfunding));
}
