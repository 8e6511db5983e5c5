use actix_web::{delete, get, post, web, HttpResponse};
use chrono::Utc;

use crate::middleware::{AuthUser, Permission};
use crate::models::dto::{CreateDetailedInspectionRequest, CreateInspectionRequest};
use crate::services::inspection_service::InspectionService;
use crate::utils::error::AppResult;
use crate::AppState;

// ---------------------------------------------------------------- contrôle périodique

/// POST /api/admin/inspections - numéro CI.ICE + QR code attribués
#[post("/inspections")]
pub async fn create_inspection(
    auth_user: AuthUser,
    body: web::Json<CreateInspectionRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageInspections)?;
    let inspection =
        InspectionService::create(&state.db, &auth_user, body.into_inner(), Utc::now().date_naive()).await?;
    Ok(HttpResponse::Created().json(inspection))
}

#[get("/inspections")]
pub async fn list_inspections(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageInspections)?;
    Ok(HttpResponse::Ok().json(InspectionService::list(&state.db).await?))
}

#[get("/inspections/{id}")]
pub async fn get_inspection(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageInspections)?;
    Ok(HttpResponse::Ok().json(InspectionService::get(&state.db, path.into_inner()).await?))
}

#[delete("/inspections/{id}")]
pub async fn delete_inspection(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageInspections)?;
    InspectionService::delete(&state.db, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ---------------------------------------------------------------- examen approfondi

/// POST /api/admin/inspections-detaillees - verdict global déduit des points
#[post("/inspections-detaillees")]
pub async fn create_detailed_inspection(
    auth_user: AuthUser,
    body: web::Json<CreateDetailedInspectionRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageInspections)?;
    let inspection =
        InspectionService::create_detailed(&state.db, &auth_user, body.into_inner(), Utc::now().date_naive())
            .await?;
    Ok(HttpResponse::Created().json(inspection))
}

#[get("/inspections-detaillees")]
pub async fn list_detailed_inspections(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageInspections)?;
    Ok(HttpResponse::Ok().json(InspectionService::list_detailed(&state.db).await?))
}

#[get("/inspections-detaillees/{id}")]
pub async fn get_detailed_inspection(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageInspections)?;
    Ok(HttpResponse::Ok().json(InspectionService::get_detailed(&state.db, path.into_inner()).await?))
}

#[delete("/inspections-detaillees/{id}")]
pub async fn delete_detailed_inspection(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageInspections)?;
    InspectionService::delete_detailed(&state.db, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_inspection)
        .service(list_inspections)
        .service(get_inspection)
        .service(delete_inspection)
        .service(create_detailed_inspection)
        .service(list_detailed_inspections)
        .service(get_detailed_inspection)
        .service(delete_detailed_inspection);
}
