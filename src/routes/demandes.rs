use actix_web::{delete, get, patch, post, web, HttpResponse};

use crate::middleware::{AuthUser, OwnerSpace, Permission};
use crate::models::dto::{CreateDemandeRequest, DecisionRequest, StatusFilter};
use crate::services::demande_service::DemandeService;
use crate::utils::error::AppResult;
use crate::AppState;

// ---------------------------------------------------------------- stagiaire / client

async fn create_own(
    auth_user: AuthUser,
    body: CreateDemandeRequest,
    state: web::Data<AppState>,
    space: OwnerSpace,
) -> AppResult<HttpResponse> {
    auth_user.authorize(space.permission())?;
    let demande = DemandeService::create(&state.db, auth_user.user_id, body).await?;
    Ok(HttpResponse::Created().json(demande))
}

async fn list_own(auth_user: AuthUser, state: web::Data<AppState>, space: OwnerSpace) -> AppResult<HttpResponse> {
    auth_user.authorize(space.permission())?;
    let demandes = DemandeService::list_for_user(&state.db, auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(demandes))
}

async fn withdraw_own(
    auth_user: AuthUser,
    id: i32,
    state: web::Data<AppState>,
    space: OwnerSpace,
) -> AppResult<HttpResponse> {
    auth_user.authorize(space.permission())?;
    DemandeService::withdraw(&state.db, &auth_user, id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/user/demandes - Demande d'inscription à une session
#[post("/demandes")]
pub async fn create_demande(
    auth_user: AuthUser,
    body: web::Json<CreateDemandeRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    create_own(auth_user, body.into_inner(), state, OwnerSpace::Trainee).await
}

/// GET /api/user/demandes
#[get("/demandes")]
pub async fn my_demandes(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    list_own(auth_user, state, OwnerSpace::Trainee).await
}

/// DELETE /api/user/demandes/{id} - Retrait tant que EN_ATTENTE
#[delete("/demandes/{id}")]
pub async fn withdraw_demande(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    withdraw_own(auth_user, path.into_inner(), state, OwnerSpace::Trainee).await
}

/// POST /api/client/demandes - Inscription portée par un client (entreprise)
#[post("/demandes")]
pub async fn client_create_demande(
    auth_user: AuthUser,
    body: web::Json<CreateDemandeRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    create_own(auth_user, body.into_inner(), state, OwnerSpace::Client).await
}

/// GET /api/client/demandes
#[get("/demandes")]
pub async fn client_demandes(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    list_own(auth_user, state, OwnerSpace::Client).await
}

/// DELETE /api/client/demandes/{id}
#[delete("/demandes/{id}")]
pub async fn client_withdraw_demande(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    withdraw_own(auth_user, path.into_inner(), state, OwnerSpace::Client).await
}

// ---------------------------------------------------------------- centre

/// GET /api/admin/demandes?statut=EN_ATTENTE
#[get("/demandes")]
pub async fn list_demandes(
    auth_user: AuthUser,
    query: web::Query<StatusFilter>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ReviewDemandes)?;
    let demandes = DemandeService::list(&state.db, query.into_inner().statut).await?;
    Ok(HttpResponse::Ok().json(demandes))
}

/// GET /api/admin/demandes/{id}
#[get("/demandes/{id}")]
pub async fn get_demande(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ReviewDemandes)?;
    let demande = DemandeService::get(&state.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(demande))
}

/// PATCH /api/admin/demandes/{id}/statut - VALIDE ou REFUSE
#[patch("/demandes/{id}/statut")]
pub async fn decide_demande(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<DecisionRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ReviewDemandes)?;
    let demande = DemandeService::decide(&state.db, path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(demande))
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_demande)
        .service(my_demandes)
        .service(withdraw_demande);
}

pub fn client_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(client_create_demande)
        .service(client_demandes)
        .service(client_withdraw_demande);
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_demandes)
        .service(get_demande)
        .service(decide_demande);
}
