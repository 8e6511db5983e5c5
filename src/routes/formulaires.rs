use actix_web::{get, patch, post, put, web, HttpResponse};
use validator::Validate;

use crate::middleware::{AuthUser, Permission};
use crate::models::dto::{CorrectionRequest, CreateFormulaireRequest, SessionFilter, SubmitReponseRequest};
use crate::services::formulaire_service::FormulaireService;
use crate::utils::error::AppResult;
use crate::AppState;

// ---------------------------------------------------------------- centre

/// POST /api/admin/formulaires - Questionnaire quotidien d'une session
#[post("/formulaires")]
pub async fn create_formulaire(
    auth_user: AuthUser,
    body: web::Json<CreateFormulaireRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageFormulaires)?;
    let formulaire = FormulaireService::create(&state.db, &auth_user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(formulaire))
}

/// GET /api/admin/formulaires?session=...
#[get("/formulaires")]
pub async fn list_formulaires(
    auth_user: AuthUser,
    query: web::Query<SessionFilter>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageFormulaires)?;
    let formulaires = FormulaireService::list(&state.db, query.into_inner().session).await?;
    Ok(HttpResponse::Ok().json(formulaires))
}

/// PATCH /api/admin/formulaires/{id}/deactivate - Ferme aux nouvelles réponses
#[patch("/formulaires/{id}/deactivate")]
pub async fn deactivate_formulaire(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageFormulaires)?;
    let formulaire = FormulaireService::deactivate(&state.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(formulaire))
}

#[get("/formulaires/{id}/reponses")]
pub async fn list_formulaire_reponses(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageFormulaires)?;
    Ok(HttpResponse::Ok().json(FormulaireService::list_reponses(&state.db, path.into_inner()).await?))
}

/// POST /api/admin/reponses/{id}/correction - VALIDE ou A_CORRIGER
#[post("/reponses/{id}/correction")]
pub async fn correct_reponse(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<CorrectionRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageFormulaires)?;
    let request = body.into_inner();
    request.validate()?;
    let reponse = FormulaireService::correct(&state.db, &auth_user, path.into_inner(), request).await?;
    Ok(HttpResponse::Ok().json(reponse))
}

// ---------------------------------------------------------------- stagiaire

/// GET /api/user/formulaires - Questionnaires ouverts de mes sessions
#[get("/formulaires")]
pub async fn my_formulaires(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::TraineeSpace)?;
    Ok(HttpResponse::Ok().json(FormulaireService::list_active_for_user(&state.db, auth_user.user_id).await?))
}

#[post("/formulaires/{id}/reponses")]
pub async fn submit_reponse(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<SubmitReponseRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::TraineeSpace)?;
    let reponse =
        FormulaireService::submit(&state.db, &auth_user, path.into_inner(), body.into_inner().reponses).await?;
    Ok(HttpResponse::Created().json(reponse))
}

#[get("/reponses")]
pub async fn my_reponses(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::TraineeSpace)?;
    Ok(HttpResponse::Ok().json(FormulaireService::list_reponses_for_user(&state.db, auth_user.user_id).await?))
}

#[get("/reponses/{id}")]
pub async fn my_reponse(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::TraineeSpace)?;
    let reponse = FormulaireService::get_reponse(&state.db, path.into_inner()).await?;
    auth_user.ensure_owner(reponse.user_id)?;
    Ok(HttpResponse::Ok().json(reponse))
}

/// PUT /api/user/reponses/{id} - Nouvelle version après demande de correction
#[put("/reponses/{id}")]
pub async fn resubmit_reponse(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<SubmitReponseRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::TraineeSpace)?;
    let reponse =
        FormulaireService::resubmit(&state.db, &auth_user, path.into_inner(), body.into_inner().reponses).await?;
    Ok(HttpResponse::Ok().json(reponse))
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_formulaire)
        .service(list_formulaires)
        .service(deactivate_formulaire)
        .service(list_formulaire_reponses)
        .service(correct_reponse);
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(my_formulaires)
        .service(submit_reponse)
        .service(my_reponses)
        .service(my_reponse)
        .service(resubmit_reponse);
}
