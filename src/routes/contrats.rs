use actix_web::{get, post, web, HttpResponse};
use validator::Validate;

use crate::middleware::{AuthUser, OwnerSpace, Permission};
use crate::models::dto::{CreateContratRequest, SignatureRequest};
use crate::services::contrat_service::ContratService;
use crate::utils::error::AppResult;
use crate::AppState;

// ---------------------------------------------------------------- centre

/// POST /api/admin/contrats - Contrat depuis un devis VALIDE
#[post("/contrats")]
pub async fn create_contrat(
    auth_user: AuthUser,
    body: web::Json<CreateContratRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageContrats)?;
    let contrat = ContratService::create(&state.db, body.devis_id).await?;
    Ok(HttpResponse::Created().json(contrat))
}

/// GET /api/admin/contrats
#[get("/contrats")]
pub async fn list_contrats(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageContrats)?;
    Ok(HttpResponse::Ok().json(ContratService::list(&state.db).await?))
}

/// GET /api/admin/contrats/{id}
#[get("/contrats/{id}")]
pub async fn get_contrat(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageContrats)?;
    Ok(HttpResponse::Ok().json(ContratService::get(&state.db, path.into_inner()).await?))
}

/// POST /api/admin/contrats/{id}/sign - Signature du centre (ADMIN)
#[post("/contrats/{id}/sign")]
pub async fn sign_contrat_as_centre(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<SignatureRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::SignAsCentre)?;
    let request = body.into_inner();
    request.validate()?;
    let contrat = ContratService::sign_as_centre(&state.db, path.into_inner(), request.signature).await?;
    Ok(HttpResponse::Ok().json(contrat))
}

/// POST /api/admin/contrats/{id}/publish - Rend le contrat visible au signataire
#[post("/contrats/{id}/publish")]
pub async fn publish_contrat(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageContrats)?;
    let contrat = ContratService::publish(&state.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(contrat))
}

// ---------------------------------------------------------------- stagiaire / client

async fn list_own(auth_user: AuthUser, state: web::Data<AppState>, space: OwnerSpace) -> AppResult<HttpResponse> {
    auth_user.authorize(space.permission())?;
    Ok(HttpResponse::Ok().json(ContratService::list_for_owner(&state.db, auth_user.user_id).await?))
}

async fn get_own(
    auth_user: AuthUser,
    id: i32,
    state: web::Data<AppState>,
    space: OwnerSpace,
) -> AppResult<HttpResponse> {
    auth_user.authorize(space.permission())?;
    Ok(HttpResponse::Ok().json(ContratService::get_for_owner(&state.db, &auth_user, id).await?))
}

async fn sign_own(
    auth_user: AuthUser,
    id: i32,
    request: SignatureRequest,
    state: web::Data<AppState>,
    space: OwnerSpace,
) -> AppResult<HttpResponse> {
    auth_user.authorize(space.permission())?;
    request.validate()?;
    let contrat = ContratService::sign_as_owner(&state.db, &auth_user, id, request.signature).await?;
    Ok(HttpResponse::Ok().json(contrat))
}

#[get("/contrats")]
pub async fn user_list_contrats(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    list_own(auth_user, state, OwnerSpace::Trainee).await
}

#[get("/contrats/{id}")]
pub async fn user_get_contrat(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    get_own(auth_user, path.into_inner(), state, OwnerSpace::Trainee).await
}

/// POST /api/user/contrats/{id}/sign
#[post("/contrats/{id}/sign")]
pub async fn user_sign_contrat(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<SignatureRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    sign_own(auth_user, path.into_inner(), body.into_inner(), state, OwnerSpace::Trainee).await
}

#[get("/contrats")]
pub async fn client_list_contrats(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    list_own(auth_user, state, OwnerSpace::Client).await
}

#[get("/contrats/{id}")]
pub async fn client_get_contrat(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    get_own(auth_user, path.into_inner(), state, OwnerSpace::Client).await
}

/// POST /api/client/contrats/{id}/sign
#[post("/contrats/{id}/sign")]
pub async fn client_sign_contrat(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<SignatureRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    sign_own(auth_user, path.into_inner(), body.into_inner(), state, OwnerSpace::Client).await
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_contrat)
        .service(list_contrats)
        .service(get_contrat)
        .service(sign_contrat_as_centre)
        .service(publish_contrat);
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(user_list_contrats)
        .service(user_get_contrat)
        .service(user_sign_contrat);
}

pub fn client_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(client_list_contrats)
        .service(client_get_contrat)
        .service(client_sign_contrat);
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};

    use crate::models::enums::{DecisionStatus, Role};
    use crate::test_utils::{bearer, test_app, test_context};

    #[actix_web::test]
    async fn test_contrat_workflow_over_http() {
        let ctx = test_context().await;
        let (alice, alice_token) = ctx.create_user("alice@example.com", Role::User).await;
        let (_, admin) = ctx.create_user("admin@example.com", Role::Admin).await;
        let (_, gestionnaire) = ctx.create_user("gestion@example.com", Role::Gestionnaire).await;
        let formation = ctx.create_formation().await;
        let demande = ctx
            .create_demande(alice.id, formation.id, "octobre", DecisionStatus::Valide)
            .await;
        let app = test_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/admin/devis")
            .insert_header(bearer(&gestionnaire))
            .set_json(json!({ "demande_id": demande.id, "montant_ht": 1000 }))
            .to_request();
        let devis: Value = test::call_and_read_body_json(&app, req).await;
        let devis_id = devis["id"].as_i64().unwrap();

        // devis encore EN_ATTENTE
        let req = test::TestRequest::post()
            .uri("/api/admin/contrats")
            .insert_header(bearer(&gestionnaire))
            .set_json(json!({ "devis_id": devis_id }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/admin/devis/{}/statut", devis_id))
            .insert_header(bearer(&gestionnaire))
            .set_json(json!({ "statut": "VALIDE" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/admin/contrats")
            .insert_header(bearer(&gestionnaire))
            .set_json(json!({ "devis_id": devis_id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let contrat: Value = test::read_body_json(resp).await;
        let id = contrat["id"].as_i64().unwrap();

        let req = test::TestRequest::post()
            .uri("/api/admin/contrats")
            .insert_header(bearer(&gestionnaire))
            .set_json(json!({ "devis_id": devis_id }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        // signature du centre réservée à l'ADMIN
        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/contrats/{}/sign", id))
            .insert_header(bearer(&gestionnaire))
            .set_json(json!({ "signature": "data:image/png;base64,AAAA" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/contrats/{}/publish", id))
            .insert_header(bearer(&admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/contrats/{}/sign", id))
            .insert_header(bearer(&admin))
            .set_json(json!({ "signature": "data:image/png;base64,AAAA" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        // signé mais pas encore publié: invisible pour le stagiaire
        let req = test::TestRequest::get()
            .uri(&format!("/api/user/contrats/{}", id))
            .insert_header(bearer(&alice_token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/contrats/{}/publish", id))
            .insert_header(bearer(&admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri(&format!("/api/user/contrats/{}/sign", id))
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "signature": "data:image/png;base64,BBBB" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["statut"], "completed");
    }
}
