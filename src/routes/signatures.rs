use actix_web::{get, post, web, HttpResponse};
use validator::Validate;

use crate::middleware::{AuthUser, Permission};
use crate::models::dto::{CreateInductionRequest, DisclaimerRequest, SessionFilter, SignatureRequest};
use crate::services::signature_service::SignatureService;
use crate::utils::error::AppResult;
use crate::AppState;

// ---------------------------------------------------------------- centre

/// GET /api/admin/irata-disclaimers?session=...
#[get("/irata-disclaimers")]
pub async fn list_disclaimers(
    auth_user: AuthUser,
    query: web::Query<SessionFilter>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageSignatures)?;
    let disclaimers = SignatureService::list_disclaimers(&state.db, query.into_inner().session).await?;
    Ok(HttpResponse::Ok().json(disclaimers))
}

/// POST /api/admin/irata-disclaimers/{id}/acknowledge - Fige la décharge
#[post("/irata-disclaimers/{id}/acknowledge")]
pub async fn acknowledge_disclaimer(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageSignatures)?;
    let disclaimer = SignatureService::acknowledge_disclaimer(&state.db, &auth_user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(disclaimer))
}

#[post("/inductions")]
pub async fn create_induction(
    auth_user: AuthUser,
    body: web::Json<CreateInductionRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageSignatures)?;
    let induction = SignatureService::create_induction(&state.db, &auth_user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(induction))
}

#[get("/inductions")]
pub async fn list_inductions(
    auth_user: AuthUser,
    query: web::Query<SessionFilter>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageSignatures)?;
    let inductions = SignatureService::list_inductions(&state.db, query.into_inner().session).await?;
    Ok(HttpResponse::Ok().json(inductions))
}

#[get("/inductions/{id}")]
pub async fn get_induction(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageSignatures)?;
    Ok(HttpResponse::Ok().json(SignatureService::get_induction(&state.db, path.into_inner()).await?))
}

/// POST /api/admin/inductions/{id}/sign - Signature du centre (ADMIN)
#[post("/inductions/{id}/sign")]
pub async fn sign_induction(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<SignatureRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::SignAsCentre)?;
    let request = body.into_inner();
    request.validate()?;
    let induction = SignatureService::sign_induction(&state.db, path.into_inner(), request.signature).await?;
    Ok(HttpResponse::Ok().json(induction))
}

#[post("/inductions/{id}/publish")]
pub async fn publish_induction(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageSignatures)?;
    let induction = SignatureService::publish_induction(&state.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(induction))
}

/// GET /api/admin/inductions/{id}/signatures - Émargement des stagiaires
#[get("/inductions/{id}/signatures")]
pub async fn list_induction_signatures(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageSignatures)?;
    let signatures = SignatureService::list_induction_signatures(&state.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(signatures))
}

// ---------------------------------------------------------------- stagiaire

/// POST /api/user/irata-disclaimer - Dépôt ou remplacement avant accusé de réception
#[post("/irata-disclaimer")]
pub async fn submit_disclaimer(
    auth_user: AuthUser,
    body: web::Json<DisclaimerRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::TraineeSpace)?;
    let disclaimer = SignatureService::submit_disclaimer(&state.db, &auth_user, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(disclaimer))
}

#[get("/irata-disclaimer")]
pub async fn my_disclaimers(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::TraineeSpace)?;
    Ok(HttpResponse::Ok().json(SignatureService::list_disclaimers_for_user(&state.db, auth_user.user_id).await?))
}

/// GET /api/user/inductions - Inductions publiées de mes sessions
#[get("/inductions")]
pub async fn my_inductions(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::TraineeSpace)?;
    Ok(HttpResponse::Ok().json(SignatureService::inductions_for_trainee(&state.db, auth_user.user_id).await?))
}

#[post("/inductions/{id}/sign")]
pub async fn sign_induction_as_trainee(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<SignatureRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::TraineeSpace)?;
    let request = body.into_inner();
    request.validate()?;
    let signature =
        SignatureService::sign_as_trainee(&state.db, &auth_user, path.into_inner(), request.signature).await?;
    Ok(HttpResponse::Created().json(signature))
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_disclaimers)
        .service(acknowledge_disclaimer)
        .service(create_induction)
        .service(list_inductions)
        .service(get_induction)
        .service(sign_induction)
        .service(publish_induction)
        .service(list_induction_signatures);
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(submit_disclaimer)
        .service(my_disclaimers)
        .service(my_inductions)
        .service(sign_induction_as_trainee);
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};

    use crate::models::enums::{DecisionStatus, Role};
    use crate::test_utils::{bearer, test_app, test_context};

    #[actix_web::test]
    async fn test_disclaimer_is_frozen_once_acknowledged() {
        let ctx = test_context().await;
        let (_, alice_token) = ctx.create_user("alice@example.com", Role::User).await;
        let (_, gestionnaire) = ctx.create_user("gestion@example.com", Role::Gestionnaire).await;
        let app = test_app!(ctx);

        let payload = |signature: &str| {
            json!({
                "session": "octobre",
                "nom": "Martin",
                "prenom": "Camille",
                "signature": signature
            })
        };

        let req = test::TestRequest::post()
            .uri("/api/user/irata-disclaimer")
            .insert_header(bearer(&alice_token))
            .set_json(payload("v1"))
            .to_request();
        let first: Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/user/irata-disclaimer")
            .insert_header(bearer(&alice_token))
            .set_json(payload("v2"))
            .to_request();
        let second: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(first["id"], second["id"]);
        assert_eq!(second["signature"], "v2");

        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/irata-disclaimers/{}/acknowledge", second["id"]))
            .insert_header(bearer(&gestionnaire))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/user/irata-disclaimer")
            .insert_header(bearer(&alice_token))
            .set_json(payload("v3"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get()
            .uri("/api/admin/irata-disclaimers?session=octobre")
            .insert_header(bearer(&gestionnaire))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().map(|a| a.len()), Some(1));
    }

    #[actix_web::test]
    async fn test_induction_signature_circuit() {
        let ctx = test_context().await;
        let (alice, alice_token) = ctx.create_user("alice@example.com", Role::User).await;
        let (_, bob_token) = ctx.create_user("bob@example.com", Role::User).await;
        let (_, admin) = ctx.create_user("admin@example.com", Role::Admin).await;
        let formation = ctx.create_formation().await;
        ctx.create_demande(alice.id, formation.id, "octobre", DecisionStatus::Valide)
            .await;
        let app = test_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/admin/inductions")
            .insert_header(bearer(&admin))
            .set_json(json!({ "session": "octobre", "contenu": { "sections": ["sécurité", "secours"] } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let induction: Value = test::read_body_json(resp).await;
        let id = induction["id"].as_i64().unwrap();

        let req = test::TestRequest::post()
            .uri(&format!("/api/user/inductions/{}/sign", id))
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "signature": "alice" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        for action in ["sign", "publish"] {
            let req = test::TestRequest::post()
                .uri(&format!("/api/admin/inductions/{}/{}", id, action))
                .insert_header(bearer(&admin))
                .set_json(json!({ "signature": "centre" }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }

        let req = test::TestRequest::get()
            .uri("/api/user/inductions")
            .insert_header(bearer(&alice_token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().map(|a| a.len()), Some(1));
        assert!(body[0]["trainee_signed_at"].is_null());

        // bob n'est pas inscrit à la session
        let req = test::TestRequest::post()
            .uri(&format!("/api/user/inductions/{}/sign", id))
            .insert_header(bearer(&bob_token))
            .set_json(json!({ "signature": "bob" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri(&format!("/api/user/inductions/{}/sign", id))
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "signature": "alice" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri(&format!("/api/user/inductions/{}/sign", id))
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "signature": "alice" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get()
            .uri(&format!("/api/admin/inductions/{}/signatures", id))
            .insert_header(bearer(&admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().map(|a| a.len()), Some(1));
    }
}
