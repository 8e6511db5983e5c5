use actix_web::{get, post, web, HttpResponse};

use crate::middleware::{AuthUser, Permission};
use crate::models::dto::CreateDiplomeRequest;
use crate::services::diplome_service::DiplomeService;
use crate::utils::error::AppResult;
use crate::AppState;

/// POST /api/admin/diplomes - Délivrance (validité 3 ans)
#[post("/diplomes")]
pub async fn create_diplome(
    auth_user: AuthUser,
    body: web::Json<CreateDiplomeRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageDiplomes)?;
    let diplome = DiplomeService::create(&state.db, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(diplome))
}

#[get("/diplomes")]
pub async fn list_diplomes(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageDiplomes)?;
    Ok(HttpResponse::Ok().json(DiplomeService::list(&state.db).await?))
}

/// GET /api/user/diplomes
#[get("/diplomes")]
pub async fn my_diplomes(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::TraineeSpace)?;
    Ok(HttpResponse::Ok().json(DiplomeService::list_for_user(&state.db, auth_user.user_id).await?))
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_diplome).service(list_diplomes);
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(my_diplomes);
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};

    use crate::models::enums::Role;
    use crate::test_utils::{bearer, test_app, test_context};

    #[actix_web::test]
    async fn test_diplome_issue_and_public_check() {
        let ctx = test_context().await;
        let (alice, alice_token) = ctx.create_user("alice@example.com", Role::User).await;
        let (_, admin) = ctx.create_user("admin@example.com", Role::Admin).await;
        let (_, gestionnaire) = ctx.create_user("gestion@example.com", Role::Gestionnaire).await;
        let formation = ctx.create_formation().await;
        let app = test_app!(ctx);

        let payload = json!({
            "user_id": alice.id,
            "formation_id": formation.id,
            "niveau": 1,
            "date_obtention": "2020-01-15"
        });

        let req = test::TestRequest::post()
            .uri("/api/admin/diplomes")
            .insert_header(bearer(&gestionnaire))
            .set_json(&payload)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/admin/diplomes")
            .insert_header(bearer(&admin))
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let diplome: Value = test::read_body_json(resp).await;
        assert_eq!(diplome["date_expiration"], "2023-01-15");
        let qr = diplome["qr_code"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/api/public/qr/{}", qr))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["type"], "diplome");
        assert_eq!(body["data"]["titulaire"], "Camille Martin");
        assert_eq!(body["data"]["formation"], "IRATA Niveau 1");
        assert_eq!(body["data"]["valide"], false);

        let req = test::TestRequest::get()
            .uri("/api/user/diplomes")
            .insert_header(bearer(&alice_token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().map(|a| a.len()), Some(1));

        let req = test::TestRequest::get().uri("/api/public/qr/INCONNU").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
