use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use chrono::Utc;
use validator::Validate;

use crate::middleware::{AuthUser, OwnerSpace, Permission};
use crate::models::dto::{CreateDevisRequest, DecisionRequest, GenerateNumbersQuery, UpdateDevisRequest};
use crate::services::devis_service::DevisService;
use crate::utils::error::AppResult;
use crate::AppState;

// ---------------------------------------------------------------- centre

/// GET /api/admin/devis/generate-numbers?session=... - Réserve numéro + référence session
#[get("/devis/generate-numbers")]
pub async fn generate_numbers(
    auth_user: AuthUser,
    query: web::Query<GenerateNumbersQuery>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageDevis)?;
    let query = query.into_inner();
    query.validate()?;

    let numbers = DevisService::generate_numbers(&state.db, &query.session, Utc::now().date_naive()).await?;
    Ok(HttpResponse::Ok().json(numbers))
}

/// POST /api/admin/devis
#[post("/devis")]
pub async fn create_devis(
    auth_user: AuthUser,
    body: web::Json<CreateDevisRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageDevis)?;
    let devis = DevisService::create(&state.db, body.into_inner(), Utc::now().date_naive()).await?;
    Ok(HttpResponse::Created().json(devis))
}

/// GET /api/admin/devis
#[get("/devis")]
pub async fn list_devis(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageDevis)?;
    Ok(HttpResponse::Ok().json(DevisService::list(&state.db).await?))
}

/// GET /api/admin/devis/{id}
#[get("/devis/{id}")]
pub async fn get_devis(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageDevis)?;
    Ok(HttpResponse::Ok().json(DevisService::get(&state.db, path.into_inner()).await?))
}

/// PUT /api/admin/devis/{id} - tant que EN_ATTENTE
#[put("/devis/{id}")]
pub async fn update_devis(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<UpdateDevisRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageDevis)?;
    let devis = DevisService::update(&state.db, path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(devis))
}

/// PATCH /api/admin/devis/{id}/statut
#[patch("/devis/{id}/statut")]
pub async fn decide_devis(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<DecisionRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageDevis)?;
    let devis = DevisService::decide(&state.db, path.into_inner(), body.into_inner().statut).await?;
    Ok(HttpResponse::Ok().json(devis))
}

/// DELETE /api/admin/devis/{id} - ADMIN uniquement
#[delete("/devis/{id}")]
pub async fn delete_devis(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::DeleteDevis)?;
    DevisService::delete(&state.db, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ---------------------------------------------------------------- stagiaire / client

async fn list_own(auth_user: AuthUser, state: web::Data<AppState>, space: OwnerSpace) -> AppResult<HttpResponse> {
    auth_user.authorize(space.permission())?;
    Ok(HttpResponse::Ok().json(DevisService::list_for_owner(&state.db, auth_user.user_id).await?))
}

async fn get_own(
    auth_user: AuthUser,
    id: i32,
    state: web::Data<AppState>,
    space: OwnerSpace,
) -> AppResult<HttpResponse> {
    auth_user.authorize(space.permission())?;
    Ok(HttpResponse::Ok().json(DevisService::get_for_owner(&state.db, &auth_user, id).await?))
}

/// GET /api/user/devis
#[get("/devis")]
pub async fn user_list_devis(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    list_own(auth_user, state, OwnerSpace::Trainee).await
}

/// GET /api/user/devis/{id}
#[get("/devis/{id}")]
pub async fn user_get_devis(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    get_own(auth_user, path.into_inner(), state, OwnerSpace::Trainee).await
}

/// GET /api/client/devis
#[get("/devis")]
pub async fn client_list_devis(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    list_own(auth_user, state, OwnerSpace::Client).await
}

/// GET /api/client/devis/{id}
#[get("/devis/{id}")]
pub async fn client_get_devis(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    get_own(auth_user, path.into_inner(), state, OwnerSpace::Client).await
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    // generate-numbers avant {id}
    cfg.service(generate_numbers)
        .service(create_devis)
        .service(list_devis)
        .service(get_devis)
        .service(update_devis)
        .service(decide_devis)
        .service(delete_devis);
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(user_list_devis).service(user_get_devis);
}

pub fn client_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(client_list_devis).service(client_get_devis);
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    use crate::models::enums::{DecisionStatus, Role};
    use crate::test_utils::{bearer, test_app, test_context};

    #[actix_web::test]
    async fn test_generate_numbers_requires_staff_and_never_repeats() {
        let ctx = test_context().await;
        let (_, gestionnaire) = ctx.create_user("gestion@example.com", Role::Gestionnaire).await;
        let (_, stagiaire) = ctx.create_user("stagiaire@example.com", Role::User).await;
        let app = test_app!(ctx);

        let req = test::TestRequest::get()
            .uri("/api/admin/devis/generate-numbers?session=octobre")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/admin/devis/generate-numbers?session=octobre")
            .insert_header(bearer(&stagiaire))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let mut seen = Vec::new();
        for _ in 0..2 {
            let req = test::TestRequest::get()
                .uri("/api/admin/devis/generate-numbers?session=octobre")
                .insert_header(bearer(&gestionnaire))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            let numero = body["numero"].as_str().unwrap().to_string();
            assert!(numero.starts_with("CI.DEV "));
            assert!(body["referenceSession"].as_str().unwrap().starts_with("CI.DES "));
            seen.push(numero);
        }
        assert_ne!(seen[0], seen[1]);

        let req = test::TestRequest::get()
            .uri("/api/admin/devis/generate-numbers?session=")
            .insert_header(bearer(&gestionnaire))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_owner_cannot_read_other_devis() {
        let ctx = test_context().await;
        let (alice, alice_token) = ctx.create_user("alice@example.com", Role::User).await;
        let (_, bob_token) = ctx.create_user("bob@example.com", Role::User).await;
        let (_, admin) = ctx.create_user("admin@example.com", Role::Admin).await;
        let (_, client) = ctx.create_user("client@example.com", Role::Client).await;
        let formation = ctx.create_formation().await;
        let demande = ctx
            .create_demande(alice.id, formation.id, "octobre", DecisionStatus::Valide)
            .await;
        let app = test_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/admin/devis")
            .insert_header(bearer(&admin))
            .set_json(json!({ "demande_id": demande.id, "montant_ht": "1200.00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let devis: Value = test::read_body_json(resp).await;
        let id = devis["id"].as_i64().unwrap();
        let ttc: Decimal = devis["montant_ttc"].as_str().unwrap().parse().unwrap();
        assert_eq!(ttc, Decimal::new(1440, 0));

        let req = test::TestRequest::get()
            .uri(&format!("/api/user/devis/{}", id))
            .insert_header(bearer(&alice_token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/api/user/devis/{}", id))
            .insert_header(bearer(&bob_token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        // l'espace client est fermé aux stagiaires
        let req = test::TestRequest::get()
            .uri("/api/client/devis")
            .insert_header(bearer(&alice_token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/api/client/devis")
            .insert_header(bearer(&client))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().map(|a| a.len()), Some(0));
    }
}
