use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use tracing::info;
use validator::Validate;

use crate::middleware::{AuthUser, Permission};
use crate::models::demande::{Column as DemandeColumn, Entity as Demande};
use crate::models::dto::FormationRequest;
use crate::models::formation::{ActiveModel as FormationActiveModel, Column as FormationColumn, Entity as Formation};
use crate::utils::error::{AppError, AppResult};
use crate::AppState;

fn check_prix(prix_ht: Decimal) -> AppResult<()> {
    if prix_ht < Decimal::ZERO {
        return Err(AppError::Validation("prix_ht: must not be negative".to_string()));
    }
    Ok(())
}

/// GET /api/formations - Catalogue (PUBLIC)
#[get("/formations")]
pub async fn list_formations(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let formations = Formation::find()
        .order_by_asc(FormationColumn::Niveau)
        .order_by_asc(FormationColumn::Titre)
        .all(&state.db)
        .await?;

    Ok(HttpResponse::Ok().json(formations))
}

/// POST /api/admin/formations
#[post("/formations")]
pub async fn create_formation(
    auth_user: AuthUser,
    body: web::Json<FormationRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageFormations)?;
    let request = body.into_inner();
    request.validate()?;
    check_prix(request.prix_ht)?;

    let formation = FormationActiveModel {
        titre: Set(request.titre),
        niveau: Set(request.niveau),
        prix_ht: Set(request.prix_ht),
        duree_jours: Set(request.duree_jours),
        description: Set(request.description),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(formation_id = formation.id, "formation created");
    Ok(HttpResponse::Created().json(formation))
}

/// PUT /api/admin/formations/{id}
#[put("/formations/{id}")]
pub async fn update_formation(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<FormationRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageFormations)?;
    let id = path.into_inner();
    let request = body.into_inner();
    request.validate()?;
    check_prix(request.prix_ht)?;

    let formation = Formation::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("formation {}", id)))?;

    let mut active: FormationActiveModel = formation.into();
    active.titre = Set(request.titre);
    active.niveau = Set(request.niveau);
    active.prix_ht = Set(request.prix_ht);
    active.duree_jours = Set(request.duree_jours);
    active.description = Set(request.description);
    let updated = active.update(&state.db).await?;

    info!(formation_id = id, "formation updated");
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/admin/formations/{id} - refusé si des demandes y sont rattachées
#[delete("/formations/{id}")]
pub async fn delete_formation(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageFormations)?;
    let id = path.into_inner();

    let demandes = Demande::find()
        .filter(DemandeColumn::FormationId.eq(id))
        .count(&state.db)
        .await?;
    if demandes > 0 {
        return Err(AppError::Conflict(format!(
            "Formation {} has {} demande(s) and cannot be deleted",
            id, demandes
        )));
    }

    let result = Formation::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("formation {}", id)));
    }

    info!(formation_id = id, "formation deleted");
    Ok(HttpResponse::NoContent().finish())
}

pub fn formations_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_formations);
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_formation)
        .service(update_formation)
        .service(delete_formation);
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};

    use crate::models::enums::Role;
    use crate::test_utils::{bearer, test_app, test_context};

    #[actix_web::test]
    async fn test_only_admin_manages_catalogue() {
        let ctx = test_context().await;
        let (_, admin) = ctx.create_user("admin@example.com", Role::Admin).await;
        let (_, gestionnaire) = ctx.create_user("gestion@example.com", Role::Gestionnaire).await;
        let app = test_app!(ctx);

        let payload = json!({ "titre": "IRATA Niveau 2", "niveau": 2, "prix_ht": "1350.00", "duree_jours": 5 });

        let req = test::TestRequest::post()
            .uri("/api/admin/formations")
            .set_json(&payload)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/admin/formations")
            .insert_header(bearer(&gestionnaire))
            .set_json(&payload)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/admin/formations")
            .insert_header(bearer(&admin))
            .set_json(&payload)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::get().uri("/api/formations").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().map(|a| a.len()), Some(1));
        assert_eq!(body[0]["titre"], "IRATA Niveau 2");
    }
}
