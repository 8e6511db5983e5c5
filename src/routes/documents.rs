use actix_web::http::header;
use actix_web::{delete, get, post, web, HttpResponse};

use crate::middleware::{AuthUser, Permission};
use crate::models::dto::UploadDocumentRequest;
use crate::services::document_service::DocumentService;
use crate::utils::error::AppResult;
use crate::AppState;

/// POST /api/admin/documents - Dépôt par le centre (public ou rattaché)
#[post("/documents")]
pub async fn admin_upload_document(
    auth_user: AuthUser,
    body: web::Json<UploadDocumentRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageDocuments)?;
    let document = DocumentService::upload(&state.db, &state.storage, &auth_user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(document))
}

#[get("/documents")]
pub async fn admin_list_documents(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageDocuments)?;
    Ok(HttpResponse::Ok().json(DocumentService::list_visible(&state.db, &auth_user).await?))
}

#[delete("/documents/{id}")]
pub async fn admin_delete_document(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageDocuments)?;
    DocumentService::delete(&state.db, &state.storage, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/user/documents - Le stagiaire dépose pour lui-même
#[post("/documents")]
pub async fn user_upload_document(
    auth_user: AuthUser,
    body: web::Json<UploadDocumentRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::TraineeSpace)?;
    let document = DocumentService::upload(&state.db, &state.storage, &auth_user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(document))
}

/// GET /api/documents - Documents visibles par l'appelant
#[get("/documents")]
pub async fn list_documents(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(DocumentService::list_visible(&state.db, &auth_user).await?))
}

/// GET /api/documents/{id}/download - Contenu brut avec son type MIME
#[get("/documents/{id}/download")]
pub async fn download_document(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let (document, bytes) = DocumentService::download(&state.db, &state.storage, &auth_user, path.into_inner()).await?;

    let filename = document.nom.replace('"', "");
    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, document.mime_type.as_str()))
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(bytes))
}

pub fn documents_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_documents).service(download_document);
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(admin_upload_document)
        .service(admin_list_documents)
        .service(admin_delete_document);
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(user_upload_document);
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde_json::{json, Value};

    use crate::models::enums::Role;
    use crate::test_utils::{bearer, test_app, test_context};

    #[actix_web::test]
    async fn test_document_visibility_and_download() {
        let ctx = test_context().await;
        let (alice, alice_token) = ctx.create_user("alice@example.com", Role::User).await;
        let (_, bob_token) = ctx.create_user("bob@example.com", Role::User).await;
        let (_, gestionnaire) = ctx.create_user("gestion@example.com", Role::Gestionnaire).await;
        let app = test_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/admin/documents")
            .insert_header(bearer(&gestionnaire))
            .set_json(json!({
                "nom": "programme.pdf",
                "mime_type": "application/pdf",
                "contenu_base64": STANDARD.encode(b"%PDF-programme"),
                "public": true
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/admin/documents")
            .insert_header(bearer(&gestionnaire))
            .set_json(json!({
                "nom": "convocation.txt",
                "mime_type": "text/plain",
                "contenu_base64": STANDARD.encode(b"convocation alice"),
                "user_id": alice.id
            }))
            .to_request();
        let private: Value = test::call_and_read_body_json(&app, req).await;
        let private_id = private["id"].as_i64().unwrap();
        assert!(private.get("storage_key").is_none());

        let req = test::TestRequest::get()
            .uri("/api/documents")
            .insert_header(bearer(&bob_token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().map(|a| a.len()), Some(1));

        let req = test::TestRequest::get()
            .uri("/api/documents")
            .insert_header(bearer(&alice_token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().map(|a| a.len()), Some(2));

        let req = test::TestRequest::get()
            .uri(&format!("/api/documents/{}/download", private_id))
            .insert_header(bearer(&bob_token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri(&format!("/api/documents/{}/download", private_id))
            .insert_header(bearer(&alice_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("content-type").unwrap(), "text/plain");
        let bytes = test::read_body(resp).await;
        assert_eq!(&bytes[..], b"convocation alice");
    }

    #[actix_web::test]
    async fn test_trainee_upload_is_never_public() {
        let ctx = test_context().await;
        let (alice, alice_token) = ctx.create_user("alice@example.com", Role::User).await;
        let (_, bob_token) = ctx.create_user("bob@example.com", Role::User).await;
        let app = test_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/user/documents")
            .insert_header(bearer(&alice_token))
            .set_json(json!({
                "nom": "certificat-medical.txt",
                "mime_type": "text/plain",
                "contenu_base64": STANDARD.encode(b"apte"),
                "public": true
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let document: Value = test::read_body_json(resp).await;
        assert_eq!(document["public"], false);
        assert_eq!(document["user_id"], alice.id);

        let req = test::TestRequest::get()
            .uri("/api/documents")
            .insert_header(bearer(&bob_token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().map(|a| a.len()), Some(0));

        let req = test::TestRequest::post()
            .uri("/api/user/documents")
            .insert_header(bearer(&alice_token))
            .set_json(json!({
                "nom": "vide.txt",
                "mime_type": "text/plain",
                "contenu_base64": "pas du base64 !"
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_large_pdf_upload_is_accepted() {
        let ctx = test_context().await;
        let (_, gestionnaire) = ctx.create_user("gestion@example.com", Role::Gestionnaire).await;
        let app = test_app!(ctx);

        // 3 Mio: plus de 4 Mio une fois encodé
        let pdf = vec![b'%'; 3 * 1024 * 1024];
        let req = test::TestRequest::post()
            .uri("/api/admin/documents")
            .insert_header(bearer(&gestionnaire))
            .set_json(json!({
                "nom": "manuel-technique.pdf",
                "mime_type": "application/pdf",
                "contenu_base64": STANDARD.encode(&pdf),
                "public": true
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let document: Value = test::read_body_json(resp).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/documents/{}/download", document["id"]))
            .insert_header(bearer(&gestionnaire))
            .to_request();
        let bytes = test::call_and_read_body(&app, req).await;
        assert_eq!(bytes.len(), pdf.len());
    }
}
