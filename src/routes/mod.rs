// ============================================================================
// ROUTES - MODULE PRINCIPAL
// ============================================================================
//
// Arborescence sous /api:
//   - /health, /auth/*, /formations : ouverts (sauf /auth/me et change-password)
//   - /documents, /contributions : tout utilisateur connecté
//   - /public/* : QR codes et financement participatif, sans session
//   - /admin/* : personnel du centre (ADMIN, GESTIONNAIRE)
//   - /user/* : espace stagiaire
//   - /client/* : espace client
//
// Chaque handler vérifie lui-même sa permission via AuthUser::authorize.
//
// ============================================================================

pub mod auth;
pub mod contrats;
pub mod contributions;
pub mod demandes;
pub mod devis;
pub mod diplomes;
pub mod documents;
pub mod formations;
pub mod formulaires;
pub mod health;
pub mod inspections;
pub mod invoices;
pub mod public;
pub mod signatures;
pub mod users;

use actix_web::web;

use crate::services::document_service::MAX_UPLOAD_BODY_BYTES;
use crate::utils::error::AppError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // corps ou query mal formés: même enveloppe d'erreur que le reste de l'API
    cfg.app_data(
        web::JsonConfig::default()
            .limit(MAX_UPLOAD_BODY_BYTES)
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    );

    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(formations::formations_routes)
            .configure(documents::documents_routes)
            .configure(contributions::contributions_routes)
            .configure(public::public_routes)
            .service(
                web::scope("/admin")
                    .configure(users::admin_routes)
                    .configure(formations::admin_routes)
                    .configure(demandes::admin_routes)
                    .configure(devis::admin_routes)
                    .configure(contrats::admin_routes)
                    .configure(invoices::admin_routes)
                    .configure(documents::admin_routes)
                    .configure(inspections::admin_routes)
                    .configure(diplomes::admin_routes)
                    .configure(formulaires::admin_routes)
                    .configure(signatures::admin_routes)
                    .configure(contributions::admin_routes),
            )
            .service(
                web::scope("/user")
                    .configure(demandes::user_routes)
                    .configure(devis::user_routes)
                    .configure(contrats::user_routes)
                    .configure(invoices::user_routes)
                    .configure(documents::user_routes)
                    .configure(diplomes::user_routes)
                    .configure(formulaires::user_routes)
                    .configure(signatures::user_routes),
            )
            .service(
                web::scope("/client")
                    .configure(demandes::client_routes)
                    .configure(devis::client_routes)
                    .configure(contrats::client_routes)
                    .configure(invoices::client_routes),
            ),
    );
}
