use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;

use crate::middleware::{AuthUser, OwnerSpace, Permission};
use crate::models::dto::{ConfirmPaymentRequest, CreateInvoiceRequest, ManualPaymentRequest, PaymentIntentRequest};
use crate::services::invoice_service::InvoiceService;
use crate::utils::error::AppResult;
use crate::AppState;

// ---------------------------------------------------------------- centre

/// POST /api/admin/invoices - Facture sur contrat (montant par défaut: TTC du devis)
#[post("/invoices")]
pub async fn create_invoice(
    auth_user: AuthUser,
    body: web::Json<CreateInvoiceRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageInvoices)?;
    let request = body.into_inner();
    let invoice =
        InvoiceService::create(&state.db, request.contrat_id, request.montant, Utc::now().date_naive()).await?;
    Ok(HttpResponse::Created().json(invoice))
}

#[get("/invoices")]
pub async fn list_invoices(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageInvoices)?;
    Ok(HttpResponse::Ok().json(InvoiceService::list(&state.db).await?))
}

#[get("/invoices/{id}")]
pub async fn get_invoice(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageInvoices)?;
    Ok(HttpResponse::Ok().json(InvoiceService::get(&state.db, path.into_inner()).await?))
}

/// GET /api/admin/invoices/{id}/payments - Historique des règlements
#[get("/invoices/{id}/payments")]
pub async fn list_invoice_payments(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageInvoices)?;
    let id = path.into_inner();
    InvoiceService::get(&state.db, id).await?;
    Ok(HttpResponse::Ok().json(InvoiceService::payments(&state.db, id).await?))
}

/// POST /api/admin/invoices/{id}/payments - Règlement hors ligne
#[post("/invoices/{id}/payments")]
pub async fn record_payment(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<ManualPaymentRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth_user.authorize(Permission::ManageInvoices)?;
    let invoice = InvoiceService::record_manual_payment(&state.db, path.into_inner(), body.montant).await?;
    Ok(HttpResponse::Ok().json(invoice))
}

// ---------------------------------------------------------------- stagiaire / client

async fn list_own(auth_user: AuthUser, state: web::Data<AppState>, space: OwnerSpace) -> AppResult<HttpResponse> {
    auth_user.authorize(space.permission())?;
    Ok(HttpResponse::Ok().json(InvoiceService::list_for_owner(&state.db, auth_user.user_id).await?))
}

async fn get_own(
    auth_user: AuthUser,
    id: i32,
    state: web::Data<AppState>,
    space: OwnerSpace,
) -> AppResult<HttpResponse> {
    auth_user.authorize(space.permission())?;
    Ok(HttpResponse::Ok().json(InvoiceService::get_for_owner(&state.db, &auth_user, id).await?))
}

async fn payment_intent(
    auth_user: AuthUser,
    id: i32,
    body: Option<web::Json<PaymentIntentRequest>>,
    state: web::Data<AppState>,
    space: OwnerSpace,
) -> AppResult<HttpResponse> {
    auth_user.authorize(space.permission())?;
    let request = body.map(|b| b.into_inner()).unwrap_or_default();
    let intent =
        InvoiceService::create_payment_intent(&state.db, &state.payments, &auth_user, id, request.montant).await?;
    Ok(HttpResponse::Created().json(intent))
}

async fn confirm_payment(
    auth_user: AuthUser,
    id: i32,
    request: ConfirmPaymentRequest,
    state: web::Data<AppState>,
    space: OwnerSpace,
) -> AppResult<HttpResponse> {
    auth_user.authorize(space.permission())?;
    let confirmation = InvoiceService::confirm_payment(
        &state.db,
        &state.payments,
        &auth_user,
        id,
        &request.payment_intent_id,
    )
    .await?;
    Ok(HttpResponse::Ok().json(confirmation))
}

#[get("/invoices")]
pub async fn user_list_invoices(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    list_own(auth_user, state, OwnerSpace::Trainee).await
}

#[get("/invoices/{id}")]
pub async fn user_get_invoice(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    get_own(auth_user, path.into_inner(), state, OwnerSpace::Trainee).await
}

/// POST /api/user/invoices/{id}/payment-intent - corps optionnel { "montant": ... }
#[post("/invoices/{id}/payment-intent")]
pub async fn user_payment_intent(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: Option<web::Json<PaymentIntentRequest>>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    payment_intent(auth_user, path.into_inner(), body, state, OwnerSpace::Trainee).await
}

#[post("/invoices/{id}/confirm-payment")]
pub async fn user_confirm_payment(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<ConfirmPaymentRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    confirm_payment(auth_user, path.into_inner(), body.into_inner(), state, OwnerSpace::Trainee).await
}

#[get("/invoices")]
pub async fn client_list_invoices(auth_user: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    list_own(auth_user, state, OwnerSpace::Client).await
}

#[get("/invoices/{id}")]
pub async fn client_get_invoice(
    auth_user: AuthUser,
    path: web::Path<i32>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    get_own(auth_user, path.into_inner(), state, OwnerSpace::Client).await
}

#[post("/invoices/{id}/payment-intent")]
pub async fn client_payment_intent(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: Option<web::Json<PaymentIntentRequest>>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    payment_intent(auth_user, path.into_inner(), body, state, OwnerSpace::Client).await
}

#[post("/invoices/{id}/confirm-payment")]
pub async fn client_confirm_payment(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<ConfirmPaymentRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    confirm_payment(auth_user, path.into_inner(), body.into_inner(), state, OwnerSpace::Client).await
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_invoice)
        .service(list_invoices)
        .service(get_invoice)
        .service(list_invoice_payments)
        .service(record_payment);
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(user_list_invoices)
        .service(user_get_invoice)
        .service(user_payment_intent)
        .service(user_confirm_payment);
}

pub fn client_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(client_list_invoices)
        .service(client_get_invoice)
        .service(client_payment_intent)
        .service(client_confirm_payment);
}
