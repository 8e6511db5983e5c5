use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::middleware::AuthUser;
use crate::models::dto::PaymentIntentResponse;
use crate::models::enums::{InvoiceStatus, PaymentStatus};
use crate::models::{contrat, devis, invoice, invoice_payment};
use crate::services::ensure_positive;
use crate::services::numbering_service::{NumberingService, SequenceKind};
use crate::services::payment::PaymentProcessor;
use crate::utils::error::{AppError, AppResult};

pub const CURRENCY: &str = "EUR";

/// Statut déduit du montant réglé
pub fn derive_status(total: Decimal, paid: Decimal) -> InvoiceStatus {
    if paid <= Decimal::ZERO {
        InvoiceStatus::Pending
    } else if paid < total {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Paid
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentConfirmation {
    pub invoice: invoice::Model,
    pub payment_status: PaymentStatus,
    /// Montant encaissé au-delà du total, à rembourser
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overpaid: Option<Decimal>,
}

/// Règlement qui dépasserait le total de la facture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overflow {
    /// saisie du centre: refusée
    Reject,
    /// capture déjà faite chez le processeur: enregistrée quand même
    Record,
}

pub struct InvoiceService;

impl InvoiceService {
    pub async fn create(
        db: &DatabaseConnection,
        contrat_id: i32,
        montant: Option<Decimal>,
        today: NaiveDate,
    ) -> AppResult<invoice::Model> {
        let contrat = contrat::Entity::find_by_id(contrat_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("contrat {}", contrat_id)))?;

        let montant = match montant {
            Some(montant) => montant,
            None => {
                devis::Entity::find_by_id(contrat.devis_id)
                    .one(db)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("devis {}", contrat.devis_id)))?
                    .montant_ttc
            }
        };
        ensure_positive(montant, "montant")?;

        let numero = NumberingService::next_numero(db, SequenceKind::Facture, today, None).await?;
        let now = Utc::now();

        let invoice = invoice::ActiveModel {
            numero: Set(numero),
            contrat_id: Set(contrat.id),
            user_id: Set(contrat.user_id),
            montant: Set(montant.round_dp(2)),
            paid_amount: Set(Decimal::ZERO),
            status: Set(InvoiceStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(invoice_id = invoice.id, numero = %invoice.numero, contrat_id, "invoice created");
        Ok(invoice)
    }

    pub async fn list(db: &DatabaseConnection) -> AppResult<Vec<invoice::Model>> {
        Ok(invoice::Entity::find()
            .order_by_desc(invoice::Column::CreatedAt)
            .all(db)
            .await?)
    }

    pub async fn list_for_owner(db: &DatabaseConnection, user_id: i32) -> AppResult<Vec<invoice::Model>> {
        Ok(invoice::Entity::find()
            .filter(invoice::Column::UserId.eq(user_id))
            .order_by_desc(invoice::Column::CreatedAt)
            .all(db)
            .await?)
    }

    pub async fn get(db: &DatabaseConnection, id: i32) -> AppResult<invoice::Model> {
        invoice::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("invoice {}", id)))
    }

    pub async fn get_for_owner(db: &DatabaseConnection, auth: &AuthUser, id: i32) -> AppResult<invoice::Model> {
        let invoice = Self::get(db, id).await?;
        auth.ensure_owner(invoice.user_id)?;
        Ok(invoice)
    }

    pub async fn payments(db: &DatabaseConnection, invoice_id: i32) -> AppResult<Vec<invoice_payment::Model>> {
        Ok(invoice_payment::Entity::find()
            .filter(invoice_payment::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(invoice_payment::Column::CreatedAt)
            .order_by_asc(invoice_payment::Column::Id)
            .all(db)
            .await?)
    }

    /// Règlement saisi par le centre (virement, chèque...)
    pub async fn record_manual_payment(
        db: &DatabaseConnection,
        id: i32,
        montant: Decimal,
    ) -> AppResult<invoice::Model> {
        ensure_positive(montant, "montant")?;

        let txn = db.begin().await?;
        let invoice = invoice::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("invoice {}", id)))?;

        invoice_payment::ActiveModel {
            invoice_id: Set(invoice.id),
            payment_intent_id: Set(None),
            montant: Set(montant),
            status: Set(PaymentStatus::Succeeded),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let updated = credit(&txn, &invoice, montant, Overflow::Reject).await?;
        txn.commit().await?;

        info!(invoice_id = id, %montant, status = ?updated.status, "manual payment recorded");
        Ok(updated)
    }

    /// Crée une intention de paiement pour le solde (ou une partie).
    /// Les intentions encore en attente réservent leur montant.
    pub async fn create_payment_intent(
        db: &DatabaseConnection,
        payments: &Arc<dyn PaymentProcessor>,
        auth: &AuthUser,
        id: i32,
        montant: Option<Decimal>,
    ) -> AppResult<PaymentIntentResponse> {
        let invoice = Self::get(db, id).await?;
        if invoice.user_id != auth.user_id {
            return Err(AppError::Forbidden);
        }

        // une intention abandonnée ou déjà réglée chez le processeur libère sa réserve
        for pending in Self::pending_payments(db, invoice.id).await? {
            settle_intent(db, payments, &pending).await?;
        }

        let invoice = Self::get(db, id).await?;
        if invoice.status == InvoiceStatus::Paid {
            return Err(AppError::Conflict(format!("Invoice {} is already paid", invoice.numero)));
        }

        let reserved: Decimal = Self::pending_payments(db, invoice.id)
            .await?
            .iter()
            .map(|p| p.montant)
            .sum();
        let outstanding = invoice.montant - invoice.paid_amount - reserved;
        if outstanding <= Decimal::ZERO {
            return Err(AppError::Conflict(format!(
                "A payment for invoice {} is already in progress",
                invoice.numero
            )));
        }

        let montant = montant.unwrap_or(outstanding);
        ensure_positive(montant, "montant")?;
        if montant > outstanding {
            return Err(AppError::Validation(format!(
                "montant: exceeds outstanding balance of {}",
                outstanding
            )));
        }

        let intent = payments
            .create_intent(
                montant,
                CURRENCY,
                &[
                    ("invoice_id", invoice.id.to_string()),
                    ("numero", invoice.numero.clone()),
                ],
            )
            .await?;

        invoice_payment::ActiveModel {
            invoice_id: Set(invoice.id),
            payment_intent_id: Set(Some(intent.id.clone())),
            montant: Set(montant),
            status: Set(PaymentStatus::Pending),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(invoice_id = id, intent = %intent.id, %montant, %reserved, "payment intent created");
        Ok(PaymentIntentResponse {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            montant,
            currency: CURRENCY.to_string(),
        })
    }

    /// Interroge le processeur et crédite la facture une seule fois
    pub async fn confirm_payment(
        db: &DatabaseConnection,
        payments: &Arc<dyn PaymentProcessor>,
        auth: &AuthUser,
        id: i32,
        payment_intent_id: &str,
    ) -> AppResult<PaymentConfirmation> {
        let invoice = Self::get(db, id).await?;
        if invoice.user_id != auth.user_id {
            return Err(AppError::Forbidden);
        }

        let payment = invoice_payment::Entity::find()
            .filter(invoice_payment::Column::InvoiceId.eq(invoice.id))
            .filter(invoice_payment::Column::PaymentIntentId.eq(payment_intent_id))
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("payment intent {}", payment_intent_id)))?;

        if payment.status != PaymentStatus::Pending {
            return Ok(PaymentConfirmation {
                overpaid: overpaid(&invoice),
                invoice,
                payment_status: payment.status,
            });
        }

        settle_intent(db, payments, &payment).await
    }

    async fn pending_payments(db: &DatabaseConnection, invoice_id: i32) -> AppResult<Vec<invoice_payment::Model>> {
        Ok(invoice_payment::Entity::find()
            .filter(invoice_payment::Column::InvoiceId.eq(invoice_id))
            .filter(invoice_payment::Column::Status.eq(PaymentStatus::Pending))
            .filter(invoice_payment::Column::PaymentIntentId.is_not_null())
            .all(db)
            .await?)
    }
}

fn overpaid(invoice: &invoice::Model) -> Option<Decimal> {
    (invoice.paid_amount > invoice.montant).then(|| invoice.paid_amount - invoice.montant)
}

/// Reporte l'état d'une intention en attente sur la ligne de paiement
async fn settle_intent(
    db: &DatabaseConnection,
    payments: &Arc<dyn PaymentProcessor>,
    payment: &invoice_payment::Model,
) -> AppResult<PaymentConfirmation> {
    let id = payment.invoice_id;
    let intent_id = payment.payment_intent_id.as_deref().unwrap_or_default();
    let intent = payments.retrieve_intent(intent_id).await?;

    match intent.status {
        PaymentStatus::Pending => Ok(PaymentConfirmation {
            invoice: InvoiceService::get(db, id).await?,
            payment_status: PaymentStatus::Pending,
            overpaid: None,
        }),
        PaymentStatus::Failed => {
            invoice_payment::Entity::update_many()
                .set(invoice_payment::ActiveModel {
                    status: Set(PaymentStatus::Failed),
                    ..Default::default()
                })
                .filter(invoice_payment::Column::Id.eq(payment.id))
                .filter(invoice_payment::Column::Status.eq(PaymentStatus::Pending))
                .exec(db)
                .await?;
            warn!(invoice_id = id, intent = intent_id, "payment failed");
            Ok(PaymentConfirmation {
                invoice: InvoiceService::get(db, id).await?,
                payment_status: PaymentStatus::Failed,
                overpaid: None,
            })
        }
        PaymentStatus::Succeeded => {
            let txn = db.begin().await?;

            // seul le premier passage PENDING -> SUCCEEDED crédite la facture
            let claimed = invoice_payment::Entity::update_many()
                .set(invoice_payment::ActiveModel {
                    status: Set(PaymentStatus::Succeeded),
                    ..Default::default()
                })
                .filter(invoice_payment::Column::Id.eq(payment.id))
                .filter(invoice_payment::Column::Status.eq(PaymentStatus::Pending))
                .exec(&txn)
                .await?;

            if claimed.rows_affected == 0 {
                txn.rollback().await?;
                let invoice = InvoiceService::get(db, id).await?;
                return Ok(PaymentConfirmation {
                    overpaid: overpaid(&invoice),
                    invoice,
                    payment_status: PaymentStatus::Succeeded,
                });
            }

            let current = invoice::Entity::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("invoice {}", id)))?;
            let updated = credit(&txn, &current, payment.montant, Overflow::Record).await?;
            txn.commit().await?;

            let overpaid = overpaid(&updated);
            if let Some(excess) = overpaid {
                warn!(invoice_id = id, intent = intent_id, %excess, "payment captured beyond invoice total, refund required");
            }
            info!(invoice_id = id, intent = intent_id, status = ?updated.status, "online payment confirmed");
            Ok(PaymentConfirmation {
                invoice: updated,
                payment_status: PaymentStatus::Succeeded,
                overpaid,
            })
        }
    }
}

/// Ajoute un règlement au montant payé et recalcule le statut
async fn credit<C: ConnectionTrait>(
    conn: &C,
    invoice: &invoice::Model,
    montant: Decimal,
    overflow: Overflow,
) -> AppResult<invoice::Model> {
    if invoice.status == InvoiceStatus::Paid && overflow == Overflow::Reject {
        return Err(AppError::Conflict(format!("Invoice {} is already paid", invoice.numero)));
    }

    let paid_amount = invoice.paid_amount + montant;
    if paid_amount > invoice.montant && overflow == Overflow::Reject {
        return Err(AppError::Validation(format!(
            "montant: exceeds outstanding balance of {}",
            invoice.montant - invoice.paid_amount
        )));
    }

    let status = derive_status(invoice.montant, paid_amount);
    let result = invoice::Entity::update_many()
        .set(invoice::ActiveModel {
            paid_amount: Set(paid_amount),
            status: Set(status),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .filter(invoice::Column::Id.eq(invoice.id))
        .filter(invoice::Column::PaidAmount.eq(invoice.paid_amount))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(format!(
            "invoice {} was paid concurrently, please retry",
            invoice.id
        )));
    }

    invoice::Entity::find_by_id(invoice.id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("invoice {}", invoice.id)))
}
