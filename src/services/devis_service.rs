use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::*;
use tracing::info;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::dto::{CreateDevisRequest, GeneratedNumbers, UpdateDevisRequest};
use crate::models::enums::DecisionStatus;
use crate::models::{contrat, demande, devis, formation};
use crate::services::ensure_positive;
use crate::services::numbering_service::{NumberingService, SequenceKind};
use crate::services::workflow::apply_decision;
use crate::utils::error::{AppError, AppResult};

const DEFAULT_TVA: i64 = 20;

/// TTC = HT * (1 + taux / 100), arrondi au centime
pub fn compute_ttc(montant_ht: Decimal, taux_tva: Decimal) -> Decimal {
    (montant_ht + montant_ht * taux_tva / Decimal::ONE_HUNDRED).round_dp(2)
}

fn check_taux(taux_tva: Decimal) -> AppResult<()> {
    if taux_tva < Decimal::ZERO || taux_tva > Decimal::ONE_HUNDRED {
        return Err(AppError::Validation("taux_tva: must be between 0 and 100".to_string()));
    }
    Ok(())
}

pub struct DevisService;

impl DevisService {
    /// Réserve un couple (numéro de devis, référence de session)
    pub async fn generate_numbers(
        db: &DatabaseConnection,
        session: &str,
        date: NaiveDate,
    ) -> AppResult<GeneratedNumbers> {
        let session = session.trim();
        if session.is_empty() {
            return Err(AppError::Validation("session: must not be empty".to_string()));
        }

        let numero = NumberingService::next_numero(db, SequenceKind::Devis, date, None).await?;
        let reference_session =
            NumberingService::next_numero(db, SequenceKind::Session, date, Some(session)).await?;

        Ok(GeneratedNumbers {
            numero,
            reference_session,
        })
    }

    pub async fn create(
        db: &DatabaseConnection,
        request: CreateDevisRequest,
        today: NaiveDate,
    ) -> AppResult<devis::Model> {
        request.validate()?;
        ensure_positive(request.montant_ht, "montant_ht")?;
        let taux_tva = request.taux_tva.unwrap_or(Decimal::new(DEFAULT_TVA, 0));
        check_taux(taux_tva)?;

        let demande = demande::Entity::find_by_id(request.demande_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("demande {}", request.demande_id)))?;

        if demande.statut != DecisionStatus::Valide {
            return Err(AppError::Conflict(format!(
                "Demande {} must be VALIDE before issuing a devis",
                demande.id
            )));
        }

        let existing = devis::Entity::find()
            .filter(devis::Column::DemandeId.eq(demande.id))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(format!(
                "A devis already exists for demande {}",
                demande.id
            )));
        }

        let designation = match request.designation.filter(|d| !d.trim().is_empty()) {
            Some(designation) => designation,
            None => {
                let titre = formation::Entity::find_by_id(demande.formation_id)
                    .one(db)
                    .await?
                    .map(|f| f.titre)
                    .unwrap_or_else(|| "Formation IRATA".to_string());
                format!("{} - session {}", titre, demande.session)
            }
        };

        // numéros saisis ou réservés à la volée
        let numero = match request.numero.filter(|n| !n.trim().is_empty()) {
            Some(numero) => numero.trim().to_string(),
            None => NumberingService::next_numero(db, SequenceKind::Devis, today, None).await?,
        };
        let reference_session = match request.reference_session.filter(|r| !r.trim().is_empty()) {
            Some(reference) => reference.trim().to_string(),
            None => {
                NumberingService::next_numero(
                    db,
                    SequenceKind::Session,
                    today,
                    Some(demande.session.as_str()),
                )
                .await?
            }
        };

        let now = Utc::now();
        let devis = devis::ActiveModel {
            numero: Set(numero),
            reference_session: Set(reference_session),
            demande_id: Set(demande.id),
            user_id: Set(demande.user_id),
            designation: Set(designation),
            montant_ht: Set(request.montant_ht),
            taux_tva: Set(taux_tva),
            montant_ttc: Set(compute_ttc(request.montant_ht, taux_tva)),
            statut: Set(DecisionStatus::EnAttente),
            iban: Set(request.iban),
            bic: Set(request.bic),
            banque: Set(request.banque),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(devis_id = devis.id, numero = %devis.numero, demande_id = demande.id, "devis created");
        Ok(devis)
    }

    pub async fn list(db: &DatabaseConnection) -> AppResult<Vec<devis::Model>> {
        Ok(devis::Entity::find()
            .order_by_desc(devis::Column::CreatedAt)
            .all(db)
            .await?)
    }

    pub async fn list_for_owner(db: &DatabaseConnection, user_id: i32) -> AppResult<Vec<devis::Model>> {
        Ok(devis::Entity::find()
            .filter(devis::Column::UserId.eq(user_id))
            .order_by_desc(devis::Column::CreatedAt)
            .all(db)
            .await?)
    }

    pub async fn get(db: &DatabaseConnection, id: i32) -> AppResult<devis::Model> {
        devis::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("devis {}", id)))
    }

    pub async fn get_for_owner(db: &DatabaseConnection, auth: &AuthUser, id: i32) -> AppResult<devis::Model> {
        let devis = Self::get(db, id).await?;
        auth.ensure_owner(devis.user_id)?;
        Ok(devis)
    }

    /// Modification tant que le devis est en attente
    pub async fn update(
        db: &DatabaseConnection,
        id: i32,
        request: UpdateDevisRequest,
    ) -> AppResult<devis::Model> {
        request.validate()?;
        let devis = Self::get(db, id).await?;
        if devis.statut != DecisionStatus::EnAttente {
            return Err(AppError::InvalidTransition {
                from: format!("{:?}", devis.statut).to_uppercase(),
                action: "update".to_string(),
            });
        }

        let montant_ht = request.montant_ht.unwrap_or(devis.montant_ht);
        let taux_tva = request.taux_tva.unwrap_or(devis.taux_tva);
        ensure_positive(montant_ht, "montant_ht")?;
        check_taux(taux_tva)?;

        let mut active: devis::ActiveModel = devis.into();
        active.montant_ht = Set(montant_ht);
        active.taux_tva = Set(taux_tva);
        active.montant_ttc = Set(compute_ttc(montant_ht, taux_tva));
        if let Some(designation) = request.designation {
            active.designation = Set(designation);
        }
        if request.iban.is_some() {
            active.iban = Set(request.iban);
        }
        if request.bic.is_some() {
            active.bic = Set(request.bic);
        }
        if request.banque.is_some() {
            active.banque = Set(request.banque);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        info!(devis_id = id, "devis updated");
        Ok(updated)
    }

    pub async fn decide(db: &DatabaseConnection, id: i32, statut: DecisionStatus) -> AppResult<devis::Model> {
        let devis = Self::get(db, id).await?;
        let next = apply_decision(devis.statut, statut)?;

        let result = devis::Entity::update_many()
            .set(devis::ActiveModel {
                statut: Set(next),
                updated_at: Set(Utc::now()),
                ..Default::default()
            })
            .filter(devis::Column::Id.eq(id))
            .filter(devis::Column::Statut.eq(devis.statut))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!("devis {} was decided concurrently", id)));
        }

        info!(devis_id = id, statut = ?next, "devis decided");
        Self::get(db, id).await
    }

    /// Suppression (ADMIN), refusée dès qu'un contrat existe
    pub async fn delete(db: &DatabaseConnection, id: i32) -> AppResult<()> {
        let devis = Self::get(db, id).await?;

        let contrat = contrat::Entity::find()
            .filter(contrat::Column::DevisId.eq(devis.id))
            .one(db)
            .await?;
        if contrat.is_some() {
            return Err(AppError::Conflict(format!(
                "Devis {} has a contrat and cannot be deleted",
                devis.numero
            )));
        }

        devis::Entity::delete_by_id(id).exec(db).await?;
        info!(devis_id = id, numero = %devis.numero, "devis deleted");
        Ok(())
    }
}
