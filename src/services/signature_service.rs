// Documents signés: décharges IRATA et inductions de session

use chrono::Utc;
use sea_orm::*;
use serde::Serialize;
use tracing::{info, warn};
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::dto::{CreateInductionRequest, DisclaimerRequest};
use crate::models::enums::SignatureStatus;
use crate::models::{induction, induction_signature, irata_disclaimer};
use crate::services::demande_service::DemandeService;
use crate::services::workflow::{apply_signature_event, SignatureEvent};
use crate::utils::error::{AppError, AppResult};

/// Induction vue par un stagiaire, avec sa signature éventuelle
#[derive(Debug, Serialize)]
pub struct TraineeInduction {
    #[serde(flatten)]
    pub induction: induction::Model,
    pub trainee_signed_at: Option<chrono::DateTime<Utc>>,
}

pub struct SignatureService;

impl SignatureService {
    /// Une décharge par stagiaire et par session, remplaçable tant
    /// que le centre n'en a pas accusé réception
    pub async fn submit_disclaimer(
        db: &DatabaseConnection,
        auth: &AuthUser,
        request: DisclaimerRequest,
    ) -> AppResult<irata_disclaimer::Model> {
        request.validate()?;
        let session = request.session.trim().to_string();

        let txn = db.begin().await?;
        let existing = irata_disclaimer::Entity::find()
            .filter(irata_disclaimer::Column::UserId.eq(auth.user_id))
            .filter(irata_disclaimer::Column::Session.eq(session.as_str()))
            .one(&txn)
            .await?;

        let disclaimer = match existing {
            Some(current) if current.acknowledged_at.is_some() => {
                txn.rollback().await?;
                return Err(AppError::Conflict(format!(
                    "Disclaimer for session {} was already acknowledged",
                    session
                )));
            }
            Some(current) => {
                let mut active: irata_disclaimer::ActiveModel = current.into();
                active.nom = Set(request.nom);
                active.prenom = Set(request.prenom);
                active.date_naissance = Set(request.date_naissance);
                active.signature = Set(request.signature);
                active.submitted_at = Set(Utc::now());
                active.update(&txn).await?
            }
            None => {
                irata_disclaimer::ActiveModel {
                    user_id: Set(auth.user_id),
                    session: Set(session),
                    nom: Set(request.nom),
                    prenom: Set(request.prenom),
                    date_naissance: Set(request.date_naissance),
                    signature: Set(request.signature),
                    submitted_at: Set(Utc::now()),
                    acknowledged_by: Set(None),
                    acknowledged_at: Set(None),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };
        txn.commit().await?;

        info!(disclaimer_id = disclaimer.id, user_id = auth.user_id, session = %disclaimer.session, "disclaimer submitted");
        Ok(disclaimer)
    }

    pub async fn list_disclaimers(
        db: &DatabaseConnection,
        session: Option<String>,
    ) -> AppResult<Vec<irata_disclaimer::Model>> {
        let mut query = irata_disclaimer::Entity::find();
        if let Some(session) = session {
            query = query.filter(irata_disclaimer::Column::Session.eq(session));
        }
        Ok(query
            .order_by_desc(irata_disclaimer::Column::SubmittedAt)
            .all(db)
            .await?)
    }

    pub async fn list_disclaimers_for_user(
        db: &DatabaseConnection,
        user_id: i32,
    ) -> AppResult<Vec<irata_disclaimer::Model>> {
        Ok(irata_disclaimer::Entity::find()
            .filter(irata_disclaimer::Column::UserId.eq(user_id))
            .order_by_desc(irata_disclaimer::Column::SubmittedAt)
            .all(db)
            .await?)
    }

    pub async fn acknowledge_disclaimer(
        db: &DatabaseConnection,
        auth: &AuthUser,
        id: i32,
    ) -> AppResult<irata_disclaimer::Model> {
        let result = irata_disclaimer::Entity::update_many()
            .set(irata_disclaimer::ActiveModel {
                acknowledged_by: Set(Some(auth.user_id)),
                acknowledged_at: Set(Some(Utc::now())),
                ..Default::default()
            })
            .filter(irata_disclaimer::Column::Id.eq(id))
            .filter(irata_disclaimer::Column::AcknowledgedAt.is_null())
            .exec(db)
            .await?;

        let disclaimer = irata_disclaimer::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("disclaimer {}", id)))?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!("disclaimer {} already acknowledged", id)));
        }

        info!(disclaimer_id = id, acknowledged_by = auth.user_id, "disclaimer acknowledged");
        Ok(disclaimer)
    }

    // ------------------------------------------------------------ inductions

    pub async fn create_induction(
        db: &DatabaseConnection,
        auth: &AuthUser,
        request: CreateInductionRequest,
    ) -> AppResult<induction::Model> {
        request.validate()?;
        let induction = induction::ActiveModel {
            session: Set(request.session.trim().to_string()),
            contenu: Set(request.contenu),
            statut: Set(SignatureStatus::Pending),
            signature_centre: Set(None),
            signed_at: Set(None),
            published_at: Set(None),
            created_by: Set(auth.user_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(induction_id = induction.id, session = %induction.session, "induction created");
        Ok(induction)
    }

    pub async fn list_inductions(
        db: &DatabaseConnection,
        session: Option<String>,
    ) -> AppResult<Vec<induction::Model>> {
        let mut query = induction::Entity::find();
        if let Some(session) = session {
            query = query.filter(induction::Column::Session.eq(session));
        }
        Ok(query
            .order_by_desc(induction::Column::CreatedAt)
            .all(db)
            .await?)
    }

    pub async fn get_induction(db: &DatabaseConnection, id: i32) -> AppResult<induction::Model> {
        induction::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("induction {}", id)))
    }

    pub async fn sign_induction(db: &DatabaseConnection, id: i32, signature: String) -> AppResult<induction::Model> {
        let induction = Self::get_induction(db, id).await?;
        let patch = induction::ActiveModel {
            signature_centre: Set(Some(signature)),
            signed_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        Self::transition(db, induction, SignatureEvent::CentreSign, patch).await
    }

    pub async fn publish_induction(db: &DatabaseConnection, id: i32) -> AppResult<induction::Model> {
        let induction = Self::get_induction(db, id).await?;
        let patch = induction::ActiveModel {
            published_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        Self::transition(db, induction, SignatureEvent::Publish, patch).await
    }

    async fn transition(
        db: &DatabaseConnection,
        induction: induction::Model,
        event: SignatureEvent,
        mut patch: induction::ActiveModel,
    ) -> AppResult<induction::Model> {
        let next = apply_signature_event(induction.statut, event)?;
        patch.statut = Set(next);

        let result = induction::Entity::update_many()
            .set(patch)
            .filter(induction::Column::Id.eq(induction.id))
            .filter(induction::Column::Statut.eq(induction.statut))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "induction {} was modified concurrently",
                induction.id
            )));
        }

        info!(induction_id = induction.id, from = induction.statut.as_str(), to = next.as_str(), "induction transition");
        Self::get_induction(db, induction.id).await
    }

    /// Inductions publiées des sessions du stagiaire
    pub async fn inductions_for_trainee(db: &DatabaseConnection, user_id: i32) -> AppResult<Vec<TraineeInduction>> {
        let sessions = DemandeService::validated_sessions(db, user_id).await?;
        if sessions.is_empty() {
            return Ok(Vec::new());
        }

        let inductions = induction::Entity::find()
            .filter(induction::Column::Statut.eq(SignatureStatus::Published))
            .filter(induction::Column::Session.is_in(sessions))
            .order_by_desc(induction::Column::PublishedAt)
            .all(db)
            .await?;

        let signatures = induction_signature::Entity::find()
            .filter(induction_signature::Column::UserId.eq(user_id))
            .all(db)
            .await?;

        Ok(inductions
            .into_iter()
            .map(|induction| {
                let trainee_signed_at = signatures
                    .iter()
                    .find(|s| s.induction_id == induction.id)
                    .map(|s| s.signed_at);
                TraineeInduction { induction, trainee_signed_at }
            })
            .collect())
    }

    /// Signature d'un stagiaire inscrit; une seule par induction
    pub async fn sign_as_trainee(
        db: &DatabaseConnection,
        auth: &AuthUser,
        id: i32,
        signature: String,
    ) -> AppResult<induction_signature::Model> {
        let induction = Self::get_induction(db, id).await?;
        if induction.statut != SignatureStatus::Published {
            return Err(AppError::InvalidTransition {
                from: induction.statut.as_str().to_string(),
                action: SignatureEvent::OwnerSign.as_str().to_string(),
            });
        }

        let sessions = DemandeService::validated_sessions(db, auth.user_id).await?;
        if !sessions.contains(&induction.session) {
            warn!(induction_id = id, user_id = auth.user_id, "induction signature outside enrolled sessions");
            return Err(AppError::Forbidden);
        }

        let txn = db.begin().await?;
        let existing = induction_signature::Entity::find()
            .filter(induction_signature::Column::InductionId.eq(id))
            .filter(induction_signature::Column::UserId.eq(auth.user_id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            txn.rollback().await?;
            return Err(AppError::Conflict(format!("induction {} already signed", id)));
        }

        let signed = induction_signature::ActiveModel {
            induction_id: Set(id),
            user_id: Set(auth.user_id),
            signature: Set(signature),
            signed_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(induction_id = id, user_id = auth.user_id, "induction signed by trainee");
        Ok(signed)
    }

    pub async fn list_induction_signatures(
        db: &DatabaseConnection,
        id: i32,
    ) -> AppResult<Vec<induction_signature::Model>> {
        Self::get_induction(db, id).await?;
        Ok(induction_signature::Entity::find()
            .filter(induction_signature::Column::InductionId.eq(id))
            .order_by_asc(induction_signature::Column::SignedAt)
            .all(db)
            .await?)
    }
}
