use chrono::Utc;
use sea_orm::*;
use tracing::{info, warn};

use crate::middleware::AuthUser;
use crate::models::enums::{DecisionStatus, SignatureStatus};
use crate::models::{contrat, devis};
use crate::services::workflow::{apply_signature_event, SignatureEvent};
use crate::utils::error::{AppError, AppResult};

pub struct ContratService;

impl ContratService {
    /// Un contrat par devis validé
    pub async fn create(db: &DatabaseConnection, devis_id: i32) -> AppResult<contrat::Model> {
        let devis = devis::Entity::find_by_id(devis_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("devis {}", devis_id)))?;

        if devis.statut != DecisionStatus::Valide {
            return Err(AppError::Conflict(format!(
                "Devis {} must be VALIDE before creating a contrat",
                devis.numero
            )));
        }

        let existing = contrat::Entity::find()
            .filter(contrat::Column::DevisId.eq(devis.id))
            .one(db)
            .await?;
        if existing.is_some() {
            warn!(devis_id, "duplicate contrat rejected");
            return Err(AppError::Conflict(format!(
                "A contrat already exists for devis {}",
                devis.numero
            )));
        }

        // la contrainte unique sur devis_id couvre la course entre deux créations
        let contrat = contrat::ActiveModel {
            devis_id: Set(devis.id),
            user_id: Set(devis.user_id),
            statut: Set(SignatureStatus::Pending),
            signature_centre: Set(None),
            signed_by_centre_at: Set(None),
            published_at: Set(None),
            signature_stagiaire: Set(None),
            signed_by_user_at: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(contrat_id = contrat.id, devis_id, "contrat created");
        Ok(contrat)
    }

    pub async fn list(db: &DatabaseConnection) -> AppResult<Vec<contrat::Model>> {
        Ok(contrat::Entity::find()
            .order_by_desc(contrat::Column::CreatedAt)
            .all(db)
            .await?)
    }

    /// Le propriétaire ne voit que les contrats publiés ou signés
    pub async fn list_for_owner(db: &DatabaseConnection, user_id: i32) -> AppResult<Vec<contrat::Model>> {
        Ok(contrat::Entity::find()
            .filter(contrat::Column::UserId.eq(user_id))
            .filter(
                contrat::Column::Statut
                    .is_in([SignatureStatus::Published, SignatureStatus::Completed]),
            )
            .order_by_desc(contrat::Column::CreatedAt)
            .all(db)
            .await?)
    }

    pub async fn get(db: &DatabaseConnection, id: i32) -> AppResult<contrat::Model> {
        contrat::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("contrat {}", id)))
    }

    pub async fn get_for_owner(db: &DatabaseConnection, auth: &AuthUser, id: i32) -> AppResult<contrat::Model> {
        let contrat = Self::get(db, id).await?;
        auth.ensure_owner(contrat.user_id)?;
        if !auth.is_staff() && !contrat.statut.is_visible_to_owner() {
            return Err(AppError::NotFound(format!("contrat {}", id)));
        }
        Ok(contrat)
    }

    pub async fn sign_as_centre(db: &DatabaseConnection, id: i32, signature: String) -> AppResult<contrat::Model> {
        let contrat = Self::get(db, id).await?;
        let patch = contrat::ActiveModel {
            signature_centre: Set(Some(signature)),
            signed_by_centre_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        Self::transition(db, contrat, SignatureEvent::CentreSign, patch).await
    }

    pub async fn publish(db: &DatabaseConnection, id: i32) -> AppResult<contrat::Model> {
        let contrat = Self::get(db, id).await?;
        let patch = contrat::ActiveModel {
            published_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        Self::transition(db, contrat, SignatureEvent::Publish, patch).await
    }

    /// Signature par le stagiaire ou le client lui-même (pas de délégation)
    pub async fn sign_as_owner(
        db: &DatabaseConnection,
        auth: &AuthUser,
        id: i32,
        signature: String,
    ) -> AppResult<contrat::Model> {
        let contrat = Self::get(db, id).await?;
        if contrat.user_id != auth.user_id {
            warn!(contrat_id = id, user_id = auth.user_id, "signature by non-owner rejected");
            return Err(AppError::Forbidden);
        }
        if !contrat.statut.is_visible_to_owner() {
            return Err(AppError::NotFound(format!("contrat {}", id)));
        }

        let patch = contrat::ActiveModel {
            signature_stagiaire: Set(Some(signature)),
            signed_by_user_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        Self::transition(db, contrat, SignatureEvent::OwnerSign, patch).await
    }

    /// Applique l'évènement si le statut n'a pas bougé depuis la lecture
    async fn transition(
        db: &DatabaseConnection,
        contrat: contrat::Model,
        event: SignatureEvent,
        mut patch: contrat::ActiveModel,
    ) -> AppResult<contrat::Model> {
        let next = apply_signature_event(contrat.statut, event)?;
        patch.statut = Set(next);

        let result = contrat::Entity::update_many()
            .set(patch)
            .filter(contrat::Column::Id.eq(contrat.id))
            .filter(contrat::Column::Statut.eq(contrat.statut))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "contrat {} was modified concurrently",
                contrat.id
            )));
        }

        info!(contrat_id = contrat.id, from = contrat.statut.as_str(), to = next.as_str(), "contrat transition");
        Self::get(db, contrat.id).await
    }
}
