use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::*;
use tracing::{info, warn};
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::dto::{
    ContributionCreated, CreateContributionRequest, CrowdfundingSummary, PublicContribution,
};
use crate::models::enums::PaymentStatus;
use crate::models::{contribution, users};
use crate::services::ensure_positive;
use crate::services::invoice_service::CURRENCY;
use crate::services::payment::PaymentProcessor;
use crate::utils::error::{AppError, AppResult};

/// Nombre de messages affichés sur la page publique
const PUBLIC_MESSAGES: u64 = 10;

pub struct ContributionService;

impl ContributionService {
    pub async fn create(
        db: &DatabaseConnection,
        payments: &Arc<dyn PaymentProcessor>,
        auth: &AuthUser,
        request: CreateContributionRequest,
    ) -> AppResult<ContributionCreated> {
        request.validate()?;
        ensure_positive(request.montant, "montant")?;
        let montant = request.montant.round_dp(2);

        let intent = payments
            .create_intent(
                montant,
                CURRENCY,
                &[
                    ("kind", "crowdfunding".to_string()),
                    ("user_id", auth.user_id.to_string()),
                ],
            )
            .await?;

        let message = request
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let contribution = contribution::ActiveModel {
            user_id: Set(auth.user_id),
            montant: Set(montant),
            message: Set(message),
            anonyme: Set(request.anonyme),
            payment_intent_id: Set(intent.id.clone()),
            status: Set(PaymentStatus::Pending),
            created_at: Set(Utc::now()),
            confirmed_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(contribution_id = contribution.id, user_id = auth.user_id, %montant, "contribution initiated");
        Ok(ContributionCreated {
            contribution_id: contribution.id,
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
        })
    }

    /// Statut final demandé au processeur; sans effet une fois réglé
    pub async fn confirm(
        db: &DatabaseConnection,
        payments: &Arc<dyn PaymentProcessor>,
        auth: &AuthUser,
        id: i32,
    ) -> AppResult<contribution::Model> {
        let contribution = Self::get(db, id).await?;
        if contribution.user_id != auth.user_id {
            return Err(AppError::Forbidden);
        }
        if contribution.status != PaymentStatus::Pending {
            return Ok(contribution);
        }

        let intent = payments.retrieve_intent(&contribution.payment_intent_id).await?;
        if intent.status == PaymentStatus::Pending {
            return Ok(contribution);
        }

        contribution::Entity::update_many()
            .set(contribution::ActiveModel {
                status: Set(intent.status),
                confirmed_at: Set(Some(Utc::now())),
                ..Default::default()
            })
            .filter(contribution::Column::Id.eq(id))
            .filter(contribution::Column::Status.eq(PaymentStatus::Pending))
            .exec(db)
            .await?;

        match intent.status {
            PaymentStatus::Succeeded => info!(contribution_id = id, "contribution confirmed"),
            _ => warn!(contribution_id = id, "contribution payment failed"),
        }
        Self::get(db, id).await
    }

    pub async fn get(db: &DatabaseConnection, id: i32) -> AppResult<contribution::Model> {
        contribution::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("contribution {}", id)))
    }

    pub async fn list(db: &DatabaseConnection) -> AppResult<Vec<contribution::Model>> {
        Ok(contribution::Entity::find()
            .order_by_desc(contribution::Column::CreatedAt)
            .all(db)
            .await?)
    }

    pub async fn list_for_user(db: &DatabaseConnection, user_id: i32) -> AppResult<Vec<contribution::Model>> {
        Ok(contribution::Entity::find()
            .filter(contribution::Column::UserId.eq(user_id))
            .order_by_desc(contribution::Column::CreatedAt)
            .all(db)
            .await?)
    }

    /// Page publique: objectif, total réglé, contributeurs, derniers messages
    pub async fn summary(db: &DatabaseConnection, objectif: Decimal) -> AppResult<CrowdfundingSummary> {
        let succeeded = contribution::Entity::find()
            .filter(contribution::Column::Status.eq(PaymentStatus::Succeeded))
            .order_by_desc(contribution::Column::ConfirmedAt)
            .all(db)
            .await?;

        let total: Decimal = succeeded.iter().map(|c| c.montant).sum();
        let mut contributeurs: Vec<i32> = succeeded.iter().map(|c| c.user_id).collect();
        contributeurs.sort_unstable();
        contributeurs.dedup();

        let recent: Vec<&contribution::Model> = succeeded
            .iter()
            .filter(|c| c.message.is_some())
            .take(PUBLIC_MESSAGES as usize)
            .collect();

        let author_ids: Vec<i32> = recent.iter().filter(|c| !c.anonyme).map(|c| c.user_id).collect();
        let authors: HashMap<i32, String> = if author_ids.is_empty() {
            HashMap::new()
        } else {
            users::Entity::find()
                .filter(users::Column::Id.is_in(author_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|u| (u.id, public_name(&u)))
                .collect()
        };

        let messages = recent
            .into_iter()
            .map(|c| PublicContribution {
                auteur: if c.anonyme { None } else { authors.get(&c.user_id).cloned() },
                montant: c.montant,
                message: c.message.clone(),
            })
            .collect();

        Ok(CrowdfundingSummary {
            objectif,
            total,
            contributeurs: contributeurs.len() as u64,
            messages,
        })
    }
}

/// "Camille M." : prénom et initiale du nom
fn public_name(user: &users::Model) -> String {
    match user.nom.chars().next() {
        Some(initiale) => format!("{} {}.", user.prenom, initiale.to_uppercase()),
        None => user.prenom.clone(),
    }
}
