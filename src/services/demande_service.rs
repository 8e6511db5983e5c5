use chrono::Utc;
use sea_orm::*;
use tracing::info;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::dto::{CreateDemandeRequest, DecisionRequest};
use crate::models::enums::DecisionStatus;
use crate::models::{demande, formation};
use crate::services::workflow::apply_decision;
use crate::utils::error::{AppError, AppResult};

pub struct DemandeService;

impl DemandeService {
    /// Dépôt d'une demande d'inscription par un stagiaire
    pub async fn create(
        db: &DatabaseConnection,
        user_id: i32,
        request: CreateDemandeRequest,
    ) -> AppResult<demande::Model> {
        request.validate()?;

        formation::Entity::find_by_id(request.formation_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("formation {}", request.formation_id)))?;

        let demande = demande::ActiveModel {
            user_id: Set(user_id),
            formation_id: Set(request.formation_id),
            session: Set(request.session.trim().to_string()),
            message: Set(request.message),
            statut: Set(DecisionStatus::EnAttente),
            commentaire: Set(None),
            created_at: Set(Utc::now()),
            decided_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(demande_id = demande.id, user_id, session = %demande.session, "demande created");
        Ok(demande)
    }

    pub async fn list(
        db: &DatabaseConnection,
        statut: Option<DecisionStatus>,
    ) -> AppResult<Vec<demande::Model>> {
        let mut query = demande::Entity::find();
        if let Some(statut) = statut {
            query = query.filter(demande::Column::Statut.eq(statut));
        }
        Ok(query
            .order_by_desc(demande::Column::CreatedAt)
            .all(db)
            .await?)
    }

    pub async fn list_for_user(db: &DatabaseConnection, user_id: i32) -> AppResult<Vec<demande::Model>> {
        Ok(demande::Entity::find()
            .filter(demande::Column::UserId.eq(user_id))
            .order_by_desc(demande::Column::CreatedAt)
            .all(db)
            .await?)
    }

    pub async fn get(db: &DatabaseConnection, id: i32) -> AppResult<demande::Model> {
        demande::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("demande {}", id)))
    }

    /// Validation ou refus par le centre (une seule fois, depuis EN_ATTENTE)
    pub async fn decide(
        db: &DatabaseConnection,
        id: i32,
        request: DecisionRequest,
    ) -> AppResult<demande::Model> {
        let demande = Self::get(db, id).await?;
        let next = apply_decision(demande.statut, request.statut)?;

        let result = demande::Entity::update_many()
            .set(demande::ActiveModel {
                statut: Set(next),
                commentaire: Set(request.commentaire),
                decided_at: Set(Some(Utc::now())),
                ..Default::default()
            })
            .filter(demande::Column::Id.eq(id))
            .filter(demande::Column::Statut.eq(demande.statut))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!("demande {} was decided concurrently", id)));
        }

        info!(demande_id = id, statut = ?next, "demande decided");
        Self::get(db, id).await
    }

    /// Retrait d'une demande par son auteur, tant qu'elle est en attente
    pub async fn withdraw(db: &DatabaseConnection, auth: &AuthUser, id: i32) -> AppResult<()> {
        let demande = Self::get(db, id).await?;
        if demande.user_id != auth.user_id {
            return Err(AppError::Forbidden);
        }
        if demande.statut != DecisionStatus::EnAttente {
            return Err(AppError::InvalidTransition {
                from: format!("{:?}", demande.statut).to_uppercase(),
                action: "withdraw".to_string(),
            });
        }

        demande::Entity::delete_by_id(id).exec(db).await?;
        info!(demande_id = id, user_id = auth.user_id, "demande withdrawn");
        Ok(())
    }

    /// Sessions pour lesquelles le stagiaire a une demande validée
    pub async fn validated_sessions(db: &DatabaseConnection, user_id: i32) -> AppResult<Vec<String>> {
        let sessions = demande::Entity::find()
            .select_only()
            .column(demande::Column::Session)
            .filter(demande::Column::UserId.eq(user_id))
            .filter(demande::Column::Statut.eq(DecisionStatus::Valide))
            .distinct()
            .into_tuple::<String>()
            .all(db)
            .await?;
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Role;
    use crate::test_utils::test_context;

    #[actix_web::test]
    async fn test_create_requires_known_formation() {
        let ctx = test_context().await;
        let (user, _) = ctx.create_user("stagiaire@example.com", Role::User).await;

        let err = DemandeService::create(
            ctx.db(),
            user.id,
            CreateDemandeRequest {
                formation_id: 999,
                session: "2025 octobre".into(),
                message: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[actix_web::test]
    async fn test_decide_once() {
        let ctx = test_context().await;
        let (user, _) = ctx.create_user("stagiaire@example.com", Role::User).await;
        let formation = ctx.create_formation().await;
        let demande = DemandeService::create(
            ctx.db(),
            user.id,
            CreateDemandeRequest {
                formation_id: formation.id,
                session: " 2025 octobre ".into(),
                message: Some("Bonjour".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(demande.session, "2025 octobre");

        let decided = DemandeService::decide(
            ctx.db(),
            demande.id,
            DecisionRequest {
                statut: DecisionStatus::Valide,
                commentaire: Some("OK".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(decided.statut, DecisionStatus::Valide);
        assert!(decided.decided_at.is_some());

        let again = DemandeService::decide(
            ctx.db(),
            demande.id,
            DecisionRequest {
                statut: DecisionStatus::Refuse,
                commentaire: None,
            },
        )
        .await;
        assert!(matches!(again, Err(AppError::InvalidTransition { .. })));

        let sessions = DemandeService::validated_sessions(ctx.db(), user.id).await.unwrap();
        assert_eq!(sessions, vec!["2025 octobre".to_string()]);
    }

    #[actix_web::test]
    async fn test_withdraw_only_own_pending() {
        let ctx = test_context().await;
        let (owner, _) = ctx.create_user("a@example.com", Role::User).await;
        let (other, _) = ctx.create_user("b@example.com", Role::User).await;
        let formation = ctx.create_formation().await;
        let pending = ctx
            .create_demande(owner.id, formation.id, "s1", DecisionStatus::EnAttente)
            .await;
        let validated = ctx
            .create_demande(owner.id, formation.id, "s2", DecisionStatus::Valide)
            .await;

        let intruder = AuthUser {
            user_id: other.id,
            email: other.email.clone(),
            role: Role::User,
        };
        let me = AuthUser {
            user_id: owner.id,
            email: owner.email.clone(),
            role: Role::User,
        };

        assert!(matches!(
            DemandeService::withdraw(ctx.db(), &intruder, pending.id).await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            DemandeService::withdraw(ctx.db(), &me, validated.id).await,
            Err(AppError::InvalidTransition { .. })
        ));
        DemandeService::withdraw(ctx.db(), &me, pending.id).await.unwrap();
        assert!(matches!(
            DemandeService::get(ctx.db(), pending.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
