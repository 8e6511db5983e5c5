use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::*;
use tracing::{info, warn};
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::dto::{CorrectionRequest, CreateFormulaireRequest, Question};
use crate::models::enums::ReponseStatus;
use crate::models::{formulaire_quotidien, reponse_formulaire};
use crate::services::demande_service::DemandeService;
use crate::services::workflow::apply_correction;
use crate::utils::error::{AppError, AppResult};

fn parse_questions(formulaire: &formulaire_quotidien::Model) -> AppResult<Vec<Question>> {
    serde_json::from_value(formulaire.questions.clone())
        .map_err(|e| AppError::Internal(format!("formulaire {} has invalid questions: {}", formulaire.id, e)))
}

/// Réponses connues du questionnaire, obligatoires renseignées
pub fn check_answers(questions: &[Question], reponses: &HashMap<String, String>) -> AppResult<()> {
    let known: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
    if let Some(unknown) = reponses.keys().find(|k| !known.contains(k.as_str())) {
        return Err(AppError::Validation(format!("reponses: unknown question {}", unknown)));
    }

    let mut missing: Vec<&str> = questions
        .iter()
        .filter(|q| q.obligatoire)
        .filter(|q| reponses.get(&q.id).map_or(true, |r| r.trim().is_empty()))
        .map(|q| q.id.as_str())
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(AppError::Validation(format!(
            "reponses: missing required answers ({})",
            missing.join(", ")
        )));
    }
    Ok(())
}

pub struct FormulaireService;

impl FormulaireService {
    pub async fn create(
        db: &DatabaseConnection,
        auth: &AuthUser,
        request: CreateFormulaireRequest,
    ) -> AppResult<formulaire_quotidien::Model> {
        request.validate()?;

        let mut ids = HashSet::new();
        for question in &request.questions {
            if question.id.trim().is_empty() || question.libelle.trim().is_empty() {
                return Err(AppError::Validation("questions: id and libelle are required".to_string()));
            }
            if !ids.insert(question.id.as_str()) {
                return Err(AppError::Validation(format!("questions: duplicate id {}", question.id)));
            }
        }

        let questions = serde_json::to_value(&request.questions)
            .map_err(|e| AppError::Internal(format!("question serialization: {}", e)))?;

        let formulaire = formulaire_quotidien::ActiveModel {
            titre: Set(request.titre),
            session: Set(request.session.trim().to_string()),
            date: Set(request.date),
            questions: Set(questions),
            actif: Set(true),
            created_by: Set(auth.user_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(formulaire_id = formulaire.id, session = %formulaire.session, "formulaire created");
        Ok(formulaire)
    }

    pub async fn list(db: &DatabaseConnection, session: Option<String>) -> AppResult<Vec<formulaire_quotidien::Model>> {
        let mut query = formulaire_quotidien::Entity::find();
        if let Some(session) = session {
            query = query.filter(formulaire_quotidien::Column::Session.eq(session));
        }
        Ok(query
            .order_by_desc(formulaire_quotidien::Column::Date)
            .all(db)
            .await?)
    }

    pub async fn get(db: &DatabaseConnection, id: i32) -> AppResult<formulaire_quotidien::Model> {
        formulaire_quotidien::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("formulaire {}", id)))
    }

    pub async fn deactivate(db: &DatabaseConnection, id: i32) -> AppResult<formulaire_quotidien::Model> {
        let formulaire = Self::get(db, id).await?;
        let mut active: formulaire_quotidien::ActiveModel = formulaire.into();
        active.actif = Set(false);
        let updated = active.update(db).await?;
        info!(formulaire_id = id, "formulaire deactivated");
        Ok(updated)
    }

    /// Questionnaires actifs des sessions où le stagiaire est inscrit
    pub async fn list_active_for_user(
        db: &DatabaseConnection,
        user_id: i32,
    ) -> AppResult<Vec<formulaire_quotidien::Model>> {
        let sessions = DemandeService::validated_sessions(db, user_id).await?;
        if sessions.is_empty() {
            return Ok(Vec::new());
        }
        Ok(formulaire_quotidien::Entity::find()
            .filter(formulaire_quotidien::Column::Actif.eq(true))
            .filter(formulaire_quotidien::Column::Session.is_in(sessions))
            .order_by_desc(formulaire_quotidien::Column::Date)
            .all(db)
            .await?)
    }

    pub async fn submit(
        db: &DatabaseConnection,
        auth: &AuthUser,
        formulaire_id: i32,
        reponses: HashMap<String, String>,
    ) -> AppResult<reponse_formulaire::Model> {
        let formulaire = Self::get(db, formulaire_id).await?;
        if !formulaire.actif {
            return Err(AppError::Conflict(format!("formulaire {} is closed", formulaire_id)));
        }

        let sessions = DemandeService::validated_sessions(db, auth.user_id).await?;
        if !sessions.contains(&formulaire.session) {
            warn!(formulaire_id, user_id = auth.user_id, "submission outside enrolled sessions");
            return Err(AppError::Forbidden);
        }

        check_answers(&parse_questions(&formulaire)?, &reponses)?;

        let existing = reponse_formulaire::Entity::find()
            .filter(reponse_formulaire::Column::FormulaireId.eq(formulaire_id))
            .filter(reponse_formulaire::Column::UserId.eq(auth.user_id))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(format!(
                "A response to formulaire {} already exists",
                formulaire_id
            )));
        }

        let reponse = reponse_formulaire::ActiveModel {
            formulaire_id: Set(formulaire_id),
            user_id: Set(auth.user_id),
            reponses: Set(answers_json(&reponses)?),
            statut: Set(ReponseStatus::Soumis),
            version: Set(1),
            previous_id: Set(None),
            correction: Set(None),
            corrected_by: Set(None),
            corrected_at: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(reponse_id = reponse.id, formulaire_id, user_id = auth.user_id, "reponse submitted");
        Ok(reponse)
    }

    pub async fn get_reponse(db: &DatabaseConnection, id: i32) -> AppResult<reponse_formulaire::Model> {
        reponse_formulaire::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("reponse {}", id)))
    }

    /// Correction par le centre: SOUMIS -> VALIDE ou A_CORRIGER
    pub async fn correct(
        db: &DatabaseConnection,
        auth: &AuthUser,
        id: i32,
        request: CorrectionRequest,
    ) -> AppResult<reponse_formulaire::Model> {
        request.validate()?;
        let reponse = Self::get_reponse(db, id).await?;
        let next = apply_correction(reponse.statut, request.valide)?;

        let result = reponse_formulaire::Entity::update_many()
            .set(reponse_formulaire::ActiveModel {
                statut: Set(next),
                correction: Set(Some(request.commentaire)),
                corrected_by: Set(Some(auth.user_id)),
                corrected_at: Set(Some(Utc::now())),
                ..Default::default()
            })
            .filter(reponse_formulaire::Column::Id.eq(id))
            .filter(reponse_formulaire::Column::Statut.eq(reponse.statut))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!("reponse {} was modified concurrently", id)));
        }

        info!(reponse_id = id, statut = ?next, corrected_by = auth.user_id, "reponse corrected");
        Self::get_reponse(db, id).await
    }

    /// Nouvelle version d'une réponse à corriger; l'ancienne passe REMPLACE
    pub async fn resubmit(
        db: &DatabaseConnection,
        auth: &AuthUser,
        id: i32,
        reponses: HashMap<String, String>,
    ) -> AppResult<reponse_formulaire::Model> {
        let previous = Self::get_reponse(db, id).await?;
        if previous.user_id != auth.user_id {
            return Err(AppError::Forbidden);
        }
        if previous.statut != ReponseStatus::ACorriger {
            return Err(AppError::InvalidTransition {
                from: format!("{:?}", previous.statut),
                action: "resubmit".to_string(),
            });
        }

        let formulaire = Self::get(db, previous.formulaire_id).await?;
        check_answers(&parse_questions(&formulaire)?, &reponses)?;
        let answers = answers_json(&reponses)?;

        let txn = db.begin().await?;
        let replaced = reponse_formulaire::Entity::update_many()
            .set(reponse_formulaire::ActiveModel {
                statut: Set(ReponseStatus::Remplace),
                ..Default::default()
            })
            .filter(reponse_formulaire::Column::Id.eq(id))
            .filter(reponse_formulaire::Column::Statut.eq(ReponseStatus::ACorriger))
            .exec(&txn)
            .await?;
        if replaced.rows_affected == 0 {
            txn.rollback().await?;
            return Err(AppError::Conflict(format!("reponse {} was already resubmitted", id)));
        }

        let reponse = reponse_formulaire::ActiveModel {
            formulaire_id: Set(previous.formulaire_id),
            user_id: Set(auth.user_id),
            reponses: Set(answers),
            statut: Set(ReponseStatus::Soumis),
            version: Set(previous.version + 1),
            previous_id: Set(Some(previous.id)),
            correction: Set(None),
            corrected_by: Set(None),
            corrected_at: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(reponse_id = reponse.id, previous_id = id, version = reponse.version, "reponse resubmitted");
        Ok(reponse)
    }

    pub async fn list_reponses(db: &DatabaseConnection, formulaire_id: i32) -> AppResult<Vec<reponse_formulaire::Model>> {
        Self::get(db, formulaire_id).await?;
        Ok(reponse_formulaire::Entity::find()
            .filter(reponse_formulaire::Column::FormulaireId.eq(formulaire_id))
            .order_by_asc(reponse_formulaire::Column::UserId)
            .order_by_asc(reponse_formulaire::Column::Version)
            .all(db)
            .await?)
    }

    pub async fn list_reponses_for_user(db: &DatabaseConnection, user_id: i32) -> AppResult<Vec<reponse_formulaire::Model>> {
        Ok(reponse_formulaire::Entity::find()
            .filter(reponse_formulaire::Column::UserId.eq(user_id))
            .order_by_desc(reponse_formulaire::Column::CreatedAt)
            .all(db)
            .await?)
    }
}

fn answers_json(reponses: &HashMap<String, String>) -> AppResult<serde_json::Value> {
    serde_json::to_value(reponses).map_err(|e| AppError::Internal(format!("answer serialization: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{DecisionStatus, Role};
    use crate::test_utils::test_context;
    use chrono::NaiveDate;

    fn question(id: &str, obligatoire: bool) -> Question {
        Question {
            id: id.to_string(),
            libelle: format!("Question {}", id),
            obligatoire,
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (ToString::to_string(k), ToString::to_string(v)))
            .collect()
    }

    #[test]
    fn test_check_answers() {
        let questions = vec![question("q1", true), question("q2", false)];
        assert!(check_answers(&questions, &answers(&[("q1", "oui")])).is_ok());
        assert!(matches!(
            check_answers(&questions, &answers(&[("q2", "non")])),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            check_answers(&questions, &answers(&[("q1", "  ")])),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            check_answers(&questions, &answers(&[("q1", "oui"), ("q9", "?")])),
            Err(AppError::Validation(_))
        ));
    }

    #[actix_web::test]
    async fn test_correction_chain() {
        let ctx = test_context().await;
        let (admin, _) = ctx.create_user("admin@example.com", Role::Admin).await;
        let (user, _) = ctx.create_user("stagiaire@example.com", Role::User).await;
        let formation = ctx.create_formation().await;
        ctx.create_demande(user.id, formation.id, "octobre", DecisionStatus::Valide)
            .await;

        let staff = AuthUser {
            user_id: admin.id,
            email: admin.email.clone(),
            role: Role::Admin,
        };
        let trainee = AuthUser {
            user_id: user.id,
            email: user.email.clone(),
            role: Role::User,
        };

        let duplicate_ids = CreateFormulaireRequest {
            titre: "Jour 1".into(),
            session: "octobre".into(),
            date: NaiveDate::from_ymd_opt(2025, 10, 13).unwrap(),
            questions: vec![question("q1", true), question("q1", false)],
        };
        assert!(matches!(
            FormulaireService::create(ctx.db(), &staff, duplicate_ids).await,
            Err(AppError::Validation(_))
        ));

        let formulaire = FormulaireService::create(
            ctx.db(),
            &staff,
            CreateFormulaireRequest {
                titre: "Jour 1".into(),
                session: "octobre".into(),
                date: NaiveDate::from_ymd_opt(2025, 10, 13).unwrap(),
                questions: vec![question("q1", true), question("q2", false)],
            },
        )
        .await
        .unwrap();
        assert_eq!(
            FormulaireService::list_active_for_user(ctx.db(), user.id).await.unwrap().len(),
            1
        );

        let v1 = FormulaireService::submit(ctx.db(), &trainee, formulaire.id, answers(&[("q1", "ok")]))
            .await
            .unwrap();
        assert!(matches!(
            FormulaireService::submit(ctx.db(), &trainee, formulaire.id, answers(&[("q1", "bis")])).await,
            Err(AppError::Conflict(_))
        ));

        // pas de resoumission tant que le centre n'a pas demandé de correction
        assert!(matches!(
            FormulaireService::resubmit(ctx.db(), &trainee, v1.id, answers(&[("q1", "v2")])).await,
            Err(AppError::InvalidTransition { .. })
        ));

        let corrected = FormulaireService::correct(
            ctx.db(),
            &staff,
            v1.id,
            CorrectionRequest {
                commentaire: "Préciser".into(),
                valide: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(corrected.statut, ReponseStatus::ACorriger);

        let v2 = FormulaireService::resubmit(ctx.db(), &trainee, v1.id, answers(&[("q1", "précisé")]))
            .await
            .unwrap();
        assert_eq!(v2.version, 2);
        assert_eq!(v2.previous_id, Some(v1.id));
        assert_eq!(v2.statut, ReponseStatus::Soumis);

        let old = FormulaireService::get_reponse(ctx.db(), v1.id).await.unwrap();
        assert_eq!(old.statut, ReponseStatus::Remplace);
        assert!(FormulaireService::correct(
            ctx.db(),
            &staff,
            v1.id,
            CorrectionRequest {
                commentaire: "trop tard".into(),
                valide: true,
            },
        )
        .await
        .is_err());

        let validated = FormulaireService::correct(
            ctx.db(),
            &staff,
            v2.id,
            CorrectionRequest {
                commentaire: "OK".into(),
                valide: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(validated.statut, ReponseStatus::Valide);
        assert_eq!(FormulaireService::list_reponses(ctx.db(), formulaire.id).await.unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn test_submission_requires_enrolment() {
        let ctx = test_context().await;
        let (admin, _) = ctx.create_user("admin@example.com", Role::Admin).await;
        let (user, _) = ctx.create_user("stagiaire@example.com", Role::User).await;
        let staff = AuthUser {
            user_id: admin.id,
            email: admin.email.clone(),
            role: Role::Admin,
        };
        let trainee = AuthUser {
            user_id: user.id,
            email: user.email.clone(),
            role: Role::User,
        };

        let formulaire = FormulaireService::create(
            ctx.db(),
            &staff,
            CreateFormulaireRequest {
                titre: "Jour 1".into(),
                session: "novembre".into(),
                date: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
                questions: vec![question("q1", false)],
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            FormulaireService::submit(ctx.db(), &trainee, formulaire.id, HashMap::new()).await,
            Err(AppError::Forbidden)
        ));
    }
}
