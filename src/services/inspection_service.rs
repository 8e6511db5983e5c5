use chrono::{Months, NaiveDate, Utc};
use sea_orm::*;
use tracing::info;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::dto::{Checkpoint, CreateDetailedInspectionRequest, CreateInspectionRequest};
use crate::models::enums::InspectionVerdict;
use crate::models::{equipment_detailed_inspection, equipment_inspection};
use crate::services::numbering_service::{NumberingService, SequenceKind};
use crate::utils::error::{AppError, AppResult};
use crate::utils::qr::generate_qr_code;

/// Périodicité par défaut des inspections
const INSPECTION_INTERVAL_MONTHS: u32 = 6;

pub fn default_next_inspection(date_inspection: NaiveDate) -> AppResult<NaiveDate> {
    date_inspection
        .checked_add_months(Months::new(INSPECTION_INTERVAL_MONTHS))
        .ok_or_else(|| AppError::Validation("date_inspection: out of range".to_string()))
}

/// Le verdict global est le pire état relevé
pub fn overall_verdict(points: &[Checkpoint]) -> InspectionVerdict {
    points
        .iter()
        .map(|p| p.etat)
        .max()
        .unwrap_or(InspectionVerdict::Conforme)
}

fn check_dates(date_inspection: NaiveDate, prochaine: NaiveDate) -> AppResult<()> {
    if prochaine <= date_inspection {
        return Err(AppError::Validation(
            "prochaine_inspection: must be after date_inspection".to_string(),
        ));
    }
    Ok(())
}

pub struct InspectionService;

impl InspectionService {
    pub async fn create(
        db: &DatabaseConnection,
        auth: &AuthUser,
        request: CreateInspectionRequest,
        today: NaiveDate,
    ) -> AppResult<equipment_inspection::Model> {
        request.validate()?;
        let prochaine = match request.prochaine_inspection {
            Some(date) => date,
            None => default_next_inspection(request.date_inspection)?,
        };
        check_dates(request.date_inspection, prochaine)?;

        let numero = NumberingService::next_numero(db, SequenceKind::Inspection, today, None).await?;

        let inspection = equipment_inspection::ActiveModel {
            numero: Set(numero),
            qr_code: Set(generate_qr_code()),
            equipment_type: Set(request.equipment_type),
            reference: Set(request.reference),
            numero_serie: Set(request.numero_serie),
            fabricant: Set(request.fabricant),
            date_inspection: Set(request.date_inspection),
            prochaine_inspection: Set(prochaine),
            inspecteur: Set(request.inspecteur),
            verdict: Set(request.verdict.unwrap_or(InspectionVerdict::Conforme)),
            observations: Set(request.observations),
            created_by: Set(auth.user_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(inspection_id = inspection.id, numero = %inspection.numero, verdict = ?inspection.verdict, "inspection recorded");
        Ok(inspection)
    }

    pub async fn list(db: &DatabaseConnection) -> AppResult<Vec<equipment_inspection::Model>> {
        Ok(equipment_inspection::Entity::find()
            .order_by_desc(equipment_inspection::Column::DateInspection)
            .all(db)
            .await?)
    }

    pub async fn get(db: &DatabaseConnection, id: i32) -> AppResult<equipment_inspection::Model> {
        equipment_inspection::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("inspection {}", id)))
    }

    pub async fn delete(db: &DatabaseConnection, id: i32) -> AppResult<()> {
        let result = equipment_inspection::Entity::delete_by_id(id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("inspection {}", id)));
        }
        info!(inspection_id = id, "inspection deleted");
        Ok(())
    }

    pub async fn create_detailed(
        db: &DatabaseConnection,
        auth: &AuthUser,
        request: CreateDetailedInspectionRequest,
        today: NaiveDate,
    ) -> AppResult<equipment_detailed_inspection::Model> {
        request.validate()?;
        if request.points.iter().any(|p| p.point.trim().is_empty()) {
            return Err(AppError::Validation("points: checkpoint name must not be empty".to_string()));
        }
        let prochaine = match request.prochaine_inspection {
            Some(date) => date,
            None => default_next_inspection(request.date_inspection)?,
        };
        check_dates(request.date_inspection, prochaine)?;

        let verdict = overall_verdict(&request.points);
        let points = serde_json::to_value(&request.points)
            .map_err(|e| AppError::Internal(format!("checkpoint serialization: {}", e)))?;
        let numero =
            NumberingService::next_numero(db, SequenceKind::DetailedInspection, today, None).await?;

        let inspection = equipment_detailed_inspection::ActiveModel {
            numero: Set(numero),
            qr_code: Set(generate_qr_code()),
            equipment_type: Set(request.equipment_type),
            reference: Set(request.reference),
            numero_serie: Set(request.numero_serie),
            fabricant: Set(request.fabricant),
            date_fabrication: Set(request.date_fabrication),
            date_inspection: Set(request.date_inspection),
            prochaine_inspection: Set(prochaine),
            inspecteur: Set(request.inspecteur),
            points: Set(points),
            verdict: Set(verdict),
            observations: Set(request.observations),
            created_by: Set(auth.user_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(inspection_id = inspection.id, numero = %inspection.numero, verdict = ?verdict, "detailed inspection recorded");
        Ok(inspection)
    }

    pub async fn list_detailed(db: &DatabaseConnection) -> AppResult<Vec<equipment_detailed_inspection::Model>> {
        Ok(equipment_detailed_inspection::Entity::find()
            .order_by_desc(equipment_detailed_inspection::Column::DateInspection)
            .all(db)
            .await?)
    }

    pub async fn get_detailed(db: &DatabaseConnection, id: i32) -> AppResult<equipment_detailed_inspection::Model> {
        equipment_detailed_inspection::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("detailed inspection {}", id)))
    }

    pub async fn delete_detailed(db: &DatabaseConnection, id: i32) -> AppResult<()> {
        let result = equipment_detailed_inspection::Entity::delete_by_id(id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("detailed inspection {}", id)));
        }
        info!(inspection_id = id, "detailed inspection deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Role;
    use crate::test_utils::test_context;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn checkpoint(point: &str, etat: InspectionVerdict) -> Checkpoint {
        Checkpoint {
            point: point.to_string(),
            etat,
            commentaire: None,
        }
    }

    #[test]
    fn test_default_next_inspection() {
        assert_eq!(default_next_inspection(date(2025, 8, 31)).unwrap(), date(2026, 2, 28));
        assert_eq!(default_next_inspection(date(2025, 1, 15)).unwrap(), date(2025, 7, 15));
    }

    #[test]
    fn test_overall_verdict_is_worst() {
        let points = vec![
            checkpoint("sangles", InspectionVerdict::Conforme),
            checkpoint("coutures", InspectionVerdict::ASurveiller),
        ];
        assert_eq!(overall_verdict(&points), InspectionVerdict::ASurveiller);

        let points = vec![
            checkpoint("boucle", InspectionVerdict::NonConforme),
            checkpoint("sangles", InspectionVerdict::ASurveiller),
        ];
        assert_eq!(overall_verdict(&points), InspectionVerdict::NonConforme);
    }

    #[actix_web::test]
    async fn test_create_inspection_numbers_and_defaults() {
        let ctx = test_context().await;
        let (admin, _) = ctx.create_user("admin@example.com", Role::Admin).await;
        let auth = AuthUser {
            user_id: admin.id,
            email: admin.email.clone(),
            role: Role::Admin,
        };

        let request = || CreateInspectionRequest {
            equipment_type: "harnais".into(),
            reference: "H-12".into(),
            numero_serie: Some("SN-1".into()),
            fabricant: None,
            date_inspection: date(2025, 10, 1),
            prochaine_inspection: None,
            inspecteur: "J. Dupont".into(),
            verdict: None,
            observations: None,
        };

        let first = InspectionService::create(ctx.db(), &auth, request(), date(2025, 10, 2))
            .await
            .unwrap();
        let second = InspectionService::create(ctx.db(), &auth, request(), date(2025, 10, 2))
            .await
            .unwrap();

        assert_eq!(first.numero, "CI.ICE 2510 001");
        assert_eq!(second.numero, "CI.ICE 2510 002");
        assert_eq!(first.prochaine_inspection, date(2026, 4, 1));
        assert_eq!(first.verdict, InspectionVerdict::Conforme);
        assert_ne!(first.qr_code, second.qr_code);
    }

    #[actix_web::test]
    async fn test_detailed_inspection_requires_points() {
        let ctx = test_context().await;
        let (admin, _) = ctx.create_user("admin@example.com", Role::Admin).await;
        let auth = AuthUser {
            user_id: admin.id,
            email: admin.email.clone(),
            role: Role::Admin,
        };

        let request = |points: Vec<Checkpoint>| CreateDetailedInspectionRequest {
            equipment_type: "descendeur".into(),
            reference: "D-4".into(),
            numero_serie: None,
            fabricant: Some("Petzl".into()),
            date_fabrication: None,
            date_inspection: date(2025, 10, 1),
            prochaine_inspection: None,
            inspecteur: "J. Dupont".into(),
            points,
            observations: None,
        };

        assert!(matches!(
            InspectionService::create_detailed(ctx.db(), &auth, request(vec![]), date(2025, 10, 1)).await,
            Err(AppError::Validation(_))
        ));

        let created = InspectionService::create_detailed(
            ctx.db(),
            &auth,
            request(vec![
                checkpoint("came", InspectionVerdict::Conforme),
                checkpoint("flasque", InspectionVerdict::NonConforme),
            ]),
            date(2025, 10, 1),
        )
        .await
        .unwrap();
        assert_eq!(created.numero, "CI.ICP 2510 001");
        assert_eq!(created.verdict, InspectionVerdict::NonConforme);
        assert_eq!(created.points.as_array().map(|a| a.len()), Some(2));
    }
}
