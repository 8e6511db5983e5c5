use chrono::{Months, NaiveDate, Utc};
use sea_orm::*;
use tracing::{debug, info};
use validator::Validate;

use crate::models::dto::{CreateDiplomeRequest, PublicDiplome, QrLookup};
use crate::models::{diplome, equipment_detailed_inspection, equipment_inspection, formation, users};
use crate::utils::error::{AppError, AppResult};
use crate::utils::qr::generate_qr_code;

/// Validité d'un diplôme IRATA
const VALIDITY_MONTHS: u32 = 36;

pub struct DiplomeService;

impl DiplomeService {
    pub async fn create(db: &DatabaseConnection, request: CreateDiplomeRequest) -> AppResult<diplome::Model> {
        request.validate()?;

        users::Entity::find_by_id(request.user_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", request.user_id)))?;
        formation::Entity::find_by_id(request.formation_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("formation {}", request.formation_id)))?;

        let date_expiration = request
            .date_obtention
            .checked_add_months(Months::new(VALIDITY_MONTHS))
            .ok_or_else(|| AppError::Validation("date_obtention: out of range".to_string()))?;

        let diplome = diplome::ActiveModel {
            user_id: Set(request.user_id),
            formation_id: Set(request.formation_id),
            niveau: Set(request.niveau),
            qr_code: Set(generate_qr_code()),
            date_obtention: Set(request.date_obtention),
            date_expiration: Set(date_expiration),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(diplome_id = diplome.id, user_id = diplome.user_id, niveau = diplome.niveau, "diplome issued");
        Ok(diplome)
    }

    pub async fn list(db: &DatabaseConnection) -> AppResult<Vec<diplome::Model>> {
        Ok(diplome::Entity::find()
            .order_by_desc(diplome::Column::DateObtention)
            .all(db)
            .await?)
    }

    pub async fn list_for_user(db: &DatabaseConnection, user_id: i32) -> AppResult<Vec<diplome::Model>> {
        Ok(diplome::Entity::find()
            .filter(diplome::Column::UserId.eq(user_id))
            .order_by_desc(diplome::Column::DateObtention)
            .all(db)
            .await?)
    }

    /// Résolution publique d'un QR code: inspection, examen approfondi, puis diplôme
    pub async fn lookup_qr(db: &DatabaseConnection, code: &str, today: NaiveDate) -> AppResult<QrLookup> {
        let code = code.trim().to_uppercase();

        if let Some(inspection) = equipment_inspection::Entity::find()
            .filter(equipment_inspection::Column::QrCode.eq(code.as_str()))
            .one(db)
            .await?
        {
            return Ok(QrLookup::Inspection(inspection.into()));
        }

        if let Some(inspection) = equipment_detailed_inspection::Entity::find()
            .filter(equipment_detailed_inspection::Column::QrCode.eq(code.as_str()))
            .one(db)
            .await?
        {
            return Ok(QrLookup::InspectionDetaillee(inspection.into()));
        }

        if let Some(diplome) = diplome::Entity::find()
            .filter(diplome::Column::QrCode.eq(code.as_str()))
            .one(db)
            .await?
        {
            let titulaire = users::Entity::find_by_id(diplome.user_id)
                .one(db)
                .await?
                .map(|u| format!("{} {}", u.prenom, u.nom))
                .unwrap_or_default();
            let formation = formation::Entity::find_by_id(diplome.formation_id)
                .one(db)
                .await?
                .map(|f| f.titre)
                .unwrap_or_default();
            return Ok(QrLookup::Diplome(PublicDiplome::new(diplome, titulaire, formation, today)));
        }

        debug!(code = %code, "unknown QR code");
        Err(AppError::NotFound(format!("QR code {}", code)))
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

    #[actix_web::test]
    async fn test_diplome_expires_after_three_years_and_resolves_by_qr() {
        let ctx = test_context().await;
        let (user, _) = ctx.create_user("stagiaire@example.com", Role::User).await;
        let formation = ctx.create_formation().await;

        let diplome = DiplomeService::create(
            ctx.db(),
            CreateDiplomeRequest {
                user_id: user.id,
                formation_id: formation.id,
                niveau: 1,
                date_obtention: date(2024, 2, 29),
            },
        )
        .await
        .unwrap();
        assert_eq!(diplome.date_expiration, date(2027, 2, 28));

        let found = DiplomeService::lookup_qr(ctx.db(), &diplome.qr_code.to_lowercase(), date(2025, 1, 1))
            .await
            .unwrap();
        match found {
            QrLookup::Diplome(public) => {
                assert_eq!(public.titulaire, "Camille Martin");
                assert_eq!(public.formation, "IRATA Niveau 1");
                assert!(public.valide);
            }
            other => panic!("unexpected lookup: {other:?}"),
        }

        let expired = DiplomeService::lookup_qr(ctx.db(), &diplome.qr_code, date(2027, 3, 1))
            .await
            .unwrap();
        assert!(matches!(expired, QrLookup::Diplome(PublicDiplome { valide: false, .. })));

        assert!(matches!(
            DiplomeService::lookup_qr(ctx.db(), "DEADBEEF", date(2025, 1, 1)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn test_create_rejects_unknown_user() {
        let ctx = test_context().await;
        let formation = ctx.create_formation().await;
        let err = DiplomeService::create(
            ctx.db(),
            CreateDiplomeRequest {
                user_id: 42,
                formation_id: formation.id,
                niveau: 2,
                date_obtention: date(2025, 1, 1),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
