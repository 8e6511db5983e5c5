use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::InspectionVerdict;

/// Examen approfondi point par point (CI.ICP).
/// `points` contient la liste des points de contrôle en JSON.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "equipment_detailed_inspections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub numero: String,
    #[sea_orm(unique)]
    pub qr_code: String,
    pub equipment_type: String,
    pub reference: String,
    pub numero_serie: Option<String>,
    pub fabricant: Option<String>,
    pub date_fabrication: Option<ChronoDate>,
    pub date_inspection: ChronoDate,
    pub prochaine_inspection: ChronoDate,
    pub inspecteur: String,
    pub points: Json,
    pub verdict: InspectionVerdict,
    pub observations: Option<String>,
    pub created_by: i32,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
