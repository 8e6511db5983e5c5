use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::InspectionVerdict;

/// Fiche d'inspection simple d'un équipement (CI.ICE)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "equipment_inspections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub numero: String,
    #[sea_orm(unique)]
    pub qr_code: String,
    pub equipment_type: String, // harnais, descendeur, longe...
    pub reference: String,
    pub numero_serie: Option<String>,
    pub fabricant: Option<String>,
    pub date_inspection: ChronoDate,
    pub prochaine_inspection: ChronoDate,
    pub inspecteur: String,
    pub verdict: InspectionVerdict,
    pub observations: Option<String>,
    pub created_by: i32,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
