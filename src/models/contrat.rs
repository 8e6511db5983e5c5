use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::SignatureStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contrats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub devis_id: i32, // un seul contrat par devis
    pub user_id: i32,
    pub statut: SignatureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_centre: Option<String>,
    pub signed_by_centre_at: Option<ChronoDateTimeUtc>,
    pub published_at: Option<ChronoDateTimeUtc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_stagiaire: Option<String>,
    pub signed_by_user_at: Option<ChronoDateTimeUtc>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::devis::Entity",
        from = "Column::DevisId",
        to = "super::devis::Column::Id"
    )]
    Devis,
}

impl Related<super::devis::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Devis.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
