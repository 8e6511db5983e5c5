use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::SignatureStatus;

/// Document d'induction d'une session, signé par le centre puis publié
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inductions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub session: String,
    pub contenu: Json,
    pub statut: SignatureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_centre: Option<String>,
    pub signed_at: Option<ChronoDateTimeUtc>,
    pub published_at: Option<ChronoDateTimeUtc>,
    pub created_by: i32,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
