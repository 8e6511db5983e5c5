use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Référence vers un fichier déposé dans le stockage objet.
/// Un document est soit public, soit rattaché à un stagiaire et/ou un devis.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub nom: String,
    pub url: String,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub mime_type: String,
    pub taille: i64,
    pub user_id: Option<i32>,
    pub devis_id: Option<i32>,
    pub public: bool,
    pub uploaded_by: i32,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
