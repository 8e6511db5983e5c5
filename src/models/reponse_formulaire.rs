use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::ReponseStatus;

/// Réponse d'un stagiaire à un questionnaire.
/// Chaque resoumission crée une nouvelle version chaînée par `previous_id`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reponses_formulaire")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub formulaire_id: i32,
    pub user_id: i32,
    pub reponses: Json,
    pub statut: ReponseStatus,
    pub version: i32,
    pub previous_id: Option<i32>,
    pub correction: Option<String>,
    pub corrected_by: Option<i32>,
    pub corrected_at: Option<ChronoDateTimeUtc>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::formulaire_quotidien::Entity",
        from = "Column::FormulaireId",
        to = "super::formulaire_quotidien::Column::Id"
    )]
    Formulaire,
}

impl Related<super::formulaire_quotidien::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Formulaire.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
