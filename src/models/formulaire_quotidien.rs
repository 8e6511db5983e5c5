use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Questionnaire quotidien d'une session.
/// `questions` : [{ "id": "q1", "libelle": "...", "obligatoire": true }]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "formulaires_quotidiens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub titre: String,
    pub session: String,
    pub date: ChronoDate,
    pub questions: Json,
    pub actif: bool,
    pub created_by: i32,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::reponse_formulaire::Entity")]
    Reponse,
}

impl Related<super::reponse_formulaire::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reponse.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
