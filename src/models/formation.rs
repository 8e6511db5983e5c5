use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Formation du catalogue (IRATA niveau 1, 2 ou 3)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "formations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub titre: String,
    pub niveau: i16,
    pub prix_ht: Decimal,
    pub duree_jours: i16,
    pub description: Option<String>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::demande::Entity")]
    Demande,
}

impl Related<super::demande::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Demande.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
