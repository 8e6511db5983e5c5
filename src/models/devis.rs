use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::DecisionStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devis")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub numero: String, // CI.DEV YYMM NNN
    pub reference_session: String, // CI.DES YYMM NNN
    #[sea_orm(unique)]
    pub demande_id: i32,
    pub user_id: i32,
    pub designation: String,
    pub montant_ht: Decimal,
    pub taux_tva: Decimal, // en pourcentage, 20 par défaut
    pub montant_ttc: Decimal,
    pub statut: DecisionStatus,

    // Coordonnées bancaires du centre (optionnelles)
    pub iban: Option<String>,
    pub bic: Option<String>,
    pub banque: Option<String>,

    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::demande::Entity",
        from = "Column::DemandeId",
        to = "super::demande::Column::Id"
    )]
    Demande,

    #[sea_orm(has_one = "super::contrat::Entity")]
    Contrat,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::demande::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Demande.def()
    }
}

impl Related<super::contrat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contrat.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
