use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Décharge IRATA signée par un stagiaire pour une session
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "irata_disclaimers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub session: String,
    pub nom: String,
    pub prenom: String,
    pub date_naissance: Option<ChronoDate>,
    pub signature: String, // image de signature (data URL)
    pub submitted_at: ChronoDateTimeUtc,
    pub acknowledged_by: Option<i32>,
    pub acknowledged_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
