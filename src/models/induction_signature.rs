use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "induction_signatures")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub induction_id: i32,
    pub user_id: i32,
    pub signature: String,
    pub signed_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
