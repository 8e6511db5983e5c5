use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::PaymentStatus;

/// Contribution au financement participatif
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contributions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub montant: Decimal,
    pub message: Option<String>,
    pub anonyme: bool,
    #[sea_orm(unique)]
    pub payment_intent_id: String,
    pub status: PaymentStatus,
    pub created_at: ChronoDateTimeUtc,
    pub confirmed_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
