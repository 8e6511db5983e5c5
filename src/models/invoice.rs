use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

use super::enums::InvoiceStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub numero: String, // CI.FAC YYMM NNN
    pub contrat_id: i32,
    pub user_id: i32,
    pub montant: Decimal,
    pub paid_amount: Decimal,
    pub status: InvoiceStatus,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contrat::Entity",
        from = "Column::ContratId",
        to = "super::contrat::Column::Id"
    )]
    Contrat,

    #[sea_orm(has_many = "super::invoice_payment::Entity")]
    Payment,
}

impl Related<super::contrat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contrat.def()
    }
}

impl Related<super::invoice_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
