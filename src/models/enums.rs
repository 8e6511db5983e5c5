// Vocabulaires de statut partagés par les tables.
// Stockés en chaîne pour rester lisibles en base.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[sea_orm(string_value = "USER")]
    User,
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[sea_orm(string_value = "GESTIONNAIRE")]
    Gestionnaire,
    #[sea_orm(string_value = "CONTRIBUTOR")]
    Contributor,
    #[sea_orm(string_value = "CLIENT")]
    Client,
}

/// Statut d'une demande ou d'un devis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    #[sea_orm(string_value = "EN_ATTENTE")]
    EnAttente,
    #[sea_orm(string_value = "VALIDE")]
    Valide,
    #[sea_orm(string_value = "REFUSE")]
    Refuse,
}

/// Circuit de signature: le centre signe, publie, puis le stagiaire signe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum SignatureStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "signed")]
    Signed,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl SignatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureStatus::Pending => "pending",
            SignatureStatus::Signed => "signed",
            SignatureStatus::Published => "published",
            SignatureStatus::Completed => "completed",
        }
    }

    /// Visible par le signataire final (stagiaire ou client)
    pub fn is_visible_to_owner(&self) -> bool {
        matches!(self, SignatureStatus::Published | SignatureStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PARTIAL")]
    Partial,
    #[sea_orm(string_value = "PAID")]
    Paid,
}

/// Statut d'un paiement (facture ou contribution)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "SUCCEEDED")]
    Succeeded,
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

/// État d'un point de contrôle, ordonné du meilleur au pire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionVerdict {
    #[sea_orm(string_value = "CONFORME")]
    Conforme,
    #[sea_orm(string_value = "A_SURVEILLER")]
    ASurveiller,
    #[sea_orm(string_value = "NON_CONFORME")]
    NonConforme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReponseStatus {
    #[sea_orm(string_value = "SOUMIS")]
    Soumis,
    #[sea_orm(string_value = "A_CORRIGER")]
    ACorriger,
    #[sea_orm(string_value = "VALIDE")]
    Valide,
    #[sea_orm(string_value = "REMPLACE")]
    Remplace,
}
