// Requêtes et réponses de l'API
use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::{DecisionStatus, InspectionVerdict, Role};
use super::{diplome, equipment_detailed_inspection, equipment_inspection, users};

// ---------------------------------------------------------------- auth

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "invalid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub nom: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub prenom: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub new_password: String,
}

// Réponse après login/register
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: users::Model,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

// ---------------------------------------------------------------- formations

#[derive(Debug, Deserialize, Validate)]
pub struct FormationRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub titre: String,
    #[validate(range(min = 1, max = 3, message = "must be 1, 2 or 3"))]
    pub niveau: i16,
    pub prix_ht: Decimal,
    #[validate(range(min = 1, message = "must be positive"))]
    pub duree_jours: i16,
    pub description: Option<String>,
}

// ---------------------------------------------------------------- demandes

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDemandeRequest {
    pub formation_id: i32,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub session: String,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub statut: DecisionStatus,
    pub commentaire: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub statut: Option<DecisionStatus>,
}

// ---------------------------------------------------------------- devis

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateNumbersQuery {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub session: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratedNumbers {
    pub numero: String,
    #[serde(rename = "referenceSession")]
    pub reference_session: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDevisRequest {
    pub demande_id: i32,
    pub montant_ht: Decimal,
    pub taux_tva: Option<Decimal>,
    pub designation: Option<String>,
    pub numero: Option<String>,
    pub reference_session: Option<String>,
    #[validate(length(min = 14, max = 34, message = "invalid IBAN length"))]
    pub iban: Option<String>,
    #[validate(length(min = 8, max = 11, message = "invalid BIC length"))]
    pub bic: Option<String>,
    pub banque: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDevisRequest {
    pub montant_ht: Option<Decimal>,
    pub taux_tva: Option<Decimal>,
    pub designation: Option<String>,
    #[validate(length(min = 14, max = 34, message = "invalid IBAN length"))]
    pub iban: Option<String>,
    #[validate(length(min = 8, max = 11, message = "invalid BIC length"))]
    pub bic: Option<String>,
    pub banque: Option<String>,
}

// ---------------------------------------------------------------- contrats

#[derive(Debug, Deserialize)]
pub struct CreateContratRequest {
    pub devis_id: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignatureRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub signature: String,
}

// ---------------------------------------------------------------- factures

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub contrat_id: i32,
    pub montant: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct ManualPaymentRequest {
    pub montant: Decimal,
}

#[derive(Debug, Deserialize, Default)]
pub struct PaymentIntentRequest {
    pub montant: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub montant: Decimal,
    pub currency: String,
}

// ---------------------------------------------------------------- documents

#[derive(Debug, Deserialize, Validate)]
pub struct UploadDocumentRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1 to 255 characters"))]
    pub nom: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub mime_type: String,
    pub contenu_base64: String,
    pub user_id: Option<i32>,
    pub devis_id: Option<i32>,
    #[serde(default)]
    pub public: bool,
}

// ---------------------------------------------------------------- inspections

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInspectionRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub equipment_type: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub reference: String,
    pub numero_serie: Option<String>,
    pub fabricant: Option<String>,
    pub date_inspection: NaiveDate,
    pub prochaine_inspection: Option<NaiveDate>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub inspecteur: String,
    pub verdict: Option<InspectionVerdict>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub point: String,
    pub etat: InspectionVerdict,
    pub commentaire: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDetailedInspectionRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub equipment_type: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub reference: String,
    pub numero_serie: Option<String>,
    pub fabricant: Option<String>,
    pub date_fabrication: Option<NaiveDate>,
    pub date_inspection: NaiveDate,
    pub prochaine_inspection: Option<NaiveDate>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub inspecteur: String,
    #[validate(length(min = 1, message = "at least one checkpoint is required"))]
    pub points: Vec<Checkpoint>,
    pub observations: Option<String>,
}

// ---------------------------------------------------------------- diplômes

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDiplomeRequest {
    pub user_id: i32,
    pub formation_id: i32,
    #[validate(range(min = 1, max = 3, message = "must be 1, 2 or 3"))]
    pub niveau: i16,
    pub date_obtention: NaiveDate,
}

// ---------------------------------------------------------------- QR

/// Vue publique d'une fiche résolue par QR code
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum QrLookup {
    Inspection(PublicInspection),
    InspectionDetaillee(PublicDetailedInspection),
    Diplome(PublicDiplome),
}

#[derive(Debug, Serialize)]
pub struct PublicInspection {
    pub numero: String,
    pub equipment_type: String,
    pub reference: String,
    pub numero_serie: Option<String>,
    pub date_inspection: NaiveDate,
    pub prochaine_inspection: NaiveDate,
    pub verdict: InspectionVerdict,
}

impl From<equipment_inspection::Model> for PublicInspection {
    fn from(m: equipment_inspection::Model) -> Self {
        Self {
            numero: m.numero,
            equipment_type: m.equipment_type,
            reference: m.reference,
            numero_serie: m.numero_serie,
            date_inspection: m.date_inspection,
            prochaine_inspection: m.prochaine_inspection,
            verdict: m.verdict,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublicDetailedInspection {
    pub numero: String,
    pub equipment_type: String,
    pub reference: String,
    pub numero_serie: Option<String>,
    pub fabricant: Option<String>,
    pub date_inspection: NaiveDate,
    pub prochaine_inspection: NaiveDate,
    pub points: serde_json::Value,
    pub verdict: InspectionVerdict,
}

impl From<equipment_detailed_inspection::Model> for PublicDetailedInspection {
    fn from(m: equipment_detailed_inspection::Model) -> Self {
        Self {
            numero: m.numero,
            equipment_type: m.equipment_type,
            reference: m.reference,
            numero_serie: m.numero_serie,
            fabricant: m.fabricant,
            date_inspection: m.date_inspection,
            prochaine_inspection: m.prochaine_inspection,
            points: m.points,
            verdict: m.verdict,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublicDiplome {
    pub titulaire: String,
    pub formation: String,
    pub niveau: i16,
    pub date_obtention: NaiveDate,
    pub date_expiration: NaiveDate,
    pub valide: bool,
}

impl PublicDiplome {
    pub fn new(diplome: diplome::Model, titulaire: String, formation: String, today: NaiveDate) -> Self {
        Self {
            titulaire,
            formation,
            niveau: diplome.niveau,
            date_obtention: diplome.date_obtention,
            date_expiration: diplome.date_expiration,
            valide: diplome.date_expiration >= today,
        }
    }
}

// ---------------------------------------------------------------- questionnaires

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub libelle: String,
    #[serde(default)]
    pub obligatoire: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFormulaireRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub titre: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub session: String,
    pub date: NaiveDate,
    #[validate(length(min = 1, message = "at least one question is required"))]
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitReponseRequest {
    pub reponses: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CorrectionRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub commentaire: String,
    pub valide: bool,
}

// ---------------------------------------------------------------- documents signés

#[derive(Debug, Deserialize, Validate)]
pub struct DisclaimerRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub session: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub nom: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub prenom: String,
    pub date_naissance: Option<NaiveDate>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionFilter {
    pub session: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInductionRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub session: String,
    pub contenu: serde_json::Value,
}

// ---------------------------------------------------------------- financement participatif

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContributionRequest {
    pub montant: Decimal,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub message: Option<String>,
    #[serde(default)]
    pub anonyme: bool,
}

#[derive(Debug, Serialize)]
pub struct ContributionCreated {
    pub contribution_id: i32,
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CrowdfundingSummary {
    pub objectif: Decimal,
    pub total: Decimal,
    pub contributeurs: u64,
    pub messages: Vec<PublicContribution>,
}

#[derive(Debug, Serialize)]
pub struct PublicContribution {
    pub auteur: Option<String>,
    pub montant: Decimal,
    pub message: Option<String>,
}
