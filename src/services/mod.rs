/*
services/
├─ numbering_service.rs     ← numéros CI.DEV / CI.DES / CI.ICE / CI.ICP / CI.FAC
├─ workflow.rs              ← transitions de statut (décision, signature, correction)
├─ demande_service.rs       ← demandes d'inscription
├─ devis_service.rs         ← devis, montants TTC
├─ contrat_service.rs       ← contrats et circuit de signature
├─ invoice_service.rs       ← factures, paiements manuels et en ligne
├─ document_service.rs      ← dépôt et visibilité des documents
├─ inspection_service.rs    ← fiches d'inspection des équipements
├─ diplome_service.rs       ← diplômes et recherche par QR code
├─ formulaire_service.rs    ← questionnaires quotidiens et corrections
├─ signature_service.rs     ← décharges IRATA et inductions
├─ contribution_service.rs  ← financement participatif
├─ payment.rs               ← processeur de paiement (Stripe / mémoire)
└─ storage.rs               ← stockage objet (disque local)
*/
pub mod numbering_service;
pub mod workflow;
pub mod demande_service;
pub mod devis_service;
pub mod contrat_service;
pub mod invoice_service;
pub mod document_service;
pub mod inspection_service;
pub mod diplome_service;
pub mod formulaire_service;
pub mod signature_service;
pub mod contribution_service;
pub mod payment;
pub mod storage;

use rust_decimal::Decimal;

use crate::utils::error::AppError;

/// Refuse un montant nul ou négatif
pub(crate) fn ensure_positive(amount: Decimal, field: &str) -> Result<(), AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation(format!("{}: must be greater than 0", field)));
    }
    Ok(())
}
