// Tables de transition des statuts (décisions et circuit de signature)

use crate::models::enums::{DecisionStatus, ReponseStatus, SignatureStatus};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureEvent {
    CentreSign,
    Publish,
    OwnerSign,
}

impl SignatureEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureEvent::CentreSign => "sign as centre",
            SignatureEvent::Publish => "publish",
            SignatureEvent::OwnerSign => "sign as owner",
        }
    }
}

/// pending -> signed -> published -> completed
pub fn apply_signature_event(
    from: SignatureStatus,
    event: SignatureEvent,
) -> Result<SignatureStatus, AppError> {
    use SignatureEvent::*;
    use SignatureStatus::*;

    match (from, event) {
        (Pending, CentreSign) => Ok(Signed),
        (Signed, Publish) => Ok(Published),
        (Published, OwnerSign) => Ok(Completed),
        _ => Err(AppError::InvalidTransition {
            from: from.as_str().to_string(),
            action: event.as_str().to_string(),
        }),
    }
}

/// Une demande ou un devis ne se décide qu'une fois, depuis EN_ATTENTE
pub fn apply_decision(from: DecisionStatus, to: DecisionStatus) -> Result<DecisionStatus, AppError> {
    match (from, to) {
        (DecisionStatus::EnAttente, DecisionStatus::Valide | DecisionStatus::Refuse) => Ok(to),
        (_, DecisionStatus::EnAttente) => Err(AppError::Validation(
            "statut must be VALIDE or REFUSE".to_string(),
        )),
        _ => Err(AppError::InvalidTransition {
            from: format!("{:?}", from).to_uppercase(),
            action: format!("set {:?}", to).to_uppercase(),
        }),
    }
}

/// Correction d'une réponse: seule une réponse SOUMIS peut être corrigée
pub fn apply_correction(from: ReponseStatus, valide: bool) -> Result<ReponseStatus, AppError> {
    match from {
        ReponseStatus::Soumis if valide => Ok(ReponseStatus::Valide),
        ReponseStatus::Soumis => Ok(ReponseStatus::ACorriger),
        other => Err(AppError::InvalidTransition {
            from: format!("{:?}", other),
            action: "correct".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_happy_path() {
        let s = apply_signature_event(SignatureStatus::Pending, SignatureEvent::CentreSign).unwrap();
        assert_eq!(s, SignatureStatus::Signed);
        let s = apply_signature_event(s, SignatureEvent::Publish).unwrap();
        assert_eq!(s, SignatureStatus::Published);
        let s = apply_signature_event(s, SignatureEvent::OwnerSign).unwrap();
        assert_eq!(s, SignatureStatus::Completed);
    }

    #[test]
    fn test_signature_rejects_skips_and_replays() {
        assert!(matches!(
            apply_signature_event(SignatureStatus::Pending, SignatureEvent::Publish),
            Err(AppError::InvalidTransition { .. })
        ));
        assert!(apply_signature_event(SignatureStatus::Signed, SignatureEvent::OwnerSign).is_err());
        assert!(apply_signature_event(SignatureStatus::Signed, SignatureEvent::CentreSign).is_err());
        assert!(apply_signature_event(SignatureStatus::Completed, SignatureEvent::OwnerSign).is_err());
    }

    #[test]
    fn test_decision_only_from_pending() {
        assert_eq!(
            apply_decision(DecisionStatus::EnAttente, DecisionStatus::Valide).unwrap(),
            DecisionStatus::Valide
        );
        assert!(matches!(
            apply_decision(DecisionStatus::Valide, DecisionStatus::Refuse),
            Err(AppError::InvalidTransition { .. })
        ));
        assert!(matches!(
            apply_decision(DecisionStatus::EnAttente, DecisionStatus::EnAttente),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_correction() {
        assert_eq!(apply_correction(ReponseStatus::Soumis, true).unwrap(), ReponseStatus::Valide);
        assert_eq!(
            apply_correction(ReponseStatus::Soumis, false).unwrap(),
            ReponseStatus::ACorriger
        );
        assert!(apply_correction(ReponseStatus::Remplace, true).is_err());
    }
}
