// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table avec SeaORM.
//
// Liste des modules:
//   - enums : Vocabulaires de statut (rôles, décisions, signatures...)
//   - health : Health check API
//   - dto : Requêtes et réponses de l'API
//   - users : Comptes (ADMIN, GESTIONNAIRE, USER, CLIENT, CONTRIBUTOR)
//   - formation : Catalogue des formations IRATA
//   - demande : Demandes d'inscription à une session
//   - devis : Devis numérotés CI.DEV / CI.DES
//   - contrat : Contrats issus d'un devis validé (un par devis)
//   - invoice / invoice_payment : Factures CI.FAC et leurs paiements
//   - document : Fichiers déposés (publics ou rattachés)
//   - equipment_inspection / equipment_detailed_inspection : Fiches CI.ICE / CI.ICP
//   - diplome : Diplômes consultables par QR code
//   - formulaire_quotidien / reponse_formulaire : Questionnaires quotidiens
//   - contribution : Financement participatif
//   - irata_disclaimer / induction / induction_signature : Documents signés
//   - sequence_counter : Compteurs de numérotation
//
// Points d'attention:
//   - Les statuts sont des enums stockés en chaîne
//   - Les montants sont des Decimal (jamais de f64)
//
// ============================================================================

pub mod enums;
pub mod health;
pub mod dto;
pub mod users;
pub mod formation;
pub mod demande;
pub mod devis;
pub mod contrat;
pub mod invoice;
pub mod invoice_payment;
pub mod document;
pub mod equipment_inspection;
pub mod equipment_detailed_inspection;
pub mod diplome;
pub mod formulaire_quotidien;
pub mod reponse_formulaire;
pub mod contribution;
pub mod irata_disclaimer;
pub mod induction;
pub mod induction_signature;
pub mod sequence_counter;
