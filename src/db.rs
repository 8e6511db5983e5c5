// connexion BD

use sea_orm::sea_query::{Index, IntoIden};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use std::time::Duration;
use tracing::info;

use crate::models::{
    contrat, contribution, demande, devis, diplome, document, equipment_detailed_inspection,
    equipment_inspection, formation, formulaire_quotidien, induction, induction_signature,
    invoice, invoice_payment, irata_disclaimer, reponse_formulaire, sequence_counter, users,
};

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(20)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(options).await
}

/// Crée les tables manquantes à partir des entités.
/// L'évolution du schéma reste l'affaire des migrations.
pub async fn sync_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    // parents avant enfants (clés étrangères)
    create_table(db, &schema, users::Entity).await?;
    create_table(db, &schema, formation::Entity).await?;
    create_table(db, &schema, demande::Entity).await?;
    create_table(db, &schema, devis::Entity).await?;
    create_table(db, &schema, contrat::Entity).await?;
    create_table(db, &schema, invoice::Entity).await?;
    create_table(db, &schema, invoice_payment::Entity).await?;
    create_table(db, &schema, document::Entity).await?;
    create_table(db, &schema, equipment_inspection::Entity).await?;
    create_table(db, &schema, equipment_detailed_inspection::Entity).await?;
    create_table(db, &schema, diplome::Entity).await?;
    create_table(db, &schema, formulaire_quotidien::Entity).await?;
    create_table(db, &schema, reponse_formulaire::Entity).await?;
    create_table(db, &schema, contribution::Entity).await?;
    create_table(db, &schema, irata_disclaimer::Entity).await?;
    create_table(db, &schema, induction::Entity).await?;
    create_table(db, &schema, induction_signature::Entity).await?;
    create_table(db, &schema, sequence_counter::Entity).await?;

    // une signature par stagiaire et par induction, un disclaimer par session,
    // une réponse par version: la base tranche entre requêtes concurrentes
    create_unique_index(
        db,
        "uq_induction_signatures_induction_user",
        induction_signature::Entity,
        [induction_signature::Column::InductionId, induction_signature::Column::UserId],
    )
    .await?;
    create_unique_index(
        db,
        "uq_irata_disclaimers_user_session",
        irata_disclaimer::Entity,
        [irata_disclaimer::Column::UserId, irata_disclaimer::Column::Session],
    )
    .await?;
    create_unique_index(
        db,
        "uq_reponses_formulaire_user_version",
        reponse_formulaire::Entity,
        [
            reponse_formulaire::Column::FormulaireId,
            reponse_formulaire::Column::UserId,
            reponse_formulaire::Column::Version,
        ],
    )
    .await?;

    info!("database schema synchronized");
    Ok(())
}

async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}

async fn create_unique_index<E, C, const N: usize>(
    db: &DatabaseConnection,
    name: &str,
    entity: E,
    columns: [C; N],
) -> Result<(), DbErr>
where
    E: EntityTrait,
    C: IntoIden,
{
    let mut statement = Index::create();
    statement.name(name).table(entity).unique().if_not_exists();
    for column in columns {
        statement.col(column);
    }

    let backend = db.get_database_backend();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, Set};

    use crate::models::enums::ReponseStatus;
    use crate::models::{formulaire_quotidien, induction_signature, irata_disclaimer, reponse_formulaire};
    use crate::test_utils::test_db;
    use crate::utils::error::AppError;

    #[actix_web::test]
    async fn test_duplicate_induction_signature_is_rejected() {
        let db = test_db().await;
        let signature = || induction_signature::ActiveModel {
            induction_id: Set(7),
            user_id: Set(3),
            signature: Set("data:image/png;base64,AAAA".into()),
            signed_at: Set(Utc::now()),
            ..Default::default()
        };

        signature().insert(&db).await.unwrap();
        let err: AppError = signature().insert(&db).await.unwrap_err().into();
        assert!(matches!(err, AppError::Conflict(_)));

        // un autre stagiaire signe la même induction
        let mut other = signature();
        other.user_id = Set(4);
        other.insert(&db).await.unwrap();
    }

    #[actix_web::test]
    async fn test_one_disclaimer_per_trainee_and_session() {
        let db = test_db().await;
        let disclaimer = |session: &str| irata_disclaimer::ActiveModel {
            user_id: Set(3),
            session: Set(session.to_string()),
            nom: Set("Martin".into()),
            prenom: Set("Camille".into()),
            date_naissance: Set(None),
            signature: Set("data:image/png;base64,AAAA".into()),
            submitted_at: Set(Utc::now()),
            acknowledged_by: Set(None),
            acknowledged_at: Set(None),
            ..Default::default()
        };

        disclaimer("octobre").insert(&db).await.unwrap();
        let err: AppError = disclaimer("octobre").insert(&db).await.unwrap_err().into();
        assert!(matches!(err, AppError::Conflict(_)));
        disclaimer("novembre").insert(&db).await.unwrap();
    }

    #[actix_web::test]
    async fn test_reponse_versions_are_unique_per_trainee() {
        let db = test_db().await;
        let formulaire = formulaire_quotidien::ActiveModel {
            titre: Set("Jour 1".into()),
            session: Set("octobre".into()),
            date: Set(Utc::now().date_naive()),
            questions: Set(serde_json::json!([])),
            actif: Set(true),
            created_by: Set(1),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        let reponse = |version: i32| reponse_formulaire::ActiveModel {
            formulaire_id: Set(formulaire.id),
            user_id: Set(3),
            reponses: Set(serde_json::json!({ "q1": "oui" })),
            statut: Set(ReponseStatus::Soumis),
            version: Set(version),
            previous_id: Set(None),
            correction: Set(None),
            corrected_by: Set(None),
            corrected_at: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        reponse(1).insert(&db).await.unwrap();
        let err: AppError = reponse(1).insert(&db).await.unwrap_err().into();
        assert!(matches!(err, AppError::Conflict(_)));
        reponse(2).insert(&db).await.unwrap();
    }

    #[actix_web::test]
    async fn test_sync_schema_is_repeatable() {
        let db = test_db().await;
        super::sync_schema(&db).await.unwrap();
    }
}
