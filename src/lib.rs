// Backend du centre de formation IRATA
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::{AppConfig, PaymentProvider};
use crate::services::payment::{InMemoryPaymentProcessor, PaymentProcessor, StripePaymentProcessor};
use crate::services::storage::{LocalObjectStore, ObjectStore};
use crate::utils::jwt::TokenService;

/// État partagé par tous les handlers
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub tokens: TokenService,
    pub storage: Arc<dyn ObjectStore>,
    pub payments: Arc<dyn PaymentProcessor>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        let payments: Arc<dyn PaymentProcessor> = match &config.payment_provider {
            PaymentProvider::Stripe { secret_key } => Arc::new(StripePaymentProcessor::new(secret_key.clone())),
            PaymentProvider::Memory => Arc::new(InMemoryPaymentProcessor::new(true)),
        };

        Self {
            tokens: TokenService::new(&config.jwt_secret, config.jwt_ttl_hours),
            storage: Arc::new(LocalObjectStore::new(
                config.upload_dir.clone(),
                config.public_files_url.clone(),
            )),
            payments,
            db,
            config,
        }
    }
}

// Outils partagés par les tests
#[cfg(test)]
pub mod test_utils {
    use std::path::PathBuf;
    use std::sync::Arc;

    use actix_web::web;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

    use super::AppState;
    use crate::config::{AppConfig, LogFormat, PaymentProvider};
    use crate::db;
    use crate::models::enums::{DecisionStatus, Role};
    use crate::models::{demande, formation, users};
    use crate::services::payment::InMemoryPaymentProcessor;
    use crate::services::storage::LocalObjectStore;
    use crate::utils::jwt::TokenService;
    use crate::utils::password;

    pub const TEST_PASSWORD: &str = "motdepasse-test";

    /// Base SQLite en mémoire avec le schéma complet.
    /// Une seule connexion: chaque connexion ":memory:" serait une base distincte.
    pub async fn test_db() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        db::sync_schema(&db).await.unwrap();
        db
    }

    pub struct TestContext {
        pub state: web::Data<AppState>,
        pub payments: Arc<InMemoryPaymentProcessor>,
        pub upload_dir: PathBuf,
    }

    pub async fn test_context() -> TestContext {
        let upload_dir = std::env::temp_dir().join(format!("irata-test-{}", uuid::Uuid::new_v4()));
        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_ttl_hours: 1,
            upload_dir: upload_dir.clone(),
            public_files_url: "/files".to_string(),
            log_format: LogFormat::Pretty,
            auto_migrate: true,
            payment_provider: PaymentProvider::Memory,
            crowdfunding_goal: Decimal::new(5_000, 0),
            cookie_secure: false,
        };
        let payments = Arc::new(InMemoryPaymentProcessor::new(false));

        let state = AppState {
            db: test_db().await,
            tokens: TokenService::new(&config.jwt_secret, config.jwt_ttl_hours),
            storage: Arc::new(LocalObjectStore::new(upload_dir.clone(), "/files")),
            payments: payments.clone(),
            config,
        };

        TestContext {
            state: web::Data::new(state),
            payments,
            upload_dir,
        }
    }

    impl TestContext {
        pub fn db(&self) -> &DatabaseConnection {
            &self.state.db
        }

        /// Crée un compte et retourne son jeton de session
        pub async fn create_user(&self, email: &str, role: Role) -> (users::Model, String) {
            let user = users::ActiveModel {
                email: Set(email.to_string()),
                password_hash: Set(password::hash_password_with_iterations(TEST_PASSWORD, 1000).unwrap()),
                nom: Set("Martin".to_string()),
                prenom: Set("Camille".to_string()),
                role: Set(role),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(self.db())
            .await
            .unwrap();

            let token = self
                .state
                .tokens
                .generate_token(user.id, &user.email, user.role)
                .unwrap();
            (user, token)
        }

        pub async fn create_formation(&self) -> formation::Model {
            formation::ActiveModel {
                titre: Set("IRATA Niveau 1".to_string()),
                niveau: Set(1),
                prix_ht: Set(Decimal::new(1200, 0)),
                duree_jours: Set(5),
                description: Set(None),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(self.db())
            .await
            .unwrap()
        }

        pub async fn create_demande(
            &self,
            user_id: i32,
            formation_id: i32,
            session: &str,
            statut: DecisionStatus,
        ) -> demande::Model {
            demande::ActiveModel {
                user_id: Set(user_id),
                formation_id: Set(formation_id),
                session: Set(session.to_string()),
                message: Set(None),
                statut: Set(statut),
                commentaire: Set(None),
                created_at: Set(Utc::now()),
                decided_at: Set(None),
                ..Default::default()
            }
            .insert(self.db())
            .await
            .unwrap()
        }
    }

    pub fn bearer(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", token))
    }

    /// Initialise l'application complète sur le contexte de test
    macro_rules! test_app {
        ($ctx:expr) => {
            actix_web::test::init_service(
                actix_web::App::new()
                    .app_data($ctx.state.clone())
                    .configure($crate::routes::configure_routes),
            )
            .await
        };
    }
    pub(crate) use test_app;
}
