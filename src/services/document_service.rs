use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use sea_orm::*;
use tracing::{info, warn};
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::dto::UploadDocumentRequest;
use crate::models::{devis, document, users};
use crate::services::storage::{storage_key, ObjectStore};
use crate::utils::error::{AppError, AppResult};

pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Corps JSON d'un dépôt: le fichier en base64 (4 octets pour 3) plus les métadonnées
pub const MAX_UPLOAD_BODY_BYTES: usize = MAX_DOCUMENT_BYTES.div_ceil(3) * 4 + 4096;

pub struct DocumentService;

impl DocumentService {
    /// Dépôt d'un fichier.
    /// Le personnel rattache librement; un stagiaire dépose pour lui-même,
    /// éventuellement sur l'un de ses devis, jamais en public.
    pub async fn upload(
        db: &DatabaseConnection,
        storage: &Arc<dyn ObjectStore>,
        auth: &AuthUser,
        request: UploadDocumentRequest,
    ) -> AppResult<document::Model> {
        request.validate()?;

        let bytes = STANDARD
            .decode(request.contenu_base64.trim())
            .map_err(|_| AppError::Validation("contenu_base64: invalid base64".to_string()))?;
        if bytes.is_empty() {
            return Err(AppError::Validation("contenu_base64: file is empty".to_string()));
        }
        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(AppError::Validation(format!(
                "contenu_base64: file exceeds {} bytes",
                MAX_DOCUMENT_BYTES
            )));
        }

        let (user_id, public) = if auth.is_staff() {
            if let Some(user_id) = request.user_id {
                users::Entity::find_by_id(user_id)
                    .one(db)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;
            }
            (request.user_id, request.public)
        } else {
            (Some(auth.user_id), false)
        };

        if let Some(devis_id) = request.devis_id {
            let devis = devis::Entity::find_by_id(devis_id)
                .one(db)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("devis {}", devis_id)))?;
            auth.ensure_owner(devis.user_id)?;
        }

        let key = storage_key("documents", &request.nom);
        let url = storage.put(&key, &bytes, &request.mime_type).await?;

        let inserted = document::ActiveModel {
            nom: Set(request.nom),
            url: Set(url),
            storage_key: Set(key.clone()),
            mime_type: Set(request.mime_type),
            taille: Set(bytes.len() as i64),
            user_id: Set(user_id),
            devis_id: Set(request.devis_id),
            public: Set(public),
            uploaded_by: Set(auth.user_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await;

        match inserted {
            Ok(document) => {
                info!(document_id = document.id, uploaded_by = auth.user_id, public, "document uploaded");
                Ok(document)
            }
            Err(e) => {
                // pas d'objet orphelin si l'écriture en base échoue
                if let Err(cleanup) = storage.delete(&key).await {
                    warn!(key = %key, error = %cleanup, "orphan object left in storage");
                }
                Err(e.into())
            }
        }
    }

    /// Publics, rattachés à l'appelant, ou rattachés à l'un de ses devis
    async fn visibility(db: &DatabaseConnection, auth: &AuthUser) -> AppResult<Condition> {
        let own_devis: Vec<i32> = devis::Entity::find()
            .select_only()
            .column(devis::Column::Id)
            .filter(devis::Column::UserId.eq(auth.user_id))
            .into_tuple()
            .all(db)
            .await?;

        let mut condition = Condition::any()
            .add(document::Column::Public.eq(true))
            .add(document::Column::UserId.eq(auth.user_id));
        if !own_devis.is_empty() {
            condition = condition.add(document::Column::DevisId.is_in(own_devis));
        }
        Ok(condition)
    }

    pub async fn list_visible(db: &DatabaseConnection, auth: &AuthUser) -> AppResult<Vec<document::Model>> {
        let mut query = document::Entity::find();
        if !auth.is_staff() {
            query = query.filter(Self::visibility(db, auth).await?);
        }
        Ok(query
            .order_by_desc(document::Column::CreatedAt)
            .all(db)
            .await?)
    }

    /// Un document invisible pour l'appelant est traité comme inexistant
    pub async fn get_visible(db: &DatabaseConnection, auth: &AuthUser, id: i32) -> AppResult<document::Model> {
        let mut query = document::Entity::find_by_id(id);
        if !auth.is_staff() {
            query = query.filter(Self::visibility(db, auth).await?);
        }
        query
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("document {}", id)))
    }

    pub async fn download(
        db: &DatabaseConnection,
        storage: &Arc<dyn ObjectStore>,
        auth: &AuthUser,
        id: i32,
    ) -> AppResult<(document::Model, Vec<u8>)> {
        let document = Self::get_visible(db, auth, id).await?;
        let bytes = storage.get(&document.storage_key).await?;
        Ok((document, bytes))
    }

    pub async fn delete(db: &DatabaseConnection, storage: &Arc<dyn ObjectStore>, id: i32) -> AppResult<()> {
        let document = document::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("document {}", id)))?;

        document::Entity::delete_by_id(id).exec(db).await?;
        storage.delete(&document.storage_key).await?;

        info!(document_id = id, "document deleted");
        Ok(())
    }
}
