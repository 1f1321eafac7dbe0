use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use examly_core::config::PostgresConfig;
use examly_core::{
    normalize_email, Document, DocumentId, Material, MaterialId, Notification, NotificationId,
    NotificationKind, User, UserId, VoteKind, VoteTally,
};

use super::{MaterialStore, StoreError};

const DOCUMENT_COLUMNS: &str = "id, owner_id, file_name, original_name, file_type, file_size, file_path, \
     chapter_order, chapter_title, extracted_text, processed, created_at, updated_at";

/// PostgreSQL-backed store. Materials are kept as JSONB.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and apply pending migrations.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_string())
            .await?;
        info!("PostgreSQL connected: {}", config.host);
        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!("Database migrations applied successfully");
        Ok(Self { pool })
    }

    /// Lock one material row, apply `f`, and write it back when `f` reports a
    /// change. `None` if the material does not exist.
    async fn modify<R, F>(&self, id: MaterialId, f: F) -> Result<Option<R>, StoreError>
    where
        F: FnOnce(&mut Material) -> (R, bool) + Send,
        R: Send,
    {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, (Json<Material>,)>(
            "SELECT data FROM materials WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((Json(mut material),)) = row else {
            return Ok(None);
        };

        let (out, changed) = f(&mut material);
        if changed {
            sqlx::query(
                "UPDATE materials SET shared_with = $2, data = $3, updated_at = $4 WHERE id = $1",
            )
            .bind(material.id)
            .bind(&material.shared_with)
            .bind(Json(&material))
            .bind(material.updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(Some(out))
    }
}

// ── Row types ────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    name: Option<String>,
    email_verified: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            email: r.email,
            password_hash: r.password_hash,
            name: r.name,
            email_verified: r.email_verified,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    owner_id: Uuid,
    file_name: String,
    original_name: String,
    file_type: String,
    file_size: i64,
    file_path: String,
    chapter_order: Option<i32>,
    chapter_title: Option<String>,
    extracted_text: Option<String>,
    processed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(r: DocumentRow) -> Self {
        Document {
            id: r.id,
            owner_id: r.owner_id,
            file_name: r.file_name,
            original_name: r.original_name,
            file_type: r.file_type,
            file_size: u64::try_from(r.file_size).unwrap_or(0),
            file_path: r.file_path,
            chapter_order: r.chapter_order.and_then(|o| u32::try_from(o).ok()),
            chapter_title: r.chapter_title,
            extracted_text: r.extracted_text,
            processed: r.processed,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    material_id: Uuid,
    shared_by: Uuid,
    message: String,
    read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(r: NotificationRow) -> Self {
        let kind = if r.kind == NotificationKind::MaterialInvited.as_str() {
            NotificationKind::MaterialInvited
        } else {
            NotificationKind::MaterialShared
        };
        Notification {
            id: r.id,
            user_id: r.user_id,
            kind,
            material_id: r.material_id,
            shared_by: r.shared_by,
            message: r.message,
            read: r.read,
            created_at: r.created_at,
        }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

// ── Store ────────────────────────────────────────────────────────

#[async_trait]
impl MaterialStore for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, email_verified, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.email_verified)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("user {}", user.email))
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, name, email_verified, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, name, email_verified, created_at FROM users WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn search_users(
        &self,
        fragment: &str,
        exclude: UserId,
        limit: usize,
    ) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, name, email_verified, created_at FROM users
             WHERE strpos(lower(email), lower($1)) > 0 AND id <> $2
             ORDER BY email LIMIT $3",
        )
        .bind(fragment)
        .bind(exclude)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn insert_document(&self, doc: &Document) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO documents ({DOCUMENT_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(doc.id)
        .bind(doc.owner_id)
        .bind(&doc.file_name)
        .bind(&doc.original_name)
        .bind(&doc.file_type)
        .bind(doc.file_size as i64)
        .bind(&doc.file_path)
        .bind(doc.chapter_order.map(|o| o as i32))
        .bind(&doc.chapter_title)
        .bind(&doc.extracted_text)
        .bind(doc.processed)
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_documents(&self, ids: &[DocumentId]) -> Result<Vec<Document>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id: std::collections::HashMap<Uuid, Document> =
            rows.into_iter().map(|r| (r.id, Document::from(r))).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn update_document(&self, doc: &Document) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE documents SET
                chapter_order = $2,
                chapter_title = $3,
                extracted_text = $4,
                processed = $5,
                updated_at = now()
             WHERE id = $1",
        )
        .bind(doc.id)
        .bind(doc.chapter_order.map(|o| o as i32))
        .bind(&doc.chapter_title)
        .bind(&doc.extracted_text)
        .bind(doc.processed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_documents(&self, ids: &[DocumentId]) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_material(&self, material: &Material) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO materials (id, owner_id, shared_with, data, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(material.id)
        .bind(material.owner_id)
        .bind(&material.shared_with)
        .bind(Json(material))
        .bind(material.created_at)
        .bind(material.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_material(&self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        let row = sqlx::query_as::<_, (Json<Material>,)>("SELECT data FROM materials WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(m),)| m))
    }

    async fn rename_material(&self, id: MaterialId, title: &str) -> Result<Option<Material>, StoreError> {
        self.modify(id, |m| {
            m.rename(title);
            (m.clone(), true)
        })
        .await
    }

    async fn add_shared_with(&self, id: MaterialId, user: UserId) -> Result<Option<bool>, StoreError> {
        self.modify(id, |m| {
            let added = m.share_with(user);
            (added, added)
        })
        .await
    }

    async fn set_vote(
        &self,
        id: MaterialId,
        user: UserId,
        vote: VoteKind,
    ) -> Result<Option<VoteTally>, StoreError> {
        self.modify(id, |m| (m.cast_vote(user, vote), true)).await
    }

    async fn delete_material(&self, id: MaterialId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM materials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_materials_for(&self, user: UserId, limit: usize) -> Result<Vec<Material>, StoreError> {
        let rows = sqlx::query_as::<_, (Json<Material>,)>(
            "SELECT data FROM materials
             WHERE owner_id = $1 OR $1 = ANY(shared_with)
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(Json(m),)| m).collect())
    }

    async fn insert_notification(&self, n: &Notification) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, kind, material_id, shared_by, message, read, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(n.id)
        .bind(n.user_id)
        .bind(n.kind.as_str())
        .bind(n.material_id)
        .bind(n.shared_by)
        .bind(&n.message)
        .bind(n.read)
        .bind(n.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_notifications(&self, user: UserId, limit: usize) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, user_id, kind, material_id, shared_by, message, read, created_at
             FROM notifications WHERE user_id = $1
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_notification_read(&self, user: UserId, id: NotificationId) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
