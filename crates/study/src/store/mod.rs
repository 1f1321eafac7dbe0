//! Persistence for users, documents, materials and notifications.
//!
//! [`MaterialStore`] is the seam between the study services and the
//! database. [`MemoryStore`] backs tests and deployments without
//! PostgreSQL; [`PgStore`] keeps everything in Postgres.

mod memory;
mod postgres;

use async_trait::async_trait;
use examly_core::{
    Document, DocumentId, Material, MaterialId, Notification, NotificationId, User, UserId,
    VoteKind, VoteTally,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0} already exists")]
    Conflict(String),
}

#[async_trait]
pub trait MaterialStore: Send + Sync {
    // ── Users ─────────────────────────────────────────────────

    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Lookup by normalized (trimmed, lower-cased) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Users whose email contains `fragment` (case-insensitive), excluding
    /// `exclude`, sorted by email.
    async fn search_users(
        &self,
        fragment: &str,
        exclude: UserId,
        limit: usize,
    ) -> Result<Vec<User>, StoreError>;

    // ── Documents ─────────────────────────────────────────────

    async fn insert_document(&self, doc: &Document) -> Result<(), StoreError>;

    /// Documents for `ids` in the order given. Unknown ids are skipped.
    async fn get_documents(&self, ids: &[DocumentId]) -> Result<Vec<Document>, StoreError>;

    async fn update_document(&self, doc: &Document) -> Result<(), StoreError>;

    async fn delete_documents(&self, ids: &[DocumentId]) -> Result<u64, StoreError>;

    // ── Materials ─────────────────────────────────────────────

    async fn insert_material(&self, material: &Material) -> Result<(), StoreError>;

    async fn get_material(&self, id: MaterialId) -> Result<Option<Material>, StoreError>;

    // The three mutations below read and write one material atomically, so
    // concurrent renames, shares and votes never overwrite each other.
    // Each returns `None` when the material no longer exists.

    /// Set the title and return the updated material.
    async fn rename_material(&self, id: MaterialId, title: &str) -> Result<Option<Material>, StoreError>;

    /// Add `user` to `sharedWith`. `Some(false)` if they already had access.
    async fn add_shared_with(&self, id: MaterialId, user: UserId) -> Result<Option<bool>, StoreError>;

    /// Replace `user`'s vote and return the new tally.
    async fn set_vote(
        &self,
        id: MaterialId,
        user: UserId,
        vote: VoteKind,
    ) -> Result<Option<VoteTally>, StoreError>;

    async fn delete_material(&self, id: MaterialId) -> Result<bool, StoreError>;

    /// Materials owned by or shared with `user`, newest first.
    async fn list_materials_for(&self, user: UserId, limit: usize) -> Result<Vec<Material>, StoreError>;

    // ── Notifications ─────────────────────────────────────────

    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError>;

    /// Notifications addressed to `user`, newest first.
    async fn list_notifications(&self, user: UserId, limit: usize) -> Result<Vec<Notification>, StoreError>;

    /// Flip `read` on one of `user`'s notifications. False if none matched.
    async fn mark_notification_read(&self, user: UserId, id: NotificationId) -> Result<bool, StoreError>;
}
