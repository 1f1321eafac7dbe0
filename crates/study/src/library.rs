//! Everything users do with documents and materials outside ingestion:
//! upload, browse, rename, delete, share, vote, notifications.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use examly_core::filename::extension_of;
use examly_core::{
    normalize_email, Document, DocumentId, ExtractionStatus, Material, MaterialId, Notification,
    NotificationId, NotificationKind, User, UserId, VoteKind, VoteTally,
};
use examly_ingest::{extract_text, is_supported};
use examly_notify::Notifier;
use examly_storage::BlobStore;

use crate::error::StudyError;
use crate::store::{MaterialStore, StoreError};

const MATERIAL_LIST_LIMIT: usize = 100;
const NOTIFICATION_LIMIT: usize = 50;
const SUGGESTION_LIMIT: usize = 10;
const MIN_SUGGESTION_QUERY: usize = 2;

// ── Views ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub original_name: String,
    pub file_type: String,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonInfo {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// A material as listed for one viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialView {
    #[serde(flatten)]
    pub material: Material,
    pub is_owner: bool,
    pub owner: Option<PersonInfo>,
    pub documents: Vec<DocumentSummary>,
    pub vote_tally: VoteTally,
    pub user_vote: Option<VoteKind>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDocument {
    pub id: DocumentId,
    pub original_name: String,
    pub file_type: String,
    pub chapter_order: Option<u32>,
    pub chapter_title: Option<String>,
    pub extracted_text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub material_id: MaterialId,
    pub material_title: String,
    pub shared_by: Option<PersonInfo>,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSuggestion {
    pub email: String,
    pub name: String,
}

/// Per-address outcome counts of one share request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareCounts {
    pub shared: usize,
    pub already_shared: usize,
    pub not_found: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareReport {
    pub message: String,
    pub results: ShareCounts,
    #[serde(skip)]
    pub error_details: Vec<String>,
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

impl ShareCounts {
    /// "Successfully shared with 2 users. 1 user already had access", with
    /// zero counts left out.
    pub fn message(&self) -> String {
        let parts = [
            (self.shared, format!("Successfully shared with {}", plural(self.shared, "user"))),
            (self.already_shared, format!("{} already had access", plural(self.already_shared, "user"))),
            (self.not_found, format!("{} not found", plural(self.not_found, "user"))),
            (self.errors, plural(self.errors, "error")),
        ];
        parts
            .into_iter()
            .filter(|(n, _)| *n > 0)
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join(". ")
    }
}

/// A file received for upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Bytes,
}

fn person(user: &User) -> PersonInfo {
    PersonInfo {
        id: user.id,
        name: user.display_name().to_string(),
        email: user.email.clone(),
    }
}

fn stored_file_name(original: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!(
        "{}-{}{}",
        Utc::now().timestamp_millis(),
        suffix.to_lowercase(),
        extension_of(original)
    )
}

// ── Library ──────────────────────────────────────────────────────

pub struct Library {
    store: Arc<dyn MaterialStore>,
    blobs: Arc<BlobStore>,
    notifier: Arc<Notifier>,
}

impl Library {
    pub fn new(store: Arc<dyn MaterialStore>, blobs: Arc<BlobStore>, notifier: Arc<Notifier>) -> Self {
        Self { store, blobs, notifier }
    }

    async fn material(&self, id: MaterialId) -> Result<Material, StudyError> {
        self.store
            .get_material(id)
            .await?
            .ok_or_else(|| StudyError::NotFound("Study material".into()))
    }

    /// The material if `user` owns it. Readers who are not the owner get
    /// `Unauthorized`; everyone else `NotFound`.
    async fn owned_material(&self, user: UserId, id: MaterialId, action: &str) -> Result<Material, StudyError> {
        let material = self.material(id).await?;
        if material.is_owner(user) {
            Ok(material)
        } else if material.can_read(user) {
            Err(StudyError::Unauthorized(format!("You can only {action} materials you own")))
        } else {
            Err(StudyError::NotFound("Study material".into()))
        }
    }

    // ── Documents ─────────────────────────────────────────────

    /// Store each file and create its Document. Text is extracted right
    /// away from the received bytes; failures leave it empty for the
    /// pipeline to retry.
    pub async fn upload(&self, owner: UserId, files: Vec<UploadedFile>) -> Result<Vec<Document>, StudyError> {
        if files.is_empty() {
            return Err(StudyError::BadRequest("No files uploaded".into()));
        }
        if let Some(bad) = files.iter().find(|f| !is_supported(&f.name)) {
            return Err(StudyError::UnsupportedFileType(bad.name.clone()));
        }

        let mut saved = Vec::with_capacity(files.len());
        for file in files {
            let stored_name = stored_file_name(&file.name);
            let path = format!("{owner}/{stored_name}");

            let bytes = file.bytes.clone();
            let name = file.name.clone();
            let extracted = match tokio::task::spawn_blocking(move || extract_text(&bytes, &name)).await {
                Ok(Ok(doc)) => Some(doc.text),
                Ok(Err(e)) => {
                    warn!(file = %file.name, error = %e, "extraction at upload failed");
                    None
                }
                Err(e) => {
                    warn!(file = %file.name, error = %e, "extraction task panicked");
                    None
                }
            };

            self.blobs.upload(&path, file.bytes.clone()).await?;

            let mut doc = Document::new(
                owner,
                stored_name,
                file.name.clone(),
                extension_of(&file.name),
                file.bytes.len() as u64,
                path,
            );
            doc.extracted_text = extracted;
            if let Err(e) = self.store.insert_document(&doc).await {
                if let Err(cleanup) = self.blobs.delete(&doc.file_path).await {
                    warn!(path = %doc.file_path, error = %cleanup, "failed to delete orphaned blob");
                }
                return Err(e.into());
            }
            info!(
                document = %doc.id,
                file = %doc.original_name,
                chars = doc.extracted_text.as_ref().map_or(0, String::len),
                "document uploaded"
            );
            saved.push(doc);
        }
        Ok(saved)
    }

    /// Extraction progress for the caller's documents among `ids`.
    pub async fn extraction_status(&self, user: UserId, ids: &[DocumentId]) -> Result<Vec<ExtractionStatus>, StudyError> {
        Ok(self
            .store
            .get_documents(ids)
            .await?
            .iter()
            .filter(|d| d.owner_id == user)
            .map(ExtractionStatus::from)
            .collect())
    }

    /// Time-limited read URL for one of the caller's blobs.
    pub async fn document_url(&self, user: UserId, path: &str, ttl: Duration) -> Result<String, StudyError> {
        if !path.starts_with(&format!("{user}/")) {
            return Err(StudyError::Unauthorized("You can only access your own files".into()));
        }
        Ok(self.blobs.signed_url(path, ttl).await?)
    }

    // ── Materials ─────────────────────────────────────────────

    /// Materials the user owns or was given, newest first.
    pub async fn list(&self, user: UserId) -> Result<Vec<MaterialView>, StudyError> {
        let materials = self.store.list_materials_for(user, MATERIAL_LIST_LIMIT).await?;

        let doc_ids: Vec<DocumentId> = materials.iter().flat_map(|m| m.document_ids.iter().copied()).collect();
        let documents: HashMap<DocumentId, DocumentSummary> = self
            .store
            .get_documents(&doc_ids)
            .await?
            .into_iter()
            .map(|d| {
                (
                    d.id,
                    DocumentSummary {
                        id: d.id,
                        original_name: d.original_name,
                        file_type: d.file_type,
                        file_path: d.file_path,
                    },
                )
            })
            .collect();

        let owner_ids: HashSet<UserId> = materials.iter().map(|m| m.owner_id).collect();
        let mut owners = HashMap::new();
        for id in owner_ids {
            if let Some(user) = self.store.get_user(id).await? {
                owners.insert(id, person(&user));
            }
        }

        Ok(materials
            .into_iter()
            .map(|m| MaterialView {
                is_owner: m.is_owner(user),
                owner: owners.get(&m.owner_id).cloned(),
                documents: m.document_ids.iter().filter_map(|id| documents.get(id).cloned()).collect(),
                vote_tally: m.tally(),
                user_vote: m.votes.iter().find(|v| v.user_id == user).map(|v| v.vote),
                material: m,
            })
            .collect())
    }

    /// The material's documents in chapter order, with full text.
    pub async fn documents(&self, user: UserId, id: MaterialId) -> Result<Vec<ChapterDocument>, StudyError> {
        let material = self.material(id).await?;
        if !material.can_read(user) {
            return Err(StudyError::NotFound("Material".into()));
        }

        let mut docs = self.store.get_documents(&material.document_ids).await?;
        docs.sort_by_key(|d| d.chapter_order.unwrap_or(u32::MAX));
        Ok(docs
            .into_iter()
            .map(|d| ChapterDocument {
                id: d.id,
                chapter_order: d.chapter_order,
                chapter_title: d.chapter_title,
                extracted_text: d.extracted_text.unwrap_or_default(),
                original_name: d.original_name,
                file_type: d.file_type,
                created_at: d.created_at,
            })
            .collect())
    }

    pub async fn rename(&self, user: UserId, id: MaterialId, title: &str) -> Result<Material, StudyError> {
        if title.trim().is_empty() {
            return Err(StudyError::BadRequest("Title is required".into()));
        }
        self.owned_material(user, id, "rename").await?;
        self.store
            .rename_material(id, title)
            .await?
            .ok_or_else(|| StudyError::NotFound("Study material".into()))
    }

    /// Delete a material and its documents. Blob removal is best-effort.
    pub async fn delete(&self, user: UserId, id: MaterialId) -> Result<(), StudyError> {
        let material = self.owned_material(user, id, "delete").await?;
        let docs = self.store.get_documents(&material.document_ids).await?;

        self.store.delete_documents(&material.document_ids).await?;
        self.store.delete_material(id).await?;

        for doc in &docs {
            if let Err(e) = self.blobs.delete(&doc.file_path).await {
                warn!(path = %doc.file_path, error = %e, "failed to delete blob");
            }
        }
        info!(material_id = %id, documents = docs.len(), "material deleted");
        Ok(())
    }

    /// Grant read access to each address. Only the owner may share.
    pub async fn share(&self, user: UserId, id: MaterialId, emails: &[String]) -> Result<ShareReport, StudyError> {
        if emails.is_empty() {
            return Err(StudyError::BadRequest("At least one email is required".into()));
        }
        let material = self.owned_material(user, id, "share").await?;
        let sharer_name = self
            .store
            .get_user(user)
            .await?
            .map(|u| u.display_name().to_string())
            .unwrap_or_else(|| "Someone".to_string());

        let mut counts = ShareCounts::default();
        let mut error_details = Vec::new();
        let mut newly_shared = Vec::new();

        for raw in emails {
            let email = normalize_email(raw);
            let recipient = match self.store.find_user_by_email(&email).await {
                Ok(Some(recipient)) => recipient,
                Ok(None) => {
                    counts.not_found += 1;
                    continue;
                }
                Err(e) => {
                    counts.errors += 1;
                    error_details.push(format!("{email} ({e})"));
                    continue;
                }
            };
            if recipient.id == user {
                counts.errors += 1;
                error_details.push(format!("{email} (cannot share with yourself)"));
                continue;
            }
            match self.store.add_shared_with(id, recipient.id).await {
                Ok(Some(true)) => {
                    counts.shared += 1;
                    newly_shared.push(recipient);
                }
                Ok(Some(false)) => counts.already_shared += 1,
                Ok(None) => return Err(StudyError::NotFound("Study material".into())),
                Err(e) => {
                    counts.errors += 1;
                    error_details.push(format!("{email} ({e})"));
                }
            }
        }

        for recipient in &newly_shared {
            let message = format!("{sharer_name} shared \"{}\" with you", material.title);
            let notification = Notification::material_shared(recipient.id, material.id, user, message);
            if let Err(e) = self.store.insert_notification(&notification).await {
                warn!(recipient = %recipient.id, error = %e, "failed to store share notification");
                counts.errors += 1;
                error_details.push(format!("{} ({e})", recipient.email));
            }
            if self.notifier.is_enabled() {
                if let Err(e) = self
                    .notifier
                    .material_shared(&recipient.email, &sharer_name, &material.title, &material.id.to_string())
                    .await
                {
                    warn!(recipient = %recipient.email, error = %e, "share email not sent");
                }
            }
        }

        info!(material_id = %id, shared = counts.shared, already = counts.already_shared, "material shared");
        Ok(ShareReport {
            message: counts.message(),
            results: counts,
            error_details,
        })
    }

    /// Record the caller's vote, replacing any earlier one.
    pub async fn vote(&self, user: UserId, id: MaterialId, vote: VoteKind) -> Result<VoteTally, StudyError> {
        self.store
            .set_vote(id, user, vote)
            .await?
            .ok_or_else(|| StudyError::NotFound("Study material".into()))
    }

    // ── Notifications & users ─────────────────────────────────

    pub async fn notifications(&self, user: UserId) -> Result<Vec<NotificationView>, StudyError> {
        let notifications = self.store.list_notifications(user, NOTIFICATION_LIMIT).await?;
        let mut views = Vec::with_capacity(notifications.len());
        for n in notifications {
            let material_title = self
                .store
                .get_material(n.material_id)
                .await?
                .map(|m| m.title)
                .unwrap_or_else(|| "Unknown Material".to_string());
            let shared_by = self.store.get_user(n.shared_by).await?.as_ref().map(person);
            views.push(NotificationView {
                id: n.id,
                kind: n.kind,
                material_id: n.material_id,
                material_title,
                shared_by,
                message: n.message,
                read: n.read,
                created_at: n.created_at,
            });
        }
        Ok(views)
    }

    pub async fn mark_read(&self, user: UserId, id: NotificationId) -> Result<(), StudyError> {
        if self.store.mark_notification_read(user, id).await? {
            Ok(())
        } else {
            Err(StudyError::NotFound("Notification".into()))
        }
    }

    /// Record the profile the identity provider reported for `user`. An
    /// existing profile is returned unchanged.
    pub async fn sync_profile(&self, user: UserId, email: &str, name: Option<String>) -> Result<User, StudyError> {
        if let Some(existing) = self.store.get_user(user).await? {
            return Ok(existing);
        }
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(StudyError::BadRequest("A valid email is required".into()));
        }
        let profile = User {
            id: user,
            ..User::new(&email, name.filter(|n| !n.trim().is_empty()))
        };
        match self.store.insert_user(&profile).await {
            Ok(()) => {
                info!(user = %user, "profile registered");
                Ok(profile)
            }
            Err(StoreError::Conflict(_)) => Err(StudyError::BadRequest("Email already registered".into())),
            Err(e) => Err(e.into()),
        }
    }

    /// Other users whose email contains `query`, for share autocompletion.
    pub async fn suggest_users(&self, user: UserId, query: &str) -> Result<Vec<UserSuggestion>, StudyError> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_SUGGESTION_QUERY {
            return Ok(Vec::new());
        }
        Ok(self
            .store
            .search_users(&query, user, SUGGESTION_LIMIT)
            .await?
            .into_iter()
            .map(|u| {
                let name = u
                    .name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| u.email.split('@').next().unwrap_or_default().to_string());
                UserSuggestion { email: u.email, name }
            })
            .collect())
    }
}
