use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use examly_core::{
    normalize_email, Document, DocumentId, Material, MaterialId, Notification, NotificationId, User,
    UserId, VoteKind, VoteTally,
};

use super::{MaterialStore, StoreError};

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    documents: RwLock<HashMap<DocumentId, Document>>,
    materials: RwLock<HashMap<MaterialId, Material>>,
    notifications: RwLock<Vec<Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to one material while holding the write lock.
    async fn modify<R>(&self, id: MaterialId, f: impl FnOnce(&mut Material) -> R) -> Option<R> {
        self.materials.write().await.get_mut(&id).map(f)
    }
}

#[async_trait]
impl MaterialStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("user {}", user.email)));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        Ok(self.users.read().await.values().find(|u| u.email == email).cloned())
    }

    async fn search_users(
        &self,
        fragment: &str,
        exclude: UserId,
        limit: usize,
    ) -> Result<Vec<User>, StoreError> {
        let fragment = fragment.to_lowercase();
        let mut found: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.id != exclude && u.email.to_lowercase().contains(&fragment))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.email.cmp(&b.email));
        found.truncate(limit);
        Ok(found)
    }

    async fn insert_document(&self, doc: &Document) -> Result<(), StoreError> {
        self.documents.write().await.insert(doc.id, doc.clone());
        Ok(())
    }

    async fn get_documents(&self, ids: &[DocumentId]) -> Result<Vec<Document>, StoreError> {
        let docs = self.documents.read().await;
        Ok(ids.iter().filter_map(|id| docs.get(id).cloned()).collect())
    }

    async fn update_document(&self, doc: &Document) -> Result<(), StoreError> {
        if let Some(existing) = self.documents.write().await.get_mut(&doc.id) {
            *existing = doc.clone();
        }
        Ok(())
    }

    async fn delete_documents(&self, ids: &[DocumentId]) -> Result<u64, StoreError> {
        let mut docs = self.documents.write().await;
        Ok(ids.iter().filter(|id| docs.remove(id).is_some()).count() as u64)
    }

    async fn insert_material(&self, material: &Material) -> Result<(), StoreError> {
        self.materials.write().await.insert(material.id, material.clone());
        Ok(())
    }

    async fn get_material(&self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        Ok(self.materials.read().await.get(&id).cloned())
    }

    async fn rename_material(&self, id: MaterialId, title: &str) -> Result<Option<Material>, StoreError> {
        Ok(self
            .modify(id, |m| {
                m.rename(title);
                m.clone()
            })
            .await)
    }

    async fn add_shared_with(&self, id: MaterialId, user: UserId) -> Result<Option<bool>, StoreError> {
        Ok(self.modify(id, |m| m.share_with(user)).await)
    }

    async fn set_vote(
        &self,
        id: MaterialId,
        user: UserId,
        vote: VoteKind,
    ) -> Result<Option<VoteTally>, StoreError> {
        Ok(self.modify(id, |m| m.cast_vote(user, vote)).await)
    }

    async fn delete_material(&self, id: MaterialId) -> Result<bool, StoreError> {
        Ok(self.materials.write().await.remove(&id).is_some())
    }

    async fn list_materials_for(&self, user: UserId, limit: usize) -> Result<Vec<Material>, StoreError> {
        let mut visible: Vec<Material> = self
            .materials
            .read()
            .await
            .values()
            .filter(|m| m.can_read(user))
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        visible.truncate(limit);
        Ok(visible)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn list_notifications(&self, user: UserId, limit: usize) -> Result<Vec<Notification>, StoreError> {
        let mut mine: Vec<Notification> = self
            .notifications
            .read()
            .await
            .iter()
            .filter(|n| n.user_id == user)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        mine.truncate(limit);
        Ok(mine)
    }

    async fn mark_notification_read(&self, user: UserId, id: NotificationId) -> Result<bool, StoreError> {
        let mut all = self.notifications.write().await;
        match all.iter_mut().find(|n| n.id == id && n.user_id == user) {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use examly_core::{Language, StudyContent};
    use uuid::Uuid;

    fn material(owner: UserId, title: &str) -> Material {
        Material::new(owner, title.into(), vec![], StudyContent::default(), Language::English, vec![])
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_user(&User::new("a@example.com", None)).await.unwrap();
        let err = store.insert_user(&User::new("A@Example.com", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.find_user_by_email(" A@EXAMPLE.COM ").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn lists_owned_and_shared_newest_first() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let mut old = material(alice, "old");
        old.created_at = Utc::now() - Duration::hours(1);
        let mut shared = material(bob, "shared");
        shared.share_with(alice);
        let private = material(bob, "private");
        for m in [&old, &shared, &private] {
            store.insert_material(m).await.unwrap();
        }

        let titles: Vec<String> = store
            .list_materials_for(alice, 100)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["shared", "old"]);
    }

    #[tokio::test]
    async fn documents_come_back_in_requested_order() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let a = Document::new(owner, "a".into(), "a.txt".into(), ".txt".into(), 1, "o/a".into());
        let b = Document::new(owner, "b".into(), "b.txt".into(), ".txt".into(), 1, "o/b".into());
        store.insert_document(&a).await.unwrap();
        store.insert_document(&b).await.unwrap();

        let docs = store.get_documents(&[b.id, Uuid::new_v4(), a.id]).await.unwrap();
        assert_eq!(docs.iter().map(|d| d.id).collect::<Vec<_>>(), vec![b.id, a.id]);
        assert_eq!(store.delete_documents(&[a.id, b.id]).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn only_recipient_can_mark_read() {
        let store = MemoryStore::new();
        let bob = Uuid::new_v4();
        let n = Notification::material_shared(bob, Uuid::new_v4(), Uuid::new_v4(), "hi".into());
        store.insert_notification(&n).await.unwrap();

        assert!(!store.mark_notification_read(Uuid::new_v4(), n.id).await.unwrap());
        assert!(store.mark_notification_read(bob, n.id).await.unwrap());
        assert!(store.list_notifications(bob, 50).await.unwrap()[0].read);
    }
}
