use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::material::MaterialId;

/// Identity handed to us by the external identity provider.
pub type UserId = Uuid;

pub type NotificationId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    /// Stored lower-cased; unique.
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash: String::new(),
            name,
            email_verified: false,
            created_at: Utc::now(),
        }
    }

    /// Name to show in messages: name, else email.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Emails compare case-insensitively and ignore surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MaterialShared,
    MaterialInvited,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::MaterialShared => "material_shared",
            NotificationKind::MaterialInvited => "material_invited",
        }
    }
}

/// Record of a share event, addressed to the recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    /// Recipient.
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub material_id: MaterialId,
    pub shared_by: UserId,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn material_shared(
        recipient: UserId,
        material_id: MaterialId,
        shared_by: UserId,
        message: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: recipient,
            kind: NotificationKind::MaterialShared,
            material_id,
            shared_by,
            message,
            read: false,
            created_at: Utc::now(),
        }
    }
}
