use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ContainerId, FileId};

/// How the container's two secrets map to capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// One visitor secret with full read/write rights.
    Standard,
    /// Visitor secret is read-only; a separate admin secret grants read/write.
    Split,
}

/// The capability a caller earned by matching one of the container's secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Matched the admin secret. Read/write regardless of mode.
    Admin,
    /// Matched the visitor secret. Read/write under [`AccessMode::Standard`],
    /// read-only under [`AccessMode::Split`].
    Visitor,
}

impl Role {
    /// Whether this role may mutate container content under the given mode.
    #[must_use]
    pub fn can_write(self, mode: AccessMode) -> bool {
        match self {
            Self::Admin => true,
            Self::Visitor => mode == AccessMode::Standard,
        }
    }
}

/// A file committed to a container after chunk reassembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    /// Unique file identifier.
    pub id: FileId,
    /// Filename as the uploader named it.
    pub original_name: String,
    /// MIME content type declared at upload time.
    pub mime_type: String,
    /// Size in bytes; equals the sum of received chunk bytes.
    pub size: u64,
    /// Opaque reference into the blob store.
    pub storage_ref: String,
    /// When reassembly completed.
    pub created_at: DateTime<Utc>,
}

/// A named, secret-gated bundle of files with its own lifecycle.
///
/// The record embeds its ordered file list; files are exclusively owned and
/// die with the container. Secrets are stored as argon2id PHC strings and
/// never leave this crate in clear form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub name: String,
    pub visitor_secret_hash: String,
    /// Present exactly when `access_mode` is [`AccessMode::Split`].
    pub admin_secret_hash: Option<String>,
    pub access_mode: AccessMode,
    /// Number of successful unlocks before self-destruction. 0 = unlimited.
    pub max_views: u32,
    /// Views consumed so far. Monotonic while the container exists.
    pub current_views: u32,
    pub files: Vec<FileEntry>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    /// Terminal flag; set on the final snapshot handed to the last viewer.
    pub deleted: bool,
}

impl Container {
    /// Whether the next counted view would reach the view limit.
    #[must_use]
    pub fn view_limited(&self) -> bool {
        self.max_views > 0
    }

    /// Views remaining before self-destruction, if a limit is set.
    #[must_use]
    pub fn remaining_views(&self) -> Option<u32> {
        self.view_limited()
            .then(|| self.max_views.saturating_sub(self.current_views))
    }

    /// Find a file by id.
    #[must_use]
    pub fn file(&self, id: &FileId) -> Option<&FileEntry> {
        self.files.iter().find(|f| &f.id == id)
    }

    /// Remove a file entry by id, returning it if present.
    pub fn remove_file(&mut self, id: &FileId) -> Option<FileEntry> {
        let idx = self.files.iter().position(|f| &f.id == id)?;
        Some(self.files.remove(idx))
    }

    /// Build the secret-free summary view of this container.
    #[must_use]
    pub fn summary(&self) -> ContainerSummary {
        ContainerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            file_count: self.files.len(),
            current_views: self.current_views,
            max_views: self.max_views,
            access_mode: self.access_mode,
            created_at: self.created_at,
            last_accessed_at: self.last_accessed_at,
        }
    }
}

/// Listing/search view of a container. Never carries secrets or file bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: ContainerId,
    pub name: String,
    pub file_count: usize,
    pub current_views: u32,
    pub max_views: u32,
    pub access_mode: AccessMode,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(mode: AccessMode, max_views: u32) -> Container {
        let now = Utc::now();
        Container {
            id: ContainerId::generate(),
            name: "trip-photos".into(),
            visitor_secret_hash: "$argon2id$fake".into(),
            admin_secret_hash: (mode == AccessMode::Split).then(|| "$argon2id$fake2".into()),
            access_mode: mode,
            max_views,
            current_views: 0,
            files: Vec::new(),
            created_at: now,
            last_accessed_at: now,
            deleted: false,
        }
    }

    #[test]
    fn role_capabilities() {
        assert!(Role::Admin.can_write(AccessMode::Standard));
        assert!(Role::Admin.can_write(AccessMode::Split));
        assert!(Role::Visitor.can_write(AccessMode::Standard));
        assert!(!Role::Visitor.can_write(AccessMode::Split));
    }

    #[test]
    fn remaining_views_unlimited() {
        let c = container(AccessMode::Standard, 0);
        assert!(!c.view_limited());
        assert_eq!(c.remaining_views(), None);
    }

    #[test]
    fn remaining_views_limited() {
        let mut c = container(AccessMode::Standard, 3);
        assert_eq!(c.remaining_views(), Some(3));
        c.current_views = 2;
        assert_eq!(c.remaining_views(), Some(1));
    }

    #[test]
    fn remove_file_keeps_order() {
        let mut c = container(AccessMode::Standard, 0);
        for name in ["a.txt", "b.txt", "c.txt"] {
            c.files.push(FileEntry {
                id: FileId::generate(),
                original_name: name.into(),
                mime_type: "text/plain".into(),
                size: 1,
                storage_ref: format!("mem:{name}"),
                created_at: Utc::now(),
            });
        }
        let middle = c.files[1].id.clone();
        let removed = c.remove_file(&middle).expect("file should exist");
        assert_eq!(removed.original_name, "b.txt");
        let names: Vec<_> = c.files.iter().map(|f| f.original_name.as_str()).collect();
        assert_eq!(names, ["a.txt", "c.txt"]);
        assert!(c.remove_file(&middle).is_none());
    }

    #[test]
    fn summary_has_no_secrets() {
        let c = container(AccessMode::Split, 5);
        let json = serde_json::to_string(&c.summary()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn access_mode_serde_is_snake_case() {
        assert_eq!(
            serde_json::to_string(&AccessMode::Standard).unwrap(),
            "\"standard\""
        );
        assert_eq!(serde_json::to_string(&Role::Visitor).unwrap(), "\"visitor\"");
    }
}
