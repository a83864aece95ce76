// Core domain types shared across all Folio crates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Opaque page identifier. Freshly generated ids are UUIDv7 so they sort by
    /// creation time, but ids supplied by a server are accepted verbatim.
    PageId
);

string_id!(
    /// Workspace that owns a set of pages.
    WorkspaceId
);

impl PageId {
    /// Generate a new creation-ordered id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}

/// A page in the workspace tree.
///
/// `depth` is denormalized from the parent chain and `position` orders the page
/// among siblings sharing the same `parent_id`. Both are provisional on the
/// client; the server recomputes them authoritatively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageNode {
    pub id: PageId,
    /// `None` means the page sits at the workspace root.
    pub parent_id: Option<PageId>,
    pub depth: u32,
    pub position: u32,
    /// Non-null marks the page (and logically its subtree) as trashed.
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub title: String,
    pub icon: Option<String>,
    /// Server-assigned; authoritative for staleness comparisons.
    pub updated_at: DateTime<Utc>,
}

impl PageNode {
    /// A root-level page with an empty title.
    pub fn new(id: impl Into<PageId>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            depth: 0,
            position: 0,
            deleted_at: None,
            title: String::new(),
            icon: None,
            updated_at,
        }
    }

    pub fn with_parent(mut self, parent_id: Option<PageId>, depth: u32) -> Self {
        self.parent_id = parent_id;
        self.depth = depth;
        self
    }

    pub fn with_position(mut self, position: u32) -> Self {
        self.position = position;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A page together with its editable payload, as returned by `getPage`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageDocument {
    #[serde(flatten)]
    pub page: PageNode,
    pub cover: Option<String>,
    /// Rich-text block content. Opaque to the tree and sync engine.
    #[serde(default)]
    pub content: serde_json::Value,
}

impl PageDocument {
    pub fn id(&self) -> &PageId {
        &self.page.id
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.page.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn page_id_serializes_as_plain_string() {
        let id = PageId::from("page-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"page-1\"");
        let back: PageId = serde_json::from_str("\"page-1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn generated_ids_are_unique() {
        let first = PageId::generate();
        let second = PageId::generate();
        assert_ne!(first, second);
        assert_eq!(first.as_str().len(), 36);
    }

    #[test]
    fn builder_sets_structural_fields() {
        let node = PageNode::new("child", ts(10))
            .with_parent(Some(PageId::from("parent")), 1)
            .with_position(3)
            .with_title("Notes");
        assert_eq!(node.parent_id.as_ref().map(PageId::as_str), Some("parent"));
        assert_eq!(node.depth, 1);
        assert_eq!(node.position, 3);
        assert_eq!(node.title, "Notes");
        assert!(!node.is_trashed());
    }

    #[test]
    fn document_flattens_page_fields() {
        let doc = PageDocument {
            page: PageNode::new("p", ts(5)).with_title("Plan"),
            cover: None,
            content: serde_json::json!([{ "type": "paragraph" }]),
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["id"], "p");
        assert_eq!(value["title"], "Plan");
        assert_eq!(value["content"][0]["type"], "paragraph");

        let back: PageDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn document_content_defaults_to_null() {
        let json = serde_json::json!({
            "id": "p",
            "parent_id": null,
            "depth": 0,
            "position": 0,
            "deleted_at": null,
            "icon": null,
            "cover": null,
            "updated_at": "2026-01-01T00:00:00Z",
        });
        let doc: PageDocument = serde_json::from_value(json).unwrap();
        assert!(doc.content.is_null());
        assert_eq!(doc.page.title, "");
    }
}
