//! Backup and third-party interchange formats. Export/import only, never
//! part of normal operation.
//!
//! The clippings schema is 0-based; the tree's 1-based `seq` is converted on
//! both directions.

use crate::document::DocumentContainer;
use crate::tree::{Color, Folder, Sniplet, TreeItem};
use serde::{Deserialize, Serialize};

/// Clippings interchange schema version emitted on export.
pub const CLIPPINGS_VERSION: &str = "6.1";

/// Native backup envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    pub version: String,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(flatten)]
    pub payload: BackupPayload,
}

/// Single-space or multi-space backup body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackupPayload {
    Space { data: SpaceBackup },
    Spaces { spaces: Vec<SpaceBackup> },
}

/// One space inside a backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceBackup {
    pub name: String,
    pub synced: bool,
    pub data: DocumentContainer,
}

/// Root of a clippings interchange file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClippingsFile {
    pub version: String,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "userClippingsRoot")]
    pub items: Vec<ClippingItem>,
}

/// One interchange item; folders carry `children`, clippings carry `content`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClippingItem {
    pub name: String,
    /// 0-based position within the parent.
    pub seq: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        rename = "shortcutKey",
        skip_serializing_if = "Option::is_none"
    )]
    pub shortcut_key: Option<String>,
    #[serde(default, rename = "sourceURL", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ClippingItem>>,
}

/// Export a container's live tree. `None` while the tree is packed.
pub fn export_clippings(container: &DocumentContainer, created_by: &str) -> Option<ClippingsFile> {
    let items = container.children.live()?;
    Some(ClippingsFile {
        version: CLIPPINGS_VERSION.to_string(),
        created_by: created_by.to_string(),
        items: export_items(items),
    })
}

fn export_items(items: &[TreeItem]) -> Vec<ClippingItem> {
    items
        .iter()
        .map(|item| match item {
            TreeItem::Folder(folder) => ClippingItem {
                name: folder.name.clone(),
                seq: folder.seq.saturating_sub(1),
                label: folder.color.map(|c| c.as_tag().to_string()),
                children: Some(export_items(&folder.children)),
                ..ClippingItem::default()
            },
            TreeItem::Sniplet(sniplet) => ClippingItem {
                name: sniplet.name.clone(),
                seq: sniplet.seq.saturating_sub(1),
                content: Some(sniplet.content.clone()),
                shortcut_key: sniplet.shortcut.map(String::from),
                source_url: sniplet.source_url.clone(),
                label: sniplet.color.map(|c| c.as_tag().to_string()),
                children: None,
            },
        })
        .collect()
}

/// Import a clippings tree into typed nodes, restoring dense 1-based seq.
pub fn import_clippings(file: &ClippingsFile) -> Vec<TreeItem> {
    import_items(&file.items)
}

fn import_items(items: &[ClippingItem]) -> Vec<TreeItem> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let seq = index as u32 + 1;
            let color = item.label.as_deref().and_then(Color::from_legacy);
            match &item.children {
                Some(children) => {
                    let mut folder = Folder::new(item.name.clone());
                    folder.seq = seq;
                    folder.color = color;
                    folder.children = import_items(children);
                    folder.into()
                }
                None => {
                    let mut sniplet = Sniplet::new(
                        Some(item.name.clone()),
                        item.content.clone().unwrap_or_default(),
                    );
                    sniplet.seq = seq;
                    sniplet.color = color;
                    sniplet.shortcut = item
                        .shortcut_key
                        .as_deref()
                        .and_then(|key| key.chars().next());
                    sniplet.source_url = item.source_url.clone();
                    sniplet.into()
                }
            }
        })
        .collect()
}
