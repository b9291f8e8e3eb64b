//! Document container: the persisted unit holding the sniplet tree plus
//! version, modification timestamp, and the counters table.
//!
//! The tree is in exactly one of two states: "live" (typed nodes) or
//! "packed" (a compressed, base64-encoded blob). Transitions happen only
//! through the explicit [`DocumentContainer::pack`] and
//! [`DocumentContainer::unpack`] calls.

pub mod codec;

use crate::error::ParseError;
use crate::tree::{Sniplet, TreeItem};
use crate::types::Seq;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::debug;

/// Schema version written into new documents.
pub const DOC_VERSION: &str = "1.0";

/// Reserved counters key holding the default starting value for new counters.
const START_VAL_KEY: &str = "startVal";

/// Counter table with a separately-held default start value.
///
/// The wire format is one flat map; the reserved `startVal` key is stripped
/// out on read (0 when absent or non-numeric) and re-inserted on write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Counters {
    start_val: i64,
    values: BTreeMap<String, i64>,
}

impl Counters {
    pub fn new(start_val: i64) -> Self {
        Self {
            start_val,
            values: BTreeMap::new(),
        }
    }

    pub fn start_val(&self) -> i64 {
        self.start_val
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }

    /// Current value, or the start value for a counter not yet present.
    pub fn value_or_start(&self, name: &str) -> i64 {
        self.get(name).unwrap_or(self.start_val)
    }

    pub fn set(&mut self, name: impl Into<String>, value: i64) {
        self.values.insert(name.into(), value);
    }

    /// Fold accumulated deltas into the table. Names not yet present start
    /// from the start value before the delta applies.
    pub fn apply_deltas(&mut self, deltas: &BTreeMap<String, i64>) {
        for (name, delta) in deltas {
            let base = self.value_or_start(name);
            self.values.insert(name.clone(), base + delta);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &i64)> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Counters {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry(START_VAL_KEY, &self.start_val)?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Counters {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut counters = Counters::default();
        for (name, value) in raw {
            if name == START_VAL_KEY {
                counters.start_val = value.as_i64().unwrap_or(0);
            } else if let Some(value) = value.as_i64() {
                counters.values.insert(name, value);
            }
            // non-numeric counter entries are dropped
        }
        Ok(counters)
    }
}

/// Tree payload of a container: live typed nodes or a packed opaque blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Children {
    Packed(String),
    Live(Vec<TreeItem>),
}

impl Children {
    pub fn is_packed(&self) -> bool {
        matches!(self, Self::Packed(_))
    }

    pub fn live(&self) -> Option<&Vec<TreeItem>> {
        match self {
            Self::Live(items) => Some(items),
            Self::Packed(_) => None,
        }
    }

    pub fn live_mut(&mut self) -> Option<&mut Vec<TreeItem>> {
        match self {
            Self::Live(items) => Some(items),
            Self::Packed(_) => None,
        }
    }
}

/// The persisted unit: tree plus document-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentContainer {
    pub version: String,
    /// Creation/modification instant, epoch milliseconds.
    pub timestamp: i64,
    pub children: Children,
    #[serde(default)]
    pub counters: Counters,
}

impl Default for DocumentContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentContainer {
    /// Create an empty live document.
    pub fn new() -> Self {
        Self {
            version: DOC_VERSION.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            children: Children::Live(Vec::new()),
            counters: Counters::default(),
        }
    }

    /// Refresh the modification timestamp.
    pub fn touch(&mut self) {
        self.timestamp = chrono::Utc::now().timestamp_millis();
    }

    /// Compress the live tree into a packed blob, replacing it.
    ///
    /// When the tree is already packed the existing blob is verified by a
    /// full decode-and-discard round trip instead: a corrupt blob is a
    /// [`ParseError`], a valid one a no-op.
    pub async fn pack(&mut self) -> Result<(), ParseError> {
        match &self.children {
            Children::Packed(blob) => {
                let text = codec::unpack_text(blob.clone()).await?;
                parse_tree(&text)?;
                debug!(bytes = blob.len(), "verified existing packed tree");
                Ok(())
            }
            Children::Live(items) => {
                let text = serde_json::to_string(items)
                    .map_err(|e| ParseError::new(format!("tree serialization failed: {}", e)))?;
                let blob = codec::pack_text(text).await?;
                debug!(bytes = blob.len(), "packed live tree");
                self.children = Children::Packed(blob);
                Ok(())
            }
        }
    }

    /// Rehydrate the typed tree from a packed blob.
    ///
    /// A live tree is already fully typed (node casting happens during
    /// deserialization), so unpacking it is a no-op.
    pub async fn unpack(&mut self) -> Result<(), ParseError> {
        let Children::Packed(blob) = &self.children else {
            return Ok(());
        };
        let text = codec::unpack_text(blob.clone()).await?;
        let items = parse_tree(&text)?;
        debug!(items = items.len(), "unpacked document tree");
        self.children = Children::Live(items);
        Ok(())
    }

    /// Children of the folder at `path` (empty path = root). `None` when the
    /// tree is packed, the path dangles, or it descends into a leaf.
    pub fn folder_children(&self, path: &[Seq]) -> Option<&Vec<TreeItem>> {
        let mut children = self.children.live()?;
        for seq in path {
            let item = children.iter().find(|item| item.seq() == *seq)?;
            children = &item.as_folder()?.children;
        }
        Some(children)
    }

    /// Mutable variant of [`folder_children`](Self::folder_children).
    pub fn folder_children_mut(&mut self, path: &[Seq]) -> Option<&mut Vec<TreeItem>> {
        let mut children = self.children.live_mut()?;
        for seq in path {
            let item = children.iter_mut().find(|item| item.seq() == *seq)?;
            children = &mut item.as_folder_mut()?.children;
        }
        Some(children)
    }

    /// Node at a non-empty path, walking `seq` steps from the root.
    pub fn get_item(&self, path: &[Seq]) -> Option<&TreeItem> {
        let (last, folder_path) = path.split_last()?;
        self.folder_children(folder_path)?
            .iter()
            .find(|item| item.seq() == *last)
    }

    /// Mutable variant of [`get_item`](Self::get_item).
    pub fn get_item_mut(&mut self, path: &[Seq]) -> Option<&mut TreeItem> {
        let (last, folder_path) = path.split_last()?;
        self.folder_children_mut(folder_path)?
            .iter_mut()
            .find(|item| item.seq() == *last)
    }

    /// First sniplet with an exactly matching name, depth-first preorder.
    pub fn find_sniplet_by_name(&self, name: &str) -> Option<&Sniplet> {
        fn find_in<'a>(items: &'a [TreeItem], name: &str) -> Option<&'a Sniplet> {
            for item in items {
                match item {
                    TreeItem::Sniplet(sniplet) if sniplet.name == name => return Some(sniplet),
                    TreeItem::Folder(folder) => {
                        if let Some(found) = find_in(&folder.children, name) {
                            return Some(found);
                        }
                    }
                    TreeItem::Sniplet(_) => {}
                }
            }
            None
        }
        find_in(self.children.live()?, name)
    }

    /// Display names of the folders along `path`.
    pub fn folder_names(&self, path: &[Seq]) -> Option<Vec<String>> {
        let mut names = Vec::with_capacity(path.len());
        let mut children = self.children.live()?;
        for seq in path {
            let item = children.iter().find(|item| item.seq() == *seq)?;
            let folder = item.as_folder()?;
            names.push(folder.name.clone());
            children = &folder.children;
        }
        Some(names)
    }

    /// Recursively clear `sourceURL` on every sniplet reachable from the
    /// folder at `path` (default: the whole tree). Returns false when the
    /// path does not resolve.
    pub fn strip_source_urls(&mut self, path: &[Seq]) -> bool {
        fn strip(items: &mut [TreeItem]) {
            for item in items {
                match item {
                    TreeItem::Sniplet(sniplet) => sniplet.source_url = None,
                    TreeItem::Folder(folder) => strip(&mut folder.children),
                }
            }
        }
        match self.folder_children_mut(path) {
            Some(children) => {
                strip(children);
                true
            }
            None => false,
        }
    }
}

fn parse_tree(text: &str) -> Result<Vec<TreeItem>, ParseError> {
    serde_json::from_str(text)
        .map_err(|e| ParseError::with_payload(format!("invalid tree payload: {}", e), text))
}
