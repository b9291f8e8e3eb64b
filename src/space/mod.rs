//! Space: a per-session handle over one stored document.
//!
//! A space owns its document container exclusively, tracks which folder is
//! currently open, and carries the tree store operations. All paths are
//! lists of `seq` values walked from the root.

use crate::config::CoreConfig;
use crate::document::DocumentContainer;
use crate::error::ApiError;
use crate::storage::{SpaceStorage, SYNC_SIZE_LIMIT};
use crate::template::{process_sniplet, ProcessContext, ProcessedSniplet};
use crate::tree::{Color, TreeItem};
use crate::types::Seq;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One field assignment for [`Space::edit_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    Name(String),
    /// Color tag; unrecognized values clear the field instead of failing.
    Color(String),
    Content(String),
    NoSubst(bool),
    /// Accepted only as a single character; anything else clears the field.
    Shortcut(String),
    /// Accepted only when non-empty; an empty value clears the field.
    SourceUrl(String),
}

/// Source or destination endpoint for [`Space::move_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLocator {
    pub path: Vec<Seq>,
    /// Sibling to address. At the destination, `None` (or a seq that does
    /// not resolve) means "append at the end".
    pub seq: Option<Seq>,
}

impl ItemLocator {
    pub fn new(path: Vec<Seq>, seq: Seq) -> Self {
        Self {
            path,
            seq: Some(seq),
        }
    }

    /// Destination meaning "end of this folder".
    pub fn end_of(path: Vec<Seq>) -> Self {
        Self { path, seq: None }
    }
}

/// Sort key for folder children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Seq,
    Name,
    Color,
}

/// Options for [`Space::sort`].
#[derive(Debug, Clone, Default)]
pub struct SortOptions {
    pub key: SortKey,
    /// Keep folders ahead of sniplets, regardless of `reverse`.
    pub folders_first: bool,
    pub reverse: bool,
    /// Folder to sort (empty = root).
    pub path: Vec<Seq>,
    /// Also sort every folder in the subtree.
    pub recursive: bool,
}

impl SortOptions {
    /// Options seeded from configured defaults.
    pub fn with_defaults(config: &CoreConfig) -> Self {
        Self {
            folders_first: config.sort.folders_first,
            ..Self::default()
        }
    }
}

/// Restore dense 1..N numbering on a child list, walking from the end.
pub fn sequence(children: &mut [TreeItem]) {
    for index in (0..children.len()).rev() {
        children[index].set_seq(index as Seq + 1);
    }
}

fn sort_children(children: &mut Vec<TreeItem>, options: &SortOptions) {
    children.sort_by(|a, b| {
        if options.folders_first {
            match (a.is_folder(), b.is_folder()) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
        }
        let ordering = match options.key {
            SortKey::Seq => a.seq().cmp(&b.seq()),
            SortKey::Name => a.name().cmp(b.name()),
            SortKey::Color => a.color().cmp(&b.color()),
        };
        if options.reverse {
            ordering.reverse()
        } else {
            ordering
        }
    });
    sequence(children);
    if options.recursive {
        for item in children.iter_mut() {
            if let TreeItem::Folder(folder) = item {
                sort_children(&mut folder.children, options);
            }
        }
    }
}

/// Per-session handle: document container plus the open folder path.
#[derive(Debug, Clone)]
pub struct Space {
    /// Storage key.
    pub name: String,
    /// Which external storage partition the space persists to.
    pub synced: bool,
    pub data: DocumentContainer,
    path: Vec<Seq>,
}

impl Space {
    /// Create an empty space.
    pub fn new(name: impl Into<String>, synced: bool) -> Self {
        Self {
            name: name.into(),
            synced,
            data: DocumentContainer::new(),
            path: Vec::new(),
        }
    }

    /// Wrap an existing container (e.g. from a backup import).
    pub fn with_data(name: impl Into<String>, synced: bool, data: DocumentContainer) -> Self {
        Self {
            name: name.into(),
            synced,
            data,
            path: Vec::new(),
        }
    }

    /// The currently open folder path.
    pub fn path(&self) -> &[Seq] {
        &self.path
    }

    /// Open a folder. An invalid path resets to the root.
    pub fn open(&mut self, path: Vec<Seq>) {
        if self.data.folder_children(&path).is_some() {
            self.path = path;
        } else {
            warn!(space = %self.name, ?path, "open path does not resolve to a folder, resetting to root");
            self.path.clear();
        }
    }

    /// Load a space from storage and unpack its tree. `None` when the key
    /// is absent.
    pub async fn load(
        name: impl Into<String>,
        synced: bool,
        storage: &dyn SpaceStorage,
    ) -> Result<Option<Self>, ApiError> {
        let name = name.into();
        let Some(mut data) = storage.load(&name).await? else {
            return Ok(None);
        };
        data.unpack().await?;
        debug!(space = %name, timestamp = data.timestamp, "loaded space");
        Ok(Some(Self {
            name,
            synced,
            data,
            path: Vec::new(),
        }))
    }

    /// Persist this space. Synced spaces are size-limited; the save fails
    /// without touching stored state when the packed document is too large.
    ///
    /// The in-memory tree stays live: packing happens on a copy.
    pub async fn save(
        &mut self,
        storage: &dyn SpaceStorage,
        config: &CoreConfig,
    ) -> Result<(), ApiError> {
        self.data.touch();
        let mut outgoing = self.data.clone();
        if config.compress {
            outgoing.pack().await?;
        }
        let size_limit = self.synced.then_some(SYNC_SIZE_LIMIT);
        storage.save(&self.name, &outgoing, size_limit).await?;
        debug!(space = %self.name, timestamp = outgoing.timestamp, "saved space");
        Ok(())
    }

    /// True when a newer copy exists in storage (external change
    /// notification carries the stored timestamp).
    pub fn is_stale(&self, stored_timestamp: i64) -> bool {
        stored_timestamp > self.data.timestamp
    }

    /// Replace this space's document with the stored copy (last-writer-wins
    /// reconciliation). The open path is kept when it still resolves.
    pub async fn reload(&mut self, storage: &dyn SpaceStorage) -> Result<bool, ApiError> {
        let Some(mut data) = storage.load(&self.name).await? else {
            return Ok(false);
        };
        data.unpack().await?;
        self.data = data;
        let path = std::mem::take(&mut self.path);
        self.open(path);
        Ok(true)
    }

    /// Node at a non-empty path.
    pub fn get_item(&self, path: &[Seq]) -> Option<&TreeItem> {
        self.data.get_item(path)
    }

    /// Append `item` to the folder at `folder_path`, assigning the next
    /// dense seq. Returns the assigned seq, or `None` when the path does
    /// not resolve.
    pub fn add_item(&mut self, mut item: TreeItem, folder_path: &[Seq]) -> Option<Seq> {
        let children = self.data.folder_children_mut(folder_path)?;
        let seq = children.len() as Seq + 1;
        item.set_seq(seq);
        children.push(item);
        self.data.touch();
        Some(seq)
    }

    /// Assign one field on the child with `seq` inside the folder at
    /// `folder_path`. Out-of-domain values are cleared rather than set;
    /// the edit still succeeds. Returns false only when the item is absent.
    pub fn edit_item(&mut self, seq: Seq, edit: FieldEdit, folder_path: &[Seq]) -> bool {
        let Some(children) = self.data.folder_children_mut(folder_path) else {
            return false;
        };
        let Some(item) = children.iter_mut().find(|item| item.seq() == seq) else {
            return false;
        };
        match edit {
            FieldEdit::Name(name) => item.set_name(name),
            FieldEdit::Color(tag) => {
                let color = Color::from_tag(&tag);
                if color.is_none() {
                    warn!(tag = %tag, "unrecognized color tag, clearing field");
                }
                item.set_color(color);
            }
            FieldEdit::Content(content) => {
                if let Some(sniplet) = item.as_sniplet_mut() {
                    sniplet.content = content;
                }
            }
            FieldEdit::NoSubst(nosubst) => {
                if let Some(sniplet) = item.as_sniplet_mut() {
                    sniplet.nosubst = nosubst;
                }
            }
            FieldEdit::Shortcut(shortcut) => {
                if let Some(sniplet) = item.as_sniplet_mut() {
                    let mut chars = shortcut.chars();
                    sniplet.shortcut = match (chars.next(), chars.next()) {
                        (Some(c), None) => Some(c),
                        _ => {
                            warn!(
                                shortcut = %shortcut,
                                "shortcut must be a single character, clearing field"
                            );
                            None
                        }
                    };
                }
            }
            FieldEdit::SourceUrl(url) => {
                if let Some(sniplet) = item.as_sniplet_mut() {
                    sniplet.source_url = (!url.is_empty()).then_some(url);
                }
            }
        }
        self.data.touch();
        true
    }

    /// Splice an item out of the source folder and into the destination at
    /// the position of the sibling named by `to.seq` (append when it does
    /// not resolve). Re-sequences the destination, and the source when it
    /// differs. No-op when source equals destination.
    ///
    /// Moving a folder into its own descendant must be rejected by the
    /// caller; this operation does not detect cycles.
    pub fn move_item(&mut self, from: &ItemLocator, to: &ItemLocator) -> bool {
        let Some(from_seq) = from.seq else {
            return false;
        };
        if from == to {
            return true;
        }
        // check the destination first so a bad path cannot drop the item
        if self.data.folder_children(&to.path).is_none() {
            return false;
        }

        let (item, removed_at) = {
            let Some(source) = self.data.folder_children_mut(&from.path) else {
                return false;
            };
            let Some(index) = source.iter().position(|item| item.seq() == from_seq) else {
                return false;
            };
            (source.remove(index), index)
        };

        // destination index is positional: map the sibling seq to its index
        // after the removal above (source and destination may be the same
        // folder)
        match self.data.folder_children_mut(&to.path) {
            Some(dest) => {
                let index = to
                    .seq
                    .and_then(|seq| dest.iter().position(|item| item.seq() == seq))
                    .unwrap_or(dest.len());
                dest.insert(index, item);
                sequence(dest);
            }
            None => {
                // the destination resolved through the item we just removed
                // (folder moved toward its own subtree); put it back
                if let Some(source) = self.data.folder_children_mut(&from.path) {
                    source.insert(removed_at, item);
                }
                return false;
            }
        }
        if from.path != to.path {
            if let Some(source) = self.data.folder_children_mut(&from.path) {
                sequence(source);
            }
        }
        self.data.touch();
        true
    }

    /// Remove and return the child with `seq`. Siblings keep their numbers;
    /// callers wanting density back call [`Space::sort`] afterwards.
    pub fn delete_item(&mut self, seq: Seq, folder_path: &[Seq]) -> Option<TreeItem> {
        let children = self.data.folder_children_mut(folder_path)?;
        let index = children.iter().position(|item| item.seq() == seq)?;
        let item = children.remove(index);
        debug!(seq, name = item.name(), "deleted item");
        self.data.touch();
        Some(item)
    }

    /// Sort a folder's children (optionally the whole subtree), restoring
    /// dense numbering. Returns false when the path does not resolve.
    pub fn sort(&mut self, options: &SortOptions) -> bool {
        let Some(children) = self.data.folder_children_mut(&options.path) else {
            return false;
        };
        sort_children(children, options);
        self.data.touch();
        true
    }

    /// Process the sniplet with `seq` inside the folder at `folder_path`.
    ///
    /// `ctx` supplies locale/host identity and (for tests) a fixed instant;
    /// the display path is derived from this space. Returned counter deltas
    /// are committed separately via [`Space::commit_counter_deltas`].
    pub async fn get_processed_sniplet(
        &self,
        seq: Seq,
        folder_path: &[Seq],
        ctx: &ProcessContext,
    ) -> Option<ProcessedSniplet> {
        let children = self.data.folder_children(folder_path)?;
        let sniplet = children
            .iter()
            .find(|item| item.seq() == seq)?
            .as_sniplet()?;
        let mut ctx = ctx.clone();
        ctx.path_names = std::iter::once(self.name.clone())
            .chain(self.data.folder_names(folder_path)?)
            .collect();
        Some(process_sniplet(&self.data, sniplet, &ctx).await)
    }

    /// Fold accumulated counter deltas into the persistent table. Called
    /// once, after a processing pass (and any save) succeeds.
    pub fn commit_counter_deltas(&mut self, deltas: &BTreeMap<String, i64>) {
        if deltas.is_empty() {
            return;
        }
        self.data.counters.apply_deltas(deltas);
        self.data.touch();
    }
}
