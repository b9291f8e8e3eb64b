//! Tree node types for the sniplet document tree.
//!
//! A document is an ordered tree of folders and sniplets. Identity within a
//! folder is positional: `seq` is 1-based and dense among siblings.

use crate::types::Seq;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum characters kept when deriving a sniplet name from its content.
const DERIVED_NAME_MAX: usize = 27;

/// Label color tag. Stored lowercase; legacy capitalized names from pre-1.0
/// documents are normalized on deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Gray,
}

impl Color {
    /// Parse a current lowercase tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "red" => Some(Self::Red),
            "orange" => Some(Self::Orange),
            "yellow" => Some(Self::Yellow),
            "green" => Some(Self::Green),
            "blue" => Some(Self::Blue),
            "purple" => Some(Self::Purple),
            "gray" => Some(Self::Gray),
            _ => None,
        }
    }

    /// Parse a tag, also accepting the legacy capitalized color names
    /// ("Red", "Grey", ...). One-time upgrade path for old documents.
    pub fn from_legacy(tag: &str) -> Option<Self> {
        match tag {
            "Red" => Some(Self::Red),
            "Orange" => Some(Self::Orange),
            "Yellow" => Some(Self::Yellow),
            "Green" => Some(Self::Green),
            "Blue" => Some(Self::Blue),
            "Purple" => Some(Self::Purple),
            "Gray" | "Grey" | "grey" => Some(Self::Gray),
            other => Self::from_tag(other),
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Gray => "gray",
        }
    }
}

/// Deserialize an optional color tag, normalizing legacy names and dropping
/// anything unrecognized instead of failing the whole record.
fn lenient_color<'de, D>(deserializer: D) -> Result<Option<Color>, D::Error>
where
    D: Deserializer<'de>,
{
    let tag = Option::<String>::deserialize(deserializer)?;
    Ok(tag.as_deref().and_then(Color::from_legacy))
}

fn default_seq() -> Seq {
    1
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Leaf node holding template text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sniplet {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_seq")]
    pub seq: Seq,
    #[serde(
        default,
        deserialize_with = "lenient_color",
        skip_serializing_if = "Option::is_none"
    )]
    pub color: Option<Color>,
    #[serde(default)]
    pub content: String,
    /// Skip all template processing for this sniplet.
    #[serde(default, skip_serializing_if = "is_false")]
    pub nosubst: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<char>,
    #[serde(default, rename = "sourceURL", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl Sniplet {
    /// Create a sniplet; derives a name from the content when none is given.
    pub fn new(name: Option<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => derive_name(&content),
        };
        Self {
            name,
            seq: 1,
            color: None,
            content,
            nosubst: false,
            shortcut: None,
            source_url: None,
        }
    }
}

/// Container node holding an ordered list of child nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_seq")]
    pub seq: Seq,
    #[serde(
        default,
        deserialize_with = "lenient_color",
        skip_serializing_if = "Option::is_none"
    )]
    pub color: Option<Color>,
    #[serde(default)]
    pub children: Vec<TreeItem>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seq: 1,
            color: None,
            children: Vec::new(),
        }
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TreeItem {
    Folder(Folder),
    Sniplet(Sniplet),
}

impl TreeItem {
    /// Cast an untyped record into the matching variant.
    ///
    /// Records with a `children` field become folders and records with a
    /// `content` field become sniplets. The historical generic-item shape
    /// (neither field) stays readable as a sniplet with empty content.
    /// Anything that is not an object is a deserialization error.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.get("children").is_some() {
            return serde_json::from_value::<Folder>(value).map(TreeItem::Folder);
        }
        let mut sniplet: Sniplet = serde_json::from_value(value)?;
        if sniplet.name.is_empty() {
            sniplet.name = derive_name(&sniplet.content);
        }
        Ok(TreeItem::Sniplet(sniplet))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Folder(folder) => &folder.name,
            Self::Sniplet(sniplet) => &sniplet.name,
        }
    }

    pub fn seq(&self) -> Seq {
        match self {
            Self::Folder(folder) => folder.seq,
            Self::Sniplet(sniplet) => sniplet.seq,
        }
    }

    pub fn set_seq(&mut self, seq: Seq) {
        match self {
            Self::Folder(folder) => folder.seq = seq,
            Self::Sniplet(sniplet) => sniplet.seq = seq,
        }
    }

    pub fn color(&self) -> Option<Color> {
        match self {
            Self::Folder(folder) => folder.color,
            Self::Sniplet(sniplet) => sniplet.color,
        }
    }

    pub fn set_color(&mut self, color: Option<Color>) {
        match self {
            Self::Folder(folder) => folder.color = color,
            Self::Sniplet(sniplet) => sniplet.color = color,
        }
    }

    pub fn set_name(&mut self, name: String) {
        match self {
            Self::Folder(folder) => folder.name = name,
            Self::Sniplet(sniplet) => sniplet.name = name,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Self::Folder(folder) => Some(folder),
            Self::Sniplet(_) => None,
        }
    }

    pub fn as_folder_mut(&mut self) -> Option<&mut Folder> {
        match self {
            Self::Folder(folder) => Some(folder),
            Self::Sniplet(_) => None,
        }
    }

    pub fn as_sniplet(&self) -> Option<&Sniplet> {
        match self {
            Self::Sniplet(sniplet) => Some(sniplet),
            Self::Folder(_) => None,
        }
    }

    pub fn as_sniplet_mut(&mut self) -> Option<&mut Sniplet> {
        match self {
            Self::Sniplet(sniplet) => Some(sniplet),
            Self::Folder(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for TreeItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        TreeItem::from_value(value).map_err(D::Error::custom)
    }
}

impl From<Folder> for TreeItem {
    fn from(folder: Folder) -> Self {
        Self::Folder(folder)
    }
}

impl From<Sniplet> for TreeItem {
    fn from(sniplet: Sniplet) -> Self {
        Self::Sniplet(sniplet)
    }
}

/// Derive a display name from the first line of template content, truncated
/// at a word boundary with an ellipsis.
pub fn derive_name(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        return "New Sniplet".to_string();
    }
    if first_line.chars().count() <= DERIVED_NAME_MAX {
        return first_line.to_string();
    }
    let head: String = first_line.chars().take(DERIVED_NAME_MAX).collect();
    let cut = match head.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => &head[..pos],
        _ => head.as_str(),
    };
    format!("{}…", cut.trim_end())
}
