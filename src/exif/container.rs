use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// IFD0 tags (camera make, orientation, modify date, ...).
pub const TIFF_GROUP: &str = "{TIFF}";
/// Exif sub-IFD tags (capture date, offsets, exposure, ...).
pub const EXIF_GROUP: &str = "{Exif}";
/// GPS sub-IFD tags, with the `GPS` prefix dropped from tag names.
pub const GPS_GROUP: &str = "{GPS}";

/// A tag name → value mapping inside a group.
pub type TagGroup = BTreeMap<String, TagValue>;

/// A single metadata value.
///
/// Deliberately loose: the codec only interprets the handful of tags it needs
/// and passes everything else through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Number(f64),
    Text(String),
    List(Vec<TagValue>),
    Group(TagGroup),
}

impl TagValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&TagGroup> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }
}

impl From<f64> for TagValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for TagValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<TagGroup> for TagValue {
    fn from(g: TagGroup) -> Self {
        Self::Group(g)
    }
}

/// The decoded metadata of one image: group name → group contents.
///
/// Top-level entries are usually groups (`{TIFF}`, `{Exif}`, `{GPS}`), but any
/// [`TagValue`] is accepted so that foreign dictionaries survive a round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataContainer {
    entries: BTreeMap<String, TagValue>,
}

impl MetadataContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.entries.get(name)
    }

    /// The named group, if present and actually a mapping.
    pub fn group(&self, name: &str) -> Option<&TagGroup> {
        self.entries.get(name).and_then(TagValue::as_group)
    }

    /// Look up `tag` inside `group`.
    pub fn tag(&self, group: &str, tag: &str) -> Option<&TagValue> {
        self.group(group).and_then(|g| g.get(tag))
    }

    /// Replace (or create) a whole group.
    pub fn insert_group(&mut self, name: impl Into<String>, group: TagGroup) {
        self.entries.insert(name.into(), TagValue::Group(group));
    }

    pub fn insert(&mut self, name: impl Into<String>, value: TagValue) {
        self.entries.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<TagValue> {
        self.entries.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagValue)> {
        self.entries.iter()
    }

    /// Top-level entries that are groups.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &TagGroup)> {
        self.entries
            .iter()
            .filter_map(|(name, value)| Some((name.as_str(), value.as_group()?)))
    }
}

impl FromIterator<(String, TagValue)> for MetadataContainer {
    fn from_iter<I: IntoIterator<Item = (String, TagValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Map a user-supplied group name to its canonical container key.
///
/// `Exif`, `exif` and `{Exif}` all name the Exif group. Names that are not one
/// of the three known groups are returned unchanged.
pub fn canonical_group_name(name: &str) -> String {
    let bare = name.trim().trim_start_matches('{').trim_end_matches('}');
    for known in [TIFF_GROUP, EXIF_GROUP, GPS_GROUP] {
        if known[1..known.len() - 1].eq_ignore_ascii_case(bare) {
            return known.to_string();
        }
    }
    name.to_string()
}
