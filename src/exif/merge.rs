use serde::{Deserialize, Serialize};

use super::container::{GPS_GROUP, MetadataContainer, TagGroup, canonical_group_name};
use super::gps;

/// A signed coordinate pair with optional horizontal accuracy in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positional_accuracy: Option<f64>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, positional_accuracy: Option<f64>) -> Self {
        Self {
            latitude,
            longitude,
            positional_accuracy,
        }
    }
}

/// Full replacement content for one tag group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTagUpdate {
    /// `Exif`, `{Exif}`, `GPS`, ... (braces optional).
    pub group: String,
    pub tags: TagGroup,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataUpdate {
    pub location: Option<Location>,
    pub raw_tags: Option<RawTagUpdate>,
}

impl MetadataUpdate {
    pub fn location(location: Location) -> Self {
        Self {
            location: Some(location),
            raw_tags: None,
        }
    }

    pub fn raw_tags(group: impl Into<String>, tags: TagGroup) -> Self {
        Self {
            location: None,
            raw_tags: Some(RawTagUpdate {
                group: group.into(),
                tags,
            }),
        }
    }
}

/// Produce a new container with `update` applied to `original`.
///
/// Raw tags replace their group wholesale, as far as the container can see:
/// tags the decoder could not represent never appear in `original`, so they
/// are kept in the image when the group is written back. A location overlays `{GPS}`: the
/// coordinate, reference and accuracy tags are rewritten and the rest of the
/// group (altitude, timestamps, ...) is kept. Groups neither mode touches are
/// carried over unchanged.
pub fn merge(original: &MetadataContainer, update: &MetadataUpdate) -> MetadataContainer {
    let mut merged = original.clone();

    if let Some(raw) = &update.raw_tags {
        merged.insert_group(canonical_group_name(&raw.group), raw.tags.clone());
    }

    if let Some(location) = &update.location {
        let mut group = merged.group(GPS_GROUP).cloned().unwrap_or_default();
        for tag in gps::LOCATION_TAGS {
            group.remove(tag);
        }
        group.extend(gps::encode(
            location.latitude,
            location.longitude,
            location.positional_accuracy,
        ));
        merged.insert_group(GPS_GROUP, group);
    }

    merged
}
