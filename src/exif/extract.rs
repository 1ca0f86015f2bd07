use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use serde::{Serialize, Serializer};

use super::container::{EXIF_GROUP, GPS_GROUP, MetadataContainer, TIFF_GROUP, TagValue};
use super::{gps, timezone};

/// EXIF timestamp layout (`2023:06:15 14:30:00`).
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
/// Output layout for [`CaptureMetadata::date`], always UTC.
pub const UTC_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// What the extractor could recover. Every field is independent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaptureMetadata {
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_date")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positional_accuracy: Option<f64>,
}

impl CaptureMetadata {
    /// `date` as `YYYY-MM-DDTHH:MM:SS.mmm`.
    pub fn date_string(&self) -> Option<String> {
        self.date.map(|d| d.format(UTC_DATE_FORMAT).to_string())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn serialize_date<S: Serializer>(date: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
    match date {
        Some(d) => s.serialize_str(&d.format(UTC_DATE_FORMAT).to_string()),
        None => s.serialize_none(),
    }
}

/// Knobs for [`extract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Zone a timestamp is read in when no offset tag resolves.
    pub default_offset: FixedOffset,
    /// Use `{TIFF}.DateTime` when `DateTimeOriginal` is missing.
    pub fallback_to_modify_date: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            default_offset: Utc.fix(),
            fallback_to_modify_date: false,
        }
    }
}

/// Normalize a decoded container. Never fails; missing or mistyped tags just
/// leave their field empty.
pub fn extract(container: &MetadataContainer, options: &ExtractOptions) -> CaptureMetadata {
    let mut metadata = CaptureMetadata::default();

    if let Some(exif) = container.group(EXIF_GROUP) {
        let offset = timezone::resolve_offset_seconds(&timezone::offset_candidates(exif))
            .unwrap_or_else(|| options.default_offset.local_minus_utc());

        let taken = exif.get("DateTimeOriginal").and_then(TagValue::as_str).or_else(|| {
            if options.fallback_to_modify_date {
                container.tag(TIFF_GROUP, "DateTime").and_then(TagValue::as_str)
            } else {
                None
            }
        });

        metadata.date = taken
            .and_then(parse_exif_date)
            .and_then(|local| timezone::to_utc(local, offset));
    }

    if let Some(group) = container.group(GPS_GROUP) {
        if let Some((lat, lon)) = gps::decode_group(group) {
            metadata.latitude = Some(lat);
            metadata.longitude = Some(lon);
        }
        metadata.positional_accuracy = group.get(gps::H_POSITIONING_ERROR).and_then(TagValue::as_f64);
    }

    metadata
}

fn parse_exif_date(value: &str) -> Option<NaiveDateTime> {
    match NaiveDateTime::parse_from_str(value.trim(), EXIF_DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            log::debug!("Unparseable EXIF date {value:?}: {e}");
            None
        }
    }
}
