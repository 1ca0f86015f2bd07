use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, Utc};

use super::container::{TagGroup, TagValue};

/// Offset tags in resolution priority order.
pub const OFFSET_TAGS: [&str; 3] = ["OffsetTimeDigitized", "OffsetTime", "OffsetTimeOriginal"];

/// Parse a zone offset: `±HH:MM`, `±HHMM`, unsigned `HH:MM` (east), or `Z`.
pub fn parse_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => (1, value),
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some(parts) => parts,
        None if rest.len() == 4 && rest.is_ascii() => rest.split_at(2),
        None => return None,
    };
    if hours.len() != 2
        || minutes.len() != 2
        || !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// The offset candidates of an Exif group, in [`OFFSET_TAGS`] order.
///
/// Values that are not strings count as absent.
pub fn offset_candidates(exif: &TagGroup) -> [Option<&str>; 3] {
    OFFSET_TAGS.map(|tag| exif.get(tag).and_then(TagValue::as_str))
}

/// Seconds east of UTC from the first present candidate.
///
/// Lower-priority candidates are only consulted when higher ones are absent:
/// a present but unparseable candidate resolves to `None`.
pub fn resolve_offset_seconds(candidates: &[Option<&str>]) -> Option<i32> {
    let first = candidates.iter().flatten().next()?;
    let offset = parse_offset(first);
    if offset.is_none() {
        log::debug!("Ignoring unparseable offset tag {first:?}");
    }
    offset.map(|o| o.local_minus_utc())
}

/// Reinterpret a naive local timestamp recorded at `offset_seconds` east of UTC.
pub fn to_utc(local: NaiveDateTime, offset_seconds: i32) -> Option<DateTime<Utc>> {
    local
        .checked_sub_signed(TimeDelta::seconds(offset_seconds.into()))
        .map(|naive| naive.and_utc())
}
