use super::container::{TagGroup, TagValue};

pub const LATITUDE: &str = "Latitude";
pub const LATITUDE_REF: &str = "LatitudeRef";
pub const LONGITUDE: &str = "Longitude";
pub const LONGITUDE_REF: &str = "LongitudeRef";
pub const H_POSITIONING_ERROR: &str = "HPositioningError";

/// Tags owned by a location write. Everything else in `{GPS}` survives it.
pub const LOCATION_TAGS: [&str; 5] = [LATITUDE, LATITUDE_REF, LONGITUDE, LONGITUDE_REF, H_POSITIONING_ERROR];

/// Apply hemisphere references to coordinate magnitudes.
///
/// No range validation: values pass through as stored.
pub fn decode(lat_mag: f64, lat_ref: &str, lon_mag: f64, lon_ref: &str) -> (f64, f64) {
    let lat = if lat_ref.trim().eq_ignore_ascii_case("S") { -lat_mag } else { lat_mag };
    let lon = if lon_ref.trim().eq_ignore_ascii_case("W") { -lon_mag } else { lon_mag };
    (lat, lon)
}

/// Signed coordinates → `{GPS}` tags. Zero maps to `N` / `E`.
///
/// `HPositioningError` is only written when an accuracy is given.
pub fn encode(lat: f64, lon: f64, accuracy: Option<f64>) -> TagGroup {
    let mut gps = TagGroup::new();
    gps.insert(LATITUDE.into(), TagValue::Number(lat.abs()));
    gps.insert(LATITUDE_REF.into(), TagValue::from(if lat >= 0.0 { "N" } else { "S" }));
    gps.insert(LONGITUDE.into(), TagValue::Number(lon.abs()));
    gps.insert(LONGITUDE_REF.into(), TagValue::from(if lon >= 0.0 { "E" } else { "W" }));
    if let Some(accuracy) = accuracy {
        gps.insert(H_POSITIONING_ERROR.into(), TagValue::Number(accuracy));
    }
    gps
}

/// Signed coordinates from a `{GPS}` group, if it carries a usable pair.
pub fn decode_group(gps: &TagGroup) -> Option<(f64, f64)> {
    let lat = gps.get(LATITUDE)?.as_f64()?;
    let lon = gps.get(LONGITUDE)?.as_f64()?;
    let lat_ref = gps.get(LATITUDE_REF)?.as_str()?;
    let lon_ref = gps.get(LONGITUDE_REF)?.as_str()?;
    let (lat, lon) = decode(lat, lat_ref, lon, lon_ref);
    if lat.is_nan() || lon.is_nan() {
        return None;
    }
    Some((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(lat: f64, lon: f64) -> (f64, f64) {
        decode_group(&encode(lat, lon, None)).unwrap()
    }

    #[test]
    fn decode_applies_references() {
        assert_eq!(decode(37.77, "N", 122.43, "W"), (37.77, -122.43));
        assert_eq!(decode(33.86, "S", 151.2, "E"), (-33.86, 151.2));
    }

    #[test]
    fn encode_splits_sign_into_reference() {
        let gps = encode(-33.86, 151.2, None);
        assert_eq!(gps.get(LATITUDE), Some(&TagValue::Number(33.86)));
        assert_eq!(gps.get(LATITUDE_REF), Some(&TagValue::from("S")));
        assert_eq!(gps.get(LONGITUDE), Some(&TagValue::Number(151.2)));
        assert_eq!(gps.get(LONGITUDE_REF), Some(&TagValue::from("E")));
    }

    #[test]
    fn zero_is_north_east() {
        let gps = encode(0.0, 0.0, None);
        assert_eq!(gps.get(LATITUDE_REF), Some(&TagValue::from("N")));
        assert_eq!(gps.get(LONGITUDE_REF), Some(&TagValue::from("E")));
        assert_eq!(round_trip(0.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn round_trip_is_exact() {
        for (lat, lon) in [
            (90.0, 180.0),
            (-90.0, -180.0),
            (37.773972, -122.431297),
            (-0.000001, 0.000001),
            (51.5007, -0.1246),
        ] {
            assert_eq!(round_trip(lat, lon), (lat, lon));
        }
    }

    #[test]
    fn accuracy_written_only_when_given() {
        let gps = encode(1.0, 2.0, Some(66.0));
        assert_eq!(gps.get(H_POSITIONING_ERROR), Some(&TagValue::Number(66.0)));
        assert!(!encode(1.0, 2.0, None).contains_key(H_POSITIONING_ERROR));
    }

    #[test]
    fn incomplete_or_mistyped_groups_decode_to_none() {
        let mut gps = encode(1.0, 2.0, None);
        gps.remove(LONGITUDE_REF);
        assert!(decode_group(&gps).is_none());

        let mut gps = encode(1.0, 2.0, None);
        gps.insert(LATITUDE.into(), TagValue::from("1.0"));
        assert!(decode_group(&gps).is_none());

        let gps = encode(f64::NAN, 2.0, None);
        assert!(decode_group(&gps).is_none());
    }
}
