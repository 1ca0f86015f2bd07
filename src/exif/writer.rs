use anyhow::{Context, Result, bail};
use image::ImageFormat;
use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::{Bytes, DynImage, ImageEXIF};

use super::container::MetadataContainer;
use super::reader::{EXIF_PREFIX, parse_structure, sniff_format, strip_exif_prefix};
use super::tiff;

const APP1: u8 = 0xE1;

// An APP1 segment length field is 16 bits and counts itself
const MAX_APP1_CONTENTS: usize = u16::MAX as usize - 2;

/// Re-synthesize `bytes` so that its EXIF block decodes to `merged`.
///
/// Only the EXIF block changes: other segments/chunks and the pixel data are
/// copied through. Inside the block, groups equal to what is already there are
/// left byte-identical.
pub fn write_container(bytes: &[u8], merged: &MetadataContainer) -> Result<Vec<u8>> {
    if sniff_format(bytes)? == ImageFormat::Tiff {
        let before = tiff::decode(bytes).context("Failed to decode existing EXIF")?;
        if before == *merged {
            return Ok(bytes.to_vec());
        }
        let patched = tiff::patch(bytes, &before, merged).context("Failed to patch TIFF structure")?;
        if tiff::decode(&patched)? == before {
            return Ok(bytes.to_vec());
        }
        return Ok(patched);
    }

    let mut image = parse_structure(bytes)?;
    let block = match image.exif().map(strip_exif_prefix) {
        Some(block) => block.to_vec(),
        None => {
            log::debug!("No EXIF block present, starting from an empty one");
            tiff::empty_block()
        }
    };

    let before = tiff::decode(&block).context("Failed to decode existing EXIF")?;
    if before == *merged {
        log::debug!("Metadata unchanged, keeping original bytes");
        return Ok(bytes.to_vec());
    }
    let patched = tiff::patch(&block, &before, merged).context("Failed to patch EXIF block")?;
    // values that only differ below the wire precision (GPS seconds) encode
    // to what is already stored
    if tiff::decode(&patched)? == before {
        log::debug!("Metadata unchanged after encoding, keeping original bytes");
        return Ok(bytes.to_vec());
    }

    match &mut image {
        DynImage::Jpeg(jpeg) => set_jpeg_exif(jpeg, patched)?,
        other => other.set_exif(Some(Bytes::from(patched))),
    }

    Ok(image.encoder().bytes().to_vec())
}

/// Replace the EXIF APP1 segment of a JPEG, keeping it where it was.
fn set_jpeg_exif(jpeg: &mut Jpeg, block: Vec<u8>) -> Result<()> {
    if EXIF_PREFIX.len() + block.len() > MAX_APP1_CONTENTS {
        bail!(
            "EXIF block of {} bytes does not fit in a JPEG APP1 segment",
            block.len()
        );
    }

    let orig_pos = find_exif_segment_pos(jpeg.segments());
    jpeg.set_exif(Some(Bytes::from(block)));

    // set_exif() inserts a fresh segment near the start, which may land after
    // XMP. Move it back so EXIF keeps its original place.
    if let Some(new_pos) = find_exif_segment_pos(jpeg.segments()) {
        let target = orig_pos.unwrap_or(new_pos);
        if target != new_pos {
            let segments = jpeg.segments_mut();
            let seg = segments.remove(new_pos);
            segments.insert(target.min(segments.len()), seg);
        }
    }
    Ok(())
}

/// Position of the EXIF APP1 segment (marker 0xE1, contents `Exif\0\0...`).
fn find_exif_segment_pos(segments: &[JpegSegment]) -> Option<usize> {
    segments
        .iter()
        .position(|s| s.marker() == APP1 && s.contents().starts_with(EXIF_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::container::{EXIF_GROUP, GPS_GROUP, TIFF_GROUP, TagGroup, TagValue};
    use crate::exif::merge::{Location, MetadataUpdate, merge};
    use crate::exif::reader::{exif_block, read_container};
    use crate::exif::tags::IfdKind;
    use crate::test_support::{
        jpeg_fixture, jpeg_with_exif, png_fixture, sample_exif_block, tiff_fixture, webp_fixture,
    };

    const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

    fn gps_group(lat: f64, lat_ref: &str) -> TagGroup {
        let mut gps = TagGroup::new();
        gps.insert("Latitude".into(), TagValue::Number(lat));
        gps.insert("LatitudeRef".into(), TagValue::Text(lat_ref.into()));
        gps
    }

    fn pixels(bytes: &[u8]) -> Vec<u8> {
        image::load_from_memory(bytes).unwrap().to_rgb8().into_raw()
    }

    // ── JPEG ──────────────────────────────────────────────────────────

    #[test]
    fn jpeg_without_exif_gains_block() {
        let original = jpeg_fixture();
        let mut merged = MetadataContainer::new();
        merged.insert_group(GPS_GROUP, gps_group(48.5, "N"));

        let written = write_container(&original, &merged).unwrap();
        assert_eq!(read_container(&written), merged);
        assert_eq!(pixels(&written), pixels(&original));
    }

    #[test]
    fn jpeg_untouched_groups_are_byte_identical() {
        let original = jpeg_with_exif(&sample_exif_block());
        let before = read_container(&original);
        let mut merged = before.clone();
        merged.insert_group(GPS_GROUP, gps_group(10.0, "S"));

        let written = write_container(&original, &merged).unwrap();
        let old_block = exif_block(&original).unwrap().unwrap();
        let new_block = exif_block(&written).unwrap().unwrap();
        // everything ahead of the replaced GPS IFD, Exif IFD included, is kept
        let gps_at = tiff::ifd_offset(&old_block, IfdKind::Gps).unwrap();
        assert_eq!(&new_block[..gps_at], &old_block[..gps_at]);
        assert_eq!(
            tiff::ifd_offset(&new_block, IfdKind::Exif),
            tiff::ifd_offset(&old_block, IfdKind::Exif)
        );

        let after = read_container(&written);
        assert_eq!(after.group(TIFF_GROUP), before.group(TIFF_GROUP));
        assert_eq!(after.group(EXIF_GROUP), before.group(EXIF_GROUP));
        assert_eq!(after.group(GPS_GROUP), merged.group(GPS_GROUP));
    }

    #[test]
    fn unchanged_metadata_returns_input() {
        let original = jpeg_with_exif(&sample_exif_block());
        let before = read_container(&original);
        assert_eq!(write_container(&original, &before).unwrap(), original);
    }

    #[test]
    fn rewriting_the_same_location_returns_input() {
        let update = MetadataUpdate::location(Location::new(37.773972, -122.431297, Some(8.0)));
        let first = jpeg_with_exif(&sample_exif_block());
        let once = write_container(&first, &merge(&read_container(&first), &update)).unwrap();
        assert_ne!(once, first);

        let twice = write_container(&once, &merge(&read_container(&once), &update)).unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn repeated_location_writes_do_not_grow_the_block() {
        let mut bytes = jpeg_with_exif(&sample_exif_block());
        let start = exif_block(&bytes).unwrap().unwrap().len();
        let exif_before = read_container(&bytes).group(EXIF_GROUP).cloned();

        for i in 0..1000 {
            let location = Location::new(10.0 + i as f64 * 0.001, -20.0 - i as f64 * 0.002, Some(i as f64));
            let merged = merge(&read_container(&bytes), &MetadataUpdate::location(location));
            bytes = write_container(&bytes, &merged).unwrap();
            let len = exif_block(&bytes).unwrap().unwrap().len();
            assert!(len <= start + 16, "block grew to {len} bytes after {} writes (start {start})", i + 1);
        }

        let last = read_container(&bytes);
        assert_eq!(last.group(EXIF_GROUP).cloned(), exif_before);
        let lat = last.tag(GPS_GROUP, "Latitude").and_then(TagValue::as_f64).unwrap();
        assert!((lat - 10.999).abs() < 1e-6);
        assert_eq!(last.tag(GPS_GROUP, "HPositioningError"), Some(&TagValue::Number(999.0)));
    }

    #[test]
    fn exif_segment_keeps_its_position_before_xmp() {
        let original = jpeg_with_exif(&sample_exif_block());
        let mut jpeg = Jpeg::from_bytes(Bytes::from(original)).unwrap();
        let exif_pos = find_exif_segment_pos(jpeg.segments()).unwrap();
        let mut xmp = XMP_HEADER.to_vec();
        xmp.extend_from_slice(b"<x:xmpmeta/>");
        jpeg.segments_mut()
            .insert(exif_pos + 1, JpegSegment::new_with_contents(APP1, Bytes::from(xmp)));
        let original = jpeg.encoder().bytes().to_vec();

        let mut merged = read_container(&original);
        merged.insert_group(GPS_GROUP, gps_group(1.0, "N"));
        let written = write_container(&original, &merged).unwrap();

        let jpeg = Jpeg::from_bytes(Bytes::from(written)).unwrap();
        let xmp_pos = jpeg
            .segments()
            .iter()
            .position(|s| s.marker() == APP1 && s.contents().starts_with(XMP_HEADER))
            .unwrap();
        assert_eq!(find_exif_segment_pos(jpeg.segments()), Some(exif_pos));
        assert!(exif_pos < xmp_pos);
    }

    #[test]
    fn oversized_block_is_rejected() {
        let original = jpeg_fixture();
        let mut exif = TagGroup::new();
        exif.insert("MakerNote".into(), TagValue::Text("x".repeat(70_000)));
        let mut merged = MetadataContainer::new();
        merged.insert_group(EXIF_GROUP, exif);

        let err = write_container(&original, &merged).unwrap_err();
        assert!(format!("{err:#}").contains("APP1"));
    }

    #[test]
    fn corrupt_block_is_an_error() {
        let original = jpeg_with_exif(b"II*\0\xFF\xFF\xFF\x7F");
        let mut merged = MetadataContainer::new();
        merged.insert_group(GPS_GROUP, gps_group(1.0, "N"));
        assert!(write_container(&original, &merged).is_err());
    }

    // ── other containers ─────────────────────────────────────────────

    #[test]
    fn png_gets_exif_chunk() {
        let original = png_fixture();
        let mut merged = MetadataContainer::new();
        merged.insert_group(GPS_GROUP, gps_group(33.5, "N"));
        let written = write_container(&original, &merged).unwrap();
        assert_eq!(read_container(&written), merged);
        assert_eq!(pixels(&written), pixels(&original));
    }

    #[test]
    fn webp_gets_exif_chunk() {
        let original = webp_fixture();
        assert_eq!(&original[12..16], b"VP8L");
        let mut merged = MetadataContainer::new();
        merged.insert_group(GPS_GROUP, gps_group(21.25, "S"));

        let written = write_container(&original, &merged).unwrap();
        // an EXIF chunk needs the extended header
        assert_eq!(&written[12..16], b"VP8X");
        assert_eq!(read_container(&written), merged);
        assert_eq!(pixels(&written), pixels(&original));
    }

    #[test]
    fn tiff_file_is_patched_in_place() {
        let original = tiff_fixture();
        let before = read_container(&original);
        let mut merged = before.clone();
        merged.insert_group(GPS_GROUP, gps_group(12.25, "N"));

        let written = write_container(&original, &merged).unwrap();
        assert_eq!(&written[..4], &original[..4]);
        let after = read_container(&written);
        assert_eq!(after.group(TIFF_GROUP), before.group(TIFF_GROUP));
        assert_eq!(after.group(GPS_GROUP), merged.group(GPS_GROUP));
        assert_eq!(pixels(&written), pixels(&original));
    }
}
