//! Image fixtures shared by unit tests.

use std::io::Cursor;

use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};

use crate::exif::container::{EXIF_GROUP, GPS_GROUP, MetadataContainer, TIFF_GROUP, TagGroup, TagValue};
use crate::exif::tiff;

fn encode(format: image::ImageFormat) -> Vec<u8> {
    let img = image::RgbImage::from_fn(16, 8, |x, y| image::Rgb([(x * 16) as u8, (y * 32) as u8, 90]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn jpeg_fixture() -> Vec<u8> {
    encode(image::ImageFormat::Jpeg)
}

pub fn png_fixture() -> Vec<u8> {
    encode(image::ImageFormat::Png)
}

/// Lossless (`VP8L`) WebP.
pub fn webp_fixture() -> Vec<u8> {
    encode(image::ImageFormat::WebP)
}

pub fn tiff_fixture() -> Vec<u8> {
    encode(image::ImageFormat::Tiff)
}

/// A JPEG whose APP1 segment carries `block`.
pub fn jpeg_with_exif(block: &[u8]) -> Vec<u8> {
    let mut jpeg = Jpeg::from_bytes(Bytes::from(jpeg_fixture())).unwrap();
    jpeg.set_exif(Some(Bytes::copy_from_slice(block)));
    jpeg.encoder().bytes().to_vec()
}

/// Camera-like metadata: a Canon body shooting in San Francisco at UTC-7.
pub fn sample_container() -> MetadataContainer {
    let mut tiff_group = TagGroup::new();
    tiff_group.insert("Make".into(), TagValue::from("Canon"));
    tiff_group.insert("Model".into(), TagValue::from("Canon EOS R5"));
    tiff_group.insert("Orientation".into(), TagValue::Number(1.0));
    tiff_group.insert("DateTime".into(), TagValue::from("2023:06:16 09:00:00"));

    let mut exif = TagGroup::new();
    exif.insert("DateTimeOriginal".into(), TagValue::from("2023:06:15 14:30:00"));
    exif.insert("OffsetTimeOriginal".into(), TagValue::from("-07:00"));
    exif.insert("FNumber".into(), TagValue::Number(2.8));
    exif.insert("LensModel".into(), TagValue::from("RF24-70mm F2.8 L IS USM"));

    let mut gps = TagGroup::new();
    gps.insert("Latitude".into(), TagValue::Number(37.5));
    gps.insert("LatitudeRef".into(), TagValue::from("N"));
    gps.insert("Longitude".into(), TagValue::Number(122.25));
    gps.insert("LongitudeRef".into(), TagValue::from("W"));
    gps.insert("Altitude".into(), TagValue::Number(16.0));
    gps.insert("HPositioningError".into(), TagValue::Number(5.0));

    let mut container = MetadataContainer::new();
    container.insert_group(TIFF_GROUP, tiff_group);
    container.insert_group(EXIF_GROUP, exif);
    container.insert_group(GPS_GROUP, gps);
    container
}

/// [`sample_container`] encoded as a little-endian EXIF block.
pub fn sample_exif_block() -> Vec<u8> {
    let empty = tiff::empty_block();
    tiff::patch(&empty, &MetadataContainer::new(), &sample_container()).unwrap()
}
