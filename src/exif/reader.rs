use anyhow::{Context, Result, bail};
use image::ImageFormat;
use img_parts::{Bytes, DynImage, ImageEXIF};

use super::container::MetadataContainer;
use super::tiff;

/// Prefix some writers leave in front of the TIFF header (always present in
/// JPEG APP1, occasionally in WebP `EXIF` chunks).
pub(crate) const EXIF_PREFIX: &[u8] = b"Exif\0\0";

/// Identify the image container from its magic bytes.
///
/// Only formats that can carry an EXIF block are accepted.
pub fn sniff_format(bytes: &[u8]) -> Result<ImageFormat> {
    let format = image::guess_format(bytes).context("Unrecognized image format")?;
    match format {
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP | ImageFormat::Tiff => Ok(format),
        other => bail!("{other:?} images cannot carry an EXIF block"),
    }
}

/// Parse a JPEG, PNG or WebP into its segment/chunk structure.
pub(crate) fn parse_structure(bytes: &[u8]) -> Result<DynImage> {
    DynImage::from_bytes(Bytes::copy_from_slice(bytes))
        .map_err(|e| anyhow::anyhow!("Failed to parse image structure: {e}"))?
        .context("Unsupported image container")
}

pub(crate) fn strip_exif_prefix(block: Bytes) -> Bytes {
    if block.starts_with(EXIF_PREFIX) {
        block.slice(EXIF_PREFIX.len()..)
    } else {
        block
    }
}

/// The TIFF-structured EXIF block of an image, or `None` when it has none.
///
/// For TIFF files the whole file is the block.
pub fn exif_block(bytes: &[u8]) -> Result<Option<Bytes>> {
    if sniff_format(bytes)? == ImageFormat::Tiff {
        return Ok(Some(Bytes::copy_from_slice(bytes)));
    }
    let image = parse_structure(bytes)?;
    Ok(image.exif().map(strip_exif_prefix))
}

/// Decode the EXIF block of an image, failing on anything malformed.
pub fn try_read_container(bytes: &[u8]) -> Result<MetadataContainer> {
    match exif_block(bytes)? {
        Some(block) => tiff::decode(&block),
        None => Ok(MetadataContainer::new()),
    }
}

/// Decode the EXIF block of an image.
///
/// Anything that prevents decoding (unknown format, corrupt block) yields an
/// empty container: absent metadata is not an error on the read path.
pub fn read_container(bytes: &[u8]) -> MetadataContainer {
    match try_read_container(bytes) {
        Ok(container) => container,
        Err(e) => {
            log::debug!("No readable EXIF block: {e:#}");
            MetadataContainer::new()
        }
    }
}
