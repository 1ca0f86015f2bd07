//! # exif-reader
//!
//! Read the capture date and location out of an image's EXIF metadata, and
//! write a new location or a replacement tag group back without touching the
//! pixel data or the groups you did not change.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exif_reader::config::Config;
//! use exif_reader::exif::Location;
//! use exif_reader::service::{MetadataService, collect_references};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Default offset, library root, dry-run and backup settings
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!     let service = MetadataService::from_config(&config)?;
//!
//!     // Files, directories and ph:// library asset ids
//!     let references = collect_references(&["./photos".to_string(), "ph://IMG_0001.jpg".to_string()]);
//!
//!     for reference in &references {
//!         let metadata = service.read_metadata(reference).await?;
//!         println!("{reference}: {}", serde_json::to_string(&metadata)?);
//!
//!         if metadata.latitude.is_none() {
//!             service
//!                 .write_location(reference, Location::new(48.8584, 2.2945, Some(10.0)))
//!                 .await?;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The codec works on bytes and can be used without the service layer:
//!
//! ```rust,no_run
//! use exif_reader::exif::{ExtractOptions, MetadataUpdate, TagGroup, extract, merge, read_container, write_container};
//!
//! fn main() -> anyhow::Result<()> {
//!     let bytes = std::fs::read("photo.jpg")?;
//!
//!     // 1. Decode the {TIFF}, {Exif} and {GPS} groups
//!     let container = read_container(&bytes);
//!     println!("Taken: {:?}", extract(&container, &ExtractOptions::default()).date_string());
//!
//!     // 2. Replace the Exif group wholesale
//!     let mut exif = TagGroup::new();
//!     exif.insert("DateTimeOriginal".into(), "2024:01:01 12:00:00".into());
//!     let merged = merge(&container, &MetadataUpdate::raw_tags("Exif", exif));
//!
//!     // 3. Patch it back into the original bytes
//!     std::fs::write("photo.jpg", write_container(&bytes, &merged)?)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | EXIF location |
//! |--------|---------------|
//! | JPEG (`.jpg`, `.jpeg`) | APP1 segment |
//! | PNG (`.png`) | `eXIf` chunk |
//! | WebP (`.webp`) | `EXIF` RIFF chunk |
//! | TIFF (`.tif`, `.tiff`) | The file itself |
//!
//! ## Modules
//!
//! - [`asset`]: image references and the storage they resolve to
//! - [`config`]: configuration types and loading/saving
//! - [`error`]: errors returned by the service layer
//! - [`exif`]: the EXIF codec (decode, extract, merge, encode)
//! - [`service`]: `read_metadata`, `write_location`, `write_raw_tags`, input collection

pub mod asset;
pub mod config;
pub mod error;
pub mod exif;
pub mod service;

#[cfg(test)]
mod test_support;

pub use error::{MetadataError, Result};
