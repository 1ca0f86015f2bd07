//! EXIF metadata codec.
//!
//! Bytes in, bytes out:
//!
//! - [`read_container`] pulls the EXIF block out of a JPEG, PNG, WebP or TIFF
//!   and decodes it into a [`MetadataContainer`] (`{TIFF}`, `{Exif}`, `{GPS}`).
//! - [`extract`] normalizes a container into [`CaptureMetadata`].
//! - [`merge`] applies a [`MetadataUpdate`] to a container.
//! - [`write_container`] patches the merged container back into the original
//!   bytes, leaving pixel data and untouched groups as they were.

pub mod container;
pub mod extract;
pub mod gps;
pub mod merge;
pub mod reader;
pub mod tags;
pub mod tiff;
pub mod timezone;
pub mod writer;

pub use container::{EXIF_GROUP, GPS_GROUP, MetadataContainer, TIFF_GROUP, TagGroup, TagValue};
pub use extract::{CaptureMetadata, ExtractOptions, extract};
pub use merge::{Location, MetadataUpdate, RawTagUpdate, merge};
pub use reader::{read_container, try_read_container};
pub use writer::write_container;
