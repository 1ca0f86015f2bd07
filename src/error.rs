use std::path::PathBuf;

use thiserror::Error;

use crate::asset::ReferenceKind;

/// Errors surfaced to callers of the [`service`](crate::service) layer.
///
/// Field-level decode problems never show up here: a malformed or missing tag
/// simply leaves the matching [`CaptureMetadata`](crate::exif::CaptureMetadata)
/// field empty. Only I/O-boundary failures are reported, one variant per kind.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The reference does not resolve to any bytes (missing file, unknown asset id).
    #[error("image not found: {0}")]
    NotFound(String),

    /// The bytes exist but could not be read.
    #[error("failed to read {reference}: {source}")]
    Read {
        reference: String,
        #[source]
        source: std::io::Error,
    },

    /// The operation needs a capability the reference kind does not have.
    #[error("{operation} is not supported for {kind} references")]
    UnsupportedForAssetKind {
        operation: &'static str,
        kind: ReferenceKind,
    },

    /// The merged metadata could not be re-synthesized into the image bytes.
    /// The original bytes are left untouched.
    #[error("failed to encode metadata: {0}")]
    Encode(String),

    /// The store refused or failed to persist the write.
    /// For file-backed references the previous content is still in place.
    #[error("failed to commit {target}: {source}")]
    Commit {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MetadataError {
    /// `true` for the two ways fetching bytes can fail.
    pub fn is_read_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Read { .. })
    }

    pub(crate) fn encode(err: anyhow::Error) -> Self {
        Self::Encode(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_errors_are_grouped() {
        assert!(MetadataError::NotFound("x.jpg".into()).is_read_error());
        assert!(
            MetadataError::Read {
                reference: "x.jpg".into(),
                source: std::io::Error::other("denied"),
            }
            .is_read_error()
        );
        assert!(!MetadataError::Encode("bad".into()).is_read_error());
    }

    #[test]
    fn unsupported_message_names_kind() {
        let err = MetadataError::UnsupportedForAssetKind {
            operation: "write_raw_tags",
            kind: ReferenceKind::LibraryAsset,
        };
        assert_eq!(
            err.to_string(),
            "write_raw_tags is not supported for library asset references"
        );
    }

    #[test]
    fn encode_keeps_context_chain() {
        let err = anyhow::anyhow!("IFD0 offset out of bounds").context("Failed to patch TIFF");
        let MetadataError::Encode(msg) = MetadataError::encode(err) else {
            panic!("expected Encode");
        };
        assert_eq!(msg, "Failed to patch TIFF: IFD0 offset out of bounds");
    }
}
