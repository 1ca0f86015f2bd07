//! Image references and the storage they resolve to.
//!
//! A reference is either a plain file or an opaque id in an asset library.
//! Files can be rewritten wholesale; library assets only accept location
//! edits, which are recorded next to the asset instead of inside its bytes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::error::{MetadataError, Result};
use crate::exif::Location;

/// URI scheme of library assets.
pub const LIBRARY_SCHEME: &str = "ph://";
pub const FILE_SCHEME: &str = "file://";

/// Directory under the library root holding committed locations.
const LOCATIONS_DIR: &str = ".locations";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    FileBacked,
    LibraryAsset,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FileBacked => "file-backed",
            Self::LibraryAsset => "library asset",
        })
    }
}

/// Where an image lives.
///
/// Parses from `ph://<id>`, `file://<path>` or a bare path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageReference {
    FileBacked(PathBuf),
    LibraryAsset(String),
}

impl ImageReference {
    pub fn kind(&self) -> ReferenceKind {
        match self {
            Self::FileBacked(_) => ReferenceKind::FileBacked,
            Self::LibraryAsset(_) => ReferenceKind::LibraryAsset,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid image reference {0:?}")]
pub struct InvalidReference(pub String);

impl FromStr for ImageReference {
    type Err = InvalidReference;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(id) = s.strip_prefix(LIBRARY_SCHEME) {
            if id.is_empty() {
                return Err(InvalidReference(s.to_string()));
            }
            return Ok(Self::LibraryAsset(id.to_string()));
        }
        let path = s.strip_prefix(FILE_SCHEME).unwrap_or(s);
        if path.is_empty() {
            return Err(InvalidReference(s.to_string()));
        }
        Ok(Self::FileBacked(PathBuf::from(path)))
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileBacked(path) => write!(f, "{}", path.display()),
            Self::LibraryAsset(id) => write!(f, "{LIBRARY_SCHEME}{id}"),
        }
    }
}

impl From<PathBuf> for ImageReference {
    fn from(path: PathBuf) -> Self {
        Self::FileBacked(path)
    }
}

impl From<&Path> for ImageReference {
    fn from(path: &Path) -> Self {
        Self::FileBacked(path.to_path_buf())
    }
}

/// Capability to commit a location edit to a library asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHandle {
    pub id: String,
}

/// Bytes of a fetched image, plus an edit handle for library assets.
#[derive(Debug)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub handle: Option<AssetHandle>,
}

/// A location edit as stored for a library asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(flatten)]
    pub location: Location,
    pub committed_at: DateTime<Utc>,
}

/// Storage behind [`ImageReference`]s.
///
/// Every method is a single awaited step that either completes or fails;
/// nothing is retried.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// Full encoded bytes of the image.
    async fn fetch_bytes(&self, reference: &ImageReference) -> Result<FetchedAsset>;

    /// Atomically replace a file's content. Returns the reference the new
    /// content lives at.
    async fn commit_full_rewrite(&self, path: &Path, bytes: Vec<u8>) -> Result<ImageReference>;

    /// Record a new location for a library asset without touching its bytes.
    async fn commit_location_only(&self, handle: &AssetHandle, location: &Location) -> Result<()>;
}

/// Resolver over the local filesystem.
///
/// Library assets are files directly under `library_root`, addressed by file
/// name (`ph://IMG_0001.jpg`).
#[derive(Debug, Clone, Default)]
pub struct LocalResolver {
    library_root: Option<PathBuf>,
}

impl LocalResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_root(root: impl Into<PathBuf>) -> Self {
        Self {
            library_root: Some(root.into()),
        }
    }

    pub fn library_root(&self) -> Option<&Path> {
        self.library_root.as_deref()
    }

    fn root_for(&self, id: &str) -> Result<&Path> {
        let root = self
            .library_root
            .as_deref()
            .ok_or_else(|| MetadataError::NotFound(format!("{LIBRARY_SCHEME}{id} (no asset library configured)")))?;
        // ids are single path components
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
            return Err(MetadataError::NotFound(format!("{LIBRARY_SCHEME}{id}")));
        }
        Ok(root)
    }

    fn asset_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.root_for(id)?.join(id))
    }

    fn location_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.root_for(id)?.join(LOCATIONS_DIR).join(format!("{id}.json")))
    }

    /// The last location committed for a library asset, if any.
    pub async fn committed_location(&self, id: &str) -> Result<Option<LocationRecord>> {
        let path = self.location_path(id)?;
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(MetadataError::Read {
                    reference: path.display().to_string(),
                    source,
                });
            }
        };
        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(|e| MetadataError::Read {
                reference: path.display().to_string(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            })
    }
}

async fn read_file(path: &Path, reference: &ImageReference) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            MetadataError::NotFound(reference.to_string())
        } else {
            MetadataError::Read {
                reference: reference.to_string(),
                source,
            }
        }
    })
}

/// Write to a temp file in the target's directory, then rename over the target.
fn replace_atomically(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    if let Ok(existing) = std::fs::metadata(target) {
        temp.as_file().set_permissions(existing.permissions())?;
    }
    temp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

async fn commit_blocking(target: PathBuf, bytes: Vec<u8>) -> Result<()> {
    let path = target.clone();
    let outcome = tokio::task::spawn_blocking(move || replace_atomically(&path, &bytes)).await;
    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(MetadataError::Commit { target, source }),
        Err(join) => Err(MetadataError::Commit {
            target,
            source: io::Error::other(join),
        }),
    }
}

#[async_trait]
impl AssetResolver for LocalResolver {
    async fn fetch_bytes(&self, reference: &ImageReference) -> Result<FetchedAsset> {
        match reference {
            ImageReference::FileBacked(path) => Ok(FetchedAsset {
                bytes: read_file(path, reference).await?,
                handle: None,
            }),
            ImageReference::LibraryAsset(id) => {
                let path = self.asset_path(id)?;
                Ok(FetchedAsset {
                    bytes: read_file(&path, reference).await?,
                    handle: Some(AssetHandle { id: id.clone() }),
                })
            }
        }
    }

    async fn commit_full_rewrite(&self, path: &Path, bytes: Vec<u8>) -> Result<ImageReference> {
        commit_blocking(path.to_path_buf(), bytes).await?;
        log::info!("Rewrote {}", path.display());
        Ok(ImageReference::FileBacked(path.to_path_buf()))
    }

    async fn commit_location_only(&self, handle: &AssetHandle, location: &Location) -> Result<()> {
        let asset = self.asset_path(&handle.id)?;
        if !tokio::fs::try_exists(&asset).await.unwrap_or(false) {
            return Err(MetadataError::NotFound(format!("{LIBRARY_SCHEME}{}", handle.id)));
        }

        let target = self.location_path(&handle.id)?;
        let record = LocationRecord {
            location: *location,
            committed_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&record).map_err(|e| MetadataError::Encode(e.to_string()))?;

        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| MetadataError::Commit {
                    target: target.clone(),
                    source,
                })?;
        }
        commit_blocking(target, json).await?;
        log::info!(
            "Committed location {}, {} to {LIBRARY_SCHEME}{}",
            location.latitude,
            location.longitude,
            handle.id
        );
        Ok(())
    }
}
