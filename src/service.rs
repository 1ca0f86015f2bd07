//! The operations applications call: read capture metadata, write a location,
//! replace a raw tag group.
//!
//! Every operation is a linear sequence of awaited steps: fetch bytes, run the
//! (synchronous) codec, commit. Reference kind is checked up front so that a
//! library asset never reaches a code path that would rewrite its bytes.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::asset::{AssetResolver, ImageReference, LocalResolver, ReferenceKind};
use crate::config::Config;
use crate::error::{MetadataError, Result};
use crate::exif::container::canonical_group_name;
use crate::exif::{
    self, CaptureMetadata, EXIF_GROUP, ExtractOptions, GPS_GROUP, Location, MetadataContainer, MetadataUpdate,
    TIFF_GROUP, TagGroup,
};

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff"];

/// Groups `write_raw_tags` can replace.
const WRITABLE_GROUPS: [&str; 3] = [TIFF_GROUP, EXIF_GROUP, GPS_GROUP];

/// Metadata operations over an [`AssetResolver`].
///
/// # Example
///
/// ```rust,no_run
/// use exif_reader::config::Config;
/// use exif_reader::exif::Location;
/// use exif_reader::service::MetadataService;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load(Some("config.json".as_ref()))?;
/// let service = MetadataService::from_config(&config)?;
///
/// let reference = "photo.jpg".parse()?;
/// let metadata = service.read_metadata(&reference).await?;
/// println!("Taken: {:?}", metadata.date_string());
///
/// service
///     .write_location(&reference, Location::new(37.7749, -122.4194, Some(10.0)))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MetadataService<R = LocalResolver> {
    resolver: R,
    options: ExtractOptions,
    dry_run: bool,
    backup_originals: bool,
}

impl MetadataService<LocalResolver> {
    /// Build a filesystem-backed service from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let resolver = match &config.library.root {
            Some(root) => LocalResolver::with_library_root(root),
            None => LocalResolver::new(),
        };
        Ok(Self::new(resolver, config.extract_options()?)
            .dry_run(config.output.dry_run)
            .backup_originals(config.output.backup_originals))
    }
}

impl<R: AssetResolver> MetadataService<R> {
    pub fn new(resolver: R, options: ExtractOptions) -> Self {
        Self {
            resolver,
            options,
            dry_run: false,
            backup_originals: false,
        }
    }

    /// Compute writes but commit nothing.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Copy a file to `<name>.<ext>.bak` before its first rewrite.
    pub fn backup_originals(mut self, backup: bool) -> Self {
        self.backup_originals = backup;
        self
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// The full decoded metadata container.
    pub async fn read_container(&self, reference: &ImageReference) -> Result<MetadataContainer> {
        let fetched = self.resolver.fetch_bytes(reference).await?;
        Ok(exif::read_container(&fetched.bytes))
    }

    /// Capture date, coordinates and accuracy.
    ///
    /// Only fails when the bytes cannot be fetched; malformed metadata gives a
    /// partially filled or empty result.
    pub async fn read_metadata(&self, reference: &ImageReference) -> Result<CaptureMetadata> {
        let container = self.read_container(reference).await?;
        Ok(exif::extract(&container, &self.options))
    }

    /// Set the location of an image.
    ///
    /// Files get their `{GPS}` group rewritten; library assets get an in-place
    /// location edit through their handle.
    ///
    /// A library asset's bytes are left as they are, so [`read_metadata`]
    /// keeps reporting the location embedded in its EXIF. The committed
    /// location is available from the resolver (see
    /// [`LocalResolver::committed_location`]).
    ///
    /// [`read_metadata`]: Self::read_metadata
    pub async fn write_location(&self, reference: &ImageReference, location: Location) -> Result<()> {
        validate_location(&location)?;
        log::info!(
            "Writing location {}, {} to {reference}",
            location.latitude,
            location.longitude
        );

        match reference {
            ImageReference::LibraryAsset(_) => {
                let fetched = self.resolver.fetch_bytes(reference).await?;
                let handle = fetched.handle.ok_or(MetadataError::UnsupportedForAssetKind {
                    operation: "write_location",
                    kind: ReferenceKind::LibraryAsset,
                })?;
                if self.dry_run {
                    log::info!("Dry run: location for {reference} not committed");
                    return Ok(());
                }
                self.resolver.commit_location_only(&handle, &location).await
            }
            ImageReference::FileBacked(path) => {
                self.rewrite_file(reference, path, &MetadataUpdate::location(location))
                    .await
                    .map(|_| ())
            }
        }
    }

    /// Replace one tag group (`TIFF`, `Exif` or `GPS`) of a file wholesale.
    ///
    /// Returns the reference the rewritten image lives at.
    pub async fn write_raw_tags(
        &self,
        reference: &ImageReference,
        group: &str,
        tags: TagGroup,
    ) -> Result<ImageReference> {
        let path = match reference {
            ImageReference::FileBacked(path) => path,
            ImageReference::LibraryAsset(_) => {
                return Err(MetadataError::UnsupportedForAssetKind {
                    operation: "write_raw_tags",
                    kind: reference.kind(),
                });
            }
        };

        let canonical = canonical_group_name(group);
        if !WRITABLE_GROUPS.contains(&canonical.as_str()) {
            return Err(MetadataError::Encode(format!(
                "tag group {group:?} cannot be written (expected one of TIFF, Exif, GPS)"
            )));
        }

        log::info!("Replacing {canonical} ({} tags) in {reference}", tags.len());
        self.rewrite_file(reference, path, &MetadataUpdate::raw_tags(canonical, tags))
            .await
    }

    async fn rewrite_file(
        &self,
        reference: &ImageReference,
        path: &Path,
        update: &MetadataUpdate,
    ) -> Result<ImageReference> {
        let fetched = self.resolver.fetch_bytes(reference).await?;
        let original = exif::read_container(&fetched.bytes);
        let merged = exif::merge(&original, update);
        let bytes = exif::write_container(&fetched.bytes, &merged).map_err(MetadataError::encode)?;

        if self.dry_run {
            log::info!("Dry run: {} not modified", path.display());
            return Ok(reference.clone());
        }
        if bytes == fetched.bytes {
            log::debug!("{} already up to date", path.display());
            return Ok(reference.clone());
        }

        if self.backup_originals {
            if let Err(e) = backup_file(path).await {
                log::warn!("Failed to backup {}: {e}", path.display());
            }
        }
        self.resolver.commit_full_rewrite(path, bytes).await
    }
}

fn validate_location(location: &Location) -> Result<()> {
    if !location.latitude.is_finite() || !location.longitude.is_finite() {
        return Err(MetadataError::Encode(format!(
            "coordinates must be finite, got {}, {}",
            location.latitude, location.longitude
        )));
    }
    if let Some(accuracy) = location.positional_accuracy {
        if !accuracy.is_finite() || accuracy < 0.0 {
            return Err(MetadataError::Encode(format!(
                "positional accuracy must be a non-negative number of meters, got {accuracy}"
            )));
        }
    }
    Ok(())
}

/// Create a backup of the original file.
async fn backup_file(path: &Path) -> std::io::Result<PathBuf> {
    let backup_path = path.with_extension(format!(
        "{}.bak",
        path.extension().unwrap_or_default().to_string_lossy()
    ));

    if !tokio::fs::try_exists(&backup_path).await? {
        tokio::fs::copy(path, &backup_path).await?;
        log::debug!("Backup created: {}", backup_path.display());
    }

    Ok(backup_path)
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks).
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Expand command-line style inputs into references.
///
/// `ph://` ids are passed through as library assets; paths go through
/// [`collect_images`].
pub fn collect_references(inputs: &[String]) -> Vec<ImageReference> {
    let mut references = Vec::new();
    for input in inputs {
        match input.parse::<ImageReference>() {
            Ok(ImageReference::FileBacked(path)) => {
                references.extend(collect_images(&[path]).into_iter().map(ImageReference::FileBacked));
            }
            Ok(asset) => references.push(asset),
            Err(e) => log::warn!("Skipping {e}"),
        }
    }
    references
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
