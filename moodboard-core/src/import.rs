//! Image acquisition and placement of newly imported items.
//!
//! Acquisition is async and runs entirely outside the gesture loop; only the
//! finished [`Item`]s are handed to [`crate::CanvasState::import_items`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kurbo::{Point, Size};

use crate::coords::world_from_screen;
use crate::store::current_timestamp_ms;
use crate::{CanvasError, CanvasResult, Item, Transform, Viewport};

/// File extensions treated as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

/// Where the user asked images to come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    /// The photo library (any number of images).
    Library,
    /// The camera (zero or one image).
    Camera,
}

/// A source of image URIs, typically backed by a platform picker.
///
/// Cancellation and denied permission are reported as
/// [`CanvasError::ImageAcquisitionCancelled`].
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Let the user pick images from their library.
    async fn pick_from_library(&self) -> CanvasResult<Vec<String>>;

    /// Take one photo.
    async fn capture_photo(&self) -> CanvasResult<Vec<String>>;
}

/// Ask `source` for images, turning every failure into an empty list.
pub async fn acquire(source: &dyn ImageSource, origin: ImageOrigin) -> Vec<String> {
    let result = match origin {
        ImageOrigin::Library => source.pick_from_library().await,
        ImageOrigin::Camera => source.capture_photo().await,
    };
    match result {
        Ok(uris) => uris,
        Err(CanvasError::ImageAcquisitionCancelled) => {
            tracing::info!(?origin, "Image acquisition cancelled");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(?origin, "Image acquisition failed: {e}");
            Vec::new()
        }
    }
}

/// Serves every image file in a directory as the "library".
#[derive(Debug, Clone)]
pub struct DirectoryImageSource {
    dir: PathBuf,
}

impl DirectoryImageSource {
    /// Serve images from `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ImageSource for DirectoryImageSource {
    async fn pick_from_library(&self) -> CanvasResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Cannot list {}: {e}", self.dir.display());
                return Err(CanvasError::ImageAcquisitionCancelled);
            }
        };

        let mut uris = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if is_image_path(&path) {
                uris.push(path.to_string_lossy().into_owned());
            }
        }
        uris.sort();
        Ok(uris)
    }

    async fn capture_photo(&self) -> CanvasResult<Vec<String>> {
        Err(CanvasError::ImageAcquisitionCancelled)
    }
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Read an image's native size from its header.
///
/// # Errors
///
/// Returns [`CanvasError::ImageDimensionUnavailable`] if the file cannot be
/// read or decoded, or reports a zero size.
pub fn image_size(uri: &str) -> CanvasResult<Size> {
    let path = uri.strip_prefix("file://").unwrap_or(uri);
    let unavailable = |reason: String| CanvasError::ImageDimensionUnavailable {
        uri: uri.to_string(),
        reason,
    };
    let (width, height) = image::image_dimensions(path).map_err(|e| unavailable(e.to_string()))?;
    if width == 0 || height == 0 {
        return Err(unavailable(format!("empty image {width}x{height}")));
    }
    Ok(Size::new(f64::from(width), f64::from(height)))
}

/// Native size of an image, or `default x default` when it cannot be read.
#[must_use]
pub fn probe_dimensions(uri: &str, default: f64) -> Size {
    image_size(uri).unwrap_or_else(|e| {
        tracing::warn!("{e}; using {default}x{default}");
        Size::new(default, default)
    })
}

/// Size an image to fit `max_side` while keeping its aspect ratio.
#[must_use]
pub fn display_size(native: Size, max_side: f64) -> Size {
    let aspect = native.width / native.height;
    if !aspect.is_finite() || aspect <= 0.0 {
        return Size::new(max_side, max_side);
    }
    if aspect > 1.0 {
        Size::new(max_side, max_side / aspect)
    } else {
        Size::new(max_side * aspect, max_side)
    }
}

/// World point currently under the viewport center.
#[must_use]
pub fn viewport_center_world(transform: &Transform, viewport: &Viewport) -> Point {
    let center = viewport.center();
    world_from_screen(center, transform, viewport).unwrap_or_else(|e| {
        tracing::debug!("Centering without scale: {e}");
        center - transform.pan()
    })
}

/// Build an item for `uri`, centered on the world point under the viewport
/// center. The z-index is assigned later, when the item joins the scene.
#[must_use]
pub fn place_imported(
    uri: &str,
    native: Size,
    default_size: f64,
    transform: &Transform,
    viewport: &Viewport,
) -> Item {
    let size = display_size(native, default_size);
    let center = viewport_center_world(transform, viewport);
    let mut item = Item::new(
        uri,
        center.x - size.width / 2.0,
        center.y - size.height / 2.0,
        size.width,
        size.height,
    );
    item.created_at = current_timestamp_ms();
    item
}

/// Acquire images from `source` and lay them out for the current camera.
///
/// Returns an empty list when the user cancels. Header probing runs on the
/// blocking pool.
pub async fn import_images(
    source: &dyn ImageSource,
    origin: ImageOrigin,
    default_size: f64,
    transform: Transform,
    viewport: Viewport,
) -> Vec<Item> {
    let uris = acquire(source, origin).await;
    if uris.is_empty() {
        return Vec::new();
    }

    let probed = tokio::task::spawn_blocking(move || {
        uris.into_iter()
            .map(|uri| {
                let native = probe_dimensions(&uri, default_size);
                (uri, native)
            })
            .collect::<Vec<_>>()
    })
    .await;

    let probed = match probed {
        Ok(probed) => probed,
        Err(e) => {
            tracing::warn!("Image probing failed: {e}");
            return Vec::new();
        }
    };

    let items: Vec<Item> = probed
        .iter()
        .map(|(uri, native)| place_imported(uri, *native, default_size, &transform, &viewport))
        .collect();
    tracing::info!(count = items.len(), ?origin, "Images imported");
    items
}
