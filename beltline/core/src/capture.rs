//! Surface Capture Boundary
//!
//! The inspection pipeline needs an encoded snapshot of the item's current
//! visual surface. Everything about how that surface is rendered or assigned
//! lives outside this crate; this module only defines the boundary trait and
//! a pool-backed implementation that holds plain bitmap surfaces in memory.
//!
//! # Contract
//!
//! - `capture` produces a lossless PNG of the active surface at its native
//!   resolution, at most once per fired trigger.
//! - `randomize` swaps the active surface, called once per pass reset.
//!
//! Capture fails when no surface is attached, or when the attached surface
//! is not a plain 2D bitmap that can be read back as pixels.

use std::io::Cursor;

use async_trait::async_trait;
use image::{ExtendedColorType, ImageEncoder};
use parking_lot::Mutex;
use rand::Rng;
use thiserror::Error;

/// A PNG-encoded snapshot of a surface
///
/// Transient value object: one per pipeline run, discarded after the verdict
/// is applied.
#[derive(Clone, Debug)]
pub struct EncodedImage {
    /// PNG bytes
    pub bytes: Vec<u8>,
    /// Pixel width of the encoded image
    pub width: u32,
    /// Pixel height of the encoded image
    pub height: u32,
}

/// Errors from the capture boundary
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No renderable surface is currently attached
    #[error("no renderable surface attached")]
    Unavailable,

    /// The attached surface cannot be converted into a static image
    #[error("attached surface is not a plain 2D bitmap")]
    SurfaceFormat,

    /// PNG encoding failed
    #[error("failed to encode surface: {0}")]
    Encode(#[from] image::ImageError),
}

/// A raw RGBA8 bitmap surface
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Tightly packed RGBA8 pixel data, `width * height * 4` bytes
    pub rgba: Vec<u8>,
}

impl Bitmap {
    /// Create a bitmap filled with a single color
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = (width * height) as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            rgba: data,
        }
    }

    /// Create a two-color checkerboard bitmap with the given cell size
    pub fn checkerboard(width: u32, height: u32, cell: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let cell = cell.max(1);
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let color = if ((x / cell) + (y / cell)) % 2 == 0 { a } else { b };
                data.extend_from_slice(&color);
            }
        }
        Self {
            width,
            height,
            rgba: data,
        }
    }

    /// Encode this bitmap as a lossless PNG
    pub fn encode_png(&self) -> Result<EncodedImage, CaptureError> {
        let mut bytes = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(Cursor::new(&mut bytes));
        encoder.write_image(&self.rgba, self.width, self.height, ExtendedColorType::Rgba8)?;
        Ok(EncodedImage {
            bytes,
            width: self.width,
            height: self.height,
        })
    }
}

/// A visual surface that may be attached to the item
///
/// Only plain bitmaps can be snapshotted; anything else (a live render
/// target, a procedural material) fails capture with `SurfaceFormat`.
#[derive(Clone, Debug)]
pub enum Surface {
    /// A plain 2D bitmap, readable and encodable
    Bitmap(Bitmap),
    /// A surface with no static pixel contents
    Procedural {
        /// Material/shader name, for logging only
        name: String,
    },
}

/// Boundary trait for producing encoded snapshots of the item's surface
///
/// The motion core never touches pixels; it talks to this trait through the
/// pipeline. Implement it to plug in a real renderer readback.
#[async_trait]
pub trait SurfaceCapture: Send + Sync {
    /// Snapshot the active surface as a lossless PNG
    async fn capture(&self) -> Result<EncodedImage, CaptureError>;

    /// Swap to a new randomly chosen surface for the next pass
    fn randomize(&self);
}

/// Pool-backed capture provider
///
/// Owns a fixed set of surfaces and keeps one active at a time, mirroring a
/// texture pool that gets re-rolled for every item that enters the line.
pub struct TexturePool {
    surfaces: Vec<Surface>,
    active: Mutex<Option<usize>>,
}

impl TexturePool {
    /// Create a pool over the given surfaces, with the first one active
    ///
    /// An empty pool is valid; capture then fails with
    /// [`CaptureError::Unavailable`] until surfaces are provided.
    pub fn new(surfaces: Vec<Surface>) -> Self {
        let active = if surfaces.is_empty() { None } else { Some(0) };
        Self {
            surfaces,
            active: Mutex::new(active),
        }
    }

    /// Number of surfaces in the pool
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Whether the pool holds no surfaces
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

#[async_trait]
impl SurfaceCapture for TexturePool {
    async fn capture(&self) -> Result<EncodedImage, CaptureError> {
        let active = *self.active.lock();
        let surface = active
            .and_then(|i| self.surfaces.get(i))
            .ok_or(CaptureError::Unavailable)?;

        match surface {
            Surface::Bitmap(bitmap) => bitmap.encode_png(),
            Surface::Procedural { name } => {
                tracing::warn!(surface = %name, "active surface has no static pixels");
                Err(CaptureError::SurfaceFormat)
            }
        }
    }

    fn randomize(&self) {
        if self.surfaces.is_empty() {
            return;
        }
        let index = rand::thread_rng().gen_range(0..self.surfaces.len());
        *self.active.lock() = Some(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_pool_is_unavailable() {
        let pool = TexturePool::new(Vec::new());
        assert!(matches!(
            pool.capture().await,
            Err(CaptureError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_procedural_surface_fails_format() {
        let pool = TexturePool::new(vec![Surface::Procedural {
            name: "noise".to_string(),
        }]);
        assert!(matches!(
            pool.capture().await,
            Err(CaptureError::SurfaceFormat)
        ));
    }

    #[tokio::test]
    async fn test_bitmap_capture_round_trips_losslessly() {
        let bitmap = Bitmap::checkerboard(16, 16, 4, [255, 0, 0, 255], [0, 0, 255, 255]);
        let pool = TexturePool::new(vec![Surface::Bitmap(bitmap.clone())]);

        let encoded = pool.capture().await.unwrap();
        assert_eq!(encoded.width, 16);
        assert_eq!(encoded.height, 16);

        let decoded = image::load_from_memory(&encoded.bytes).unwrap().into_rgba8();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 16);
        assert_eq!(decoded.into_raw(), bitmap.rgba);
    }

    #[test]
    fn test_randomize_stays_in_bounds() {
        let pool = TexturePool::new(vec![
            Surface::Bitmap(Bitmap::solid(2, 2, [0, 0, 0, 255])),
            Surface::Bitmap(Bitmap::solid(2, 2, [255, 255, 255, 255])),
        ]);
        for _ in 0..32 {
            pool.randomize();
            let active = (*pool.active.lock()).unwrap();
            assert!(active < pool.len());
        }
    }

    #[test]
    fn test_randomize_on_empty_pool_is_noop() {
        let pool = TexturePool::new(Vec::new());
        pool.randomize();
        assert!(pool.active.lock().is_none());
    }

    #[test]
    fn test_solid_bitmap_dimensions() {
        let bitmap = Bitmap::solid(3, 2, [1, 2, 3, 4]);
        assert_eq!(bitmap.rgba.len(), 3 * 2 * 4);
        assert_eq!(&bitmap.rgba[0..4], &[1, 2, 3, 4]);
    }
}
