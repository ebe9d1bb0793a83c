//! Shared raster image and rectangle types.

use std::fmt;
use std::sync::Arc;

use image::{DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// Immutable pixel grid, cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct RasterImage {
    inner: Arc<DynamicImage>,
}

impl RasterImage {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            inner: Arc::new(image),
        }
    }

    /// Decode an encoded image (PNG, JPEG) from memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, image::ImageError> {
        image::load_from_memory(bytes).map(Self::new)
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// Rectangle covering the whole image.
    pub fn bounds(&self) -> Boundary {
        Boundary::full(self.width(), self.height())
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.inner
    }

    pub fn to_luma(&self) -> GrayImage {
        self.inner.to_luma8()
    }

    pub fn to_rgb(&self) -> RgbImage {
        self.inner.to_rgb8()
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RasterImage({}x{})", self.width(), self.height())
    }
}

impl From<DynamicImage> for RasterImage {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}

impl From<GrayImage> for RasterImage {
    fn from(image: GrayImage) -> Self {
        Self::new(DynamicImage::ImageLuma8(image))
    }
}

impl From<RgbImage> for RasterImage {
    fn from(image: RgbImage) -> Self {
        Self::new(DynamicImage::ImageRgb8(image))
    }
}

/// Axis-aligned rectangle in pixel coordinates. Width and height are
/// always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Boundary {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Boundary {
    /// `None` for an empty rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self {
            x,
            y,
            width,
            height,
        })
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Intersect with a `width`×`height` image; `None` if nothing remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.right().min(width);
        let y1 = self.bottom().min(height);
        Boundary::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }

    pub fn contains_x(&self, x: u32) -> bool {
        x >= self.x && x < self.right()
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}
