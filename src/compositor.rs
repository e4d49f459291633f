//! Watermark compositing.
//!
//! Overlays an optional logo on the top-left corner of a generated image and
//! serializes the result as PNG. The base layer is never resized: the output
//! always has the base image's dimensions.
//!
//! Logo geometry, for a base image of width `W`:
//!
//! - inset from the top and left edges: 3% of `W`
//! - logo width: `min(200, 40% of W)`
//! - logo height: scaled by the logo's own aspect ratio

use crate::error::{Result, SundaError};
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use std::io::Cursor;

/// Default cap on the rendered logo width, in pixels.
pub const DEFAULT_MAX_LOGO_WIDTH: u32 = 200;

/// Where and how large the logo is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoPlacement {
    /// Left offset in pixels.
    pub x: u32,
    /// Top offset in pixels.
    pub y: u32,
    /// Rendered logo width.
    pub width: u32,
    /// Rendered logo height.
    pub height: u32,
}

impl LogoPlacement {
    /// Computes the placement of a `logo_width`x`logo_height` logo on a base of width `base_width`.
    ///
    /// Returns `None` when the logo would be zero pixels wide or tall.
    pub fn compute(
        base_width: u32,
        logo_width: u32,
        logo_height: u32,
        max_logo_width: u32,
    ) -> Option<Self> {
        if logo_width == 0 || logo_height == 0 {
            return None;
        }

        let base_width = u64::from(base_width);
        let width = u64::from(max_logo_width).min(base_width * 2 / 5);
        if width == 0 {
            return None;
        }

        let (lw, lh) = (u64::from(logo_width), u64::from(logo_height));
        let height = ((width * lh + lw / 2) / lw).max(1);
        let inset = (base_width * 3 + 50) / 100;

        Some(Self {
            x: inset as u32,
            y: inset as u32,
            width: width as u32,
            height: u32::try_from(height).unwrap_or(u32::MAX),
        })
    }
}

/// Composites watermark logos onto generated images.
#[derive(Debug, Clone, Copy)]
pub struct Compositor {
    max_logo_width: u32,
}

impl Default for Compositor {
    fn default() -> Self {
        Self {
            max_logo_width: DEFAULT_MAX_LOGO_WIDTH,
        }
    }
}

impl Compositor {
    /// Creates a compositor with the default 200 pixel logo cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the logo width cap. The 40% of base width cap still applies.
    pub fn with_max_logo_width(mut self, width: u32) -> Self {
        self.max_logo_width = width;
        self
    }

    /// Placement this compositor would use for the given images.
    pub fn placement(&self, base: &DynamicImage, logo: &DynamicImage) -> Option<LogoPlacement> {
        LogoPlacement::compute(base.width(), logo.width(), logo.height(), self.max_logo_width)
    }

    /// Overlays `logo` on a copy of `base`. Without a logo the copy is returned as is.
    pub fn compose_image(&self, base: &DynamicImage, logo: Option<&DynamicImage>) -> DynamicImage {
        let Some(logo) = logo else {
            return base.clone();
        };
        let Some(placement) = self.placement(base, logo) else {
            tracing::debug!(
                base_width = base.width(),
                "base image too narrow for a logo, skipping watermark"
            );
            return base.clone();
        };

        let scaled = image::imageops::resize(
            &logo.to_rgba8(),
            placement.width,
            placement.height,
            FilterType::Lanczos3,
        );

        let mut canvas = base.to_rgba8();
        blend_layer(&mut canvas, &scaled, placement.x, placement.y);
        DynamicImage::ImageRgba8(canvas)
    }

    /// Composes encoded images.
    ///
    /// With no logo, `base` is decoded only to validate it and an exact copy
    /// of the input bytes is returned. Otherwise decodes both images and
    /// returns a PNG.
    pub fn compose(&self, base: &[u8], logo: Option<&[u8]>) -> Result<Vec<u8>> {
        match logo {
            None => {
                decode(base, "base image")?;
                Ok(base.to_vec())
            }
            Some(logo) => self.render_png(base, Some(logo)),
        }
    }

    /// Decodes, composites and always re-encodes as PNG.
    ///
    /// The base image is decoded before the logo. Nothing is returned unless
    /// every step succeeds.
    pub fn render_png(&self, base: &[u8], logo: Option<&[u8]>) -> Result<Vec<u8>> {
        let base = decode(base, "base image")?;
        let logo = logo.map(|bytes| decode(bytes, "logo")).transpose()?;
        encode_png(&self.compose_image(&base, logo.as_ref()))
    }

    /// Async form of [`Compositor::render_png`].
    ///
    /// Decoding runs on the blocking pool: the base image is decoded and
    /// awaited first, then the logo, then the composite is drawn and encoded.
    pub async fn render_png_async(&self, base: Vec<u8>, logo: Option<Vec<u8>>) -> Result<Vec<u8>> {
        let base = run_blocking(move || decode(&base, "base image")).await?;
        let logo = match logo {
            Some(bytes) => Some(run_blocking(move || decode(&bytes, "logo")).await?),
            None => None,
        };

        let compositor = *self;
        run_blocking(move || encode_png(&compositor.compose_image(&base, logo.as_ref()))).await
    }
}

fn decode(bytes: &[u8], what: &str) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| SundaError::ImageDecode(format!("{what}: {e}")))
}

/// Serializes an image as PNG.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| SundaError::ImageEncode(e.to_string()))?;
    Ok(out.into_inner())
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SundaError::ImageDecode(format!("image task failed: {e}")))?
}

/// Draws `layer` over `target` at (`x`, `y`), clipped to the target bounds.
fn blend_layer(target: &mut RgbaImage, layer: &RgbaImage, x: u32, y: u32) {
    let x_end = x.saturating_add(layer.width()).min(target.width());
    let y_end = y.saturating_add(layer.height()).min(target.height());

    for ty in y..y_end {
        for tx in x..x_end {
            let fg = *layer.get_pixel(tx - x, ty - y);
            let bg = *target.get_pixel(tx, ty);
            target.put_pixel(tx, ty, blend_pixels(bg, fg));
        }
    }
}

/// Porter-Duff "over": foreground + background * (1 - foreground.alpha).
fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>) -> Rgba<u8> {
    let fg_alpha = foreground[3] as f32 / 255.0;
    let bg_alpha = background[3] as f32 / 255.0;

    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);
    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn png(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
        encode_png(&DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width, height, color,
        )))
        .unwrap()
    }

    fn placement(base_width: u32, logo_width: u32, logo_height: u32) -> LogoPlacement {
        LogoPlacement::compute(base_width, logo_width, logo_height, DEFAULT_MAX_LOGO_WIDTH).unwrap()
    }

    #[test]
    fn test_placement_capped_at_200() {
        assert_eq!(
            placement(1000, 400, 100),
            LogoPlacement {
                x: 30,
                y: 30,
                width: 200,
                height: 50
            }
        );
    }

    #[test]
    fn test_placement_capped_at_40_percent() {
        assert_eq!(
            placement(300, 100, 100),
            LogoPlacement {
                x: 9,
                y: 9,
                width: 120,
                height: 120
            }
        );
    }

    #[test]
    fn test_placement_invariants() {
        for base_width in [10, 64, 333, 499, 500, 501, 1024, 4096] {
            for (lw, lh) in [(1, 1), (50, 200), (200, 50), (640, 480), (4000, 10)] {
                let p = placement(base_width, lw, lh);
                assert!(p.width <= 200);
                assert!(p.width as f64 <= 0.4 * base_width as f64);
                assert_eq!(p.x, p.y);
                assert_eq!(p.x, (base_width as f64 * 0.03).round() as u32);

                let expected_height = (p.width as f64 * lh as f64 / lw as f64).round().max(1.0);
                assert_eq!(p.height as f64, expected_height);
            }
        }
    }

    #[test]
    fn test_placement_too_narrow() {
        assert_eq!(LogoPlacement::compute(2, 100, 100, 200), None);
        assert_eq!(LogoPlacement::compute(1000, 0, 100, 200), None);
    }

    #[test]
    fn test_custom_max_width() {
        let p = LogoPlacement::compute(1000, 400, 100, 300).unwrap();
        assert_eq!((p.width, p.height), (300, 75));
        // 40% still applies
        let p = LogoPlacement::compute(500, 400, 100, 300).unwrap();
        assert_eq!(p.width, 200);
    }

    #[test]
    fn test_compose_without_logo_is_copy() {
        let base = png(40, 30, RED);
        let out = Compositor::new().compose(&base, None).unwrap();
        assert_eq!(out, base);

        let decoded = image::load_from_memory(&out).unwrap().to_rgba8();
        let original = image::load_from_memory(&base).unwrap().to_rgba8();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_compose_draws_logo_top_left() {
        let base = png(1000, 800, WHITE);
        let logo = png(400, 100, RED);

        let out = Compositor::new().compose(&base, Some(&logo)).unwrap();
        let image = image::load_from_memory(&out).unwrap().to_rgba8();

        assert_eq!(image.dimensions(), (1000, 800));
        // Inside the 200x50 logo at (30, 30)
        assert_eq!(*image.get_pixel(130, 55), RED);
        // Inset and beyond the logo stay untouched
        assert_eq!(*image.get_pixel(10, 10), WHITE);
        assert_eq!(*image.get_pixel(240, 55), WHITE);
        assert_eq!(*image.get_pixel(130, 90), WHITE);
    }

    #[test]
    fn test_logo_alpha_blends() {
        let base = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 100, WHITE));
        let logo = DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 20, Rgba([255, 0, 0, 128])));

        let out = Compositor::new().compose_image(&base, Some(&logo)).to_rgba8();
        let pixel = out.get_pixel(10, 10);
        assert_eq!(pixel[0], 255);
        assert!(pixel[1] > 100 && pixel[1] < 150);
        assert_eq!(pixel[3], 255);
    }

    #[test]
    fn test_base_never_mutated() {
        let base = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 100, WHITE));
        let logo = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, RED));
        let _ = Compositor::new().compose_image(&base, Some(&logo));
        assert!(base.to_rgba8().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_render_png_keeps_dimensions() {
        let base = png(321, 123, WHITE);
        for logo in [None, Some(png(50, 80, RED))] {
            let out = Compositor::new().render_png(&base, logo.as_deref()).unwrap();
            let decoded = image::load_from_memory(&out).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (321, 123));
        }
    }

    #[test]
    fn test_decode_errors() {
        let good = png(10, 10, WHITE);
        let err = Compositor::new()
            .compose(b"not an image", Some(&good))
            .unwrap_err();
        assert!(matches!(err, SundaError::ImageDecode(ref msg) if msg.starts_with("base image")));

        let err = Compositor::new()
            .render_png(&good, Some(b"not a logo"))
            .unwrap_err();
        assert!(matches!(err, SundaError::ImageDecode(ref msg) if msg.starts_with("logo")));
    }

    #[test]
    fn test_compose_without_logo_rejects_garbage() {
        let err = Compositor::new()
            .compose(b"definitely not an image", None)
            .unwrap_err();
        assert!(matches!(err, SundaError::ImageDecode(ref msg) if msg.starts_with("base image")));
    }

    #[tokio::test]
    async fn test_render_png_async_matches_sync() {
        let base = png(300, 300, WHITE);
        let logo = png(100, 100, RED);
        let compositor = Compositor::new();

        let sync = compositor.render_png(&base, Some(&logo)).unwrap();
        let async_out = compositor
            .render_png_async(base.clone(), Some(logo.clone()))
            .await
            .unwrap();
        assert_eq!(
            image::load_from_memory(&sync).unwrap().to_rgba8(),
            image::load_from_memory(&async_out).unwrap().to_rgba8()
        );

        let err = compositor
            .render_png_async(b"junk".to_vec(), Some(logo))
            .await
            .unwrap_err();
        assert!(matches!(err, SundaError::ImageDecode(_)));
    }
}
