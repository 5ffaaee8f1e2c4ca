//! Marker shape drawing on [`image::RgbaImage`].
//!
//! Shapes are filled with single-sample coverage at pixel centres plus a
//! one-pixel linear falloff at the edge, and composited with
//! [`Pixel::blend`]. Glyph masks are tinted and laid over the shape with
//! [`imageops::overlay`].

use image::{GrayImage, Pixel, Rgba, RgbaImage, imageops};

use crate::IconError;

/// Opaque white.
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Parses `#rrggbb` or `#rrggbbaa`.
///
/// # Errors
///
/// Returns [`IconError::InvalidColor`] for any other format.
pub fn parse_hex(hex: &str) -> Result<Rgba<u8>, IconError> {
    let invalid = || IconError::InvalidColor {
        color: hex.to_string(),
    };
    let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
    if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
        return Err(invalid());
    }

    let mut channels = [255u8; 4];
    for (i, slot) in channels.iter_mut().enumerate().take(digits.len() / 2) {
        *slot = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
    }
    Ok(Rgba(channels))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend_coverage(pixel: &mut Rgba<u8>, color: Rgba<u8>, coverage: f32) {
    let coverage = coverage.clamp(0.0, 1.0);
    if coverage <= 0.0 {
        return;
    }
    if coverage >= 1.0 && color[3] == u8::MAX {
        *pixel = color;
        return;
    }
    let mut source = color;
    source[3] = (f32::from(color[3]) * coverage).round() as u8;
    pixel.blend(&source);
}

#[allow(clippy::cast_precision_loss)]
fn fill_with(image: &mut RgbaImage, color: Rgba<u8>, edge: impl Fn(f32, f32) -> f32) {
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let coverage = edge(x as f32 + 0.5, y as f32 + 0.5) + 0.5;
        blend_coverage(pixel, color, coverage);
    }
}

/// Fills a circle centred at `(cx, cy)`.
pub fn fill_circle(image: &mut RgbaImage, cx: f32, cy: f32, radius: f32, color: Rgba<u8>) {
    fill_with(image, color, |px, py| radius - (px - cx).hypot(py - cy));
}

/// Fills the square `[inset, size - inset]` with rounded corners.
pub fn fill_rounded_square(image: &mut RgbaImage, inset: f32, corner_radius: f32, color: Rgba<u8>) {
    #[allow(clippy::cast_precision_loss)]
    let size = image.width().min(image.height()) as f32;
    let (low, high) = (inset, size - inset);
    let r = corner_radius.min((high - low) / 2.0).max(0.0);
    fill_with(image, color, |px, py| {
        let qx = (px - low - r).min(high - r - px);
        let qy = (py - low - r).min(high - r - py);
        if qx >= 0.0 || qy >= 0.0 {
            qx.min(qy) + r
        } else {
            r - qx.hypot(qy)
        }
    });
}

/// Tints a glyph coverage mask with `color` and lays it over the centre of
/// `image`.
#[allow(clippy::cast_possible_truncation)]
pub fn overlay_glyph_centered(image: &mut RgbaImage, mask: &GrayImage, color: Rgba<u8>) {
    let tinted = RgbaImage::from_fn(mask.width(), mask.height(), |x, y| {
        let coverage = u16::from(mask.get_pixel(x, y)[0]);
        let alpha = coverage * u16::from(color[3]) / 255;
        Rgba([color[0], color[1], color[2], alpha as u8])
    });
    let x = (i64::from(image.width()) - i64::from(mask.width())) / 2;
    let y = (i64::from(image.height()) - i64::from(mask.height())) / 2;
    imageops::overlay(image, &tinted, x, y);
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex("#f59e0b").unwrap(), Rgba([0xf5, 0x9e, 0x0b, 255]));
        assert_eq!(parse_hex("#00000080").unwrap(), Rgba([0, 0, 0, 0x80]));
        assert!(parse_hex("f59e0b").is_err());
        assert!(parse_hex("#f59").is_err());
        assert!(parse_hex("#zz9e0b").is_err());
    }

    #[test]
    fn circle_fills_centre_not_corner() {
        let mut image = RgbaImage::new(24, 24);
        fill_circle(&mut image, 12.0, 12.0, 11.0, WHITE);
        assert_eq!(*image.get_pixel(12, 12), WHITE);
        assert_eq!(image.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn later_fill_covers_earlier() {
        let red = Rgba([255, 0, 0, 255]);
        let mut image = RgbaImage::new(24, 24);
        fill_circle(&mut image, 12.0, 12.0, 11.0, WHITE);
        fill_circle(&mut image, 12.0, 12.0, 9.0, red);
        assert_eq!(*image.get_pixel(12, 12), red);
        // Inside the white ring but outside the red disc.
        assert_eq!(*image.get_pixel(12, 2), WHITE);
    }

    #[test]
    fn edge_pixels_are_partially_covered() {
        let mut image = RgbaImage::new(24, 24);
        fill_circle(&mut image, 12.0, 12.0, 5.0, WHITE);
        let alpha = image.get_pixel(16, 12)[3];
        assert!(alpha > 0 && alpha < 255, "alpha {alpha}");
    }

    #[test]
    fn rounded_square_leaves_corners_clear() {
        let mut image = RgbaImage::new(24, 24);
        fill_rounded_square(&mut image, 1.0, 7.0, WHITE);
        assert_eq!(image.get_pixel(1, 1)[3], 0);
        assert_eq!(*image.get_pixel(12, 1), WHITE);
        assert_eq!(*image.get_pixel(12, 12), WHITE);
    }

    #[test]
    fn glyph_is_centred() {
        let mut image = RgbaImage::new(10, 10);
        let mask = GrayImage::from_pixel(2, 2, Luma([255]));
        overlay_glyph_centered(&mut image, &mask, WHITE);
        assert_eq!(*image.get_pixel(4, 4), WHITE);
        assert_eq!(*image.get_pixel(5, 5), WHITE);
        assert_eq!(image.get_pixel(3, 3)[3], 0);
    }
}
