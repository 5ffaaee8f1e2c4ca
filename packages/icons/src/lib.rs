#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Marker iconography for the report layer.
//!
//! Every incident type gets one icon per scariness level (a white-ringed
//! circle filled with the scariness colour) and every annoyance type gets
//! one icon (a white-ringed amber rounded square). Each icon carries the
//! category's glyph from the icon font, composited in white.
//!
//! Icons are keyed `marker-{type}-{scariness}` and `annoyance-{type}` so
//! render layers can look them up from feature properties. The icon font
//! must report ready before rasterizing, otherwise glyphs come out blank.

pub mod raster;

use async_trait::async_trait;
use image::{GrayImage, RgbaImage};
use nearmiss_map_report_models::{AnnoyanceType, IncidentType, Scariness};
use thiserror::Error;

pub use raster::{WHITE, parse_hex};

/// Logical icon size in CSS pixels, before the device pixel ratio.
pub const BASE_SIZE_PX: u32 = 24;

/// Logical glyph size in CSS pixels.
pub const GLYPH_SIZE_PX: f32 = 11.0;

/// Fill colour of every annoyance marker.
pub const ANNOYANCE_COLOR: &str = "#f59e0b";

/// Errors from icon generation.
#[derive(Debug, Error)]
pub enum IconError {
    /// A colour string was not `#rrggbb` or `#rrggbbaa`.
    #[error("Invalid colour {color:?}")]
    InvalidColor {
        /// The rejected colour.
        color: String,
    },

    /// Device pixel ratio was not a positive finite number.
    #[error("Invalid pixel ratio {ratio}")]
    InvalidPixelRatio {
        /// The rejected ratio.
        ratio: f32,
    },

    /// The icon font failed to load.
    #[error("Icon font unavailable: {message}")]
    FontUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// The image atlas rejected an icon.
    #[error("Failed to register icon {key}: {message}")]
    Atlas {
        /// Icon key.
        key: String,
        /// Description of the failure.
        message: String,
    },
}

/// The glyph font used for marker symbols.
#[async_trait]
pub trait IconFont: Send + Sync {
    /// Resolves once the font is loaded and glyphs can be measured.
    ///
    /// # Errors
    ///
    /// Returns [`IconError::FontUnavailable`] if the font failed to load.
    async fn ready(&self) -> Result<(), IconError>;

    /// Renders `glyph` at `size_px` device pixels as a coverage mask.
    ///
    /// Returns `None` if the font has no such glyph.
    fn glyph_mask(&self, glyph: char, size_px: u32) -> Option<GrayImage>;
}

/// The render surface's image registry.
pub trait ImageAtlas {
    /// Whether an image is already registered under `key`.
    fn has_image(&self, key: &str) -> bool;

    /// Registers an icon under its key.
    ///
    /// # Errors
    ///
    /// Returns [`IconError::Atlas`] if the surface rejects the image.
    fn add_image(&mut self, icon: &MarkerIcon) -> Result<(), IconError>;
}

/// A rasterized marker icon.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerIcon {
    /// Atlas key.
    pub key: String,
    /// Device pixel ratio the icon was rendered at.
    pub pixel_ratio: f32,
    /// Rendered pixels.
    pub image: RgbaImage,
}

impl MarkerIcon {
    /// Width in device pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in device pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Atlas key for an incident marker.
#[must_use]
pub fn incident_icon_key(incident_type: IncidentType, scariness: Scariness) -> String {
    format!("marker-{}-{}", incident_type.as_ref(), scariness.as_ref())
}

/// Atlas key for an annoyance marker.
#[must_use]
pub fn annoyance_icon_key(annoyance_type: AnnoyanceType) -> String {
    format!("annoyance-{}", annoyance_type.as_ref())
}

/// Every icon key, incidents first.
#[must_use]
pub fn all_icon_keys() -> Vec<String> {
    IncidentType::all()
        .iter()
        .flat_map(|&t| {
            Scariness::all()
                .iter()
                .map(move |&s| incident_icon_key(t, s))
        })
        .chain(AnnoyanceType::all().iter().map(|&t| annoyance_icon_key(t)))
        .collect()
}

/// Icon edge length in device pixels.
///
/// # Errors
///
/// Returns [`IconError::InvalidPixelRatio`] for non-positive or
/// non-finite ratios.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn icon_size_px(pixel_ratio: f32) -> Result<u32, IconError> {
    if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
        return Err(IconError::InvalidPixelRatio { ratio: pixel_ratio });
    }
    Ok(((BASE_SIZE_PX as f32) * pixel_ratio).floor().max(1.0) as u32)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn draw_glyph(image: &mut RgbaImage, font: &dyn IconFont, glyph: char, pixel_ratio: f32) {
    let size = (GLYPH_SIZE_PX * pixel_ratio).round().max(1.0) as u32;
    match font.glyph_mask(glyph, size) {
        Some(mask) => raster::overlay_glyph_centered(image, &mask, WHITE),
        None => log::warn!("Icon font has no glyph U+{:04X}", u32::from(glyph)),
    }
}

/// Rasterizes one incident marker.
///
/// # Errors
///
/// Returns [`IconError`] if the pixel ratio or scariness colour is
/// invalid.
#[allow(clippy::cast_precision_loss)]
pub fn rasterize_incident_icon(
    font: &dyn IconFont,
    incident_type: IncidentType,
    scariness: Scariness,
    pixel_ratio: f32,
) -> Result<MarkerIcon, IconError> {
    let px = icon_size_px(pixel_ratio)?;
    let half = px as f32 / 2.0;
    let mut image = RgbaImage::new(px, px);

    raster::fill_circle(&mut image, half, half, half - 1.0, WHITE);
    raster::fill_circle(
        &mut image,
        half,
        half,
        3.0f32.mul_add(-pixel_ratio, half),
        parse_hex(scariness.color())?,
    );
    draw_glyph(&mut image, font, incident_type.glyph(), pixel_ratio);

    Ok(MarkerIcon {
        key: incident_icon_key(incident_type, scariness),
        pixel_ratio,
        image,
    })
}

/// Rasterizes one annoyance marker.
///
/// # Errors
///
/// Returns [`IconError`] if the pixel ratio is invalid.
pub fn rasterize_annoyance_icon(
    font: &dyn IconFont,
    annoyance_type: AnnoyanceType,
    pixel_ratio: f32,
) -> Result<MarkerIcon, IconError> {
    let px = icon_size_px(pixel_ratio)?;
    let corner = (5.0 * pixel_ratio).round();
    let mut image = RgbaImage::new(px, px);

    raster::fill_rounded_square(&mut image, 1.0, corner + 2.0, WHITE);
    raster::fill_rounded_square(
        &mut image,
        3.0 * pixel_ratio,
        corner,
        parse_hex(ANNOYANCE_COLOR)?,
    );
    draw_glyph(&mut image, font, annoyance_type.glyph(), pixel_ratio);

    Ok(MarkerIcon {
        key: annoyance_icon_key(annoyance_type),
        pixel_ratio,
        image,
    })
}

/// Waits for the icon font, then rasterizes every marker icon.
///
/// # Errors
///
/// Returns [`IconError`] if the font fails to load or the pixel ratio is
/// invalid.
pub async fn generate_marker_images(
    font: &dyn IconFont,
    pixel_ratio: f32,
) -> Result<Vec<MarkerIcon>, IconError> {
    font.ready().await?;

    let mut icons = Vec::with_capacity(
        IncidentType::all().len() * Scariness::all().len() + AnnoyanceType::all().len(),
    );
    for &incident_type in IncidentType::all() {
        for &scariness in Scariness::all() {
            icons.push(rasterize_incident_icon(
                font,
                incident_type,
                scariness,
                pixel_ratio,
            )?);
        }
    }
    for &annoyance_type in AnnoyanceType::all() {
        icons.push(rasterize_annoyance_icon(font, annoyance_type, pixel_ratio)?);
    }

    log::debug!("Rasterized {} marker icons at {pixel_ratio}x", icons.len());
    Ok(icons)
}

/// Registers icons not already present in the atlas.
///
/// Returns the number of icons added.
///
/// # Errors
///
/// Returns [`IconError::Atlas`] on the first rejected icon.
pub fn register_marker_images(
    atlas: &mut dyn ImageAtlas,
    icons: &[MarkerIcon],
) -> Result<usize, IconError> {
    let mut added = 0;
    for icon in icons {
        if atlas.has_image(&icon.key) {
            continue;
        }
        atlas.add_image(icon)?;
        added += 1;
    }
    Ok(added)
}
