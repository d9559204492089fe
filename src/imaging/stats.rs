//! Color statistics over decoded images.
//!
//! Every operation takes an [`ImageSource`] and returns `None` when it
//! cannot be turned into a non-empty RGB image. Alpha is dropped before
//! counting.

#![allow(clippy::cast_precision_loss)]

use std::collections::HashMap;
use std::path::Path;

use image::{DynamicImage, RgbImage};
use serde::Serialize;

/// An RGB triple.
pub type Rgb = [u8; 3];

/// Pure white.
pub const WHITE: Rgb = [255, 255, 255];

/// Where the pixels come from.
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    /// Already decoded in memory.
    Decoded(&'a DynamicImage),
    /// Decoded on demand from disk.
    Path(&'a Path),
}

impl<'a> From<&'a DynamicImage> for ImageSource<'a> {
    fn from(value: &'a DynamicImage) -> Self {
        Self::Decoded(value)
    }
}

impl<'a> From<&'a Path> for ImageSource<'a> {
    fn from(value: &'a Path) -> Self {
        Self::Path(value)
    }
}

impl ImageSource<'_> {
    /// RGB pixels, or `None` for unreadable, undecodable or empty images.
    #[must_use]
    pub fn rgb(&self) -> Option<RgbImage> {
        let rgb = match self {
            Self::Decoded(img) => img.to_rgb8(),
            Self::Path(path) => image::open(path).ok()?.to_rgb8(),
        };
        (rgb.width() > 0 && rgb.height() > 0).then_some(rgb)
    }
}

/// Share of the image covered by one color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorShare {
    /// The color.
    pub rgb: Rgb,
    /// Percentage in `0.0..=100.0`.
    pub percentage: f64,
}

/// Mean of each channel over all pixels.
#[must_use]
pub fn average_color(source: ImageSource<'_>) -> Option<[f64; 3]> {
    let img = source.rgb()?;
    let mut totals = [0u64; 3];
    for pixel in img.pixels() {
        for (total, channel) in totals.iter_mut().zip(pixel.0) {
            *total += u64::from(channel);
        }
    }
    let count = pixel_count(&img);
    Some(totals.map(|t| t as f64 / count))
}

/// Every color present with its share, most frequent first.
///
/// Colors with equal counts are ordered by ascending RGB value.
#[must_use]
pub fn color_histogram(source: ImageSource<'_>) -> Option<Vec<ColorShare>> {
    let img = source.rgb()?;
    let total = pixel_count(&img);

    let mut counts: Vec<(Rgb, u64)> = count_colors(&img).into_iter().collect();
    counts.sort_by(|(rgb_a, n_a), (rgb_b, n_b)| n_b.cmp(n_a).then(rgb_a.cmp(rgb_b)));

    Some(
        counts
            .into_iter()
            .map(|(rgb, n)| ColorShare {
                rgb,
                percentage: n as f64 / total * 100.0,
            })
            .collect(),
    )
}

/// Percentage of pixels exactly equal to `rgb` (zero when absent).
#[must_use]
pub fn color_percentage(source: ImageSource<'_>, rgb: Rgb) -> Option<f64> {
    let img = source.rgb()?;
    let matching = img.pixels().filter(|p| p.0 == rgb).count();
    Some(matching as f64 / pixel_count(&img) * 100.0)
}

/// Percentage of pure white pixels.
#[must_use]
pub fn white_percentage(source: ImageSource<'_>) -> Option<f64> {
    color_percentage(source, WHITE)
}

/// Number of distinct colors.
#[must_use]
pub fn distinct_color_count(source: ImageSource<'_>) -> Option<usize> {
    source.rgb().map(|img| count_colors(&img).len())
}

fn count_colors(img: &RgbImage) -> HashMap<Rgb, u64> {
    let mut counts = HashMap::new();
    for pixel in img.pixels() {
        *counts.entry(pixel.0).or_insert(0) += 1;
    }
    counts
}

fn pixel_count(img: &RgbImage) -> f64 {
    f64::from(img.width()) * f64::from(img.height())
}
