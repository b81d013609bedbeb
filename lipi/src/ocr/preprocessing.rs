use std::sync::OnceLock;

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::filter::{bilateral_filter, gaussian_blur_f32, median_filter};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};

const MALAYALAM_THRESHOLD: u8 = 150;
const ODIA_THRESHOLD: u8 = 120;
const PUNJABI_THRESHOLD: u8 = 180;

const ADAPTIVE_BLOCK_SIZE: u32 = 31;
const ADAPTIVE_OFFSET: f32 = 10.0;

const BILATERAL_DIAMETER: u32 = 5;
const BILATERAL_SIGMA: f32 = 50.0;

/// Script-tuned image enhancement applied before recognition.
///
/// Every strategy converts to grayscale and ends with an inverted binary
/// image: foreground strokes are 255, background is 0. Strategies are pure
/// and deterministic, so the same input always yields the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Hindi and Marathi: Gaussian blur, Otsu, then the head-stroke is removed.
    Devanagari,
    /// Gaussian blur + unsharp mask, Otsu.
    Tamil,
    /// Median blur, fixed threshold, dilation to thicken thin curves.
    Malayalam,
    /// Otsu, opening to drop speckle around rounded glyphs.
    Kannada,
    /// Gaussian blur, local Gaussian threshold, dilation.
    Telugu,
    /// Edge-preserving bilateral blur, Otsu.
    Bengali,
    /// Median blur, fixed threshold.
    Odia,
    /// Plain Otsu.
    Gujarati,
    /// High fixed threshold.
    Punjabi,
    /// Plain Otsu; used for Latin text and anything without its own entry.
    Generic,
}

impl Strategy {
    pub const ALL: [Strategy; 10] = [
        Strategy::Devanagari,
        Strategy::Tamil,
        Strategy::Malayalam,
        Strategy::Kannada,
        Strategy::Telugu,
        Strategy::Bengali,
        Strategy::Odia,
        Strategy::Gujarati,
        Strategy::Punjabi,
        Strategy::Generic,
    ];

    pub const fn fallback() -> Self {
        Strategy::Generic
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Devanagari => "devanagari",
            Strategy::Tamil => "tamil",
            Strategy::Malayalam => "malayalam",
            Strategy::Kannada => "kannada",
            Strategy::Telugu => "telugu",
            Strategy::Bengali => "bengali",
            Strategy::Odia => "odia",
            Strategy::Gujarati => "gujarati",
            Strategy::Punjabi => "punjabi",
            Strategy::Generic => "generic",
        }
    }

    pub fn apply(self, image: &DynamicImage) -> GrayImage {
        self.apply_gray(&image.to_luma8())
    }

    pub fn apply_gray(self, gray: &GrayImage) -> GrayImage {
        if gray.width() == 0 || gray.height() == 0 {
            return gray.clone();
        }
        match self {
            Strategy::Devanagari => {
                let blurred = gaussian_blur(gray, 5);
                let binary = otsu_inverted(&blurred);
                strip_head_stroke(&binary)
            }
            Strategy::Tamil => {
                let blurred = gaussian_blur(gray, 3);
                let sharpened = add_weighted(gray, 2.5, &blurred, -1.5);
                otsu_inverted(&sharpened)
            }
            Strategy::Malayalam => {
                let smoothed = median_filter(gray, 1, 1);
                let binary = threshold_inverted(&smoothed, MALAYALAM_THRESHOLD);
                stroke_element().dilate(&binary)
            }
            Strategy::Kannada => {
                let binary = otsu_inverted(gray);
                stroke_element().open(&binary)
            }
            Strategy::Telugu => {
                let blurred = gaussian_blur(gray, 5);
                let binary =
                    adaptive_threshold_inverted(&blurred, ADAPTIVE_BLOCK_SIZE, ADAPTIVE_OFFSET);
                stroke_element().dilate(&binary)
            }
            Strategy::Bengali => {
                let smoothed =
                    bilateral_filter(gray, BILATERAL_DIAMETER, BILATERAL_SIGMA, BILATERAL_SIGMA);
                otsu_inverted(&smoothed)
            }
            Strategy::Odia => {
                let smoothed = median_filter(gray, 2, 2);
                threshold_inverted(&smoothed, ODIA_THRESHOLD)
            }
            Strategy::Punjabi => threshold_inverted(gray, PUNJABI_THRESHOLD),
            Strategy::Gujarati | Strategy::Generic => otsu_inverted(gray),
        }
    }
}

/// Sigma a `ksize`-wide Gaussian uses when none is given explicitly.
fn kernel_sigma(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

fn gaussian_blur(gray: &GrayImage, ksize: u32) -> GrayImage {
    gaussian_blur_f32(gray, kernel_sigma(ksize))
}

/// `alpha * a + beta * b`, rounded and saturated to 8 bits.
fn add_weighted(a: &GrayImage, alpha: f32, b: &GrayImage, beta: f32) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        let value = alpha * a.get_pixel(x, y)[0] as f32 + beta * b.get_pixel(x, y)[0] as f32;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Pixels strictly above `level` become background (0), the rest foreground (255).
fn threshold_inverted(gray: &GrayImage, level: u8) -> GrayImage {
    threshold(gray, level, ThresholdType::BinaryInverted)
}

fn otsu_inverted(gray: &GrayImage) -> GrayImage {
    threshold_inverted(gray, otsu_level(gray))
}

/// Compare each pixel with the Gaussian-weighted mean of its
/// `block_size` neighbourhood minus `offset`.
fn adaptive_threshold_inverted(gray: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let local_mean = gaussian_blur_f32(gray, kernel_sigma(block_size));
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let level = local_mean.get_pixel(x, y)[0] as f32 - offset;
        if gray.get_pixel(x, y)[0] as f32 > level {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// A filled rectangular structuring element anchored at `(width / 2, height / 2)`.
///
/// imageproc applies a mask unreflected for both erosion and dilation, so
/// dilation gets the mirrored mask. With even sides this keeps opened shapes
/// in place. Pixels outside the image never take part.
struct RectElement {
    erosion: Mask,
    dilation: Mask,
}

impl RectElement {
    fn new(width: u8, height: u8) -> Self {
        let block = GrayImage::from_pixel(width.into(), height.into(), Luma([255]));
        Self {
            erosion: Mask::from_image(&block, width / 2, height / 2),
            dilation: Mask::from_image(&block, width - 1 - width / 2, height - 1 - height / 2),
        }
    }

    fn erode(&self, image: &GrayImage) -> GrayImage {
        grayscale_erode(image, &self.erosion)
    }

    fn dilate(&self, image: &GrayImage) -> GrayImage {
        grayscale_dilate(image, &self.dilation)
    }

    /// Erosion followed by dilation: drops foreground smaller than the
    /// element and keeps the rest.
    fn open(&self, image: &GrayImage) -> GrayImage {
        self.dilate(&self.erode(image))
    }
}

/// 2x2, for thickening thin strokes and removing speckle.
fn stroke_element() -> &'static RectElement {
    static ELEMENT: OnceLock<RectElement> = OnceLock::new();
    ELEMENT.get_or_init(|| RectElement::new(2, 2))
}

/// 50x1, matches only long horizontal runs such as the shirorekha.
fn head_stroke_element() -> &'static RectElement {
    static ELEMENT: OnceLock<RectElement> = OnceLock::new();
    ELEMENT.get_or_init(|| RectElement::new(50, 1))
}

/// Remove the shirorekha: a wide, one-pixel-high opening isolates the long
/// horizontal runs, which are then subtracted from the binary image.
fn strip_head_stroke(binary: &GrayImage) -> GrayImage {
    let head_strokes = head_stroke_element().open(binary);
    GrayImage::from_fn(binary.width(), binary.height(), |x, y| {
        let value = binary.get_pixel(x, y)[0].saturating_sub(head_strokes.get_pixel(x, y)[0]);
        Luma([value])
    })
}
