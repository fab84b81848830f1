//! Video production pricing calculator
//!
//! Blends two per-minute price bands, Motion Graphics and CGI/VFX/SFX, by a
//! mix ratio driven by project complexity and duration. All prices are AED
//! per minute unless noted. The calculation is pure: identical inputs give
//! bit-identical outputs.

use serde::{Deserialize, Serialize};

pub const CURRENCY: &str = "AED";

/// Samples in the visualization curve
pub const CURVE_SAMPLES: usize = 100;

/// Absolute bounds spanned by both bands
pub const BASE_MIN: f64 = 2000.0;
pub const BASE_MAX: f64 = 4000.0;

/// Fraction of a band's range the mean moves at complexity 0 or 1
const MEAN_SHIFT_FACTOR: f64 = 0.6;
/// Standard deviation as a fraction of a band's range
const STD_DEV_FACTOR: f64 = 0.10;

/// A fixed per-minute price interval for one content type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    pub min: f64,
    pub max: f64,
}

impl PriceBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn mean(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Mean moved toward the top of the band as complexity rises
    pub fn shifted_mean(&self, complexity: f64) -> f64 {
        self.mean() + (complexity - 0.5) * self.range() * MEAN_SHIFT_FACTOR
    }

    pub fn std_dev(&self) -> f64 {
        self.range() * STD_DEV_FACTOR
    }

    /// Shifted mean ± one standard deviation, clamped to the band and
    /// rounded to the nearest 10
    pub fn price_range(&self, complexity: f64) -> PriceRange {
        let mean = self.shifted_mean(complexity);
        let std_dev = self.std_dev();
        PriceRange {
            min: round_to_ten((mean - std_dev).clamp(self.min, self.max)),
            max: round_to_ten((mean + std_dev).clamp(self.min, self.max)),
        }
    }
}

pub const MOTION_GRAPHICS: PriceBand = PriceBand::new(2000.0, 3000.0);
pub const CGFX: PriceBand = PriceBand::new(3500.0, 4000.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    fn scale(&self, factor: f64) -> PriceRange {
        PriceRange {
            min: self.min * factor,
            max: self.max * factor,
        }
    }
}

/// Split of the project between the two content types
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixRatio {
    pub motion_graphics_ratio: f64,
    pub cgfx_ratio: f64,
    pub motion_graphics_minutes: f64,
    pub cgfx_minutes: f64,
}

/// Price for one content type: per-minute range and the total for its share
/// of the minutes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentTypeEstimate {
    pub price_range: PriceRange,
    pub total_range: PriceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub price: f64,
    /// Normalized so the highest sample is 1.0
    pub density: f64,
}

/// Full calculator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingEstimate {
    pub currency: String,
    pub minutes: f64,
    pub complexity_factor: f64,
    pub price_per_minute: PriceRange,
    pub total: PriceRange,
    pub mix: MixRatio,
    pub motion_graphics: ContentTypeEstimate,
    pub cgfx: ContentTypeEstimate,
    pub curve: Vec<CurvePoint>,
    pub bounds: PriceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum PricingError {
    #[error("minutes must be a finite number greater than 0, got {0}")]
    InvalidMinutes(f64),
    #[error("complexity_factor must be a finite number between 0 and 1, got {0}")]
    InvalidComplexity(f64),
}

fn round_to_ten(value: f64) -> f64 {
    (value / 10.0).round() * 10.0
}

/// Share of the project assigned to CGI/VFX/SFX. Longer projects lean
/// slightly toward motion graphics.
pub fn cgfx_ratio(minutes: f64, complexity: f64) -> f64 {
    let duration_factor = 1.0 / (1.0 + minutes / 100.0);
    complexity.powf(1.5) * (0.8 + 0.2 * duration_factor)
}

/// Compute the estimate. Out-of-range input is rejected, never clamped.
pub fn estimate(minutes: f64, complexity: f64) -> Result<PricingEstimate, PricingError> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(PricingError::InvalidMinutes(minutes));
    }
    if !complexity.is_finite() || !(0.0..=1.0).contains(&complexity) {
        return Err(PricingError::InvalidComplexity(complexity));
    }

    let cgfx = cgfx_ratio(minutes, complexity);
    let motion = 1.0 - cgfx;

    let mix = MixRatio {
        motion_graphics_ratio: motion,
        cgfx_ratio: cgfx,
        motion_graphics_minutes: motion * minutes,
        cgfx_minutes: cgfx * minutes,
    };

    let motion_range = MOTION_GRAPHICS.price_range(complexity);
    let cgfx_range = CGFX.price_range(complexity);

    let price_per_minute = PriceRange {
        min: round_to_ten(motion * motion_range.min + cgfx * cgfx_range.min),
        max: round_to_ten(motion * motion_range.max + cgfx * cgfx_range.max),
    };

    Ok(PricingEstimate {
        currency: CURRENCY.to_string(),
        minutes,
        complexity_factor: complexity,
        price_per_minute,
        total: price_per_minute.scale(minutes),
        mix,
        motion_graphics: ContentTypeEstimate {
            price_range: motion_range,
            total_range: motion_range.scale(mix.motion_graphics_minutes),
        },
        cgfx: ContentTypeEstimate {
            price_range: cgfx_range,
            total_range: cgfx_range.scale(mix.cgfx_minutes),
        },
        curve: curve(motion, cgfx, complexity),
        bounds: PriceRange {
            min: BASE_MIN,
            max: BASE_MAX,
        },
    })
}

/// Gaussian over [BASE_MIN, BASE_MAX] centred on the blended shifted mean
/// with the blended standard deviation. Visualization only.
fn curve(motion: f64, cgfx: f64, complexity: f64) -> Vec<CurvePoint> {
    let mean = motion * MOTION_GRAPHICS.shifted_mean(complexity) + cgfx * CGFX.shifted_mean(complexity);
    let std_dev = motion * MOTION_GRAPHICS.std_dev() + cgfx * CGFX.std_dev();
    let step = (BASE_MAX - BASE_MIN) / (CURVE_SAMPLES - 1) as f64;

    let mut points: Vec<CurvePoint> = (0..CURVE_SAMPLES)
        .map(|i| {
            let price = BASE_MIN + step * i as f64;
            let z = (price - mean) / std_dev;
            CurvePoint {
                price,
                density: (-0.5 * z * z).exp(),
            }
        })
        .collect();

    let peak = points.iter().map(|p| p.density).fold(0.0_f64, f64::max);
    if peak > 0.0 {
        for point in &mut points {
            point.density /= peak;
        }
    }
    points
}
