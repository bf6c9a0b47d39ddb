//! Feature contract between the forecast pipeline and the demand scorer.
//!
//! Every [`ForecastInput`] is flattened into [`FEATURE_COUNT`] normalized
//! `f32` values in a fixed order. The scaling constants must match the ones
//! the scorer was calibrated with.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::ForecastInput;

pub const FEATURE_COUNT: usize = 13;

/// Padded width of the on-device model input
pub const DEFAULT_SEQUENCE_LENGTH: usize = 512;

/// Positions of each feature in a [`FeatureVector`]
pub mod index {
    pub const DAY_OF_YEAR: usize = 0;
    pub const PRODUCT_HASH: usize = 1;
    pub const CURRENT_STOCK: usize = 2;
    pub const RESTOCK_AMOUNT: usize = 3;
    pub const PROMOTION: usize = 4;
    pub const HOLIDAY: usize = 5;
    pub const PEAK_SEASON: usize = 6;
    pub const REORDER_POINT_DAY: usize = 7;
    pub const DEMAND_LAG1: usize = 8;
    pub const DEMAND_LAG2: usize = 9;
    pub const DEMAND_LAG3: usize = 10;
    pub const ROLLING_MEAN: usize = 11;
    pub const ROLLING_STD: usize = 12;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConstants {
    pub day_of_year_scale: f32,
    pub max_stock: f32,
    pub max_demand: f32,
    pub max_rolling: f32,
}

impl Default for NormalizationConstants {
    fn default() -> Self {
        NormalizationConstants {
            day_of_year_scale: 366.0,
            max_stock: 10_000.0,
            max_demand: 1_000.0,
            max_rolling: 100.0,
        }
    }
}

impl NormalizationConstants {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("day_of_year_scale", self.day_of_year_scale),
            ("max_stock", self.max_stock),
            ("max_demand", self.max_demand),
            ("max_rolling", self.max_rolling),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("normalization constant {name} must be positive, got {value}"));
            }
        }
        Ok(())
    }
}

/// Normalized model input for one product on one day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn get(&self, idx: usize) -> f32 {
        self.0[idx]
    }

    /// Features followed by zeros up to `len`; truncated if `len` is shorter
    pub fn padded(&self, len: usize) -> Vec<f32> {
        let mut sequence = vec![0.0; len];
        let n = len.min(FEATURE_COUNT);
        sequence[..n].copy_from_slice(&self.0[..n]);
        sequence
    }

    /// The model attends over the whole padded sequence
    pub fn attention_mask(len: usize) -> Vec<f32> {
        vec![1.0; len]
    }
}

/// Values recovered from a [`FeatureVector`] by inverting the scaling
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredFeatures {
    pub day_of_year: u32,
    pub product_hash: i32,
    pub current_stock: u32,
    pub restock_amount: u32,
    pub promotion: bool,
    pub holiday: bool,
    pub peak_season: bool,
    pub reorder_point_day: u32,
    pub demand_lags: [u32; 3],
    pub rolling_mean: f64,
    pub rolling_std: f64,
}

/// 32-bit polynomial string hash (`h = 31*h + c` over UTF-16 units).
///
/// Matches the product-id hash the scorer was trained against.
pub fn product_hash(product_id: &str) -> i32 {
    product_id
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

#[derive(Debug, Clone, Default)]
pub struct FeatureNormalizer {
    constants: NormalizationConstants,
}

impl FeatureNormalizer {
    pub fn new(constants: NormalizationConstants) -> Self {
        FeatureNormalizer { constants }
    }

    pub fn constants(&self) -> &NormalizationConstants {
        &self.constants
    }

    pub fn normalize(&self, input: &ForecastInput) -> FeatureVector {
        let c = &self.constants;
        let flag = |b: bool| if b { 1.0 } else { 0.0 };

        let mut v = [0.0f32; FEATURE_COUNT];
        v[index::DAY_OF_YEAR] = day_of_year(input.date) as f32 / c.day_of_year_scale;
        v[index::PRODUCT_HASH] = product_hash(&input.product_id) as f32 / i32::MAX as f32;
        v[index::CURRENT_STOCK] = input.current_stock as f32 / c.max_stock;
        v[index::RESTOCK_AMOUNT] = input.restock_amount as f32 / c.max_stock;
        v[index::PROMOTION] = flag(input.promotion);
        v[index::HOLIDAY] = flag(input.holiday);
        v[index::PEAK_SEASON] = flag(input.peak_season);
        v[index::REORDER_POINT_DAY] = day_of_year(input.reorder_point) as f32 / c.day_of_year_scale;
        v[index::DEMAND_LAG1] = input.demand_lag1 as f32 / c.max_demand;
        v[index::DEMAND_LAG2] = input.demand_lag2 as f32 / c.max_demand;
        v[index::DEMAND_LAG3] = input.demand_lag3 as f32 / c.max_demand;
        v[index::ROLLING_MEAN] = input.rolling_mean as f32 / c.max_rolling;
        v[index::ROLLING_STD] = input.rolling_std as f32 / c.max_rolling;
        FeatureVector(v)
    }

    pub fn denormalize(&self, features: &FeatureVector) -> RecoveredFeatures {
        let c = &self.constants;
        let v = &features.0;
        let count = |x: f32, scale: f32| (x * scale).round().max(0.0) as u32;

        RecoveredFeatures {
            day_of_year: count(v[index::DAY_OF_YEAR], c.day_of_year_scale),
            product_hash: (v[index::PRODUCT_HASH] as f64 * i32::MAX as f64).round() as i32,
            current_stock: count(v[index::CURRENT_STOCK], c.max_stock),
            restock_amount: count(v[index::RESTOCK_AMOUNT], c.max_stock),
            promotion: v[index::PROMOTION] >= 0.5,
            holiday: v[index::HOLIDAY] >= 0.5,
            peak_season: v[index::PEAK_SEASON] >= 0.5,
            reorder_point_day: count(v[index::REORDER_POINT_DAY], c.day_of_year_scale),
            demand_lags: [
                count(v[index::DEMAND_LAG1], c.max_demand),
                count(v[index::DEMAND_LAG2], c.max_demand),
                count(v[index::DEMAND_LAG3], c.max_demand),
            ],
            rolling_mean: (v[index::ROLLING_MEAN] * c.max_rolling) as f64,
            rolling_std: (v[index::ROLLING_STD] * c.max_rolling) as f64,
        }
    }
}

/// 1-based day of the year, as a calendar would report it
fn day_of_year(date: NaiveDate) -> u32 {
    date.ordinal()
}
