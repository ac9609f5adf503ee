use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::color::ColorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStrategy {
    Greedy,
    RoundRobin,
    Balanced,
}

impl Default for ChargeStrategy {
    fn default() -> Self {
        Self::Greedy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorComparisonMethod {
    Rgb,
    Lab,
}

impl Default for ColorComparisonMethod {
    fn default() -> Self {
        Self::Rgb
    }
}

pub const DEFAULT_PROTECTION_PATTERN: &str = "random";
pub const DEFAULT_PIXELS_PER_BATCH: u32 = 100;
pub const DEFAULT_RECENT_LOCK_SECONDS: i64 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Process-wide mutable guard configuration (C11's backing record). Every
/// field is optional in the wire representation; typed accessors fall back
/// to the documented default on a missing or malformed field rather than
/// erroring, per the Data Malformation policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_color: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_color_ids: Option<HashSet<ColorId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_color: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_color_ids: Option<HashSet<ColorId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixels_per_batch: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend_all_pixels_on_start: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_charges_to_wait: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_threshold: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_comparison_method: Option<ColorComparisonMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_lock_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge_strategy: Option<ChargeStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

impl GuardConfig {
    #[must_use]
    pub fn protection_pattern(&self) -> &str {
        self.protection_pattern
            .as_deref()
            .unwrap_or(DEFAULT_PROTECTION_PATTERN)
    }

    #[must_use]
    pub fn pixels_per_batch(&self) -> u32 {
        self.pixels_per_batch
            .filter(|n| *n >= 1)
            .unwrap_or(DEFAULT_PIXELS_PER_BATCH)
    }

    #[must_use]
    pub fn spend_all_pixels_on_start(&self) -> bool {
        self.spend_all_pixels_on_start.unwrap_or(false)
    }

    #[must_use]
    pub fn recent_lock_seconds(&self) -> i64 {
        self.recent_lock_seconds
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_RECENT_LOCK_SECONDS)
    }

    #[must_use]
    pub fn charge_strategy(&self) -> ChargeStrategy {
        self.charge_strategy.unwrap_or_default()
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    #[must_use]
    pub fn prefer_color(&self) -> bool {
        self.prefer_color.unwrap_or(false)
    }

    #[must_use]
    pub fn exclude_color(&self) -> bool {
        self.exclude_color.unwrap_or(false)
    }

    #[must_use]
    pub fn preferred_color_ids(&self) -> &HashSet<ColorId> {
        static EMPTY: std::sync::OnceLock<HashSet<ColorId>> = std::sync::OnceLock::new();
        self.preferred_color_ids
            .as_ref()
            .unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }

    #[must_use]
    pub fn excluded_color_ids(&self) -> &HashSet<ColorId> {
        static EMPTY: std::sync::OnceLock<HashSet<ColorId>> = std::sync::OnceLock::new();
        self.excluded_color_ids
            .as_ref()
            .unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }

    /// Merge only the fields present in `partial` into `self`, returning the
    /// set of field names that actually changed.
    pub fn merge(&mut self, partial: GuardConfig) -> Vec<&'static str> {
        let mut changed = Vec::new();
        macro_rules! merge_field {
            ($field:ident, $name:expr) => {
                if let Some(value) = partial.$field {
                    if self.$field.as_ref() != Some(&value) {
                        changed.push($name);
                    }
                    self.$field = Some(value);
                }
            };
        }
        merge_field!(protection_pattern, "protectionPattern");
        merge_field!(prefer_color, "preferColor");
        merge_field!(preferred_color_ids, "preferredColorIds");
        merge_field!(exclude_color, "excludeColor");
        merge_field!(excluded_color_ids, "excludedColorIds");
        merge_field!(pixels_per_batch, "pixelsPerBatch");
        merge_field!(spend_all_pixels_on_start, "spendAllPixelsOnStart");
        merge_field!(min_charges_to_wait, "minChargesToWait");
        merge_field!(color_threshold, "colorThreshold");
        merge_field!(color_comparison_method, "colorComparisonMethod");
        merge_field!(recent_lock_seconds, "recentLockSeconds");
        merge_field!(charge_strategy, "chargeStrategy");
        merge_field!(max_retries, "maxRetries");
        changed
    }
}
