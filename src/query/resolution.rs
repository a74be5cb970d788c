//! Bucket-width selection for chart queries.
//!
//! A resolution is either a positive bucket width in milliseconds or
//! [`Resolution::Raw`] (no bucketing). User-facing tokens such as `"6h"` are
//! only an input format: they are mapped to millisecond widths on parse and
//! never travel further than that.

use super::TimeRange;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MINUTE_MS: u64 = 60 * 1000;
pub const HOUR_MS: u64 = 60 * MINUTE_MS;
pub const DAY_MS: u64 = 24 * HOUR_MS;

/// "One month" is four weeks throughout.
pub const DEFAULT_BUCKET_MS: u64 = 28 * DAY_MS;

const RESOLUTION_TOKENS: &[(&str, u64)] = &[
    ("1M", 28 * DAY_MS),
    ("7d", 7 * DAY_MS),
    ("1d", DAY_MS),
    ("6h", 6 * HOUR_MS),
    ("1h", HOUR_MS),
    ("30m", 30 * MINUTE_MS),
    ("15m", 15 * MINUTE_MS),
    ("2m", 2 * MINUTE_MS),
];

/// Dynamic selection table: first entry whose exclusive upper bound exceeds
/// the range width wins.
const DYNAMIC_THRESHOLDS: &[(u64, u64)] = &[
    (10 * HOUR_MS, 5 * MINUTE_MS),
    (7 * DAY_MS, HOUR_MS),
    (28 * DAY_MS, DAY_MS),
    (364 * DAY_MS, 7 * DAY_MS),
];

pub const DYNAMIC_TOKEN: &str = "dynamic";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    Raw,
    Bucket(u64),
}

impl Resolution {
    pub const DEFAULT: Resolution = Resolution::Bucket(DEFAULT_BUCKET_MS);

    /// Zero is not a valid width and maps to the monthly default.
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::DEFAULT
        } else {
            Resolution::Bucket(ms)
        }
    }

    /// `""` is raw resolution; unknown tokens fall back to the monthly default.
    pub fn from_token(token: &str) -> Self {
        let token = token.trim();
        if token.is_empty() {
            return Resolution::Raw;
        }
        RESOLUTION_TOKENS
            .iter()
            .find(|(t, _)| *t == token)
            .map(|&(_, ms)| Resolution::Bucket(ms))
            .unwrap_or(Self::DEFAULT)
    }

    pub fn bucket_ms(&self) -> Option<u64> {
        match self {
            Resolution::Raw => None,
            Resolution::Bucket(ms) => Some(*ms),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Resolution::Raw)
    }

    pub fn token(&self) -> Option<&'static str> {
        match self {
            Resolution::Raw => Some(""),
            Resolution::Bucket(ms) => RESOLUTION_TOKENS
                .iter()
                .find(|(_, width)| width == ms)
                .map(|&(t, _)| t),
        }
    }

    /// Wire form for the `resolution` query parameter.
    pub fn as_param(&self) -> String {
        match self {
            Resolution::Raw => String::new(),
            Resolution::Bucket(ms) => ms.to_string(),
        }
    }

    /// Ordering key from finest to coarsest; raw sorts below every bucket.
    pub fn width(&self) -> u64 {
        self.bucket_ms().unwrap_or(0)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Raw => write!(f, "raw"),
            Resolution::Bucket(ms) => {
                if let Some(token) = self.token() {
                    write!(f, "{}", token)
                } else if ms % DAY_MS == 0 {
                    write!(f, "{}d", ms / DAY_MS)
                } else if ms % HOUR_MS == 0 {
                    write!(f, "{}h", ms / HOUR_MS)
                } else if ms % MINUTE_MS == 0 {
                    write!(f, "{}m", ms / MINUTE_MS)
                } else {
                    write!(f, "{}ms", ms)
                }
            }
        }
    }
}

/// What the user picked in the resolution menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResolutionSetting {
    #[default]
    Dynamic,
    Explicit(Resolution),
}

impl ResolutionSetting {
    /// Accepts `dynamic`, a menu token, or a positive millisecond width.
    /// A missing parameter is dynamic.
    pub fn parse(param: Option<&str>) -> Self {
        let Some(param) = param else {
            return ResolutionSetting::Dynamic;
        };
        let param = param.trim();
        if param.eq_ignore_ascii_case(DYNAMIC_TOKEN) {
            return ResolutionSetting::Dynamic;
        }
        match param.parse::<i64>() {
            Ok(ms) => ResolutionSetting::Explicit(Resolution::from_millis(ms.max(0) as u64)),
            Err(_) => ResolutionSetting::Explicit(Resolution::from_token(param)),
        }
    }

    pub fn as_param(&self) -> String {
        match self {
            ResolutionSetting::Dynamic => DYNAMIC_TOKEN.to_string(),
            ResolutionSetting::Explicit(resolution) => resolution.as_param(),
        }
    }
}

/// Picks the bucket width for `range`.
///
/// An explicit setting wins regardless of the range. Dynamic selection on a
/// range without both bounds returns the monthly default; callers detect
/// that case through [`TimeRange::bounds`] and drop the time filter.
pub fn select_resolution(range: &TimeRange, setting: &ResolutionSetting) -> Resolution {
    match setting {
        ResolutionSetting::Explicit(resolution) => *resolution,
        ResolutionSetting::Dynamic => match range.span() {
            Some(diff) => optimal_resolution(diff),
            None => Resolution::DEFAULT,
        },
    }
}

pub fn optimal_resolution(diff_ms: u64) -> Resolution {
    if diff_ms == 0 {
        return Resolution::DEFAULT;
    }
    DYNAMIC_THRESHOLDS
        .iter()
        .find(|(upper, _)| diff_ms < *upper)
        .map(|&(_, width)| Resolution::Bucket(width))
        .unwrap_or(Resolution::DEFAULT)
}
