//! Air Quality Index classification.
//!
//! Each pollutant owns an ascending breakpoint table of
//! `(level, inclusive upper bound)` pairs in µg/m³. Classification never
//! fails: concentrations above the last bound saturate at the top level.

use crate::pollutant::Pollutant;

/// Categorical AQI level, 1 (good) to 6 (extremely poor).
pub type AqiLevel = u8;

/// Highest categorical level.
pub const MAX_AQI_LEVEL: AqiLevel = 6;

/// Upper limit of the fractional scale.
const MAX_FRACTIONAL_LEVEL: f64 = 7.0;

const OZONE: [(AqiLevel, f64); 6] = [
    (1, 50.0),
    (2, 100.0),
    (3, 130.0),
    (4, 240.0),
    (5, 380.0),
    (6, 800.0),
];

const NITROGEN_DIOXIDE: [(AqiLevel, f64); 6] = [
    (1, 40.0),
    (2, 90.0),
    (3, 120.0),
    (4, 230.0),
    (5, 340.0),
    (6, 1000.0),
];

const SULPHUR_DIOXIDE: [(AqiLevel, f64); 6] = [
    (1, 100.0),
    (2, 200.0),
    (3, 350.0),
    (4, 500.0),
    (5, 750.0),
    (6, 1250.0),
];

const PM10: [(AqiLevel, f64); 6] = [
    (1, 20.0),
    (2, 40.0),
    (3, 50.0),
    (4, 100.0),
    (5, 150.0),
    (6, 1200.0),
];

const PM2_5: [(AqiLevel, f64); 6] = [
    (1, 10.0),
    (2, 20.0),
    (3, 25.0),
    (4, 50.0),
    (5, 75.0),
    (6, 800.0),
];

/// Breakpoint table for a pollutant.
pub fn breakpoints(pollutant: Pollutant) -> &'static [(AqiLevel, f64)] {
    match pollutant {
        Pollutant::Ozone => &OZONE,
        Pollutant::NitrogenDioxide => &NITROGEN_DIOXIDE,
        Pollutant::SulphurDioxide => &SULPHUR_DIOXIDE,
        Pollutant::Pm10 => &PM10,
        Pollutant::Pm2_5 => &PM2_5,
    }
}

/// Classify a concentration (µg/m³) into an AQI level.
///
/// Returns the first level whose bound is ≥ `value`; anything above the
/// last bound is `MAX_AQI_LEVEL`.
pub fn classify(value: f64, pollutant: Pollutant) -> AqiLevel {
    breakpoints(pollutant)
        .iter()
        .find(|(_, bound)| value <= *bound)
        .map(|(level, _)| *level)
        .unwrap_or(MAX_AQI_LEVEL)
}

/// Continuous AQI for color scales, linearly interpolated between adjacent
/// breakpoints and clamped to `[1.0, 7.0]`.
pub fn classify_fractional(value: f64, pollutant: Pollutant) -> f64 {
    let mut lower = 0.0;
    for &(level, upper) in breakpoints(pollutant) {
        if value <= upper {
            let span = upper - lower;
            let fraction = if span > 0.0 { (value - lower) / span } else { 0.0 };
            return (level as f64 + fraction).clamp(1.0, MAX_FRACTIONAL_LEVEL);
        }
        lower = upper;
    }
    MAX_FRACTIONAL_LEVEL
}

/// Overall AQI: the maximum of the per-pollutant levels.
///
/// Callers pass at least one level; `None` is returned for an empty slice.
pub fn overall(levels: &[AqiLevel]) -> Option<AqiLevel> {
    levels.iter().copied().max()
}
