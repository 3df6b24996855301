//! Mixing-ratio to mass-concentration conversion on the lowest model level.

/// Specific gas constant for dry air, J kg-1 K-1.
pub const DRY_AIR_GAS_CONSTANT: f64 = 287.0;

/// Hybrid coefficient `a` for both half levels bounding model level 137.
const HALF_LEVEL_A: f64 = 0.0;
/// Hybrid coefficient `b` for the half level above model level 137.
const HALF_LEVEL_B_ABOVE: f64 = 0.997630;
/// Hybrid coefficient `b` for the half level below (the surface).
const HALF_LEVEL_B_BELOW: f64 = 1.0;

/// Full-level pressure (Pa) of model level 137 for a surface pressure.
pub fn model_level_pressure(surface_pressure: f64) -> f64 {
    let above = HALF_LEVEL_A + HALF_LEVEL_B_ABOVE * surface_pressure;
    let below = HALF_LEVEL_A + HALF_LEVEL_B_BELOW * surface_pressure;
    (above + below) / 2.0
}

/// Dry-air density (kg m-3) from pressure (Pa) and temperature (K).
pub fn air_density(pressure: f64, temperature: f64) -> f64 {
    pressure / (DRY_AIR_GAS_CONSTANT * temperature)
}

/// Convert mass mixing ratios in place, point by point.
///
/// All three slices share one layout.
pub fn mixing_ratio_to_concentration(
    values: &mut [f32],
    surface_pressure: &[f32],
    temperature: &[f32],
) {
    for ((value, &sp), &t) in values.iter_mut().zip(surface_pressure).zip(temperature) {
        let rho = air_density(model_level_pressure(sp as f64), t as f64);
        *value = (*value as f64 * rho) as f32;
    }
}
