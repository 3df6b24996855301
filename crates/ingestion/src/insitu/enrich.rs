//! Attach grid meteorology to in-situ records and convert volumetric
//! readings to mass concentration.

use atmos_grid::{AtmosphericGrid, GridField};
use tracing::debug;

use aq_common::{InSituRecord, MICROGRAMS_PER_CUBIC_METRE};

use crate::error::Result;
use crate::insitu::transform::PPM;

/// Molar gas constant, J/(mol·K).
pub const GAS_CONSTANT: f64 = 8.31446;

/// ppm to µg/m³ for a gas of molar mass `molecular_weight` (g/mol) at
/// `pressure_pa` and `temperature_k`.
pub fn ppm_to_micrograms(
    ppm: f64,
    molecular_weight: f64,
    pressure_pa: f64,
    temperature_k: f64,
) -> f64 {
    let pressure_kpa = pressure_pa / 1000.0;
    ppm * molecular_weight * pressure_kpa / (GAS_CONSTANT * temperature_k) * 1000.0
}

/// Add the nearest grid temperature and surface pressure to every record
/// and convert its ppm readings.
///
/// Readings in ppm for pollutants without a molar mass are dropped, as are
/// records left without any reading.
pub fn enrich_records(
    records: Vec<InSituRecord>,
    grid: &AtmosphericGrid,
) -> Result<Vec<InSituRecord>> {
    let mut enriched = Vec::with_capacity(records.len());

    for mut record in records {
        let latitude = record.location.latitude();
        let longitude = record.location.longitude();
        let temperature =
            grid.point_in_time(latitude, longitude, record.measurement_date, GridField::Temperature)?
                as f64;
        let pressure = grid.point_in_time(
            latitude,
            longitude,
            record.measurement_date,
            GridField::SurfacePressure,
        )? as f64;

        record.metadata.estimated_temperature = Some(temperature);
        record.metadata.estimated_surface_pressure = Some(pressure);

        record.pollutants.retain(|pollutant, reading| {
            if reading.unit != PPM {
                return true;
            }
            match pollutant.molecular_weight() {
                Some(weight) => {
                    let converted = ppm_to_micrograms(reading.value, weight, pressure, temperature);
                    reading.original_value = Some(reading.value);
                    reading.original_unit = Some(std::mem::replace(
                        &mut reading.unit,
                        MICROGRAMS_PER_CUBIC_METRE.to_string(),
                    ));
                    reading.value = converted;
                    true
                }
                None => {
                    debug!(
                        station = %record.location_name,
                        pollutant = %pollutant,
                        "Dropping volumetric reading without molar mass"
                    );
                    false
                }
            }
        });

        if !record.pollutants.is_empty() {
            enriched.push(record);
        }
    }

    Ok(enriched)
}
