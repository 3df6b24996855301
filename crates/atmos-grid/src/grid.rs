//! The harmonised, immutable atmospheric grid.

use std::collections::{BTreeMap, HashMap};

use aq_common::{Location, Pollutant};
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{GridError, GridResult};
use crate::fields::{GridField, GridLevel, CONCENTRATION_UNITS, MIXING_RATIO_UNITS};
use crate::interpolation::{axis_position, bilinear_interpolate, nearest_index};
use crate::raw::{normalize_longitude, RawField, RawGrid};
use crate::units::mixing_ratio_to_concentration;

/// A field after harmonisation.
#[derive(Debug)]
struct FieldData {
    units: String,
    values: Vec<f32>,
    /// Point-major copy: every lead time of one grid point is contiguous.
    point_major: OnceCell<Vec<f32>>,
}

/// Per-location pollutant series, each ordered by lead time.
pub type LocationSeries = BTreeMap<Pollutant, Vec<f32>>;

/// Single-level and model-level fields of one forecast run on a shared
/// axis set.
#[derive(Debug)]
pub struct AtmosphericGrid {
    base_time: DateTime<Utc>,
    lead_hours: Vec<u32>,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    fields: HashMap<GridField, FieldData>,
}

impl AtmosphericGrid {
    /// Build from the two raw grids of one forecast run.
    ///
    /// Longitudes are normalised first, then every mixing-ratio field is
    /// converted to mass concentration using surface pressure and
    /// model-level temperature.
    pub fn from_raw(mut single_level: RawGrid, mut model_level: RawGrid) -> GridResult<Self> {
        if single_level.base_time != model_level.base_time {
            return Err(GridError::AxisMismatch {
                axis: "base_time",
                detail: format!("{} vs {}", single_level.base_time, model_level.base_time),
            });
        }
        if single_level.lead_hours != model_level.lead_hours {
            return Err(GridError::AxisMismatch {
                axis: "lead_time",
                detail: format!(
                    "{:?} vs {:?}",
                    single_level.lead_hours, model_level.lead_hours
                ),
            });
        }
        if single_level.lead_hours.is_empty() {
            return Err(GridError::Shape("grid has no lead times".to_string()));
        }

        single_level.normalize_longitudes();
        model_level.normalize_longitudes();

        if single_level.latitudes != model_level.latitudes {
            return Err(GridError::AxisMismatch {
                axis: "latitude",
                detail: format!(
                    "{} vs {} points",
                    single_level.latitudes.len(),
                    model_level.latitudes.len()
                ),
            });
        }
        if single_level.longitudes != model_level.longitudes {
            return Err(GridError::AxisMismatch {
                axis: "longitude",
                detail: format!(
                    "{} vs {} points",
                    single_level.longitudes.len(),
                    model_level.longitudes.len()
                ),
            });
        }
        if single_level.latitudes.is_empty() || single_level.longitudes.is_empty() {
            return Err(GridError::Shape("grid has an empty spatial axis".to_string()));
        }

        let mut raw_fields: BTreeMap<GridField, RawField> = BTreeMap::new();
        for (level, grid) in [
            (GridLevel::SingleLevel, &mut single_level),
            (GridLevel::ModelLevel, &mut model_level),
        ] {
            for field in GridField::for_level(level) {
                let data = grid.fields.remove(&field).ok_or_else(|| GridError::MissingField {
                    field,
                    detail: format!("in {} grid", level),
                })?;
                raw_fields.insert(field, data);
            }
        }

        harmonise_units(&mut raw_fields)?;

        info!(
            base_time = %single_level.base_time,
            lead_times = single_level.lead_hours.len(),
            latitudes = single_level.latitudes.len(),
            longitudes = single_level.longitudes.len(),
            "Built atmospheric grid"
        );

        Ok(Self {
            base_time: single_level.base_time,
            lead_hours: single_level.lead_hours,
            latitudes: single_level.latitudes,
            longitudes: single_level.longitudes,
            fields: raw_fields
                .into_iter()
                .map(|(field, raw)| {
                    (
                        field,
                        FieldData {
                            units: raw.units,
                            values: raw.values,
                            point_major: OnceCell::new(),
                        },
                    )
                })
                .collect(),
        })
    }

    pub fn base_time(&self) -> DateTime<Utc> {
        self.base_time
    }

    pub fn lead_hours(&self) -> &[u32] {
        &self.lead_hours
    }

    /// Base time plus each lead time.
    pub fn valid_times(&self) -> Vec<DateTime<Utc>> {
        self.lead_hours
            .iter()
            .map(|&h| self.base_time + Duration::hours(h as i64))
            .collect()
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    /// Ascending, after [`normalize_longitude`].
    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    fn slice_len(&self) -> usize {
        self.latitudes.len() * self.longitudes.len()
    }

    fn field(&self, field: GridField) -> GridResult<&FieldData> {
        self.fields
            .get(&field)
            .ok_or_else(|| GridError::UnknownField(field.to_string()))
    }

    pub fn units(&self, field: GridField) -> GridResult<&str> {
        Ok(&self.field(field)?.units)
    }

    /// All values of a field, lead-time major then row-major.
    pub fn values(&self, field: GridField) -> GridResult<&[f32]> {
        Ok(&self.field(field)?.values)
    }

    /// One lead-time slice of a field, row-major.
    pub fn slice(&self, field: GridField, lead_index: usize) -> GridResult<&[f32]> {
        if lead_index >= self.lead_hours.len() {
            return Err(GridError::Shape(format!(
                "lead index {} out of {} lead times",
                lead_index,
                self.lead_hours.len()
            )));
        }
        let len = self.slice_len();
        let start = lead_index * len;
        Ok(&self.field(field)?.values[start..start + len])
    }

    /// Bilinearly interpolated series for each location and pollutant.
    ///
    /// The result is aligned with `locations`; each series has one value per
    /// lead time. Coordinates outside the grid clamp to its edge.
    pub fn series_for_locations(
        &self,
        locations: &[Location],
        pollutants: &[Pollutant],
    ) -> GridResult<Vec<LocationSeries>> {
        let positions: Vec<(f64, f64)> = locations
            .iter()
            .map(|location| self.fractional_position(location.latitude, location.longitude))
            .collect();

        let width = self.longitudes.len();
        let height = self.latitudes.len();
        let slice_len = self.slice_len();

        let mut result: Vec<LocationSeries> = vec![BTreeMap::new(); locations.len()];
        for &pollutant in pollutants {
            let data = &self.field(GridField::for_pollutant(pollutant))?.values;
            let per_location: Vec<Vec<f32>> = positions
                .par_iter()
                .map(|&(x, y)| {
                    data.chunks_exact(slice_len)
                        .map(|slice| bilinear_interpolate(slice, width, height, x, y))
                        .collect()
                })
                .collect();
            for (series, values) in result.iter_mut().zip(per_location) {
                series.insert(pollutant, values);
            }
        }

        debug!(
            locations = locations.len(),
            pollutants = pollutants.len(),
            "Interpolated location series"
        );
        Ok(result)
    }

    /// Nearest grid value in space and lead time.
    pub fn point_in_time(
        &self,
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
        field: GridField,
    ) -> GridResult<f32> {
        let data = self.field(field)?;
        let lead_count = self.lead_hours.len();
        let table = data
            .point_major
            .get_or_init(|| point_major_table(&data.values, lead_count, self.slice_len()));

        let row = nearest_index(&self.latitudes, latitude);
        let col = nearest_index(&self.longitudes, normalize_longitude(longitude));
        let lead = self.nearest_lead_index(timestamp);

        let point = row * self.longitudes.len() + col;
        Ok(table[point * lead_count + lead])
    }

    fn nearest_lead_index(&self, timestamp: DateTime<Utc>) -> usize {
        let offset_seconds = (timestamp - self.base_time).num_seconds();
        self.lead_hours
            .iter()
            .enumerate()
            .min_by_key(|&(_, &h)| (h as i64 * 3600 - offset_seconds).abs())
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// (column, row) fractional indices, clamped to the grid.
    fn fractional_position(&self, latitude: f64, longitude: f64) -> (f64, f64) {
        let x = axis_position(&self.longitudes, normalize_longitude(longitude));
        let y = axis_position(&self.latitudes, latitude);
        (x, y)
    }
}

fn point_major_table(values: &[f32], lead_count: usize, slice_len: usize) -> Vec<f32> {
    let mut table = vec![0.0_f32; values.len()];
    for (lead, slice) in values.chunks_exact(slice_len).enumerate() {
        for (point, &value) in slice.iter().enumerate() {
            table[point * lead_count + lead] = value;
        }
    }
    table
}

/// Convert every mixing-ratio field to mass concentration.
fn harmonise_units(fields: &mut BTreeMap<GridField, RawField>) -> GridResult<()> {
    let mixing_ratio: Vec<GridField> = fields
        .iter()
        .filter(|(_, raw)| raw.units == MIXING_RATIO_UNITS)
        .map(|(field, _)| *field)
        .collect();
    if mixing_ratio.is_empty() {
        return Ok(());
    }

    let surface_pressure = fields
        .get(&GridField::SurfacePressure)
        .map(|raw| raw.values.clone())
        .ok_or_else(|| GridError::MissingField {
            field: GridField::SurfacePressure,
            detail: "for mixing ratio conversion".to_string(),
        })?;
    let temperature = fields
        .get(&GridField::Temperature)
        .map(|raw| raw.values.clone())
        .ok_or_else(|| GridError::MissingField {
            field: GridField::Temperature,
            detail: "for mixing ratio conversion".to_string(),
        })?;

    for field in mixing_ratio {
        if let Some(raw) = fields.get_mut(&field) {
            mixing_ratio_to_concentration(&mut raw.values, &surface_pressure, &temperature);
            raw.units = CONCENTRATION_UNITS.to_string();
            debug!(field = %field, "Converted mixing ratio to mass concentration");
        }
    }
    Ok(())
}
