//! GRIB2 decoding into a [`RawGrid`].
//!
//! Each submessage is identified through the static field table, grouped
//! by lead time and decoded with the `grib` crate. Fields the table does
//! not know are skipped.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::error::{GridError, GridResult};
use crate::fields::{GridField, GridLevel};
use crate::raw::RawGrid;

/// Decoded values for one field at one lead time.
struct DecodedSlice {
    field: GridField,
    lead_hours: u32,
    values: Vec<f32>,
}

/// Decode an in-memory GRIB2 file.
pub fn decode_grib_bytes(
    data: &[u8],
    base_time: DateTime<Utc>,
    level: GridLevel,
) -> GridResult<RawGrid> {
    decode_grib(Cursor::new(data), base_time, level)
}

/// Decode a GRIB2 stream holding the fields of one grid level.
#[instrument(skip_all, fields(base_time = %base_time, level = %level))]
pub fn decode_grib<R: Read + Seek>(
    reader: R,
    base_time: DateTime<Utc>,
    level: GridLevel,
) -> GridResult<RawGrid> {
    let grib_file = grib::from_reader(reader).map_err(|e| GridError::Decode(e.to_string()))?;

    let mut slices = Vec::new();
    let mut axes: Option<(Vec<f64>, Vec<f64>)> = None;
    let mut skipped = 0usize;

    for ((message_index, submessage_index), submsg) in grib_file.iter() {
        let discipline = submsg.indicator().discipline;
        let prod_def = submsg.prod_def();
        let (Some(category), Some(number)) =
            (prod_def.parameter_category(), prod_def.parameter_number())
        else {
            skipped += 1;
            continue;
        };
        let Some(field) = GridField::from_grib_parameter(discipline, category, number, level)
        else {
            debug!(
                message_index,
                submessage_index, discipline, category, number, "Skipping unknown GRIB parameter"
            );
            skipped += 1;
            continue;
        };
        let lead_hours = prod_def.forecast_time().map(|t| t.value).unwrap_or(0);

        let (width, height) = submsg
            .grid_shape()
            .map_err(|e| GridError::Decode(format!("{} grid shape: {}", field, e)))?;
        match &axes {
            Some((lats, lons)) if lats.len() != height || lons.len() != width => {
                return Err(GridError::AxisMismatch {
                    axis: "grid",
                    detail: format!(
                        "{} at +{}h is {}x{}, expected {}x{}",
                        field,
                        lead_hours,
                        width,
                        height,
                        lons.len(),
                        lats.len()
                    ),
                });
            }
            Some(_) => {}
            None => {
                let points: Vec<(f32, f32)> = submsg
                    .latlons()
                    .map_err(|e| GridError::Decode(format!("{} coordinates: {}", field, e)))?
                    .collect();
                axes = Some(axes_from_points(&points, width, height)?);
            }
        }

        let decoder = grib::Grib2SubmessageDecoder::from(submsg)
            .map_err(|e| GridError::Decode(format!("{} decoder: {}", field, e)))?;
        let values: Vec<f32> = decoder
            .dispatch()
            .map_err(|e| GridError::Decode(format!("{} values: {}", field, e)))?
            .collect();

        slices.push(DecodedSlice {
            field,
            lead_hours,
            values,
        });
    }

    let (latitudes, longitudes) =
        axes.ok_or_else(|| GridError::Decode(format!("no known fields in {} file", level)))?;
    let grid = assemble(base_time, level, latitudes, longitudes, slices)?;

    info!(
        fields = grid.fields.len(),
        lead_times = grid.lead_hours.len(),
        skipped,
        "Decoded GRIB file"
    );
    Ok(grid)
}

/// Recover the 1-D axes of a regular grid scanned longitude-fastest.
fn axes_from_points(
    points: &[(f32, f32)],
    width: usize,
    height: usize,
) -> GridResult<(Vec<f64>, Vec<f64>)> {
    if width == 0 || height == 0 || points.len() != width * height {
        return Err(GridError::Shape(format!(
            "{} coordinates for a {}x{} grid",
            points.len(),
            width,
            height
        )));
    }
    let longitudes = points[..width].iter().map(|&(_, lon)| lon as f64).collect();
    let latitudes = points
        .iter()
        .step_by(width)
        .map(|&(lat, _)| lat as f64)
        .collect();
    Ok((latitudes, longitudes))
}

/// Order decoded slices by lead time and stack each field.
fn assemble(
    base_time: DateTime<Utc>,
    level: GridLevel,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    slices: Vec<DecodedSlice>,
) -> GridResult<RawGrid> {
    let mut by_field: BTreeMap<GridField, BTreeMap<u32, Vec<f32>>> = BTreeMap::new();
    for slice in slices {
        by_field
            .entry(slice.field)
            .or_default()
            .insert(slice.lead_hours, slice.values);
    }

    let mut lead_hours: Vec<u32> = by_field
        .values()
        .flat_map(|leads| leads.keys().copied())
        .collect();
    lead_hours.sort_unstable();
    lead_hours.dedup();

    let mut grid = RawGrid::new(base_time, level, lead_hours, latitudes, longitudes);
    for (field, mut leads) in by_field {
        let mut values = Vec::with_capacity(grid.field_len());
        for lead in &grid.lead_hours {
            let slice = leads.remove(lead).ok_or_else(|| GridError::MissingField {
                field,
                detail: format!("at lead time +{}h", lead),
            })?;
            values.extend(slice);
        }
        grid.insert_field(field, field.native_units(), values)?;
    }
    Ok(grid)
}
