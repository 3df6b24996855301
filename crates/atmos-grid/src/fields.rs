//! Grid fields and the static GRIB parameter table.
//!
//! CAMS publishes its composition fields under the ECMWF local table
//! (discipline 192, category 210) while meteorological fields use the WMO
//! codes. Identification therefore needs the request level as well: WMO
//! `0/0/0` is temperature on model level 137 but is never requested on the
//! single-level grid.

use std::collections::HashSet;
use std::fmt;

use aq_common::Pollutant;

use crate::error::{GridError, GridResult};

/// Mass mixing ratio units as written in CAMS metadata.
pub const MIXING_RATIO_UNITS: &str = "kg kg**-1";

/// Mass concentration units.
pub const CONCENTRATION_UNITS: &str = "kg m**-3";

/// Model level used for near-surface chemistry.
pub const SURFACE_MODEL_LEVEL: u32 = 137;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridLevel {
    SingleLevel,
    ModelLevel,
}

impl fmt::Display for GridLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridLevel::SingleLevel => f.write_str("single-level"),
            GridLevel::ModelLevel => write!(f, "model-level-{}", SURFACE_MODEL_LEVEL),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GridField {
    Pm10,
    Pm2_5,
    SurfacePressure,
    WindU10,
    WindV10,
    NitrogenDioxide,
    Ozone,
    SulphurDioxide,
    Temperature,
}

/// (discipline, category, number) as found in GRIB2 sections 0 and 4.
pub type GribCode = (u8, u8, u8);

struct FieldSpec {
    field: GridField,
    level: GridLevel,
    short_name: &'static str,
    request_name: &'static str,
    units: &'static str,
    codes: &'static [GribCode],
}

static FIELD_TABLE: &[FieldSpec] = &[
    FieldSpec {
        field: GridField::Pm10,
        level: GridLevel::SingleLevel,
        short_name: "pm10",
        request_name: "particulate_matter_10um",
        units: CONCENTRATION_UNITS,
        codes: &[(192, 210, 74)],
    },
    FieldSpec {
        field: GridField::Pm2_5,
        level: GridLevel::SingleLevel,
        short_name: "pm2p5",
        request_name: "particulate_matter_2.5um",
        units: CONCENTRATION_UNITS,
        codes: &[(192, 210, 73)],
    },
    FieldSpec {
        field: GridField::SurfacePressure,
        level: GridLevel::SingleLevel,
        short_name: "sp",
        request_name: "surface_pressure",
        units: "Pa",
        codes: &[(0, 3, 0)],
    },
    FieldSpec {
        field: GridField::WindU10,
        level: GridLevel::SingleLevel,
        short_name: "u10",
        request_name: "10m_u_component_of_wind",
        units: "m s**-1",
        codes: &[(0, 2, 2)],
    },
    FieldSpec {
        field: GridField::WindV10,
        level: GridLevel::SingleLevel,
        short_name: "v10",
        request_name: "10m_v_component_of_wind",
        units: "m s**-1",
        codes: &[(0, 2, 3)],
    },
    FieldSpec {
        field: GridField::NitrogenDioxide,
        level: GridLevel::ModelLevel,
        short_name: "no2",
        request_name: "nitrogen_dioxide",
        units: MIXING_RATIO_UNITS,
        codes: &[(192, 210, 121)],
    },
    FieldSpec {
        field: GridField::Ozone,
        level: GridLevel::ModelLevel,
        short_name: "go3",
        request_name: "ozone",
        units: MIXING_RATIO_UNITS,
        codes: &[(192, 210, 203), (0, 14, 1)],
    },
    FieldSpec {
        field: GridField::SulphurDioxide,
        level: GridLevel::ModelLevel,
        short_name: "so2",
        request_name: "sulphur_dioxide",
        units: MIXING_RATIO_UNITS,
        codes: &[(192, 210, 122)],
    },
    FieldSpec {
        field: GridField::Temperature,
        level: GridLevel::ModelLevel,
        short_name: "t",
        request_name: "temperature",
        units: "K",
        codes: &[(0, 0, 0)],
    },
];

impl GridField {
    pub const ALL: [GridField; 9] = [
        GridField::Pm10,
        GridField::Pm2_5,
        GridField::SurfacePressure,
        GridField::WindU10,
        GridField::WindV10,
        GridField::NitrogenDioxide,
        GridField::Ozone,
        GridField::SulphurDioxide,
        GridField::Temperature,
    ];

    // FIELD_TABLE is ordered like the enum; validate_field_table checks it
    fn spec(&self) -> &'static FieldSpec {
        &FIELD_TABLE[*self as usize]
    }

    pub fn level(&self) -> GridLevel {
        self.spec().level
    }

    /// Short name used by the provider inside the decoded file.
    fn short_name(&self) -> &'static str {
        self.spec().short_name
    }

    /// Variable name used when requesting the field from the provider.
    pub fn request_name(&self) -> &'static str {
        self.spec().request_name
    }

    /// Units the provider delivers the field in.
    pub fn native_units(&self) -> &'static str {
        self.spec().units
    }

    pub fn grib_codes(&self) -> &'static [GribCode] {
        self.spec().codes
    }

    /// Fields requested for one level, in table order.
    pub fn for_level(level: GridLevel) -> Vec<GridField> {
        FIELD_TABLE
            .iter()
            .filter(|spec| spec.level == level)
            .map(|spec| spec.field)
            .collect()
    }

    /// Field a pollutant is read from.
    pub fn for_pollutant(pollutant: Pollutant) -> GridField {
        match pollutant {
            Pollutant::NitrogenDioxide => GridField::NitrogenDioxide,
            Pollutant::Ozone => GridField::Ozone,
            Pollutant::Pm10 => GridField::Pm10,
            Pollutant::Pm2_5 => GridField::Pm2_5,
            Pollutant::SulphurDioxide => GridField::SulphurDioxide,
        }
    }

    /// Identify a decoded submessage. Unknown parameters yield `None`.
    pub fn from_grib_parameter(
        discipline: u8,
        category: u8,
        number: u8,
        level: GridLevel,
    ) -> Option<GridField> {
        FIELD_TABLE
            .iter()
            .find(|spec| spec.level == level && spec.codes.contains(&(discipline, category, number)))
            .map(|spec| spec.field)
    }
}

impl fmt::Display for GridField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Check the static field table once at startup.
///
/// Every variant must own the table slot at its discriminant and carry at
/// least one GRIB code. Codes must be unique within a level and every
/// pollutant must map onto a field of its own.
pub fn validate_field_table() -> GridResult<()> {
    if FIELD_TABLE.len() != GridField::ALL.len() {
        return Err(GridError::UnknownField(format!(
            "field table has {} entries for {} fields",
            FIELD_TABLE.len(),
            GridField::ALL.len()
        )));
    }
    for (slot, field) in GridField::ALL.into_iter().enumerate() {
        if FIELD_TABLE[slot].field != field {
            return Err(GridError::UnknownField(format!(
                "{:?} is not at table slot {}",
                field, slot
            )));
        }
    }
    for field in GridField::ALL {
        let entries: Vec<&FieldSpec> = FIELD_TABLE.iter().filter(|s| s.field == field).collect();
        match entries.as_slice() {
            [spec] if !spec.codes.is_empty() => {}
            [_] => {
                return Err(GridError::UnknownField(format!(
                    "{:?} has no GRIB parameter codes",
                    field
                )))
            }
            _ => {
                return Err(GridError::UnknownField(format!(
                    "{:?} has {} table entries",
                    field,
                    entries.len()
                )))
            }
        }
    }

    let mut seen = HashSet::new();
    for spec in FIELD_TABLE {
        for code in spec.codes {
            if !seen.insert((spec.level, *code)) {
                return Err(GridError::UnknownField(format!(
                    "GRIB code {:?} mapped twice on {}",
                    code, spec.level
                )));
            }
        }
    }

    let mut pollutant_fields = HashSet::new();
    for pollutant in Pollutant::ALL {
        let field = GridField::for_pollutant(pollutant);
        if !pollutant_fields.insert(field) {
            return Err(GridError::UnknownField(format!(
                "{} shares grid field {:?} with another pollutant",
                pollutant, field
            )));
        }
    }

    Ok(())
}
