//! Steady-state plume trace written by the model as `final_plume.dat`.

mod parser;

use crate::domain::PlumeResult;
use crate::modules::serialization::{read_text_artifact, render_delimited_table};
use std::path::Path;

pub use parser::parse_trace_source;

/// Minimum number of columns a trace record must carry.
pub const TRACE_MIN_COLUMNS: usize = 15;

pub(crate) const HEIGHT_COLUMN: usize = 0;
pub(crate) const PRESSURE_COLUMN: usize = 1;
pub(crate) const VELOCITY_COLUMN: usize = 2;
pub(crate) const RADIUS_COLUMN: usize = 11;
pub(crate) const ENTRAINMENT_COLUMN: usize = 12;
pub(crate) const PLUME_TEMPERATURE_COLUMN: usize = 13;
pub(crate) const ENVIRONMENT_TEMPERATURE_COLUMN: usize = 14;

/// Labels used when the trace is archived.
pub const TRACE_COLUMN_LABELS: [&str; TRACE_MIN_COLUMNS] = [
    "height(km)",
    "press(hPa)",
    "W(M/S)",
    "T(C)",
    "T-TE(C)",
    "QV(g/kg)",
    "SAT(g/kg)",
    "QC(g/kg)",
    "QH(g/kg)",
    "QI(g/kg)",
    "Buoy(1e-2 m/s2)",
    "radius(km)",
    "dwdt_entr(unitless)",
    "plumeT(K)",
    "envT(K)",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PlumeLevel {
    pub height_km: f64,
    pub pressure_mb: f64,
    /// m/s
    pub vertical_velocity: f64,
    pub radius_km: f64,
    /// Fractional entrainment rate per unit height, 1/m.
    pub entrainment: f64,
    /// K
    pub plume_temperature: f64,
    /// K
    pub environment_temperature: f64,
    /// Every column of the source record, kept for archiving.
    pub record: Vec<f64>,
}

impl PlumeLevel {
    /// Builds a level from a full model record. Returns `None` when the record is too short.
    pub fn from_record(record: Vec<f64>) -> Option<Self> {
        if record.len() < TRACE_MIN_COLUMNS {
            return None;
        }
        Some(Self {
            height_km: record[HEIGHT_COLUMN],
            pressure_mb: record[PRESSURE_COLUMN],
            vertical_velocity: record[VELOCITY_COLUMN],
            radius_km: record[RADIUS_COLUMN],
            entrainment: record[ENTRAINMENT_COLUMN],
            plume_temperature: record[PLUME_TEMPERATURE_COLUMN],
            environment_temperature: record[ENVIRONMENT_TEMPERATURE_COLUMN],
            record,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlumeTrace {
    levels: Vec<PlumeLevel>,
}

impl PlumeTrace {
    pub fn new(levels: Vec<PlumeLevel>) -> Self {
        Self { levels }
    }

    pub fn read(path: &Path) -> PlumeResult<Self> {
        let source = read_text_artifact(path, "plume trace")?;
        parse_trace_source(&source)
    }

    pub fn levels(&self) -> &[PlumeLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.levels
            .iter()
            .map(|level| level.record.len())
            .max()
            .unwrap_or(TRACE_MIN_COLUMNS)
    }

    /// Renders the trace with a header row and 4-decimal values.
    pub fn render_labelled(&self) -> String {
        let header = (0..self.column_count())
            .map(|column| {
                TRACE_COLUMN_LABELS
                    .get(column)
                    .map_or_else(|| format!("col{}", column), |label| (*label).to_string())
            })
            .collect::<Vec<_>>();
        render_delimited_table(
            &header,
            self.levels.iter().map(|level| level.record.as_slice()),
            4,
        )
    }
}
