//! Atmospheric sounding ingest and the fixed-width profile the plume model reads.

mod parser;

use crate::domain::{PlumeError, PlumeResult};
use crate::modules::serialization::{format_fixed_f64, read_text_artifact};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

pub use parser::{WYOMING_COLUMN_WIDTH, WYOMING_HEADER_LINES};

/// Column width of every field in `env_met_input.dat`.
pub const MET_INPUT_WIDTH: usize = 7;

/// One sounding level in the column order the plume model expects:
/// HGHT PRES TEMP RELH DWPT DRCT WIND THTA MIXR.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoundingRecord {
    /// Height above sea level, m.
    pub height: f64,
    /// hPa
    pub pressure: f64,
    /// °C
    pub temperature: f64,
    /// %
    pub relative_humidity: f64,
    /// °C
    pub dew_point: f64,
    /// Degrees
    pub wind_direction: f64,
    /// m/s
    pub wind_speed: f64,
    /// K
    pub potential_temperature: f64,
    /// g/kg
    pub mixing_ratio: f64,
}

impl SoundingRecord {
    pub const FIELD_COUNT: usize = 9;

    pub const fn from_fields(fields: [f64; Self::FIELD_COUNT]) -> Self {
        Self {
            height: fields[0],
            pressure: fields[1],
            temperature: fields[2],
            relative_humidity: fields[3],
            dew_point: fields[4],
            wind_direction: fields[5],
            wind_speed: fields[6],
            potential_temperature: fields[7],
            mixing_ratio: fields[8],
        }
    }

    pub const fn fields(&self) -> [f64; Self::FIELD_COUNT] {
        [
            self.height,
            self.pressure,
            self.temperature,
            self.relative_humidity,
            self.dew_point,
            self.wind_direction,
            self.wind_speed,
            self.potential_temperature,
            self.mixing_ratio,
        ]
    }

    /// Renders the record as one line of `env_met_input.dat`.
    ///
    /// Height and pressure are truncated toward zero to integers.
    pub fn met_input_line(&self) -> String {
        let integral = [self.height, self.pressure]
            .into_iter()
            .map(|value| format!("{:>width$}", value.trunc() as i64, width = MET_INPUT_WIDTH));
        let decimal = self.fields()[2..]
            .iter()
            .map(|value| format_fixed_f64(*value, MET_INPUT_WIDTH, 1))
            .collect::<Vec<_>>();
        integral.chain(decimal).collect::<Vec<_>>().join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundingFormat {
    /// Nine whitespace-separated columns already in model order, winds in m/s.
    #[default]
    Profile,
    /// University of Wyoming text listing, winds in knots.
    Wyoming,
}

impl SoundingFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Wyoming => "wyoming",
        }
    }
}

impl Display for SoundingFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for SoundingFormat {
    type Err = PlumeError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_lowercase().as_str() {
            "profile" => Ok(Self::Profile),
            "wyoming" => Ok(Self::Wyoming),
            other => Err(PlumeError::input_validation(
                "INPUT.SOUNDING_FORMAT",
                format!(
                    "unknown sounding format '{}'; expected 'profile' or 'wyoming'",
                    other
                ),
            )),
        }
    }
}

/// Height-ordered sounding. Construction guarantees at least one record, finite
/// fields, and strictly increasing height.
#[derive(Debug, Clone, PartialEq)]
pub struct Sounding {
    records: Vec<SoundingRecord>,
}

impl Sounding {
    pub fn new(records: Vec<SoundingRecord>) -> PlumeResult<Self> {
        if records.is_empty() {
            return Err(PlumeError::input_validation(
                "INPUT.SOUNDING_EMPTY",
                "sounding contains no records",
            ));
        }

        for (index, record) in records.iter().enumerate() {
            if record.fields().iter().any(|value| !value.is_finite()) {
                return Err(PlumeError::input_validation(
                    "INPUT.SOUNDING_VALUE",
                    format!("sounding record {} contains a non-finite value", index),
                ));
            }
        }

        if let Some(index) = records
            .windows(2)
            .position(|pair| pair[1].height <= pair[0].height)
        {
            return Err(PlumeError::input_validation(
                "INPUT.SOUNDING_ORDER",
                format!(
                    "sounding heights must be strictly increasing; {} m follows {} m at record {}",
                    records[index + 1].height,
                    records[index].height,
                    index + 1
                ),
            ));
        }

        Ok(Self { records })
    }

    pub fn from_source(source: &str, format: SoundingFormat) -> PlumeResult<Self> {
        let records = match format {
            SoundingFormat::Profile => parser::parse_profile_source(source)?,
            SoundingFormat::Wyoming => parser::parse_wyoming_source(source)?,
        };
        Self::new(records)
    }

    pub fn read(path: &Path, format: SoundingFormat) -> PlumeResult<Self> {
        let source = read_text_artifact(path, "sounding")?;
        Self::from_source(&source, format)
    }

    pub fn records(&self) -> &[SoundingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Height of the lowest level, m ASL. The plume model takes this as its ground level.
    pub fn surface_height(&self) -> f64 {
        self.records[0].height
    }

    pub fn render_met_input(&self) -> String {
        let mut content = String::with_capacity(self.records.len() * 72);
        for record in &self.records {
            content.push_str(&record.met_input_line());
            content.push('\n');
        }
        content
    }
}

#[cfg(test)]
mod tests {
    use super::{Sounding, SoundingFormat, SoundingRecord};
    use crate::domain::PlumeErrorCategory;

    fn record(height: f64, pressure: f64) -> SoundingRecord {
        SoundingRecord::from_fields([height, pressure, 20.3, 45.0, 8.1, 270.0, 5.2, 300.4, 6.7])
    }

    #[test]
    fn met_input_line_uses_fixed_width_columns() {
        let line = record(1234.9, 850.7).met_input_line();
        assert_eq!(
            line,
            "   1234     850    20.3    45.0     8.1   270.0     5.2   300.4     6.7"
        );
        assert_eq!(line.len(), 9 * 7 + 8);
    }

    #[test]
    fn heights_must_strictly_increase() {
        let error = Sounding::new(vec![record(1000.0, 900.0), record(1000.0, 890.0)])
            .expect_err("repeated height should fail");
        assert_eq!(error.placeholder(), "INPUT.SOUNDING_ORDER");
        assert_eq!(error.category(), PlumeErrorCategory::InputValidationError);
    }

    #[test]
    fn empty_and_non_finite_soundings_are_rejected() {
        assert_eq!(
            Sounding::new(Vec::new())
                .expect_err("empty should fail")
                .placeholder(),
            "INPUT.SOUNDING_EMPTY"
        );
        assert_eq!(
            Sounding::new(vec![record(f64::NAN, 900.0)])
                .expect_err("NaN should fail")
                .placeholder(),
            "INPUT.SOUNDING_VALUE"
        );
    }

    #[test]
    fn render_met_input_emits_one_line_per_record() {
        let sounding = Sounding::new(vec![record(500.0, 950.0), record(1500.0, 850.0)])
            .expect("sounding should build");
        let rendered = sounding.render_met_input();
        assert_eq!(rendered.lines().count(), 2);
        assert!(rendered.starts_with("    500     950"));
        assert_eq!(sounding.surface_height(), 500.0);
    }

    #[test]
    fn format_tokens_parse_case_insensitively() {
        assert_eq!("Wyoming".parse::<SoundingFormat>().ok(), Some(SoundingFormat::Wyoming));
        assert_eq!("profile".parse::<SoundingFormat>().ok(), Some(SoundingFormat::Profile));
        assert!("csv".parse::<SoundingFormat>().is_err());
    }
}
