use super::SoundingRecord;
use crate::common::constants::METERS_PER_SECOND_PER_KNOT;
use crate::domain::{PlumeError, PlumeResult};
use tracing::warn;

pub const WYOMING_HEADER_LINES: usize = 5;
pub const WYOMING_COLUMN_WIDTH: usize = 7;

// Wyoming listing column order: PRES HGHT TEMP DWPT RELH MIXR DRCT SKNT THTA ...
const WYOMING_PRES: usize = 0;
const WYOMING_HGHT: usize = 1;
const WYOMING_TEMP: usize = 2;
const WYOMING_DWPT: usize = 3;
const WYOMING_RELH: usize = 4;
const WYOMING_MIXR: usize = 5;
const WYOMING_DRCT: usize = 6;
const WYOMING_SKNT: usize = 7;
const WYOMING_THTA: usize = 8;

pub(super) fn parse_profile_source(source: &str) -> PlumeResult<Vec<SoundingRecord>> {
    let mut records = Vec::new();
    for (line_index, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let tokens = trimmed.split_whitespace().collect::<Vec<_>>();
        if tokens.len() != SoundingRecord::FIELD_COUNT {
            return Err(PlumeError::input_validation(
                "INPUT.SOUNDING_FIELDS",
                format!(
                    "sounding line {} has {} fields; expected {}",
                    line_index + 1,
                    tokens.len(),
                    SoundingRecord::FIELD_COUNT
                ),
            ));
        }

        let mut fields = [0.0; SoundingRecord::FIELD_COUNT];
        for (slot, token) in fields.iter_mut().zip(&tokens) {
            *slot = parse_number(token, line_index + 1)?;
        }
        records.push(SoundingRecord::from_fields(fields));
    }

    Ok(records)
}

pub(super) fn parse_wyoming_source(source: &str) -> PlumeResult<Vec<SoundingRecord>> {
    let mut records = Vec::new();
    let mut data_started = false;

    for (line_index, line) in source.lines().enumerate().skip(WYOMING_HEADER_LINES) {
        let line_number = line_index + 1;
        let leading_numeric = line
            .split_whitespace()
            .next()
            .is_some_and(|token| token.parse::<f64>().is_ok());
        if !leading_numeric {
            if data_started {
                break;
            }
            continue;
        }
        data_started = true;

        let mut raw = [0.0; SoundingRecord::FIELD_COUNT];
        let mut complete = true;
        for (column, slot) in raw.iter_mut().enumerate() {
            match fixed_width_field(line, column) {
                Some(token) => *slot = parse_number(token, line_number)?,
                None => {
                    complete = false;
                    break;
                }
            }
        }

        if !complete {
            warn!(
                line = line_number,
                "skipping sounding level with missing fields"
            );
            continue;
        }

        records.push(SoundingRecord {
            height: raw[WYOMING_HGHT],
            pressure: raw[WYOMING_PRES],
            temperature: raw[WYOMING_TEMP],
            relative_humidity: raw[WYOMING_RELH],
            dew_point: raw[WYOMING_DWPT],
            wind_direction: raw[WYOMING_DRCT],
            wind_speed: raw[WYOMING_SKNT] * METERS_PER_SECOND_PER_KNOT,
            potential_temperature: raw[WYOMING_THTA],
            mixing_ratio: raw[WYOMING_MIXR],
        });
    }

    Ok(records)
}

fn fixed_width_field(line: &str, column: usize) -> Option<&str> {
    let start = column * WYOMING_COLUMN_WIDTH;
    if start >= line.len() {
        return None;
    }
    let end = (start + WYOMING_COLUMN_WIDTH).min(line.len());
    let field = line.get(start..end)?.trim();
    (!field.is_empty()).then_some(field)
}

fn parse_number(token: &str, line_number: usize) -> PlumeResult<f64> {
    token.parse::<f64>().map_err(|source| {
        PlumeError::input_validation(
            "INPUT.SOUNDING_VALUE",
            format!(
                "invalid sounding value '{}' at line {}: {}",
                token, line_number, source
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_profile_source, parse_wyoming_source};

    const WYOMING_FIXTURE: &str = "\
72489 REV Reno Observations at 00Z 07 Sep 2020
-----------------------------------------------------------------------------
   PRES   HGHT   TEMP   DWPT   RELH   MIXR   DRCT   SKNT   THTA   THTE   THTV
    hPa     m      C      C      %    g/kg    deg   knot     K      K      K
-----------------------------------------------------------------------------
  861.0   1516   33.4   -2.6      9   3.77    230      8  319.5  331.6  320.2
  850.0   1623   31.2   -2.8     10   3.77    235     10  318.3  330.3  319.0
  800.0   2129   26.0   -3.0     10   3.80    240     14  318.1  330.0  318.8
  700.0   3179   15.8   -4.2     24   3.95    245     20  318.4  330.8  319.1

Station information and sounding indices
                         Station identifier: REV
";

    #[test]
    fn wyoming_listing_is_reordered_and_converted() {
        let records = parse_wyoming_source(WYOMING_FIXTURE).expect("listing should parse");
        assert_eq!(records.len(), 4);

        let surface = records[0];
        assert_eq!(surface.height, 1516.0);
        assert_eq!(surface.pressure, 861.0);
        assert_eq!(surface.temperature, 33.4);
        assert_eq!(surface.relative_humidity, 9.0);
        assert_eq!(surface.dew_point, -2.6);
        assert_eq!(surface.wind_direction, 230.0);
        assert!((surface.wind_speed - 8.0 * 0.514444).abs() < 1.0e-12);
        assert_eq!(surface.potential_temperature, 319.5);
        assert_eq!(surface.mixing_ratio, 3.77);
    }

    #[test]
    fn wyoming_rows_with_blank_fields_are_skipped() {
        let source = "\
h1
h2
h3
h4
h5
  861.0   1516   33.4   -2.6      9   3.77    230      8  319.5
  850.0   1623   31.2          10   3.77    235     10  318.3
  700.0   3179   15.8   -4.2     24   3.95    245     20  318.4
";
        let records = parse_wyoming_source(source).expect("listing should parse");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].height, 3179.0);
    }

    #[test]
    fn profile_rows_require_nine_fields() {
        let records = parse_profile_source(
            "# HGHT PRES TEMP RELH DWPT DRCT WIND THTA MIXR\n1516 861 33.4 9 -2.6 230 4.1 319.5 3.77\n",
        )
        .expect("profile should parse");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].wind_speed, 4.1);

        let error = parse_profile_source("1516 861 33.4 9 -2.6 230 4.1 319.5\n")
            .expect_err("eight fields should fail");
        assert_eq!(error.placeholder(), "INPUT.SOUNDING_FIELDS");
        assert!(error.message().contains("line 1"));
    }

    #[test]
    fn profile_rejects_non_numeric_tokens() {
        let error = parse_profile_source("1516 861 33.4 9 -2.6 230 calm 319.5 3.77\n")
            .expect_err("non-numeric should fail");
        assert_eq!(error.placeholder(), "INPUT.SOUNDING_VALUE");
    }
}
