use super::{PlumeLevel, PlumeTrace, TRACE_MIN_COLUMNS};
use crate::domain::{PlumeError, PlumeResult};

/// Parses a whitespace-delimited trace. Lines that do not start with a number
/// (the header row of an archived trace) are skipped.
pub fn parse_trace_source(source: &str) -> PlumeResult<PlumeTrace> {
    let mut levels = Vec::new();

    for (line_index, line) in source.lines().enumerate() {
        let line_number = line_index + 1;
        let mut tokens = line.split_whitespace().peekable();
        let Some(first) = tokens.peek() else {
            continue;
        };
        if first.parse::<f64>().is_err() {
            continue;
        }

        let record = tokens
            .map(|token| {
                token.parse::<f64>().map_err(|source| {
                    PlumeError::input_validation(
                        "INPUT.TRACE_VALUE",
                        format!(
                            "invalid plume trace value '{}' at line {}: {}",
                            token, line_number, source
                        ),
                    )
                })
            })
            .collect::<PlumeResult<Vec<_>>>()?;

        let column_count = record.len();
        let level = PlumeLevel::from_record(record).ok_or_else(|| {
            PlumeError::input_validation(
                "INPUT.TRACE_COLUMNS",
                format!(
                    "plume trace line {} has {} columns; expected at least {}",
                    line_number, column_count, TRACE_MIN_COLUMNS
                ),
            )
        })?;
        levels.push(level);
    }

    if levels.is_empty() {
        return Err(PlumeError::input_validation(
            "INPUT.TRACE_EMPTY",
            "plume trace contains no levels",
        ));
    }

    Ok(PlumeTrace::new(levels))
}
