use crate::domain::{PlumeError, PlumeResult};
use std::fs;
use std::path::Path;

pub fn format_fixed_f64(value: f64, width: usize, precision: usize) -> String {
    format!(
        "{value:>width$.precision$}",
        width = width,
        precision = precision
    )
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

/// Renders a space-delimited table with a header row and fixed-point values.
pub fn render_delimited_table<R>(header: &[String], rows: R, precision: usize) -> String
where
    R: IntoIterator,
    R::Item: AsRef<[f64]>,
{
    let mut content = header.join(" ");
    content.push('\n');
    for row in rows {
        let line = row
            .as_ref()
            .iter()
            .map(|value| format!("{value:.precision$}", precision = precision))
            .collect::<Vec<_>>()
            .join(" ");
        content.push_str(&line);
        content.push('\n');
    }
    content
}

pub fn write_text_artifact(path: &Path, content: &str) -> PlumeResult<()> {
    fs::write(path, normalize_text_artifact(content)).map_err(|source| {
        PlumeError::io_system(
            "IO.ARTIFACT_WRITE",
            format!("failed to write artifact '{}': {}", path.display(), source),
        )
    })
}

pub fn read_text_artifact(path: &Path, artifact_name: &str) -> PlumeResult<String> {
    fs::read_to_string(path).map_err(|source| {
        PlumeError::io_system(
            "IO.ARTIFACT_READ",
            format!(
                "failed to read {} '{}': {}",
                artifact_name,
                path.display(),
                source
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{
        format_fixed_f64, normalize_text_artifact, read_text_artifact, render_delimited_table,
        write_text_artifact,
    };
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn fixed_width_float_formatting_is_deterministic() {
        let first = format_fixed_f64(1.23, 7, 1);
        let second = format_fixed_f64(1.23, 7, 1);

        assert_eq!(first, "    1.2");
        assert_eq!(first, second);
    }

    #[test]
    fn normalize_text_artifact_uses_canonical_line_endings() {
        let normalized = normalize_text_artifact("alpha\r\nbeta\rgamma");
        assert_eq!(normalized, "alpha\nbeta\ngamma\n");
    }

    #[test]
    fn delimited_table_uses_header_and_fixed_precision() {
        let header = vec!["height(mAGL)".to_string(), "detrain(unitless)".to_string()];
        let rows = vec![vec![50.0, 0.25], vec![150.0, 0.75]];
        let table = render_delimited_table(&header, &rows, 4);
        assert_eq!(
            table,
            "height(mAGL) detrain(unitless)\n50.0000 0.2500\n150.0000 0.7500\n"
        );
    }

    #[test]
    fn repeated_text_writes_produce_identical_bytes() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("artifact.dat");
        let input = "line 1\r\nline 2\rline 3";

        write_text_artifact(&path, input).expect("first write should succeed");
        let first = fs::read(&path).expect("artifact should be readable");

        write_text_artifact(&path, input).expect("second write should succeed");
        let second = fs::read(&path).expect("artifact should be readable");

        assert_eq!(first, second);
        assert_eq!(second, b"line 1\nline 2\nline 3\n");
    }

    #[test]
    fn missing_artifact_reports_io_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = read_text_artifact(&temp.path().join("absent.dat"), "plume trace")
            .expect_err("missing file should fail");
        assert_eq!(error.placeholder(), "IO.ARTIFACT_READ");
        assert!(error.message().contains("plume trace"));
    }
}
