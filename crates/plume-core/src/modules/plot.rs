//! Quick-look SVG chart of a detrainment profile.

use crate::domain::PlumeResult;
use crate::modules::detrainment::DetrainmentProfile;
use crate::modules::serialization::write_text_artifact;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const WIDTH: f64 = 600.0;
const HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 70.0;
const TICK_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisRange {
    min: f64,
    max: f64,
}

impl AxisRange {
    fn spanning(values: impl Iterator<Item = f64>, floor_at_zero: bool) -> Self {
        let (mut min, mut max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if floor_at_zero {
            min = min.min(0.0);
        }
        if !min.is_finite() || !max.is_finite() {
            return Self { min: 0.0, max: 1.0 };
        }
        if max <= min {
            max = min + 1.0;
        }
        Self { min, max }
    }

    fn fraction(&self, value: f64) -> f64 {
        (value - self.min) / (self.max - self.min)
    }

    fn ticks(&self) -> impl Iterator<Item = f64> + '_ {
        (0..=TICK_COUNT)
            .map(move |index| self.min + (self.max - self.min) * index as f64 / TICK_COUNT as f64)
    }
}

pub fn plot_path(run_directory: &Path, run_id: &str) -> PathBuf {
    run_directory.join(format!("{}.svg", run_id))
}

/// Detrainment on x, height on y, titled with the run id.
pub fn render_profile_svg(run_id: &str, profile: &DetrainmentProfile) -> String {
    let x_axis = AxisRange::spanning(profile.levels().iter().map(|level| level.weight), true);
    let y_axis = AxisRange::spanning(profile.levels().iter().map(|level| level.height), false);
    let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let to_x = |value: f64| MARGIN_LEFT + x_axis.fraction(value) * plot_width;
    let to_y = |value: f64| MARGIN_TOP + (1.0 - y_axis.fraction(value)) * plot_height;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="30" font-size="16" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        escape_xml(run_id)
    );

    for tick in x_axis.ticks() {
        let x = to_x(tick);
        let _ = writeln!(
            svg,
            r##"<line x1="{x:.1}" y1="{MARGIN_TOP:.1}" x2="{x:.1}" y2="{:.1}" stroke="#808080" stroke-dasharray="4 4" stroke-opacity="0.5"/>"##,
            MARGIN_TOP + plot_height
        );
        let _ = writeln!(
            svg,
            r#"<text x="{x:.1}" y="{:.1}" font-size="11" text-anchor="middle">{tick:.3}</text>"#,
            MARGIN_TOP + plot_height + 18.0
        );
    }
    for tick in y_axis.ticks() {
        let y = to_y(tick);
        let _ = writeln!(
            svg,
            r##"<line x1="{MARGIN_LEFT:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#808080" stroke-dasharray="4 4" stroke-opacity="0.5"/>"##,
            MARGIN_LEFT + plot_width
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end">{tick:.0}</text>"#,
            MARGIN_LEFT - 8.0,
            y + 4.0
        );
    }

    let _ = writeln!(
        svg,
        r#"<rect x="{MARGIN_LEFT:.1}" y="{MARGIN_TOP:.1}" width="{plot_width:.1}" height="{plot_height:.1}" fill="none" stroke="black"/>"#
    );

    let points = profile
        .levels()
        .iter()
        .map(|level| format!("{:.2},{:.2}", to_x(level.weight), to_y(level.height)))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = writeln!(
        svg,
        r#"<polyline points="{points}" fill="none" stroke="blue" stroke-width="1.5"/>"#
    );

    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-size="14" text-anchor="middle">Detrainment (unitless)</text>"#,
        MARGIN_LEFT + plot_width / 2.0,
        HEIGHT - 20.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="20" y="{0:.1}" font-size="14" text-anchor="middle" transform="rotate(-90 20 {0:.1})">Height (m AGL)</text>"#,
        MARGIN_TOP + plot_height / 2.0
    );
    svg.push_str("</svg>\n");
    svg
}

pub fn write_profile_plot(
    run_directory: &Path,
    run_id: &str,
    profile: &DetrainmentProfile,
) -> PlumeResult<PathBuf> {
    let path = plot_path(run_directory, run_id);
    write_text_artifact(&path, &render_profile_svg(run_id, profile))?;
    Ok(path)
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{AxisRange, escape_xml, render_profile_svg, write_profile_plot};
    use crate::domain::TargetHeights;
    use crate::modules::detrainment::compute_detrainment_profile;
    use crate::modules::trace::{PlumeLevel, PlumeTrace};
    use tempfile::TempDir;

    fn profile() -> crate::modules::detrainment::DetrainmentProfile {
        let levels = [(0.0, 6.0), (0.1, 4.0), (0.2, 2.0), (0.3, 0.5)]
            .into_iter()
            .map(|(height_km, velocity)| {
                let mut record = vec![0.0; 15];
                record[0] = height_km;
                record[1] = 880.0;
                record[2] = velocity;
                record[11] = 0.3;
                record[12] = -1.0e-3;
                record[13] = 305.0;
                record[14] = 300.0;
                PlumeLevel::from_record(record).expect("record is long enough")
            })
            .collect();
        compute_detrainment_profile(&PlumeTrace::new(levels), &TargetHeights::Native)
            .expect("profile should compute")
    }

    #[test]
    fn svg_has_title_axes_and_one_line() {
        let svg = render_profile_svg("fire <A&B>", &profile());
        assert!(svg.starts_with("<svg "));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("fire &lt;A&amp;B&gt;"));
        assert!(svg.contains("Detrainment (unitless)"));
        assert!(svg.contains("Height (m AGL)"));
        assert!(svg.contains("stroke-dasharray=\"4 4\""));
        assert_eq!(svg.matches("<polyline").count(), 1);
    }

    #[test]
    fn plot_is_named_after_the_run() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = write_profile_plot(temp.path(), "case_a", &profile()).expect("plot writes");
        assert_eq!(path, temp.path().join("case_a.svg"));
        assert!(path.is_file());
    }

    #[test]
    fn degenerate_ranges_are_widened() {
        let axis = AxisRange::spanning([5.0, 5.0].into_iter(), false);
        assert_eq!(axis.min, 5.0);
        assert_eq!(axis.max, 6.0);
        assert_eq!(AxisRange::spanning(std::iter::empty(), true).max, 1.0);
        assert_eq!(escape_xml("a\"b"), "a&quot;b");
    }
}
