//! One-dimensional piecewise-linear interpolation over monotonic abscissae.

/// What to do with targets that fall outside `[xs[0], xs[n-1]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Continue the end segment's line.
    Extrapolate,
    /// Hold the end value.
    Clamp,
}

/// Interpolate `ys(xs)` at `target_x`.
///
/// Assumes `xs` is strictly increasing. Returns `None` when the slices are empty or of
/// different lengths.
pub fn linear_interpolate(xs: &[f64], ys: &[f64], target_x: f64, boundary: Boundary) -> Option<f64> {
    if xs.is_empty() || xs.len() != ys.len() {
        return None;
    }

    let last = xs.len() - 1;
    if last == 0 {
        return Some(ys[0]);
    }

    let upper = xs.partition_point(|x| *x < target_x);
    if upper <= last && xs[upper] == target_x {
        return Some(ys[upper]);
    }

    let (i0, i1) = match upper {
        0 => match boundary {
            Boundary::Clamp => return Some(ys[0]),
            Boundary::Extrapolate => (0, 1),
        },
        index if index > last => match boundary {
            Boundary::Clamp => return Some(ys[last]),
            Boundary::Extrapolate => (last - 1, last),
        },
        index => (index - 1, index),
    };

    Some(linear_interp(target_x, xs[i0], xs[i1], ys[i0], ys[i1]))
}

/// Interpolate `ys(xs)` at each of `targets`.
pub fn resample(xs: &[f64], ys: &[f64], targets: &[f64], boundary: Boundary) -> Option<Vec<f64>> {
    targets
        .iter()
        .map(|target| linear_interpolate(xs, ys, *target, boundary))
        .collect()
}

#[inline]
fn linear_interp(x_val: f64, x1: f64, x2: f64, y1: f64, y2: f64) -> f64 {
    debug_assert!(x1 != x2);
    let run = x2 - x1;
    let rise = y2 - y1;
    let dx = x_val - x1;
    y1 + rise / run * dx
}
