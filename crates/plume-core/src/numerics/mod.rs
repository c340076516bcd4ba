pub mod interpolation;

pub use interpolation::{Boundary, linear_interpolate, resample};
