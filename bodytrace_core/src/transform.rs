//! Rigid-body offsets for externally supplied points.

use nalgebra::{Isometry3, Point3};

/// Re-expresses `points` through `transform`, preserving order.
pub fn apply(transform: &Isometry3<f64>, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    points.iter().map(|p| transform * p).collect()
}

/// In-place variant of [`apply`].
pub fn apply_in_place(transform: &Isometry3<f64>, points: &mut [Point3<f64>]) {
    for p in points.iter_mut() {
        *p = transform * *p;
    }
}
