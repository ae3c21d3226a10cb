use nalgebra::{Point3, Vector3};

/// Reads the point for locus `index` out of a flat `[x0, y0, z0, x1, ...]` array.
#[inline]
pub fn point_at(coords: &[f64], index: usize) -> Point3<f64> {
    let base = index * 3;
    Point3::new(coords[base], coords[base + 1], coords[base + 2])
}

/// Vector from locus `j` to locus `i`.
#[inline]
pub fn displacement(coords: &[f64], i: usize, j: usize) -> Vector3<f64> {
    point_at(coords, i) - point_at(coords, j)
}

#[inline]
pub fn squared_distance(coords: &[f64], i: usize, j: usize) -> f64 {
    displacement(coords, i, j).norm_squared()
}

#[inline]
pub fn distance(coords: &[f64], i: usize, j: usize) -> f64 {
    squared_distance(coords, i, j).sqrt()
}

/// Centroid of all points in a flat coordinate array.
pub fn centroid(coords: &[f64]) -> Option<Point3<f64>> {
    let n = coords.len() / 3;
    if n == 0 {
        return None;
    }
    let sum = (0..n).fold(Vector3::zeros(), |acc, i| acc + point_at(coords, i).coords);
    Some(Point3::from(sum / n as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn point_at_reads_row_major_triplets() {
        let coords = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(point_at(&coords, 1), Point3::new(3.0, 4.0, 5.0));
    }

    #[test]
    fn distance_between_points_is_euclidean() {
        let coords = [0.0, 0.0, 0.0, 3.0, 4.0, 0.0];
        assert!((squared_distance(&coords, 0, 1) - 25.0).abs() < TOLERANCE);
        assert!((distance(&coords, 1, 0) - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn displacement_points_from_second_to_first() {
        let coords = [1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        assert_eq!(displacement(&coords, 0, 1), Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn centroid_of_empty_array_is_none() {
        assert!(centroid(&[]).is_none());
        let c = centroid(&[0.0, 0.0, 0.0, 2.0, 4.0, 6.0]).unwrap();
        assert_eq!(c, Point3::new(1.0, 2.0, 3.0));
    }
}
