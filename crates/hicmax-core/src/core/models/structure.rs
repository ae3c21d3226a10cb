use crate::core::utils::geometry;
use nalgebra::Point3;
use rand::Rng;

/// Edge length of the cube random initial coordinates are drawn from.
pub const INITIAL_SPREAD: f64 = 0.1;

/// A 3D configuration: `3n` coordinates, three per locus, row-major by index.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    coords: Vec<f64>,
}

impl Structure {
    pub fn zeros(num_points: usize) -> Self {
        Self {
            coords: vec![0.0; num_points * 3],
        }
    }

    /// Wraps a flat coordinate vector. Returns `None` unless its length is a
    /// multiple of three.
    pub fn from_coords(coords: Vec<f64>) -> Option<Self> {
        (coords.len() % 3 == 0).then_some(Self { coords })
    }

    /// Draws every coordinate uniformly from `[0, INITIAL_SPREAD)`.
    pub fn random<R: Rng + ?Sized>(num_points: usize, rng: &mut R) -> Self {
        let coords = (0..num_points * 3)
            .map(|_| rng.gen_range(0.0..INITIAL_SPREAD))
            .collect();
        Self { coords }
    }

    pub fn num_points(&self) -> usize {
        self.coords.len() / 3
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    pub fn coords_mut(&mut self) -> &mut [f64] {
        &mut self.coords
    }

    pub fn into_coords(self) -> Vec<f64> {
        self.coords
    }

    pub fn point(&self, index: usize) -> Option<Point3<f64>> {
        (index < self.num_points()).then(|| geometry::point_at(&self.coords, index))
    }

    pub fn points(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        (0..self.num_points()).map(|i| geometry::point_at(&self.coords, i))
    }

    pub fn distance(&self, i: usize, j: usize) -> f64 {
        geometry::distance(&self.coords, i, j)
    }

    /// Translates the structure so its centroid sits at the origin.
    pub fn center(&mut self) {
        let Some(centroid) = geometry::centroid(&self.coords) else {
            return;
        };
        for point in self.coords.chunks_exact_mut(3) {
            point[0] -= centroid.x;
            point[1] -= centroid.y;
            point[2] -= centroid.z;
        }
    }
}
