use nalgebra::{Matrix2, Point2, Rotation2, Vector2};

use super::RadialDistortion;
use crate::Result;

/// Invertible affine map `p -> Mp + t`
#[derive(Debug, Clone, PartialEq)]
pub struct Affine {
    linear: Matrix2<f64>,
    translation: Vector2<f64>,
    inverse_linear: Matrix2<f64>,
}
impl Affine {
    /// Returns `None` if `linear` is singular
    pub fn new(linear: Matrix2<f64>, translation: Vector2<f64>) -> Option<Self> {
        linear.try_inverse().map(|inverse_linear| Self {
            linear,
            translation,
            inverse_linear,
        })
    }
    /// Scaling by a non-zero factor
    pub fn scaling(scale: f64) -> Option<Self> {
        Self::new(Matrix2::from_diagonal_element(scale), Vector2::zeros())
    }
    /// Focal plane (mm) to pixel map of a detector
    ///
    /// The focal plane point `center` maps to the pixel `center_pixel` and
    /// the pixel grid is rotated by `yaw` radians with respect to the focal plane axes
    pub fn focal_plane_to_pixels(
        center: Point2<f64>,
        center_pixel: Point2<f64>,
        pixel_size: f64,
        yaw: f64,
    ) -> Option<Self> {
        let linear = Rotation2::new(-yaw).into_inner() / pixel_size;
        let translation = center_pixel.coords - linear * center.coords;
        Self::new(linear, translation)
    }
    pub fn forward(&self, p: &Point2<f64>) -> Point2<f64> {
        Point2::from(self.linear * p.coords + self.translation)
    }
    pub fn inverse(&self, p: &Point2<f64>) -> Point2<f64> {
        Point2::from(self.inverse_linear * (p.coords - self.translation))
    }
    fn inverted(&self) -> Self {
        Self {
            linear: self.inverse_linear,
            translation: -self.inverse_linear * self.translation,
            inverse_linear: self.linear,
        }
    }
}

/// A single step of a [Transform]
#[derive(Debug, Clone, PartialEq)]
pub enum Mapping {
    Affine(Affine),
    /// Focal plane to field angles
    Distortion(RadialDistortion),
    /// Field angles to focal plane
    InverseDistortion(RadialDistortion),
}
impl Mapping {
    fn apply(&self, p: &Point2<f64>) -> Result<Point2<f64>> {
        match self {
            Mapping::Affine(affine) => Ok(affine.forward(p)),
            Mapping::Distortion(distortion) => Ok(distortion.field_angle(p)),
            Mapping::InverseDistortion(distortion) => distortion.focal_plane(p),
        }
    }
    fn inverted(&self) -> Self {
        match self {
            Mapping::Affine(affine) => Mapping::Affine(affine.inverted()),
            Mapping::Distortion(distortion) => Mapping::InverseDistortion(distortion.clone()),
            Mapping::InverseDistortion(distortion) => Mapping::Distortion(distortion.clone()),
        }
    }
}

/// Mapping between two camera coordinate systems
///
/// A transform is a chain of [Mapping]s applied in order by [Transform::apply_forward]
/// and in reverse order by [Transform::apply_inverse]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transform {
    steps: Vec<Mapping>,
}
impl Transform {
    pub fn identity() -> Self {
        Default::default()
    }
    pub fn from_mapping(mapping: Mapping) -> Self {
        Self {
            steps: vec![mapping],
        }
    }
    /// Appends `other` after `self`
    pub fn then(mut self, other: Transform) -> Self {
        self.steps.extend(other.steps);
        self
    }
    pub fn inverse(&self) -> Self {
        Self {
            steps: self.steps.iter().rev().map(Mapping::inverted).collect(),
        }
    }
    pub fn apply_forward(&self, p: &Point2<f64>) -> Result<Point2<f64>> {
        self.steps.iter().try_fold(*p, |p, step| step.apply(&p))
    }
    pub fn apply_inverse(&self, p: &Point2<f64>) -> Result<Point2<f64>> {
        self.inverse().apply_forward(p)
    }
    pub fn apply_forward_list(&self, points: &[Point2<f64>]) -> Result<Vec<Point2<f64>>> {
        points.iter().map(|p| self.apply_forward(p)).collect()
    }
}
