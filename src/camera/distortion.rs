use nalgebra::{Point2, Vector2};
use roots::SimpleConvergency;
use serde::{Deserialize, Serialize};

use crate::{CameraWrapperError, Result};

/// Radial optical distortion between the focal plane and the field angles
///
/// The field angle `θ` of a point at the distance `r` from the optical axis in the focal plane is
/// ```text
/// θ = ρ(1 + k1ρ² + k2ρ⁴ + ...), ρ = r/f
/// ```
/// with `f` the focal length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadialDistortion {
    /// Focal length in mm
    pub focal_length: f64,
    /// Radial polynomial coefficients `[k1, k2, ...]`
    pub coefficients: Vec<f64>,
}
impl RadialDistortion {
    pub fn new(focal_length: f64, coefficients: Vec<f64>) -> Self {
        Self {
            focal_length,
            coefficients,
        }
    }
    /// Distortion-free mapping
    pub fn paraxial(focal_length: f64) -> Self {
        Self::new(focal_length, vec![])
    }
    fn theta(&self, rho: f64) -> f64 {
        let rho2 = rho * rho;
        let (s, _) = self
            .coefficients
            .iter()
            .fold((1f64, 1f64), |(s, p), k| (s + k * p * rho2, p * rho2));
        rho * s
    }
    fn dtheta(&self, rho: f64) -> f64 {
        let rho2 = rho * rho;
        let (s, _) = self
            .coefficients
            .iter()
            .enumerate()
            .fold((1f64, 1f64), |(s, p), (i, k)| {
                (s + (2 * i + 3) as f64 * k * p * rho2, p * rho2)
            });
        s
    }
    /// Maps a focal plane point in mm into field angles in radians
    pub fn field_angle(&self, focal_plane: &Point2<f64>) -> Point2<f64> {
        let r = focal_plane.coords.norm();
        if r == 0f64 {
            return Point2::origin();
        }
        let theta = self.theta(r / self.focal_length);
        Point2::from(focal_plane.coords * (theta / r))
    }
    /// Maps field angles in radians into a focal plane point in mm
    pub fn focal_plane(&self, field_angle: &Point2<f64>) -> Result<Point2<f64>> {
        let theta = field_angle.coords.norm();
        if theta == 0f64 {
            return Ok(Point2::origin());
        }
        if self.coefficients.is_empty() {
            return Ok(Point2::from(field_angle.coords * self.focal_length));
        }
        let mut convergency = SimpleConvergency {
            eps: 1e-15f64,
            max_iter: 50,
        };
        let rho = roots::find_root_newton_raphson(
            theta,
            |rho| self.theta(rho) - theta,
            |rho| self.dtheta(rho),
            &mut convergency,
        )
        .map_err(|_| CameraWrapperError::Distortion(theta))?;
        // only the branch where θ increases with ρ maps back to the focal plane
        if rho < 0f64 || self.dtheta(rho) <= 0f64 {
            return Err(CameraWrapperError::Distortion(theta));
        }
        let direction: Vector2<f64> = field_angle.coords / theta;
        Ok(Point2::from(direction * (rho * self.focal_length)))
    }
}
