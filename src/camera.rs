//!
//! # Camera geometry
//!
//! The camera geometry provides, for each detector, its bounding box, its center and corners
//! in the focal plane and the transforms between the camera coordinate systems.
//! Any detector layout can be wrapped by implementing [CameraGeometry];
//! [Camera] is a layout of flat detectors behind a single radial distortion,
//! built with [CameraBuilder].
//!
//! # Examples
//!
//! ```
//! use imsim_camera::{Builder, CameraBuilder, CameraGeometry, CoordSys, Detector};
//! let camera = CameraBuilder::lsst().build().unwrap();
//! let detector = camera.detector("R:2,2 S:1,1").unwrap();
//! let pixel = detector
//!     .transform(CoordSys::FocalPlane, CoordSys::Pixels)
//!     .apply_forward(&detector.center())
//!     .unwrap();
//! assert!((pixel.x - 2035.5).abs() < 1e-9);
//! ```

use std::{collections::HashMap, sync::Arc};

use nalgebra::Point2;

use crate::{geom::Box2I, CameraWrapperError, Result};

mod builder;
mod distortion;
mod transform;

pub use builder::{CameraBuilder, CameraBuilderError, DetectorBuilder};
pub use distortion::RadialDistortion;
pub use transform::{Affine, Mapping, Transform};

/// Camera coordinate systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordSys {
    /// Focal plane in mm
    FocalPlane,
    /// Detector pixels
    Pixels,
    /// Detector pixels with the radial distortion removed
    TanPixels,
    /// Field angles in radians
    FieldAngle,
}

/// Detector geometry interface
pub trait Detector {
    fn name(&self) -> &str;
    /// Pixel bounding box
    fn bbox(&self) -> Box2I;
    /// Detector center in the focal plane
    fn center(&self) -> Point2<f64>;
    /// Pixel edges corners in the focal plane
    fn corners(&self) -> Vec<Point2<f64>>;
    /// Transform from one coordinate system to another
    fn transform(&self, from: CoordSys, to: CoordSys) -> Transform;
}

/// Camera geometry interface
pub trait CameraGeometry {
    type Detector: Detector;
    /// Returns the detector `name` or [CameraWrapperError::DetectorNotFound]
    fn detector(&self, name: &str) -> Result<&Self::Detector>;
    /// Iterator over all the detectors
    fn detectors(&self) -> impl Iterator<Item = &Self::Detector>;
    /// Transform from the focal plane to the field angles
    fn focal_to_field(&self) -> Transform;
}

impl<T: CameraGeometry + ?Sized> CameraGeometry for &T {
    type Detector = T::Detector;
    fn detector(&self, name: &str) -> Result<&Self::Detector> {
        (**self).detector(name)
    }
    fn detectors(&self) -> impl Iterator<Item = &Self::Detector> {
        (**self).detectors()
    }
    fn focal_to_field(&self) -> Transform {
        (**self).focal_to_field()
    }
}
impl<T: CameraGeometry + ?Sized> CameraGeometry for Arc<T> {
    type Detector = T::Detector;
    fn detector(&self, name: &str) -> Result<&Self::Detector> {
        (**self).detector(name)
    }
    fn detectors(&self) -> impl Iterator<Item = &Self::Detector> {
        (**self).detectors()
    }
    fn focal_to_field(&self) -> Transform {
        (**self).focal_to_field()
    }
}

/// Flat detector in the focal plane
#[derive(Debug, Clone)]
pub struct DetectorGeometry {
    pub(crate) name: String,
    pub(crate) bbox: Box2I,
    pub(crate) center: Point2<f64>,
    pub(crate) pixel_size: f64,
    pub(crate) yaw: f64,
    /// Focal plane to pixels
    pub(crate) to_pixels: Affine,
    /// Field angles to the distortion-free focal plane
    pub(crate) paraxial: Affine,
    pub(crate) distortion: RadialDistortion,
}
impl DetectorGeometry {
    /// Pixel size in mm
    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }
    /// Pixel grid rotation in radians
    pub fn yaw(&self) -> f64 {
        self.yaw
    }
    fn from_focal_plane(&self, to: CoordSys) -> Transform {
        match to {
            CoordSys::FocalPlane => Transform::identity(),
            CoordSys::Pixels => Transform::from_mapping(Mapping::Affine(self.to_pixels.clone())),
            CoordSys::FieldAngle => {
                Transform::from_mapping(Mapping::Distortion(self.distortion.clone()))
            }
            CoordSys::TanPixels => self
                .from_focal_plane(CoordSys::FieldAngle)
                .then(Transform::from_mapping(Mapping::Affine(
                    self.paraxial.clone(),
                )))
                .then(self.from_focal_plane(CoordSys::Pixels)),
        }
    }
}
impl Detector for DetectorGeometry {
    fn name(&self) -> &str {
        &self.name
    }
    fn bbox(&self) -> Box2I {
        self.bbox
    }
    fn center(&self) -> Point2<f64> {
        self.center
    }
    fn corners(&self) -> Vec<Point2<f64>> {
        self.bbox
            .edge_corners()
            .iter()
            .map(|p| self.to_pixels.inverse(p))
            .collect()
    }
    fn transform(&self, from: CoordSys, to: CoordSys) -> Transform {
        if from == to {
            return Transform::identity();
        }
        self.from_focal_plane(from)
            .inverse()
            .then(self.from_focal_plane(to))
    }
}

/// Camera made of flat detectors behind a radial distortion
#[derive(Debug, Clone)]
pub struct Camera {
    pub(crate) name: String,
    pub(crate) distortion: RadialDistortion,
    pub(crate) detectors: Vec<DetectorGeometry>,
    pub(crate) index: HashMap<String, usize>,
}
impl crate::FromBuilder for Camera {
    type ComponentBuilder = CameraBuilder;
}
impl Camera {
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Focal length in mm
    pub fn focal_length(&self) -> f64 {
        self.distortion.focal_length
    }
    pub fn distortion(&self) -> &RadialDistortion {
        &self.distortion
    }
}
impl CameraGeometry for Camera {
    type Detector = DetectorGeometry;
    fn detector(&self, name: &str) -> Result<&DetectorGeometry> {
        self.index
            .get(name)
            .map(|&i| &self.detectors[i])
            .ok_or_else(|| CameraWrapperError::DetectorNotFound(name.to_owned()))
    }
    fn detectors(&self) -> impl Iterator<Item = &DetectorGeometry> {
        self.detectors.iter()
    }
    fn focal_to_field(&self) -> Transform {
        Transform::from_mapping(Mapping::Distortion(self.distortion.clone()))
    }
}
