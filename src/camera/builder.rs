use std::{
    collections::HashMap,
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::{transform::Affine, Camera, DetectorGeometry, RadialDistortion};
use crate::{geom::Box2I, Builder};

/// LSST sensor pitch within a raft in mm
const LSST_SENSOR_PITCH: f64 = 42.25;
/// LSST raft pitch in mm
const LSST_RAFT_PITCH: f64 = 127.0;

#[derive(Debug, thiserror::Error)]
pub enum CameraBuilderError {
    #[error("cannot open `::imsim_camera::CameraBuilder` toml file: {1}")]
    Open(#[source] std::io::Error, PathBuf),
    #[error("cannot create `::imsim_camera::CameraBuilder` toml file: {1}")]
    Create(#[source] std::io::Error, PathBuf),
    #[error("cannot read `::imsim_camera::CameraBuilder` toml file: {1}")]
    Read(#[source] std::io::Error, PathBuf),
    #[error("cannot write `::imsim_camera::CameraBuilder` toml file: {1}")]
    Write(#[source] std::io::Error, PathBuf),
    #[error("cannot deserialize `::imsim_camera::CameraBuilder` from toml")]
    Load(#[from] toml::de::Error),
    #[error("cannot serialize `::imsim_camera::CameraBuilder` into toml")]
    Save(#[from] toml::ser::Error),
    #[error("the focal length must be strictly positive, found {0}mm")]
    FocalLength(f64),
    #[error("the camera has no detector")]
    NoDetector,
    #[error("detector {0} is defined more than once")]
    DuplicateDetector(String),
    #[error("invalid detector {0}: {1}")]
    InvalidDetector(String, &'static str),
}

/// Detector builder
///
/// Default properties:
///  - name        : "R:2,2 S:1,1"
///  - center      : [0,0]mm
///  - pixels      : 4072x4000
///  - pixel size  : 10micron
///  - yaw         : 0rd
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorBuilder {
    pub name: String,
    /// Focal plane coordinates of the detector center in mm
    pub center: [f64; 2],
    /// Number of pixels along x and y
    pub n_pixel: [u32; 2],
    /// Pixel size in mm
    pub pixel_size: f64,
    /// Rotation of the pixel grid with respect to the focal plane in radians
    pub yaw: f64,
}
impl Default for DetectorBuilder {
    fn default() -> Self {
        Self {
            name: "R:2,2 S:1,1".into(),
            center: [0f64; 2],
            n_pixel: [4072, 4000],
            pixel_size: 0.01,
            yaw: 0f64,
        }
    }
}
impl DetectorBuilder {
    pub fn name(self, name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..self
        }
    }
    /// Set the detector center in the focal plane in mm
    pub fn center(self, x: f64, y: f64) -> Self {
        Self {
            center: [x, y],
            ..self
        }
    }
    /// Set the number of pixels along x and y
    pub fn n_pixel(self, nx: u32, ny: u32) -> Self {
        Self {
            n_pixel: [nx, ny],
            ..self
        }
    }
    /// Set the pixel size in mm
    pub fn pixel_size(self, pixel_size: f64) -> Self {
        Self { pixel_size, ..self }
    }
    /// Set the pixel grid rotation in radians
    pub fn yaw(self, yaw: f64) -> Self {
        Self { yaw, ..self }
    }
    fn build(self, distortion: &RadialDistortion) -> Result<DetectorGeometry, CameraBuilderError> {
        let [nx, ny] = self.n_pixel;
        if nx == 0 || ny == 0 || nx > i32::MAX as u32 || ny > i32::MAX as u32 {
            return Err(CameraBuilderError::InvalidDetector(
                self.name,
                "invalid number of pixels",
            ));
        }
        if !(self.pixel_size.is_finite() && self.pixel_size > 0f64) {
            return Err(CameraBuilderError::InvalidDetector(
                self.name,
                "the pixel size must be strictly positive",
            ));
        }
        let bbox = Box2I::from_dimensions(nx, ny);
        let center = Point2::new(self.center[0], self.center[1]);
        let center_pixel = Point2::new(0.5 * (nx as f64 - 1.), 0.5 * (ny as f64 - 1.));
        let to_pixels =
            Affine::focal_plane_to_pixels(center, center_pixel, self.pixel_size, self.yaw)
                .ok_or_else(|| {
                    CameraBuilderError::InvalidDetector(self.name.clone(), "singular pixel map")
                })?;
        let paraxial = Affine::scaling(distortion.focal_length)
            .ok_or(CameraBuilderError::FocalLength(distortion.focal_length))?;
        Ok(DetectorGeometry {
            name: self.name,
            bbox,
            center,
            pixel_size: self.pixel_size,
            yaw: self.yaw,
            to_pixels,
            paraxial,
            distortion: distortion.clone(),
        })
    }
}

/// `Camera` builder
///
/// Default properties:
///  - name          : "LSSTCam"
///  - focal length  : 10310mm
///  - distortion    : \[0.05\]
///  - detectors     : the 189 science sensors of the LSST camera
///
/// # Examples
///
/// ```
/// use imsim_camera::{Builder, FromBuilder, Camera, CameraGeometry};
/// let camera = Camera::builder().build().unwrap();
/// assert_eq!(camera.detectors().count(), 189);
/// ```
///
/// ```
/// use imsim_camera::{Builder, CameraBuilder, DetectorBuilder};
/// let camera = CameraBuilder::default()
///     .name("single")
///     .detectors(vec![DetectorBuilder::default().name("S00").n_pixel(512, 512)])
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraBuilder {
    pub name: String,
    /// Focal length in mm
    pub focal_length: f64,
    /// Radial distortion coefficients
    pub distortion: Vec<f64>,
    pub detectors: Vec<DetectorBuilder>,
}
impl Default for CameraBuilder {
    fn default() -> Self {
        Self::lsst()
    }
}
impl CameraBuilder {
    /// LSST camera: 21 rafts of 3x3 sensors
    pub fn lsst() -> Self {
        let mut detectors = vec![];
        for raft_x in 0..5 {
            for raft_y in 0..5 {
                if (raft_x == 0 || raft_x == 4) && (raft_y == 0 || raft_y == 4) {
                    continue;
                }
                for sensor_x in 0..3 {
                    for sensor_y in 0..3 {
                        let x = (raft_x as f64 - 2.) * LSST_RAFT_PITCH
                            + (sensor_x as f64 - 1.) * LSST_SENSOR_PITCH;
                        let y = (raft_y as f64 - 2.) * LSST_RAFT_PITCH
                            + (sensor_y as f64 - 1.) * LSST_SENSOR_PITCH;
                        detectors.push(
                            DetectorBuilder::default()
                                .name(&format!(
                                    "R:{raft_x},{raft_y} S:{sensor_x},{sensor_y}"
                                ))
                                .center(x, y),
                        );
                    }
                }
            }
        }
        Self {
            name: "LSSTCam".into(),
            focal_length: 10_310.,
            distortion: vec![0.05],
            detectors,
        }
    }
    /// Load the camera builder from a toml file
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, CameraBuilderError> {
        let mut file = File::open(&path)
            .map_err(|e| CameraBuilderError::Open(e, path.as_ref().to_path_buf()))?;
        let mut toml = String::new();
        file.read_to_string(&mut toml)
            .map_err(|e| CameraBuilderError::Read(e, path.as_ref().to_path_buf()))?;
        let builder: CameraBuilder = toml::from_str(&toml)?;
        Ok(builder)
    }
    /// Save the camera builder to a toml file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::result::Result<(), CameraBuilderError> {
        let toml = toml::to_string_pretty(self)?;
        let mut file = File::create(&path)
            .map_err(|e| CameraBuilderError::Create(e, path.as_ref().to_path_buf()))?;
        write!(file, "# ::imsim_camera::CameraBuilder\n\n{}", toml)
            .map_err(|e| CameraBuilderError::Write(e, path.as_ref().to_path_buf()))?;
        Ok(())
    }
    pub fn name(self, name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..self
        }
    }
    /// Set the focal length in mm
    pub fn focal_length(self, focal_length: f64) -> Self {
        Self {
            focal_length,
            ..self
        }
    }
    /// Set the radial distortion coefficients
    pub fn distortion(self, distortion: Vec<f64>) -> Self {
        Self { distortion, ..self }
    }
    /// Removes the radial distortion
    pub fn paraxial(self) -> Self {
        Self {
            distortion: vec![],
            ..self
        }
    }
    /// Replace the detectors
    pub fn detectors(self, detectors: Vec<DetectorBuilder>) -> Self {
        Self { detectors, ..self }
    }
}
impl Builder for CameraBuilder {
    type Component = Camera;
    /// Build the `Camera`
    fn build(self) -> crate::Result<Camera> {
        if !(self.focal_length.is_finite() && self.focal_length > 0f64) {
            return Err(CameraBuilderError::FocalLength(self.focal_length).into());
        }
        if self.detectors.is_empty() {
            return Err(CameraBuilderError::NoDetector.into());
        }
        let distortion = RadialDistortion::new(self.focal_length, self.distortion);
        let mut index = HashMap::with_capacity(self.detectors.len());
        let mut detectors = Vec::with_capacity(self.detectors.len());
        for builder in self.detectors {
            if index.contains_key(&builder.name) {
                return Err(CameraBuilderError::DuplicateDetector(builder.name).into());
            }
            index.insert(builder.name.clone(), detectors.len());
            detectors.push(builder.build(&distortion)?);
        }
        log::info!(
            "{} camera with {} detectors and a {:.1}m focal length",
            self.name,
            detectors.len(),
            self.focal_length * 1e-3
        );
        Ok(Camera {
            name: self.name,
            distortion,
            detectors,
            index,
        })
    }
}

impl From<&Camera> for CameraBuilder {
    fn from(camera: &Camera) -> Self {
        Self {
            name: camera.name.clone(),
            focal_length: camera.distortion.focal_length,
            distortion: camera.distortion.coefficients.clone(),
            detectors: camera
                .detectors
                .iter()
                .map(|d| DetectorBuilder {
                    name: d.name.clone(),
                    center: [d.center.x, d.center.y],
                    n_pixel: [d.bbox.width() as u32, d.bbox.height() as u32],
                    pixel_size: d.pixel_size,
                    yaw: d.yaw,
                })
                .collect(),
        }
    }
}
