use std::sync::Arc;

use nalgebra::Point2;

use super::{CameraWrapper, WrapperCore};
use crate::{
    Box2I, Builder, Camera, CameraBuilder, CameraGeometry, CameraWrapperError, ChipName,
    PixelBounds, PixelCoords, Result, Transform,
};

/// Camera wrapper in the camera team pixel convention
///
/// The camera team pixel axes are rotated with respect to the axes of the camera geometry:
///  * camera +y = geometry +x
///  * camera +x = geometry -y
///
/// so a detector bounding box, center pixel and tan pixel bounds have their x and y swapped,
/// and a pixel is mapped with `x' = 2c - y`, `y' = x` where `c` is the camera team x
/// coordinate of the detector center pixel.
/// Pupil coordinates are the same in both conventions.
pub struct LsstCameraWrapper<C = Camera> {
    core: WrapperCore<C>,
}
impl LsstCameraWrapper<Camera> {
    /// Wraps the LSST camera
    pub fn new() -> Result<Self> {
        Ok(Self::with_camera(CameraBuilder::lsst().build()?))
    }
}
impl<C: CameraGeometry> LsstCameraWrapper<C> {
    pub fn with_camera(camera: C) -> Self {
        Self {
            core: WrapperCore::new(camera),
        }
    }
    pub fn core(&self) -> &WrapperCore<C> {
        &self.core
    }
    /// Camera team x coordinate of the detector center pixel
    fn reflection_center(&self, name: &str) -> Result<f64> {
        Ok(self.core.center_pixel(name)?.y)
    }
    /// Camera geometry pixels to camera team pixels
    fn to_camera_pixel(&self, name: &str, p: Point2<f64>) -> Result<Point2<f64>> {
        Ok(Point2::new(2. * self.reflection_center(name)? - p.y, p.x))
    }
    /// Camera team pixels to camera geometry pixels
    fn to_geometry_pixel(&self, name: &str, p: Point2<f64>) -> Result<Point2<f64>> {
        Ok(Point2::new(p.y, 2. * self.reflection_center(name)? - p.x))
    }
}

impl<C: CameraGeometry> CameraWrapper for LsstCameraWrapper<C> {
    type Camera = C;
    fn camera(&self) -> &C {
        self.core.camera()
    }
    fn focal_to_field(&self) -> &Transform {
        self.core.focal_to_field()
    }
    fn bbox(&self, name: &str) -> Result<Box2I> {
        Ok(self.core.bbox(name)?.transposed())
    }
    fn center_pixel(&self, name: &str) -> Result<Point2<f64>> {
        let p = self.core.center_pixel(name)?;
        Ok(Point2::new(p.y, p.x))
    }
    fn center_pupil(&self, name: &str) -> Result<Point2<f64>> {
        self.core.center_pupil(name)
    }
    fn corner_pupils(&self, name: &str) -> Result<Arc<[Point2<f64>]>> {
        self.core.corner_pupils(name)
    }
    fn tan_pixel_bounds(&self, name: &str) -> Result<PixelBounds> {
        Ok(self.core.tan_pixel_bounds(name)?.transposed())
    }
    fn pixel_coords_from_pupil_coords(
        &self,
        x_pupil: &[f64],
        y_pupil: &[f64],
        chip_name: ChipName,
        include_distortion: bool,
    ) -> Result<PixelCoords> {
        let mut pixels = self.core.pixel_coords_from_pupil_coords(
            x_pupil,
            y_pupil,
            chip_name,
            include_distortion,
        )?;
        for i in 0..pixels.len() {
            if let Some(name) = &pixels.chips[i] {
                let p = self.to_camera_pixel(name, Point2::new(pixels.x[i], pixels.y[i]))?;
                pixels.x[i] = p.x;
                pixels.y[i] = p.y;
            }
        }
        Ok(pixels)
    }
    fn pupil_coords_from_pixel_coords(
        &self,
        x_pix: &[f64],
        y_pix: &[f64],
        chip_name: ChipName,
        include_distortion: bool,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        if chip_name == ChipName::Auto {
            return Err(CameraWrapperError::ChipNameRequired);
        }
        CameraWrapperError::check_len("y coordinates", x_pix.len(), y_pix.len())?;
        chip_name.check_len(x_pix.len())?;
        let mut x_geom = Vec::with_capacity(x_pix.len());
        let mut y_geom = Vec::with_capacity(x_pix.len());
        for (i, (&x, &y)) in x_pix.iter().zip(y_pix).enumerate() {
            let name = chip_name
                .get(i)
                .ok_or(CameraWrapperError::ChipNameRequired)?;
            let p = self.to_geometry_pixel(name, Point2::new(x, y))?;
            x_geom.push(p.x);
            y_geom.push(p.y);
        }
        self.core
            .pupil_coords_from_pixel_coords(&x_geom, &y_geom, chip_name, include_distortion)
    }
}
