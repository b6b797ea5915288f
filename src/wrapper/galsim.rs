use std::sync::Arc;

use nalgebra::Point2;

use super::{CameraWrapper, WrapperCore};
use crate::{Box2I, Camera, CameraGeometry, ChipName, PixelBounds, PixelCoords, Result, Transform};

/// Camera wrapper in the pixel axes of the camera geometry
///
/// ```
/// use imsim_camera::{Builder, CameraBuilder, CameraWrapper, GalSimCameraWrapper};
/// let wrapper = GalSimCameraWrapper::new(CameraBuilder::lsst().build().unwrap());
/// let bbox = wrapper.bbox("R:2,2 S:1,1").unwrap();
/// assert_eq!((bbox.width(), bbox.height()), (4072, 4000));
/// ```
pub struct GalSimCameraWrapper<C = Camera> {
    core: WrapperCore<C>,
}
impl<C: CameraGeometry> GalSimCameraWrapper<C> {
    pub fn new(camera: C) -> Self {
        Self {
            core: WrapperCore::new(camera),
        }
    }
    pub fn core(&self) -> &WrapperCore<C> {
        &self.core
    }
}

impl<C: CameraGeometry> CameraWrapper for GalSimCameraWrapper<C> {
    type Camera = C;
    fn camera(&self) -> &C {
        self.core.camera()
    }
    fn focal_to_field(&self) -> &Transform {
        self.core.focal_to_field()
    }
    fn bbox(&self, name: &str) -> Result<Box2I> {
        self.core.bbox(name)
    }
    fn center_pixel(&self, name: &str) -> Result<Point2<f64>> {
        self.core.center_pixel(name)
    }
    fn center_pupil(&self, name: &str) -> Result<Point2<f64>> {
        self.core.center_pupil(name)
    }
    fn corner_pupils(&self, name: &str) -> Result<Arc<[Point2<f64>]>> {
        self.core.corner_pupils(name)
    }
    fn tan_pixel_bounds(&self, name: &str) -> Result<PixelBounds> {
        self.core.tan_pixel_bounds(name)
    }
    fn pixel_coords_from_pupil_coords(
        &self,
        x_pupil: &[f64],
        y_pupil: &[f64],
        chip_name: ChipName,
        include_distortion: bool,
    ) -> Result<PixelCoords> {
        self.core
            .pixel_coords_from_pupil_coords(x_pupil, y_pupil, chip_name, include_distortion)
    }
    fn pupil_coords_from_pixel_coords(
        &self,
        x_pix: &[f64],
        y_pix: &[f64],
        chip_name: ChipName,
        include_distortion: bool,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        self.core
            .pupil_coords_from_pixel_coords(x_pix, y_pix, chip_name, include_distortion)
    }
}
