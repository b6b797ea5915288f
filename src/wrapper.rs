//!
//! # Camera wrappers
//!
//! A camera wrapper answers the geometric queries of a camera (detector bounding boxes,
//! centers and corners) in a given pixel axis convention and converts coordinates between
//! pixels, pupil and sky.
//! Geometric queries are memoized per detector for the lifetime of the wrapper.
//!
//! [GalSimCameraWrapper] uses the pixel axes of the camera geometry as they are,
//! [LsstCameraWrapper] presents them in the camera team convention.

use std::sync::{Arc, OnceLock};

use nalgebra::Point2;

use crate::{
    coord_utils, Astrometry, Box2I, CameraGeometry, ChipName, ConversionOptions, CoordSys,
    Detector, ObservationMetaData, PixelBounds, PixelCoords, Result, Transform,
};

mod cache;
mod galsim;
mod lsst;

use cache::Memo;
pub use galsim::GalSimCameraWrapper;
pub use lsst::LsstCameraWrapper;

fn to_radians(values: &[f64]) -> Vec<f64> {
    values.iter().map(|x| x.to_radians()).collect()
}
fn to_degrees(values: Vec<f64>) -> Vec<f64> {
    values.into_iter().map(|x| x.to_degrees()).collect()
}

/// Camera wrapper interface
///
/// Pupil coordinates are in radians.
/// A single point is given as one-element slices.
pub trait CameraWrapper {
    type Camera: CameraGeometry;
    fn camera(&self) -> &Self::Camera;
    /// Focal plane to field angles transform, built on first use
    fn focal_to_field(&self) -> &Transform;
    /// Pixel bounding box of a detector
    fn bbox(&self, name: &str) -> Result<Box2I>;
    /// Pixel coordinates of the center of a detector
    fn center_pixel(&self, name: &str) -> Result<Point2<f64>>;
    /// Pupil coordinates of the center of a detector
    fn center_pupil(&self, name: &str) -> Result<Point2<f64>>;
    /// Pupil coordinates of the corners of a detector
    fn corner_pupils(&self, name: &str) -> Result<Arc<[Point2<f64>]>>;
    /// Distortion-free pixel bounds of a detector
    fn tan_pixel_bounds(&self, name: &str) -> Result<PixelBounds>;
    /// Pixel coordinates from pupil coordinates
    ///
    /// If `include_distortion` is false, the distortion-free pixel coordinates are returned
    fn pixel_coords_from_pupil_coords(
        &self,
        x_pupil: &[f64],
        y_pupil: &[f64],
        chip_name: ChipName,
        include_distortion: bool,
    ) -> Result<PixelCoords>;
    /// Pupil coordinates from pixel coordinates
    ///
    /// [ChipName::Auto] is not allowed
    fn pupil_coords_from_pixel_coords(
        &self,
        x_pix: &[f64],
        y_pix: &[f64],
        chip_name: ChipName,
        include_distortion: bool,
    ) -> Result<(Vec<f64>, Vec<f64>)>;

    /// Pixel coordinates from RA and Dec in radians
    ///
    /// Proper motions are in radians/year and parallaxes in radians
    fn pixel_coords_from_ra_dec_rad(
        &self,
        ra: &[f64],
        dec: &[f64],
        astrometry: &Astrometry,
        obs: &ObservationMetaData,
        chip_name: ChipName,
        options: ConversionOptions,
    ) -> Result<PixelCoords> {
        let (x_pupil, y_pupil) =
            coord_utils::pupil_coords_from_ra_dec_rad(ra, dec, astrometry, obs, options.epoch)?;
        self.pixel_coords_from_pupil_coords(
            &x_pupil,
            &y_pupil,
            chip_name,
            options.include_distortion,
        )
    }
    /// Pixel coordinates from RA and Dec in degrees
    ///
    /// Proper motions are in arcseconds/year and parallaxes in arcseconds
    fn pixel_coords_from_ra_dec(
        &self,
        ra: &[f64],
        dec: &[f64],
        astrometry: &Astrometry,
        obs: &ObservationMetaData,
        chip_name: ChipName,
        options: ConversionOptions,
    ) -> Result<PixelCoords> {
        self.pixel_coords_from_ra_dec_rad(
            &to_radians(ra),
            &to_radians(dec),
            &astrometry.arcsec_to_radians(),
            obs,
            chip_name,
            options,
        )
    }
    /// RA and Dec in radians from pixel coordinates
    fn ra_dec_from_pixel_coords_rad(
        &self,
        x_pix: &[f64],
        y_pix: &[f64],
        chip_name: ChipName,
        obs: &ObservationMetaData,
        options: ConversionOptions,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let (x_pupil, y_pupil) = self.pupil_coords_from_pixel_coords(
            x_pix,
            y_pix,
            chip_name,
            options.include_distortion,
        )?;
        coord_utils::ra_dec_from_pupil_coords_rad(&x_pupil, &y_pupil, obs)
    }
    /// RA and Dec in degrees from pixel coordinates
    fn ra_dec_from_pixel_coords(
        &self,
        x_pix: &[f64],
        y_pix: &[f64],
        chip_name: ChipName,
        obs: &ObservationMetaData,
        options: ConversionOptions,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let (ra, dec) = self.ra_dec_from_pixel_coords_rad(x_pix, y_pix, chip_name, obs, options)?;
        Ok((to_degrees(ra), to_degrees(dec)))
    }
}

/// Camera handle and memoized detector geometry shared by the wrappers
///
/// All the quantities are in the pixel axes of the camera geometry.
pub struct WrapperCore<C> {
    camera: C,
    focal_to_field: OnceLock<Transform>,
    bbox: Memo<Box2I>,
    center_pixel: Memo<Point2<f64>>,
    center_pupil: Memo<Point2<f64>>,
    corner_pupils: Memo<Arc<[Point2<f64>]>>,
    tan_pixel_bounds: Memo<PixelBounds>,
}
impl<C: CameraGeometry> WrapperCore<C> {
    pub fn new(camera: C) -> Self {
        Self {
            camera,
            focal_to_field: OnceLock::new(),
            bbox: Memo::new("bounding box"),
            center_pixel: Memo::new("center pixel"),
            center_pupil: Memo::new("center pupil coordinates"),
            corner_pupils: Memo::new("corners pupil coordinates"),
            tan_pixel_bounds: Memo::new("tan pixel bounds"),
        }
    }
    pub fn camera(&self) -> &C {
        &self.camera
    }
    pub fn focal_to_field(&self) -> &Transform {
        self.focal_to_field.get_or_init(|| {
            log::debug!("building the focal plane to field angle transform");
            self.camera.focal_to_field()
        })
    }
    pub fn bbox(&self, name: &str) -> Result<Box2I> {
        self.bbox
            .get_or_try_insert(name, || Ok(self.camera.detector(name)?.bbox()))
    }
    pub fn center_pixel(&self, name: &str) -> Result<Point2<f64>> {
        self.center_pixel.get_or_try_insert(name, || {
            let detector = self.camera.detector(name)?;
            detector
                .transform(CoordSys::FocalPlane, CoordSys::Pixels)
                .apply_forward(&detector.center())
        })
    }
    pub fn center_pupil(&self, name: &str) -> Result<Point2<f64>> {
        self.center_pupil.get_or_try_insert(name, || {
            let center = self.camera.detector(name)?.center();
            self.focal_to_field().apply_forward(&center)
        })
    }
    pub fn corner_pupils(&self, name: &str) -> Result<Arc<[Point2<f64>]>> {
        self.corner_pupils.get_or_try_insert(name, || {
            let corners = self.camera.detector(name)?.corners();
            Ok(self.focal_to_field().apply_forward_list(&corners)?.into())
        })
    }
    pub fn tan_pixel_bounds(&self, name: &str) -> Result<PixelBounds> {
        self.tan_pixel_bounds.get_or_try_insert(name, || {
            let detector = self.camera.detector(name)?;
            let tan_pixels = detector
                .transform(CoordSys::FocalPlane, CoordSys::TanPixels)
                .apply_forward_list(&detector.corners())?;
            Ok(PixelBounds::enclosing(&tan_pixels))
        })
    }
    pub fn pixel_coords_from_pupil_coords(
        &self,
        x_pupil: &[f64],
        y_pupil: &[f64],
        chip_name: ChipName,
        include_distortion: bool,
    ) -> Result<PixelCoords> {
        coord_utils::pixel_coords_from_pupil_coords(
            x_pupil,
            y_pupil,
            chip_name,
            &self.camera,
            include_distortion,
        )
    }
    pub fn pupil_coords_from_pixel_coords(
        &self,
        x_pix: &[f64],
        y_pix: &[f64],
        chip_name: ChipName,
        include_distortion: bool,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        coord_utils::pupil_coords_from_pixel_coords(
            x_pix,
            y_pix,
            chip_name,
            &self.camera,
            include_distortion,
        )
    }
    /// Number of detectors with a memoized bounding box
    pub fn n_cached(&self) -> usize {
        self.bbox.len()
    }
}
