//!
//! # Survey camera coordinate wrappers
//!
//! The wrappers map between the focal plane, pixel, pupil (field angle) and sky
//! coordinates of a survey camera for image simulations.
//!
//! Two conventions exist for the pixel axes of the LSST focal plane:
//!
//!  * Camera +y = DM +x
//!  * Camera +x = DM -y
//!
//! [`GalSimCameraWrapper`] treats the software (DM) pixel coordinates as truth, while
//! [`LsstCameraWrapper`] presents every pixel quantity in the camera team convention.
//! Both implement the [`CameraWrapper`] trait.
//!
//! ```
//! use imsim_camera::{CameraWrapper, ChipName, LsstCameraWrapper};
//! # fn main() -> imsim_camera::Result<()> {
//! let wrapper = LsstCameraWrapper::new()?;
//! let center = wrapper.center_pixel("R:2,2 S:1,1")?;
//! let pupil = wrapper.pupil_coords_from_pixel_coords(
//!     &[center.x],
//!     &[center.y],
//!     ChipName::Single("R:2,2 S:1,1"),
//!     true,
//! )?;
//! let pixel = wrapper.pixel_coords_from_pupil_coords(&pupil.0, &pupil.1, ChipName::Auto, true)?;
//! assert_eq!(pixel.chips[0].as_deref(), Some("R:2,2 S:1,1"));
//! # Ok(())
//! # }
//! ```

pub mod camera;
pub mod coord_utils;
pub mod error;
pub mod geom;
pub mod observation;
pub mod wrapper;

#[doc(inline)]
pub use self::camera::{
    Camera, CameraBuilder, CameraBuilderError, CameraGeometry, CoordSys, Detector,
    DetectorBuilder, DetectorGeometry, RadialDistortion, Transform,
};
#[doc(inline)]
pub use self::coord_utils::{Astrometry, ChipName, ConversionOptions, PixelCoords};
#[doc(inline)]
pub use self::error::CameraWrapperError;
#[doc(inline)]
pub use self::geom::{Box2I, PixelBounds};
#[doc(inline)]
pub use self::observation::{ObservationBuilder, ObservationError, ObservationMetaData};
#[doc(inline)]
pub use self::wrapper::{CameraWrapper, GalSimCameraWrapper, LsstCameraWrapper, WrapperCore};

pub type Result<T> = std::result::Result<T, CameraWrapperError>;

/// Builder type trait
pub trait Builder: Default {
    type Component;
    fn new() -> Self {
        Default::default()
    }
    fn build(self) -> Result<Self::Component>;
}
/// Gives access to the builder of a component
pub trait FromBuilder: Sized {
    type ComponentBuilder: Builder<Component = Self>;
    fn builder() -> Self::ComponentBuilder {
        Self::ComponentBuilder::new()
    }
}
