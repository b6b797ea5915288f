#[derive(Debug, thiserror::Error)]
pub enum CameraWrapperError {
    #[error("detector {0} is not part of the camera")]
    DetectorNotFound(String),
    #[error("expected {expected} {what}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("a chip name is required to reckon pixel coordinates")]
    ChipNameRequired,
    #[error("cannot invert the radial distortion for a field angle of {0:e}rd")]
    Distortion(f64),
    #[error("cannot build `::imsim_camera::Camera`")]
    Camera(#[from] crate::CameraBuilderError),
    #[error("cannot build `::imsim_camera::ObservationMetaData`")]
    Observation(#[from] crate::ObservationError),
}

impl CameraWrapperError {
    pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> crate::Result<()> {
        if expected == found {
            Ok(())
        } else {
            Err(Self::LengthMismatch {
                what,
                expected,
                found,
            })
        }
    }
}
