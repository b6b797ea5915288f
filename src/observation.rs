//!
//! # Observation metadata
//!
//! The telescope pointing context of an exposure:
//! the pointing center, the rotation of the sky in the focal plane and the observation date.
//!
//! # Examples
//!
//! ```
//! use imsim_camera::{Builder, FromBuilder, ObservationMetaData};
//! let obs = ObservationMetaData::builder()
//!     .pointing(53.0, -27.4)
//!     .rot_sky_pos(20.)
//!     .mjd(59_580.)
//!     .build()
//!     .unwrap();
//! assert_eq!(obs.bandpass(), "r");
//! ```

use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{Builder, FromBuilder};

/// Modified Julian date of the J2000.0 epoch
pub const MJD_J2000: f64 = 51_544.5;
/// Days in a Julian year
pub const DAYS_PER_JULIAN_YEAR: f64 = 365.25;

#[derive(Debug, thiserror::Error)]
pub enum ObservationError {
    #[error("cannot open `::imsim_camera::ObservationBuilder` toml file: {1}")]
    Open(#[source] std::io::Error, PathBuf),
    #[error("cannot create `::imsim_camera::ObservationBuilder` toml file: {1}")]
    Create(#[source] std::io::Error, PathBuf),
    #[error("cannot read `::imsim_camera::ObservationBuilder` toml file: {1}")]
    Read(#[source] std::io::Error, PathBuf),
    #[error("cannot write `::imsim_camera::ObservationBuilder` toml file: {1}")]
    Write(#[source] std::io::Error, PathBuf),
    #[error("cannot deserialize `::imsim_camera::ObservationBuilder` from toml")]
    Load(#[from] toml::de::Error),
    #[error("cannot serialize `::imsim_camera::ObservationBuilder` into toml")]
    Save(#[from] toml::ser::Error),
    #[error("the pointing declination must be within [-90,90]degree, found {0}degree")]
    Declination(f64),
    #[error("{0} is not a finite number")]
    NotFinite(&'static str),
    #[error("the bound length must be strictly positive, found {0}degree")]
    BoundLength(f64),
}

/// `ObservationMetaData` builder
///
/// Default properties:
///  - pointing     : RA=0degree, Dec=0degree
///  - rotSkyPos    : 0degree
///  - MJD          : 59580 (2022-01-01)
///  - bandpass     : r
///  - bound length : 1.75degree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationBuilder {
    /// Pointing right ascension in degrees
    pub pointing_ra: f64,
    /// Pointing declination in degrees
    pub pointing_dec: f64,
    /// Angle between north and the +y pupil axis in degrees
    pub rot_sky_pos: f64,
    pub mjd: f64,
    pub bandpass: String,
    /// Radius of the field of view in degrees
    pub bound_length: f64,
}
impl Default for ObservationBuilder {
    fn default() -> Self {
        Self {
            pointing_ra: 0f64,
            pointing_dec: 0f64,
            rot_sky_pos: 0f64,
            mjd: 59_580.,
            bandpass: "r".into(),
            bound_length: 1.75,
        }
    }
}
impl ObservationBuilder {
    /// Load the observation builder from a toml file
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ObservationError> {
        let mut file = File::open(&path)
            .map_err(|e| ObservationError::Open(e, path.as_ref().to_path_buf()))?;
        let mut toml = String::new();
        file.read_to_string(&mut toml)
            .map_err(|e| ObservationError::Read(e, path.as_ref().to_path_buf()))?;
        let builder: ObservationBuilder = toml::from_str(&toml)?;
        Ok(builder)
    }
    /// Save the observation builder to a toml file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::result::Result<(), ObservationError> {
        let toml = toml::to_string_pretty(self)?;
        let mut file = File::create(&path)
            .map_err(|e| ObservationError::Create(e, path.as_ref().to_path_buf()))?;
        write!(file, "# ::imsim_camera::ObservationBuilder\n\n{}", toml)
            .map_err(|e| ObservationError::Write(e, path.as_ref().to_path_buf()))?;
        Ok(())
    }
    /// Set the pointing RA and Dec in degrees
    pub fn pointing(self, ra: f64, dec: f64) -> Self {
        Self {
            pointing_ra: ra,
            pointing_dec: dec,
            ..self
        }
    }
    /// Set rotSkyPos in degrees
    pub fn rot_sky_pos(self, rot_sky_pos: f64) -> Self {
        Self {
            rot_sky_pos,
            ..self
        }
    }
    /// Set the modified Julian date of the observation
    pub fn mjd(self, mjd: f64) -> Self {
        Self { mjd, ..self }
    }
    pub fn bandpass(self, bandpass: &str) -> Self {
        Self {
            bandpass: bandpass.to_owned(),
            ..self
        }
    }
    /// Set the field of view radius in degrees
    pub fn bound_length(self, bound_length: f64) -> Self {
        Self {
            bound_length,
            ..self
        }
    }
}
impl Builder for ObservationBuilder {
    type Component = ObservationMetaData;
    fn build(self) -> crate::Result<ObservationMetaData> {
        for (value, name) in [
            (self.pointing_ra, "pointing RA"),
            (self.pointing_dec, "pointing Dec"),
            (self.rot_sky_pos, "rotSkyPos"),
            (self.mjd, "MJD"),
            (self.bound_length, "bound length"),
        ] {
            if !value.is_finite() {
                return Err(ObservationError::NotFinite(name).into());
            }
        }
        if self.pointing_dec.abs() > 90f64 {
            return Err(ObservationError::Declination(self.pointing_dec).into());
        }
        if self.bound_length <= 0f64 {
            return Err(ObservationError::BoundLength(self.bound_length).into());
        }
        log::info!(
            "Pointing (RA,Dec)=({:.4},{:.4})degree, rotSkyPos={:.2}degree at MJD {:.5} in {} band",
            self.pointing_ra,
            self.pointing_dec,
            self.rot_sky_pos,
            self.mjd,
            self.bandpass
        );
        Ok(ObservationMetaData {
            pointing_ra: self.pointing_ra.rem_euclid(360f64).to_radians(),
            pointing_dec: self.pointing_dec.to_radians(),
            rot_sky_pos: self.rot_sky_pos.to_radians(),
            mjd: self.mjd,
            bandpass: self.bandpass,
            bound_length: self.bound_length.to_radians(),
        })
    }
}

/// Telescope pointing of an exposure
///
/// Angles are stored in radians
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationMetaData {
    pointing_ra: f64,
    pointing_dec: f64,
    rot_sky_pos: f64,
    mjd: f64,
    bandpass: String,
    bound_length: f64,
}
impl FromBuilder for ObservationMetaData {
    type ComponentBuilder = ObservationBuilder;
}
impl ObservationMetaData {
    /// Pointing RA and Dec in radians
    pub fn pointing(&self) -> (f64, f64) {
        (self.pointing_ra, self.pointing_dec)
    }
    /// Pointing RA and Dec in degrees
    pub fn pointing_degrees(&self) -> (f64, f64) {
        (self.pointing_ra.to_degrees(), self.pointing_dec.to_degrees())
    }
    /// rotSkyPos in radians
    pub fn rot_sky_pos(&self) -> f64 {
        self.rot_sky_pos
    }
    pub fn mjd(&self) -> f64 {
        self.mjd
    }
    pub fn bandpass(&self) -> &str {
        &self.bandpass
    }
    /// Field of view radius in radians
    pub fn bound_length(&self) -> f64 {
        self.bound_length
    }
    /// Epoch of the observation in Julian years
    pub fn epoch(&self) -> f64 {
        2000f64 + (self.mjd - MJD_J2000) / DAYS_PER_JULIAN_YEAR
    }
    /// Unit vector of the pointing center
    pub fn pointing_vector(&self) -> Vector3<f64> {
        unit_vector(self.pointing_ra, self.pointing_dec)
    }
}

impl From<&ObservationMetaData> for ObservationBuilder {
    fn from(obs: &ObservationMetaData) -> Self {
        Self {
            pointing_ra: obs.pointing_ra.to_degrees(),
            pointing_dec: obs.pointing_dec.to_degrees(),
            rot_sky_pos: obs.rot_sky_pos.to_degrees(),
            mjd: obs.mjd,
            bandpass: obs.bandpass.clone(),
            bound_length: obs.bound_length.to_degrees(),
        }
    }
}

/// Unit vector of the direction (RA,Dec) in radians
pub fn unit_vector(ra: f64, dec: f64) -> Vector3<f64> {
    Vector3::new(dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin())
}
/// RA in [0,2π[ and Dec of a vector in radians
pub fn ra_dec(v: &Vector3<f64>) -> (f64, f64) {
    let ra = v.y.atan2(v.x).rem_euclid(std::f64::consts::TAU);
    let dec = (v.z / v.norm()).asin();
    (ra, dec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CameraWrapperError;

    #[test]
    fn radians() {
        let obs = ObservationMetaData::builder()
            .pointing(-90., 45.)
            .build()
            .unwrap();
        let (ra, dec) = obs.pointing();
        assert!((ra - 1.5 * std::f64::consts::PI).abs() < 1e-12);
        assert!((dec - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
        assert!((obs.pointing_vector().norm() - 1.).abs() < 1e-12);
    }

    #[test]
    fn epoch() {
        let obs = ObservationMetaData::builder()
            .mjd(MJD_J2000 + 2. * DAYS_PER_JULIAN_YEAR)
            .build()
            .unwrap();
        assert!((obs.epoch() - 2002.).abs() < 1e-12);
    }

    #[test]
    fn invalid_pointing() {
        assert!(matches!(
            ObservationMetaData::builder().pointing(0., 91.).build(),
            Err(CameraWrapperError::Observation(ObservationError::Declination(_)))
        ));
        assert!(ObservationMetaData::builder().mjd(f64::NAN).build().is_err());
        assert!(ObservationMetaData::builder()
            .bound_length(0.)
            .build()
            .is_err());
    }

    #[test]
    fn ra_dec_of_unit_vector() {
        let (ra, dec) = ra_dec(&unit_vector(5.5, -0.3));
        assert!((ra - 5.5).abs() < 1e-12);
        assert!((dec + 0.3).abs() < 1e-12);
    }

    #[test]
    fn toml_round_trip() {
        let path =
            std::env::temp_dir().join(format!("imsim_observation_{}.toml", std::process::id()));
        let builder = ObservationBuilder::default()
            .pointing(53.1, -27.8)
            .rot_sky_pos(12.)
            .bandpass("u")
            .bound_length(0.05);
        builder.save(&path).unwrap();
        let loaded = ObservationBuilder::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, builder);
        let obs = loaded.build().unwrap();
        let back = ObservationBuilder::from(&obs);
        assert!((back.pointing_ra - 53.1).abs() < 1e-9);
        assert_eq!(back.bandpass, "u");
    }
}
