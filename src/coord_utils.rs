//!
//! # Coordinate utilities
//!
//! Conversions between pixel, pupil and sky coordinates on a [CameraGeometry].
//!
//! Coordinates are passed as parallel slices, a single point being a one-element slice,
//! and are returned as rows `(x, y)` or as [PixelCoords].
//! Pupil coordinates are the gnomonic projection of the sky in radians, centered on the
//! telescope pointing and rotated by rotSkyPos (north is rotated from +y toward -x).
//! Points that do not land on any detector when the detector is resolved automatically
//! are returned as NaN.

use std::collections::HashMap;

use nalgebra::{Point2, Rotation2, Vector2, Vector3};
use skyangle::Conversion;

use crate::{
    observation::{ra_dec, unit_vector, MJD_J2000},
    CameraGeometry, CameraWrapperError, CoordSys, Detector, ObservationMetaData, Result,
    Transform,
};

/// Detector selection for pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipName<'a> {
    /// Resolve the detector each point falls on
    Auto,
    /// All the points are reckoned on the same detector
    Single(&'a str),
    /// One detector per point
    PerPoint(&'a [&'a str]),
}
impl<'a> ChipName<'a> {
    pub(crate) fn check_len(&self, n: usize) -> Result<()> {
        match self {
            ChipName::PerPoint(names) => CameraWrapperError::check_len("chip names", n, names.len()),
            _ => Ok(()),
        }
    }
    /// Name of the detector of the i-th point, `None` if resolved automatically
    pub fn get(&self, i: usize) -> Option<&'a str> {
        match *self {
            ChipName::Auto => None,
            ChipName::Single(name) => Some(name),
            ChipName::PerPoint(names) => names.get(i).copied(),
        }
    }
}
impl<'a> From<&'a str> for ChipName<'a> {
    fn from(name: &'a str) -> Self {
        ChipName::Single(name)
    }
}
impl<'a> From<&'a [&'a str]> for ChipName<'a> {
    fn from(names: &'a [&'a str]) -> Self {
        ChipName::PerPoint(names)
    }
}
impl<'a> From<Option<&'a str>> for ChipName<'a> {
    fn from(name: Option<&'a str>) -> Self {
        name.map_or(ChipName::Auto, ChipName::Single)
    }
}

/// Sky to pixel conversion options
///
/// Default properties:
///  - epoch              : 2000.0
///  - include distortion : true
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionOptions {
    /// Reference epoch of the catalog positions in Julian years
    pub epoch: f64,
    /// True pixels if `true`, distortion-free pixels otherwise
    pub include_distortion: bool,
}
impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            epoch: 2000f64,
            include_distortion: true,
        }
    }
}
impl ConversionOptions {
    pub fn epoch(self, epoch: f64) -> Self {
        Self { epoch, ..self }
    }
    pub fn include_distortion(self, include_distortion: bool) -> Self {
        Self {
            include_distortion,
            ..self
        }
    }
}

/// Proper motions, parallaxes and radial velocities
///
/// Each property is either absent or given for every object.
/// The units are set by the conversion the astrometry is passed to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Astrometry {
    /// Proper motion in RA multiplied by cos(Dec)
    pub pm_ra: Option<Vec<f64>>,
    /// Proper motion in Dec
    pub pm_dec: Option<Vec<f64>>,
    pub parallax: Option<Vec<f64>>,
    /// Radial velocity in km/s
    ///
    /// Checked against the number of objects but ignored by the conversions:
    /// light travel time and perspective acceleration are not modeled.
    pub v_rad: Option<Vec<f64>>,
}
impl Astrometry {
    /// Set the proper motions in RA (multiplied by cos(Dec)) and Dec
    pub fn proper_motion(self, pm_ra: Vec<f64>, pm_dec: Vec<f64>) -> Self {
        Self {
            pm_ra: Some(pm_ra),
            pm_dec: Some(pm_dec),
            ..self
        }
    }
    pub fn parallax(self, parallax: Vec<f64>) -> Self {
        Self {
            parallax: Some(parallax),
            ..self
        }
    }
    /// Set the radial velocities in km/s
    pub fn radial_velocity(self, v_rad: Vec<f64>) -> Self {
        Self {
            v_rad: Some(v_rad),
            ..self
        }
    }
    pub fn is_empty(&self) -> bool {
        self.pm_ra.is_none() && self.pm_dec.is_none() && self.parallax.is_none()
    }
    /// Converts proper motions and parallaxes from arcseconds into radians
    pub fn arcsec_to_radians(&self) -> Self {
        let convert = |values: &Option<Vec<f64>>| {
            values
                .as_ref()
                .map(|values| values.iter().map(|&x| x.from_arcsec()).collect())
        };
        Self {
            pm_ra: convert(&self.pm_ra),
            pm_dec: convert(&self.pm_dec),
            parallax: convert(&self.parallax),
            v_rad: self.v_rad.clone(),
        }
    }
    fn check_len(&self, n: usize) -> Result<()> {
        for (values, what) in [
            (&self.pm_ra, "proper motions in RA"),
            (&self.pm_dec, "proper motions in Dec"),
            (&self.parallax, "parallaxes"),
            (&self.v_rad, "radial velocities"),
        ] {
            if let Some(values) = values {
                CameraWrapperError::check_len(what, n, values.len())?;
            }
        }
        Ok(())
    }
    fn at(values: &Option<Vec<f64>>, i: usize) -> f64 {
        values.as_ref().map_or(0f64, |values| values[i])
    }
}

/// Pixel coordinates and the detectors they are reckoned on
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PixelCoords {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// `None` where a point does not fall on any detector
    pub chips: Vec<Option<String>>,
}
impl PixelCoords {
    fn with_capacity(n: usize) -> Self {
        Self {
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            chips: Vec::with_capacity(n),
        }
    }
    fn push(&mut self, point: Point2<f64>, chip: Option<String>) {
        self.x.push(point.x);
        self.y.push(point.y);
        self.chips.push(chip);
    }
    fn push_nan(&mut self) {
        self.push(Point2::new(f64::NAN, f64::NAN), None);
    }
    pub fn len(&self) -> usize {
        self.x.len()
    }
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
    /// Number of points that fell on a detector
    pub fn n_on_chip(&self) -> usize {
        self.chips.iter().filter(|c| c.is_some()).count()
    }
    /// Consumes the pixel coordinates into rows `(x, y)`
    pub fn into_rows(self) -> (Vec<f64>, Vec<f64>) {
        (self.x, self.y)
    }
}

/// Per detector transforms between two coordinate systems, built on demand
struct TransformCache<'c, C: CameraGeometry> {
    camera: &'c C,
    from: CoordSys,
    to: CoordSys,
    transforms: HashMap<String, Transform>,
}
impl<'c, C: CameraGeometry> TransformCache<'c, C> {
    fn new(camera: &'c C, from: CoordSys, to: CoordSys) -> Self {
        Self {
            camera,
            from,
            to,
            transforms: HashMap::new(),
        }
    }
    fn get(&mut self, name: &str) -> Result<&Transform> {
        if !self.transforms.contains_key(name) {
            let transform = self.camera.detector(name)?.transform(self.from, self.to);
            self.transforms.insert(name.to_owned(), transform);
        }
        self.transforms
            .get(name)
            .ok_or_else(|| CameraWrapperError::DetectorNotFound(name.to_owned()))
    }
}

fn pixel_system(include_distortion: bool) -> CoordSys {
    if include_distortion {
        CoordSys::Pixels
    } else {
        CoordSys::TanPixels
    }
}

fn points<'a>(
    x: &'a [f64],
    y: &'a [f64],
) -> Result<impl Iterator<Item = Point2<f64>> + 'a> {
    CameraWrapperError::check_len("y coordinates", x.len(), y.len())?;
    Ok(x.iter().zip(y).map(|(&x, &y)| Point2::new(x, y)))
}

fn is_finite(p: &Point2<f64>) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Names of the detectors the pupil coordinates in radians fall on
pub fn chip_name_from_pupil_coords<C: CameraGeometry>(
    x_pupil: &[f64],
    y_pupil: &[f64],
    camera: &C,
) -> Result<Vec<Option<String>>> {
    let field_to_focal = camera.focal_to_field().inverse();
    let detectors: Vec<_> = camera
        .detectors()
        .map(|d| (d, d.transform(CoordSys::FocalPlane, CoordSys::Pixels)))
        .collect();
    let chips: Vec<Option<String>> = points(x_pupil, y_pupil)?
        .map(|p| {
            if !is_finite(&p) {
                return None;
            }
            let fp = field_to_focal.apply_forward(&p).ok()?;
            detectors.iter().find_map(|(detector, to_pixels)| {
                to_pixels
                    .apply_forward(&fp)
                    .ok()
                    .filter(|pixel| detector.bbox().contains(pixel))
                    .map(|_| detector.name().to_owned())
            })
        })
        .collect();
    let n_off_chip = chips.iter().filter(|c| c.is_none()).count();
    if n_off_chip > 0 {
        log::warn!(
            "{} out of {} points do not fall on any detector",
            n_off_chip,
            chips.len()
        );
    }
    Ok(chips)
}

/// Pixel coordinates from pupil coordinates in radians
///
/// With [ChipName::Auto], each point is reckoned on the detector it falls on,
/// otherwise on the given detector(s) even if the point falls outside.
/// Points beyond the reach of the inverse distortion are returned as NaN.
/// If `include_distortion` is false, the distortion-free pixel coordinates are returned.
pub fn pixel_coords_from_pupil_coords<C: CameraGeometry>(
    x_pupil: &[f64],
    y_pupil: &[f64],
    chip_name: ChipName,
    camera: &C,
    include_distortion: bool,
) -> Result<PixelCoords> {
    chip_name.check_len(x_pupil.len())?;
    let auto_chips = match chip_name {
        ChipName::Auto => Some(chip_name_from_pupil_coords(x_pupil, y_pupil, camera)?),
        _ => None,
    };
    let mut transforms = TransformCache::new(
        camera,
        CoordSys::FieldAngle,
        pixel_system(include_distortion),
    );
    let mut pixels = PixelCoords::with_capacity(x_pupil.len());
    for (i, p) in points(x_pupil, y_pupil)?.enumerate() {
        let name = match &auto_chips {
            Some(chips) => chips[i].as_deref(),
            None => chip_name.get(i),
        };
        match name {
            Some(name) if is_finite(&p) => match transforms.get(name)?.apply_forward(&p) {
                Ok(pixel) => pixels.push(pixel, Some(name.to_owned())),
                Err(CameraWrapperError::Distortion(theta)) => {
                    log::debug!("no inverse distortion at {theta:e}rd on {name}");
                    pixels.push(Point2::new(f64::NAN, f64::NAN), Some(name.to_owned()))
                }
                Err(e) => return Err(e),
            },
            Some(name) => {
                camera.detector(name)?;
                pixels.push(Point2::new(f64::NAN, f64::NAN), Some(name.to_owned()))
            }
            None => pixels.push_nan(),
        }
    }
    Ok(pixels)
}

/// Pupil coordinates in radians from pixel coordinates
///
/// If `include_distortion` is false, the pixel coordinates are expected to be distortion-free.
pub fn pupil_coords_from_pixel_coords<C: CameraGeometry>(
    x_pix: &[f64],
    y_pix: &[f64],
    chip_name: ChipName,
    camera: &C,
    include_distortion: bool,
) -> Result<(Vec<f64>, Vec<f64>)> {
    if chip_name == ChipName::Auto {
        return Err(CameraWrapperError::ChipNameRequired);
    }
    chip_name.check_len(x_pix.len())?;
    let mut transforms = TransformCache::new(
        camera,
        pixel_system(include_distortion),
        CoordSys::FieldAngle,
    );
    let mut x_pupil = Vec::with_capacity(x_pix.len());
    let mut y_pupil = Vec::with_capacity(x_pix.len());
    for (i, p) in points(x_pix, y_pix)?.enumerate() {
        let name = chip_name
            .get(i)
            .ok_or(CameraWrapperError::ChipNameRequired)?;
        let transform = transforms.get(name)?;
        let pupil = if is_finite(&p) {
            transform.apply_forward(&p)?
        } else {
            Point2::new(f64::NAN, f64::NAN)
        };
        x_pupil.push(pupil.x);
        y_pupil.push(pupil.y);
    }
    Ok((x_pupil, y_pupil))
}

/// Heliocentric position of the Earth in AU in the equatorial frame
///
/// Low precision solar coordinates, good to about 0.01degree between 1950 and 2050
pub fn earth_position(mjd: f64) -> Vector3<f64> {
    let n = mjd - MJD_J2000;
    let mean_longitude = (280.460 + 0.985_647_4 * n).to_radians();
    let mean_anomaly = (357.528 + 0.985_600_3 * n).to_radians();
    let longitude = mean_longitude
        + 1.915f64.to_radians() * mean_anomaly.sin()
        + 0.020f64.to_radians() * (2. * mean_anomaly).sin();
    let obliquity = (23.439 - 4e-7 * n).to_radians();
    let distance = 1.000_14 - 0.016_71 * mean_anomaly.cos() - 0.000_14 * (2. * mean_anomaly).cos();
    let sun = Vector3::new(
        distance * longitude.cos(),
        distance * obliquity.cos() * longitude.sin(),
        distance * obliquity.sin() * longitude.sin(),
    );
    -sun
}

/// Tangent plane basis (east, north) at the pointing
fn tangent_basis(obs: &ObservationMetaData) -> (Vector3<f64>, Vector3<f64>) {
    let (ra, dec) = obs.pointing();
    let east = Vector3::new(-ra.sin(), ra.cos(), 0f64);
    let north = Vector3::new(-dec.sin() * ra.cos(), -dec.sin() * ra.sin(), dec.cos());
    (east, north)
}

/// Pupil coordinates in radians from RA and Dec in radians
///
/// Proper motions (radians/year) are applied from `epoch` to the observation epoch
/// and parallaxes (radians) for the Earth position at the observation date.
/// Objects more than 90degree away from the pointing are returned as NaN.
pub fn pupil_coords_from_ra_dec_rad(
    ra: &[f64],
    dec: &[f64],
    astrometry: &Astrometry,
    obs: &ObservationMetaData,
    epoch: f64,
) -> Result<(Vec<f64>, Vec<f64>)> {
    CameraWrapperError::check_len("declinations", ra.len(), dec.len())?;
    astrometry.check_len(ra.len())?;
    let dt = obs.epoch() - epoch;
    let earth = if astrometry.parallax.is_some() {
        earth_position(obs.mjd())
    } else {
        Vector3::zeros()
    };
    let pointing = obs.pointing_vector();
    let (east, north) = tangent_basis(obs);
    let sky_to_pupil = Rotation2::new(obs.rot_sky_pos());
    let mut x_pupil = Vec::with_capacity(ra.len());
    let mut y_pupil = Vec::with_capacity(ra.len());
    for (i, (&ra, &dec)) in ra.iter().zip(dec).enumerate() {
        let ra = ra + Astrometry::at(&astrometry.pm_ra, i) * dt / dec.cos();
        let dec = dec + Astrometry::at(&astrometry.pm_dec, i) * dt;
        let u = unit_vector(ra, dec) - earth * Astrometry::at(&astrometry.parallax, i);
        let cos_c = u.dot(&pointing) / u.norm();
        if cos_c.is_nan() || cos_c <= 0f64 {
            x_pupil.push(f64::NAN);
            y_pupil.push(f64::NAN);
            continue;
        }
        let u = u / u.norm();
        let tangent = Vector2::new(u.dot(&east), u.dot(&north)) / cos_c;
        let pupil = sky_to_pupil * tangent;
        x_pupil.push(pupil.x);
        y_pupil.push(pupil.y);
    }
    Ok((x_pupil, y_pupil))
}

/// RA and Dec in radians from pupil coordinates in radians
///
/// Parallaxes are not removed
pub fn ra_dec_from_pupil_coords_rad(
    x_pupil: &[f64],
    y_pupil: &[f64],
    obs: &ObservationMetaData,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let pointing = obs.pointing_vector();
    let (east, north) = tangent_basis(obs);
    let pupil_to_sky = Rotation2::new(-obs.rot_sky_pos());
    Ok(points(x_pupil, y_pupil)?
        .map(|p| {
            let tangent = pupil_to_sky * p.coords;
            ra_dec(&(pointing + east * tangent.x + north * tangent.y))
        })
        .unzip())
}

/// Pixel coordinates from RA and Dec in radians
///
/// Proper motions are in radians/year and parallaxes in radians
pub fn pixel_coords_from_ra_dec_rad<C: CameraGeometry>(
    ra: &[f64],
    dec: &[f64],
    astrometry: &Astrometry,
    obs: &ObservationMetaData,
    chip_name: ChipName,
    camera: &C,
    options: ConversionOptions,
) -> Result<PixelCoords> {
    let (x_pupil, y_pupil) = pupil_coords_from_ra_dec_rad(ra, dec, astrometry, obs, options.epoch)?;
    pixel_coords_from_pupil_coords(
        &x_pupil,
        &y_pupil,
        chip_name,
        camera,
        options.include_distortion,
    )
}

/// RA and Dec in radians from pixel coordinates
///
/// The positions are returned at the observation epoch, parallaxes are not removed
pub fn ra_dec_from_pixel_coords_rad<C: CameraGeometry>(
    x_pix: &[f64],
    y_pix: &[f64],
    chip_name: ChipName,
    camera: &C,
    obs: &ObservationMetaData,
    options: ConversionOptions,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let (x_pupil, y_pupil) =
        pupil_coords_from_pixel_coords(x_pix, y_pix, chip_name, camera, options.include_distortion)?;
    ra_dec_from_pupil_coords_rad(&x_pupil, &y_pupil, obs)
}
