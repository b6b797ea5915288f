use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use imsim_camera::{
    Astrometry, Builder, Camera, CameraBuilder, CameraGeometry, CameraWrapper,
    CameraWrapperError, ChipName, ConversionOptions, Detector, DetectorGeometry, FromBuilder,
    GalSimCameraWrapper, LsstCameraWrapper, ObservationMetaData, Transform,
};
use nanorand::{Rng, WyRand};

const CHIPS: [&str; 5] = [
    "R:2,2 S:1,1",
    "R:0,1 S:0,0",
    "R:1,3 S:2,0",
    "R:4,2 S:2,2",
    "R:3,0 S:1,2",
];

fn obs() -> ObservationMetaData {
    ObservationMetaData::builder()
        .pointing(53.0, -27.5)
        .rot_sky_pos(20.)
        .mjd(60_000.)
        .build()
        .unwrap()
}

/// Random pixels within the detector bounding box in the wrapper convention
fn random_pixels<W: CameraWrapper>(
    wrapper: &W,
    rng: &mut WyRand,
    n: usize,
) -> (Vec<&'static str>, Vec<f64>, Vec<f64>) {
    let mut chips = vec![];
    let mut x = vec![];
    let mut y = vec![];
    for _ in 0..n {
        let chip = CHIPS[rng.generate_range(0..CHIPS.len())];
        let bbox = wrapper.bbox(chip).unwrap();
        chips.push(chip);
        x.push(bbox.min.x as f64 + rng.generate::<f64>() * (bbox.width() - 1) as f64);
        y.push(bbox.min.y as f64 + rng.generate::<f64>() * (bbox.height() - 1) as f64);
    }
    (chips, x, y)
}

fn pixel_round_trip<W: CameraWrapper>(wrapper: &W) -> anyhow::Result<()> {
    let mut rng = WyRand::new_seed(7);
    let (chips, x, y) = random_pixels(wrapper, &mut rng, 50);
    for include_distortion in [true, false] {
        let (x_pupil, y_pupil) = wrapper.pupil_coords_from_pixel_coords(
            &x,
            &y,
            ChipName::PerPoint(&chips),
            include_distortion,
        )?;
        let pixels = wrapper.pixel_coords_from_pupil_coords(
            &x_pupil,
            &y_pupil,
            ChipName::PerPoint(&chips),
            include_distortion,
        )?;
        for i in 0..x.len() {
            assert!((pixels.x[i] - x[i]).abs() < 1e-6);
            assert!((pixels.y[i] - y[i]).abs() < 1e-6);
        }
    }
    let (x_pupil, y_pupil) =
        wrapper.pupil_coords_from_pixel_coords(&x, &y, ChipName::PerPoint(&chips), true)?;
    let pixels = wrapper.pixel_coords_from_pupil_coords(&x_pupil, &y_pupil, ChipName::Auto, true)?;
    for i in 0..x.len() {
        assert_eq!(pixels.chips[i].as_deref(), Some(chips[i]));
        assert!((pixels.x[i] - x[i]).abs() < 1e-6);
        assert!((pixels.y[i] - y[i]).abs() < 1e-6);
    }
    Ok(())
}

#[test]
fn galsim_round_trip() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    pixel_round_trip(&GalSimCameraWrapper::new(CameraBuilder::lsst().build()?))
}

#[test]
fn lsst_round_trip() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    pixel_round_trip(&LsstCameraWrapper::new()?)
}

/// Regular grid of pixels spanning the bounding box, corners and center pixel included
fn pixel_grid<W: CameraWrapper>(wrapper: &W, chip: &str) -> anyhow::Result<(Vec<f64>, Vec<f64>)> {
    const N: i32 = 4;
    let bbox = wrapper.bbox(chip)?;
    let mut x = vec![];
    let mut y = vec![];
    for i in 0..=N {
        for j in 0..=N {
            x.push(bbox.min.x as f64 + (i * (bbox.width() - 1)) as f64 / N as f64);
            y.push(bbox.min.y as f64 + (j * (bbox.height() - 1)) as f64 / N as f64);
        }
    }
    let center = wrapper.center_pixel(chip)?;
    x.push(center.x);
    y.push(center.y);
    Ok((x, y))
}

fn every_detector_round_trip<W: CameraWrapper>(wrapper: &W) -> anyhow::Result<()> {
    let chips: Vec<String> = wrapper
        .camera()
        .detectors()
        .map(|d| d.name().to_owned())
        .collect();
    assert_eq!(chips.len(), 189);
    for chip in &chips {
        let (x, y) = pixel_grid(wrapper, chip)?;
        for include_distortion in [true, false] {
            let (x_pupil, y_pupil) = wrapper.pupil_coords_from_pixel_coords(
                &x,
                &y,
                chip.as_str().into(),
                include_distortion,
            )?;
            let (x_pix, y_pix) = wrapper
                .pixel_coords_from_pupil_coords(
                    &x_pupil,
                    &y_pupil,
                    ChipName::from(chip.as_str()),
                    include_distortion,
                )?
                .into_rows();
            for i in 0..x.len() {
                assert!(
                    (x_pix[i] - x[i]).abs() < 1e-6 && (y_pix[i] - y[i]).abs() < 1e-6,
                    "{chip} ({},{}) -> ({},{})",
                    x[i],
                    y[i],
                    x_pix[i],
                    y_pix[i]
                );
            }
        }
        let names = vec![chip.as_str(); x.len()];
        let (x_pupil, y_pupil) =
            wrapper.pupil_coords_from_pixel_coords(&x, &y, names.as_slice().into(), true)?;
        let pixels =
            wrapper.pixel_coords_from_pupil_coords(&x_pupil, &y_pupil, ChipName::from(None), true)?;
        for i in 0..x.len() {
            assert_eq!(pixels.chips[i].as_deref(), Some(chip.as_str()));
            assert!((pixels.x[i] - x[i]).abs() < 1e-6);
            assert!((pixels.y[i] - y[i]).abs() < 1e-6);
        }
    }
    Ok(())
}

#[test]
fn galsim_every_detector() -> anyhow::Result<()> {
    every_detector_round_trip(&GalSimCameraWrapper::new(CameraBuilder::lsst().build()?))
}

#[test]
fn lsst_every_detector() -> anyhow::Result<()> {
    every_detector_round_trip(&LsstCameraWrapper::new()?)
}

#[test]
fn sky_round_trip() -> anyhow::Result<()> {
    let wrapper = LsstCameraWrapper::new()?;
    let obs = obs();
    let mut rng = WyRand::new_seed(11);
    let (chips, x, y) = random_pixels(&wrapper, &mut rng, 20);
    let options = ConversionOptions::default();
    let (ra, dec) =
        wrapper.ra_dec_from_pixel_coords(&x, &y, ChipName::PerPoint(&chips), &obs, options)?;
    let pixels = wrapper.pixel_coords_from_ra_dec(
        &ra,
        &dec,
        &Astrometry::default(),
        &obs,
        ChipName::Auto,
        options,
    )?;
    for i in 0..x.len() {
        assert_eq!(pixels.chips[i].as_deref(), Some(chips[i]));
        assert!((pixels.x[i] - x[i]).abs() < 1e-5);
        assert!((pixels.y[i] - y[i]).abs() < 1e-5);
    }
    Ok(())
}

#[test]
fn center_pixel_swap() -> anyhow::Result<()> {
    let lsst = LsstCameraWrapper::new()?;
    let galsim = GalSimCameraWrapper::new(CameraBuilder::lsst().build()?);
    for chip in CHIPS {
        let c = lsst.center_pixel(chip)?;
        let g = galsim.center_pixel(chip)?;
        assert_eq!(c.x, g.y);
        assert_eq!(c.y, g.x);
        let bl = lsst.bbox(chip)?;
        let bg = galsim.bbox(chip)?;
        assert_eq!(bl.min.x, bg.min.y);
        assert_eq!(bl.max.x, bg.max.y);
        assert_eq!(bl.min.y, bg.min.x);
        assert_eq!(bl.max.y, bg.max.x);
        let (xmin, xmax, ymin, ymax) = galsim.tan_pixel_bounds(chip)?.as_tuple();
        assert_eq!(lsst.tan_pixel_bounds(chip)?.as_tuple(), (ymin, ymax, xmin, xmax));
    }
    Ok(())
}

#[test]
fn reflection_about_the_center() -> anyhow::Result<()> {
    let lsst = LsstCameraWrapper::new()?;
    let galsim = GalSimCameraWrapper::new(CameraBuilder::lsst().build()?);
    let chip = "R:3,0 S:1,2";
    let c = lsst.center_pixel(chip)?;
    let k = 250.;
    let pupil_lsst =
        lsst.pupil_coords_from_pixel_coords(&[c.x + k], &[c.y], ChipName::Single(chip), true)?;
    // camera (cx + k, cy) is geometry (cy, cx - k)
    let pupil_galsim =
        galsim.pupil_coords_from_pixel_coords(&[c.y], &[c.x - k], ChipName::Single(chip), true)?;
    assert!((pupil_lsst.0[0] - pupil_galsim.0[0]).abs() < 1e-15);
    assert!((pupil_lsst.1[0] - pupil_galsim.1[0]).abs() < 1e-15);
    Ok(())
}

#[test]
fn degrees_and_arcseconds() -> anyhow::Result<()> {
    let wrapper = LsstCameraWrapper::new()?;
    let obs = obs();
    let ra = [53.05, 52.9, 53.3];
    let dec = [-27.45, -27.6, -27.2];
    let astrometry = Astrometry::default()
        .proper_motion(vec![0.5, -1.2, 3.0], vec![2.0, 0.1, -0.7])
        .parallax(vec![0.01, 0.2, 0.05])
        .radial_velocity(vec![10., -30., 0.]);
    let options = ConversionOptions::default().epoch(1990.);
    let chip = ChipName::Single("R:2,2 S:1,1");
    let in_degrees =
        wrapper.pixel_coords_from_ra_dec(&ra, &dec, &astrometry, &obs, chip, options)?;
    let arcsec = std::f64::consts::PI / 180. / 3600.;
    let astrometry_rad = Astrometry::default()
        .proper_motion(
            vec![0.5 * arcsec, -1.2 * arcsec, 3.0 * arcsec],
            vec![2.0 * arcsec, 0.1 * arcsec, -0.7 * arcsec],
        )
        .parallax(vec![0.01 * arcsec, 0.2 * arcsec, 0.05 * arcsec]);
    let in_radians = wrapper.pixel_coords_from_ra_dec_rad(
        &ra.map(f64::to_radians),
        &dec.map(f64::to_radians),
        &astrometry_rad,
        &obs,
        chip,
        options,
    )?;
    for i in 0..ra.len() {
        assert!((in_degrees.x[i] - in_radians.x[i]).abs() < 1e-6);
        assert!((in_degrees.y[i] - in_radians.y[i]).abs() < 1e-6);
    }
    let auto_degrees =
        wrapper.pixel_coords_from_ra_dec(&ra, &dec, &astrometry, &obs, ChipName::Auto, options)?;
    let auto_radians = wrapper.pixel_coords_from_ra_dec_rad(
        &ra.map(f64::to_radians),
        &dec.map(f64::to_radians),
        &astrometry_rad,
        &obs,
        ChipName::Auto,
        options,
    )?;
    assert_eq!(auto_degrees.chips, auto_radians.chips);
    // 10 more years of proper motion
    let at_2000 = wrapper.pixel_coords_from_ra_dec(
        &ra,
        &dec,
        &astrometry,
        &obs,
        chip,
        ConversionOptions::default(),
    )?;
    for i in 0..ra.len() {
        assert!((in_degrees.x[i] - at_2000.x[i]).hypot(in_degrees.y[i] - at_2000.y[i]) > 1.);
    }
    Ok(())
}

#[test]
fn sky_accessors_units() -> anyhow::Result<()> {
    let wrapper = GalSimCameraWrapper::new(CameraBuilder::lsst().build()?);
    let obs = obs();
    let options = ConversionOptions::default().include_distortion(false);
    let (ra_deg, dec_deg) = wrapper.ra_dec_from_pixel_coords(
        &[1000.],
        &[500.],
        ChipName::Single("R:2,2 S:1,1"),
        &obs,
        options,
    )?;
    let (ra_rad, dec_rad) = wrapper.ra_dec_from_pixel_coords_rad(
        &[1000.],
        &[500.],
        ChipName::Single("R:2,2 S:1,1"),
        &obs,
        options,
    )?;
    assert!((ra_deg[0] - ra_rad[0].to_degrees()).abs() < 1e-12);
    assert!((dec_deg[0] - dec_rad[0].to_degrees()).abs() < 1e-12);
    assert!((ra_deg[0] - 53.0).abs() < 0.2);
    assert!((dec_deg[0] + 27.5).abs() < 0.2);
    Ok(())
}

#[test]
fn off_detector_sky_points() -> anyhow::Result<()> {
    let wrapper = LsstCameraWrapper::new()?;
    let obs = obs();
    let pixels = wrapper.pixel_coords_from_ra_dec(
        &[53.0, 80.0, 233.0],
        &[-27.5, -27.5, 27.5],
        &Astrometry::default(),
        &obs,
        ChipName::Auto,
        ConversionOptions::default(),
    )?;
    assert!(pixels.chips[0].is_some());
    for i in 1..3 {
        assert!(pixels.chips[i].is_none());
        assert!(pixels.x[i].is_nan() && pixels.y[i].is_nan());
    }
    Ok(())
}

#[test]
fn errors() -> anyhow::Result<()> {
    let wrapper = LsstCameraWrapper::new()?;
    assert!(matches!(
        wrapper.center_pixel("R:4,4 S:1,1"),
        Err(CameraWrapperError::DetectorNotFound(_))
    ));
    assert!(matches!(
        wrapper.pixel_coords_from_pupil_coords(&[0.], &[0.], ChipName::Single("S00"), true),
        Err(CameraWrapperError::DetectorNotFound(_))
    ));
    assert!(matches!(
        wrapper.pixel_coords_from_ra_dec(
            &[53.0, 53.1],
            &[-27.5, -27.4],
            &Astrometry::default().parallax(vec![0.1]),
            &obs(),
            ChipName::Auto,
            ConversionOptions::default(),
        ),
        Err(CameraWrapperError::LengthMismatch { .. })
    ));
    assert!(matches!(
        wrapper.pupil_coords_from_pixel_coords(
            &[0., 1.],
            &[0.],
            ChipName::Single("R:2,2 S:1,1"),
            true
        ),
        Err(CameraWrapperError::LengthMismatch { .. })
    ));
    Ok(())
}

/// Camera geometry counting the detector queries
struct Counting {
    camera: Camera,
    calls: AtomicUsize,
}
impl Counting {
    fn new() -> Self {
        Self {
            camera: Camera::builder().build().unwrap(),
            calls: AtomicUsize::new(0),
        }
    }
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}
impl CameraGeometry for Counting {
    type Detector = DetectorGeometry;
    fn detector(&self, name: &str) -> imsim_camera::Result<&DetectorGeometry> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.camera.detector(name)
    }
    fn detectors(&self) -> impl Iterator<Item = &DetectorGeometry> {
        self.camera.detectors()
    }
    fn focal_to_field(&self) -> Transform {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.camera.focal_to_field()
    }
}

#[test]
fn memoization() -> anyhow::Result<()> {
    let wrapper = GalSimCameraWrapper::new(Counting::new());
    let chip = "R:1,2 S:0,1";
    let bbox = wrapper.bbox(chip)?;
    assert_eq!(wrapper.bbox(chip)?, bbox);
    assert_eq!(wrapper.camera().calls(), 1);
    let center = wrapper.center_pupil(chip)?;
    assert_eq!(wrapper.center_pupil(chip)?, center);
    // one detector query and the focal plane to field angle transform
    assert_eq!(wrapper.camera().calls(), 3);
    let corners = wrapper.corner_pupils(chip)?;
    assert!(Arc::ptr_eq(&corners, &wrapper.corner_pupils(chip)?));
    assert_eq!(wrapper.camera().calls(), 4);
    wrapper.focal_to_field();
    wrapper.tan_pixel_bounds(chip)?;
    wrapper.tan_pixel_bounds(chip)?;
    assert_eq!(wrapper.camera().calls(), 5);
    assert_eq!(wrapper.core().n_cached(), 1);
    Ok(())
}

#[test]
fn independent_caches() -> anyhow::Result<()> {
    let camera = Arc::new(Counting::new());
    let a = LsstCameraWrapper::with_camera(Arc::clone(&camera));
    let b = LsstCameraWrapper::with_camera(Arc::clone(&camera));
    let chip = "R:2,3 S:2,2";
    a.center_pixel(chip)?;
    a.center_pixel(chip)?;
    assert_eq!(camera.calls(), 1);
    b.center_pixel(chip)?;
    assert_eq!(camera.calls(), 2);
    assert_eq!(a.core().n_cached(), 0);
    Ok(())
}

#[test]
fn shared_across_threads() -> anyhow::Result<()> {
    let wrapper = Arc::new(LsstCameraWrapper::new()?);
    let handles: Vec<_> = CHIPS
        .iter()
        .map(|&chip| {
            let wrapper = Arc::clone(&wrapper);
            std::thread::spawn(move || wrapper.corner_pupils(chip).map(|c| c.len()))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap()?, 4);
    }
    Ok(())
}
