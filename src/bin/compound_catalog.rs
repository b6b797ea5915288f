//! Compound catalog of stars, galaxy bulges, galaxy disks and AGN
//!
//! Places synthetic populations around a telescope pointing on the LSST camera detectors
//! and writes their pixel coordinates into a single catalog.
//!
//! ```shell
//! cargo run --release --features driver --bin compound_catalog -- --observation observation.toml --catalog catalog.txt
//! ```

use std::{
    fs::OpenOptions,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::Parser;

use imsim_camera::{
    Astrometry, Builder, CameraWrapper, ChipName, ConversionOptions, LsstCameraWrapper,
    ObservationBuilder, ObservationMetaData,
};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{rngs::StdRng, Rng, SeedableRng};

const CHUNK_SIZE: usize = 100;

/// Command line arguments of the compound catalog
#[derive(Parser, Debug)]
#[command(version, about = "Stars, galaxies and AGN placed on the LSST camera detectors")]
struct Args {
    /// Observation metadata toml file, default pointing if not given
    #[arg(long)]
    observation: Option<PathBuf>,

    /// Output catalog
    #[arg(long, default_value = "galSim_compound_example.txt")]
    catalog: PathBuf,

    /// Random seed of the synthetic populations
    #[arg(long, default_value_t = 1133)]
    seed: u64,

    /// Number of stars
    #[arg(long, default_value_t = 2_000)]
    stars: usize,

    /// Number of galaxy bulges
    #[arg(long, default_value_t = 800)]
    bulges: usize,

    /// Number of galaxy disks
    #[arg(long, default_value_t = 800)]
    disks: usize,

    /// Number of AGN
    #[arg(long, default_value_t = 100)]
    agn: usize,
}

#[derive(Debug, Clone, Copy)]
enum Population {
    Stars,
    Bulges,
    Disks,
    Agn,
}
impl Population {
    fn name(&self) -> &'static str {
        match self {
            Population::Stars => "star",
            Population::Bulges => "bulge",
            Population::Disks => "disk",
            Population::Agn => "agn",
        }
    }
    fn size(&self, args: &Args) -> usize {
        match self {
            Population::Stars => args.stars,
            Population::Bulges => args.bulges,
            Population::Disks => args.disks,
            Population::Agn => args.agn,
        }
    }
    /// Unique id offset of the population
    fn id_offset(&self) -> usize {
        match self {
            Population::Stars => 0,
            Population::Bulges => 1_000_000,
            Population::Disks => 2_000_000,
            Population::Agn => 3_000_000,
        }
    }
}

/// Synthetic objects in degrees, arcsec/yr and arcsec
struct Objects {
    ra: Vec<f64>,
    dec: Vec<f64>,
    mag_norm: Vec<f64>,
    astrometry: Astrometry,
}
impl Objects {
    /// Objects uniformly distributed within the field of view
    fn new(population: Population, n: usize, obs: &ObservationMetaData, rng: &mut StdRng) -> Self {
        let (ra0, dec0) = obs.pointing_degrees();
        let radius = obs.bound_length().to_degrees();
        let mut ra = Vec::with_capacity(n);
        let mut dec = Vec::with_capacity(n);
        for _ in 0..n {
            let r = radius * rng.gen::<f64>().sqrt();
            let phi = rng.gen_range(0f64..std::f64::consts::TAU);
            let d = dec0 + r * phi.sin();
            ra.push((ra0 + r * phi.cos() / d.to_radians().cos()).rem_euclid(360.));
            dec.push(d.clamp(-90., 90.));
        }
        let mag_norm = (0..n).map(|_| rng.gen_range(16f64..26f64)).collect();
        let astrometry = match population {
            Population::Stars => Astrometry::default()
                .proper_motion(
                    (0..n).map(|_| rng.gen_range(-0.05..0.05)).collect(),
                    (0..n).map(|_| rng.gen_range(-0.05..0.05)).collect(),
                )
                .parallax((0..n).map(|_| rng.gen_range(0f64..0.01)).collect())
                .radial_velocity((0..n).map(|_| rng.gen_range(-100f64..100f64)).collect()),
            _ => Astrometry::default(),
        };
        Self {
            ra,
            dec,
            mag_norm,
            astrometry,
        }
    }
    fn chunk(&self, range: std::ops::Range<usize>) -> (&[f64], &[f64], Astrometry) {
        let slice = |values: &Option<Vec<f64>>| values.as_ref().map(|v| v[range.clone()].to_vec());
        (
            &self.ra[range.clone()],
            &self.dec[range.clone()],
            Astrometry {
                pm_ra: slice(&self.astrometry.pm_ra),
                pm_dec: slice(&self.astrometry.pm_dec),
                parallax: slice(&self.astrometry.parallax),
                v_rad: slice(&self.astrometry.v_rad),
            },
        )
    }
}

/// Writes the objects that land on a detector, returns their number
fn write_catalog<W: CameraWrapper, P: AsRef<Path>>(
    path: P,
    population: Population,
    objects: &Objects,
    wrapper: &W,
    obs: &ObservationMetaData,
    write_header: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(!write_header)
        .truncate(write_header)
        .open(&path)?;
    let mut buffer = BufWriter::new(file);
    if write_header {
        writeln!(
            buffer,
            "# uniqueId chipName xPix yPix raJ2000 decJ2000 magNorm objectType"
        )?;
    }
    let n = objects.ra.len();
    let pb = ProgressBar::new(n as u64);
    pb.set_style(ProgressStyle::with_template(
        "{msg:>6} [{bar:40}] {pos}/{len}",
    )?);
    pb.set_message(population.name());
    let mut n_on_chip = 0;
    for start in (0..n).step_by(CHUNK_SIZE) {
        let range = start..n.min(start + CHUNK_SIZE);
        let (ra, dec, astrometry) = objects.chunk(range.clone());
        let pixels = wrapper.pixel_coords_from_ra_dec(
            ra,
            dec,
            &astrometry,
            obs,
            ChipName::Auto,
            ConversionOptions::default(),
        )?;
        for (k, i) in range.enumerate() {
            if let Some(chip) = &pixels.chips[k] {
                writeln!(
                    buffer,
                    "{} {} {:.4} {:.4} {:.8} {:.8} {:.3} {}",
                    population.id_offset() + i,
                    chip.replace(' ', "_"),
                    pixels.x[k],
                    pixels.y[k],
                    objects.ra[i],
                    objects.dec[i],
                    objects.mag_norm[i],
                    population.name()
                )?;
                n_on_chip += 1;
            }
        }
        pb.inc(ra.len() as u64);
    }
    pb.finish();
    buffer.flush()?;
    Ok(n_on_chip)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let obs = match &args.observation {
        Some(path) => ObservationBuilder::load(path)?,
        None => ObservationBuilder::default()
            .pointing(53.0, -27.5)
            .bound_length(0.05),
    }
    .build()?;

    let wrapper = LsstCameraWrapper::new()?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    for (i, population) in [
        Population::Stars,
        Population::Bulges,
        Population::Disks,
        Population::Agn,
    ]
    .into_iter()
    .enumerate()
    {
        let size = population.size(&args);
        let objects = Objects::new(population, size, &obs, &mut rng);
        let n = write_catalog(&args.catalog, population, &objects, &wrapper, &obs, i == 0)?;
        log::info!(
            "{}: {} out of {} objects on the detectors",
            population.name(),
            n,
            size
        );
        println!("done with {}s", population.name());
    }

    Ok(())
}
