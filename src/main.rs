use levelset_mesh::{
    DEFAULT_BACKGROUND, MeshSettings, Result, create_function, create_noise, save_obj,
    types::{Coord, Extent, Value, Vector},
    volume_to_mesh,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

const EXTENT: i32 = 60;
const NOISE_SCALE: Value = 0.1;
const ISO_VALUE: Value = 0.0;
const ADAPTIVITY: Value = 0.0;
const OUTPUT_PATH: &str = "out.obj";

fn main() -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let extent = Extent::repeat(EXTENT);

    info!(extent = EXTENT, "building height field");
    // negative below the y = 0 plane
    let mut terrain = create_function(extent, &|c: Coord| c.y as Value, DEFAULT_BACKGROUND);

    info!(scale = NOISE_SCALE, "adding noise");
    terrain.sum(create_noise(extent, Vector::repeat(NOISE_SCALE)));

    let settings = MeshSettings::default()
        .with_iso_value(ISO_VALUE)
        .with_adaptivity(ADAPTIVITY);
    let mesh = volume_to_mesh(&terrain, &settings)?;

    save_obj(&mesh, OUTPUT_PATH)?;
    Ok(())
}
