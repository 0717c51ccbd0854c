pub mod error;
pub mod export;
pub mod generators;
pub mod interp;
pub mod mesh;
pub mod mesher;
pub mod settings;
pub mod types;
pub mod utils;
pub mod volume;

pub use error::{LevelSetError, Result};
pub use export::{save_obj, to_obj_string, volume_to_obj, write_obj};
pub use generators::{DEFAULT_BACKGROUND, create_box, create_function, create_noise, make_sphere};
pub use mesh::PolygonMesh;
pub use mesher::volume_to_mesh;
pub use settings::MeshSettings;
pub use volume::Volume;
