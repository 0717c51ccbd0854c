use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, LevelSetError>;

#[derive(Debug, Display, From)]
pub enum LevelSetError {
    /// Opening or writing the mesh file failed.
    #[display("mesh output failed: {_0}")]
    Io(std::io::Error),

    /// A polygon referenced a vertex past the end of the vertex list.
    #[display("polygon index {index} out of range for {vertex_count} vertices")]
    #[from(skip)]
    InvalidIndex { index: usize, vertex_count: usize },

    #[display("invalid mesh settings: {_0}")]
    #[from(skip)]
    InvalidSettings(String),

    #[display("volume has no stored voxels")]
    #[from(skip)]
    EmptyVolume,
}

impl std::error::Error for LevelSetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LevelSetError::Io(err) => Some(err),
            _ => None,
        }
    }
}
