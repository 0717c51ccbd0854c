use crate::{
    error::{LevelSetError, Result},
    types::Value,
};

/// Iso-surface extraction parameters.
///
/// ```rust,ignore
/// let settings = MeshSettings::default().with_iso_value(0.0).with_adaptivity(0.3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshSettings {
    /// The surface is where the field crosses this value. Corners `<= iso_value` are inside.
    pub iso_value: Value,
    /// `0` keeps one vertex per surface cell; up to `1` merges vertices across flat regions.
    pub adaptivity: Value,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            iso_value: 0.0,
            adaptivity: 0.0,
        }
    }
}

impl MeshSettings {
    /// Sets the iso-surface threshold.
    pub fn with_iso_value(mut self, iso_value: Value) -> Self {
        self.iso_value = iso_value;
        self
    }

    /// Sets the adaptivity, expected in `[0, 1]`.
    pub fn with_adaptivity(mut self, adaptivity: Value) -> Self {
        self.adaptivity = adaptivity;
        self
    }

    /// Checks the iso value is finite and the adaptivity lies in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !self.iso_value.is_finite() {
            return Err(LevelSetError::InvalidSettings(format!(
                "iso value must be finite, got {}",
                self.iso_value
            )));
        }
        if !(0.0..=1.0).contains(&self.adaptivity) {
            return Err(LevelSetError::InvalidSettings(format!(
                "adaptivity must be within [0, 1], got {}",
                self.adaptivity
            )));
        }
        Ok(())
    }
}
