//! Settings of a mapping session.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingSettings {
    /// Owning tool name written on new identifier maps.
    pub tool_name: String,
    /// Explicit identifier map name; derived from the tool and model names when unset.
    pub map_name: Option<String>,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            tool_name: "hubmap".to_string(),
            map_name: None,
        }
    }
}

impl MappingSettings {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// The name of the identifier map for `model_name`.
    pub fn map_name(&self, model_name: &str) -> String {
        self.map_name
            .clone()
            .unwrap_or_else(|| format!("{} - {model_name}", self.tool_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_name() {
        let settings = MappingSettings::default();
        assert_eq!(settings.map_name("Satellite"), "hubmap - Satellite");

        let settings = MappingSettings {
            map_name: Some("custom".into()),
            ..Default::default()
        };
        assert_eq!(settings.map_name("Satellite"), "custom");
    }

    #[test]
    fn test_partial_json() {
        let settings: MappingSettings =
            serde_json::from_str(r#"{"map_name": "Power budget"}"#).unwrap();
        assert_eq!(settings.tool_name, "hubmap");
        assert_eq!(settings.map_name("Satellite"), "Power budget");
    }
}
