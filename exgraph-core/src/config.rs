use crate::{debug::DebugMask, error::GraphError};
use nanoserde::DeJson;
use std::path::Path;

/// Graph configuration.
///
/// Every field is optional in json, missing fields take their default.
#[derive(DeJson, Debug, Clone, Default, PartialEq)]
pub struct GraphConfig {
    /// Inference mode, nothing is recorded for backward and
    /// buffers are released as soon as all consumers ran
    #[nserde(default)]
    pub inference: bool,
    /// Enables gradient checkpointing
    #[nserde(default)]
    pub checkpointing: bool,
    /// Check trainable values and gradients for NaN and Inf
    #[nserde(default)]
    pub throw_nan: bool,
    /// First NaN or Inf found is returned as an error
    #[nserde(default)]
    pub abort_on_nan: bool,
    /// Maximum L2 norm of intermediate gradients used by backprop, zero disables clipping
    #[nserde(default)]
    pub clip_norm: f32,
    /// Seed for backend random number generator, zero keeps backend default
    #[nserde(default)]
    pub seed: u64,
    /// Debug mask, see [`DebugMask`]
    #[nserde(default)]
    pub debug: u32,
}

impl GraphConfig {
    /// Parse config from json
    pub fn from_json(json: &str) -> Result<GraphConfig, GraphError> {
        GraphConfig::deserialize_json(json).map_err(|e| GraphError::Parse(format!("{e:?}")))
    }

    /// Read and parse config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<GraphConfig, GraphError> {
        let file = std::fs::read_to_string(path)?;
        GraphConfig::from_json(&file)
    }

    /// Search through config directories and find exgraph/graph_config.json.
    /// If not found or failed to parse, use defaults.
    #[must_use]
    pub fn discover() -> GraphConfig {
        let debug = DebugMask::from_env(0);
        let config = xdg::BaseDirectories::new()
            .map_err(|e| {
                if debug.memory() {
                    println!("Failed to find config directories for graph_config.json, {e}");
                }
            })
            .ok()
            .map(|bd| {
                let mut dirs = bd.get_config_dirs();
                dirs.push(bd.get_config_home());
                dirs
            })
            .and_then(|paths| {
                paths.into_iter().find_map(|mut path| {
                    path.push("exgraph/graph_config.json");
                    std::fs::read_to_string(&path).ok()
                })
            })
            .and_then(|file| {
                GraphConfig::from_json(&file)
                    .map_err(|e| {
                        if debug.memory() {
                            println!("Failed to parse graph_config.json, {e}");
                        }
                    })
                    .ok()
            });
        match config {
            Some(config) => {
                if debug.memory() {
                    println!("Graph config successfully read and parsed.");
                }
                config
            }
            None => {
                if debug.memory() {
                    println!("Failed to get graph config, using defaults.");
                }
                GraphConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json() -> Result<(), GraphError> {
        let config = GraphConfig::from_json(r#"{"checkpointing": true, "clip_norm": 5.0}"#)?;
        assert!(config.checkpointing);
        assert!(!config.inference);
        assert_eq!(config.clip_norm, 5.0);
        assert_eq!(config.seed, 0);
        Ok(())
    }

    #[test]
    fn broken_json() {
        assert!(matches!(
            GraphConfig::from_json("{\"inference\": "),
            Err(GraphError::Parse(_))
        ));
    }
}
