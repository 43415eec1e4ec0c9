use exgraph_core::{GraphConfig, GraphError};
use std::path::PathBuf;

fn scratch(name: &str) -> Result<PathBuf, GraphError> {
    let dir = std::env::temp_dir().join(format!("exgraph-{}-{name}", std::process::id()));
    std::fs::create_dir_all(dir.join("exgraph"))?;
    Ok(dir)
}

#[test]
fn from_file() -> Result<(), GraphError> {
    let dir = scratch("file")?;
    let path = dir.join("graph_config.json");
    std::fs::write(&path, r#"{"inference": true, "seed": 7}"#)?;
    let config = GraphConfig::from_file(&path)?;
    assert!(config.inference);
    assert_eq!(config.seed, 7);
    assert!(matches!(
        GraphConfig::from_file(dir.join("missing.json")),
        Err(GraphError::Io(_))
    ));
    std::fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn discover() -> Result<(), GraphError> {
    let dir = scratch("xdg")?;
    std::fs::write(
        dir.join("exgraph/graph_config.json"),
        r#"{"checkpointing": true, "clip_norm": 2.5}"#,
    )?;
    std::env::set_var("XDG_CONFIG_HOME", &dir);
    std::env::set_var("XDG_CONFIG_DIRS", dir.join("none"));
    let config = GraphConfig::discover();
    assert!(config.checkpointing);
    assert_eq!(config.clip_norm, 2.5);

    // broken file falls back to defaults
    std::fs::write(dir.join("exgraph/graph_config.json"), "{")?;
    assert_eq!(GraphConfig::discover(), GraphConfig::default());
    std::fs::remove_dir_all(dir)?;
    Ok(())
}
