// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config = parse_config(path, &contents)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(path: &Path, contents: &str) -> Result<Config> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")
        }
        _ => serde_json::from_str(contents).context("Failed to parse JSON config"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_the_fallback_format() {
        let json = r#"{"listen":"127.0.0.1:9999","backends":["http://127.0.0.1:1"]}"#;
        let config = parse_config(Path::new("lb.conf"), json).unwrap();
        assert_eq!(config.listen.port(), 9999);
        assert_eq!(config.backends.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let err = load_config("/nonexistent/lb.yaml").await.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
