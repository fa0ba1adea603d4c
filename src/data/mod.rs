//! Data document loading.
//!
//! A data path names a JSON or YAML file, or a directory whose `.json`,
//! `.yaml` and `.yml` files are loaded in file-name order. Each document has
//! its `$ref`s resolved, then the documents are shallow-merged: top-level
//! keys of later documents replace those of earlier ones.

mod refs;

use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::common::{Error, Result};

pub use refs::dereference;

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Yaml,
}

impl DataFormat {
    /// Format implied by a file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(DataFormat::Json),
            "yaml" | "yml" => Some(DataFormat::Yaml),
            _ => None,
        }
    }
}

/// Parse document text and resolve its `$ref`s.
pub fn parse_document(text: &str, format: DataFormat) -> Result<Value> {
    let value: Value = match format {
        DataFormat::Json => serde_json::from_str(text)?,
        DataFormat::Yaml => serde_saphyr::from_str(text)?,
    };
    dereference(&value)
}

/// Load one data file.
pub async fn load_file(path: &Path) -> Result<Value> {
    let format = DataFormat::from_path(path).ok_or_else(|| {
        Error::Data(format!(
            "unsupported data file extension: {}",
            path.display()
        ))
    })?;
    let text = tokio::fs::read_to_string(path).await?;
    let value = parse_document(&text, format)
        .map_err(|e| Error::Data(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), "loaded data file");
    Ok(value)
}

/// Data files inside `dir`, sorted by file name.
async fn data_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && DataFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Load a data file or directory into one object.
pub async fn load_data(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let metadata = tokio::fs::metadata(path).await?;
    let files = if metadata.is_dir() {
        data_files(path).await?
    } else {
        vec![path.to_path_buf()]
    };

    let documents = try_join_all(files.iter().map(|file| load_file(file))).await?;
    let sources: Vec<(&Path, Value)> = files
        .iter()
        .map(PathBuf::as_path)
        .zip(documents)
        .collect();
    let data = merge_documents(sources)?;
    info!(path = %path.display(), files = files.len(), "loaded data");
    Ok(data)
}

/// Load several data paths concurrently and merge them in the given order.
pub async fn load_data_paths(paths: &[PathBuf]) -> Result<Value> {
    let documents = try_join_all(paths.iter().map(load_data)).await?;
    let sources: Vec<(&Path, Value)> = paths
        .iter()
        .map(PathBuf::as_path)
        .zip(documents)
        .collect();
    merge_documents(sources)
}

/// Shallow-merge top-level objects, later sources winning.
pub fn merge_documents<'a, I>(sources: I) -> Result<Value>
where
    I: IntoIterator<Item = (&'a Path, Value)>,
{
    let mut merged = Map::new();
    for (source, document) in sources {
        let Value::Object(object) = document else {
            return Err(Error::Data(format!(
                "{}: top-level value must be an object",
                source.display()
            )));
        };
        for (key, value) in object {
            if merged.insert(key.clone(), value).is_some() {
                warn!(key = %key, source = %source.display(), "data key overridden");
            }
        }
    }
    Ok(Value::Object(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_formats_by_extension() {
        assert_eq!(DataFormat::from_path(Path::new("a.JSON")), Some(DataFormat::Json));
        assert_eq!(DataFormat::from_path(Path::new("a.yml")), Some(DataFormat::Yaml));
        assert_eq!(DataFormat::from_path(Path::new("a.yaml")), Some(DataFormat::Yaml));
        assert_eq!(DataFormat::from_path(Path::new("a.mjs")), None);
        assert_eq!(DataFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn parses_yaml_with_references() {
        let yaml = "people:\n  ada:\n    name: Ada\n    team: Eng\ninvitees:\n  - $ref: '#/people/ada'\n";
        let value = parse_document(yaml, DataFormat::Yaml).unwrap();
        assert_eq!(value["invitees"][0]["name"], "Ada");
    }

    #[test]
    fn merge_is_shallow_and_ordered() {
        let merged = merge_documents([
            (Path::new("a.json"), json!({"a": {"x": 1}, "b": 1})),
            (Path::new("b.json"), json!({"a": {"y": 2}, "c": 3})),
        ])
        .unwrap();
        assert_eq!(merged, json!({"a": {"y": 2}, "b": 1, "c": 3}));
    }

    #[test]
    fn merge_rejects_non_objects() {
        let err = merge_documents([(Path::new("list.json"), json!([1]))]).unwrap_err();
        assert!(matches!(err, Error::Data(ref msg) if msg.contains("list.json")));
    }

    #[tokio::test]
    async fn loads_directories_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("b.yaml"), "orgName: Second\nteam: b\n")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("a.json"), r#"{"orgName": "First", "extra": true}"#)
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), "ignored").await.unwrap();

        let data = load_data(dir.path()).await.unwrap();
        assert_eq!(data, json!({"orgName": "Second", "extra": true, "team": "b"}));
    }

    #[tokio::test]
    async fn loads_multiple_paths_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.yml");
        tokio::fs::write(&first, r#"{"orgName": "Acme", "gigamon": {"orgName": "G"}}"#)
            .await
            .unwrap();
        tokio::fs::write(&second, "orgName: Override\n").await.unwrap();

        let data = load_data_paths(&[first, second]).await.unwrap();
        assert_eq!(data["orgName"], "Override");
        assert_eq!(data["gigamon"]["orgName"], "G");
    }

    #[tokio::test]
    async fn unsupported_files_and_bad_documents_fail() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("data.mjs");
        tokio::fs::write(&script, "export default {}").await.unwrap();
        assert!(matches!(load_data(&script).await, Err(Error::Data(_))));

        let broken = dir.path().join("broken.json");
        tokio::fs::write(&broken, "{").await.unwrap();
        let err = load_data(&broken).await.unwrap_err();
        assert!(matches!(err, Error::Data(ref msg) if msg.contains("broken.json")));

        assert!(matches!(
            load_data(dir.path().join("missing.json")).await,
            Err(Error::Io(_))
        ));
    }
}
