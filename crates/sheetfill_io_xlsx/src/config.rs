//! Configuration document: load, save and lenient section access.
//!
//! The document is user-edited YAML, so every accessor treats an absent
//! section, a `null` section and a section of the wrong type alike.

use std::fs;
use std::io;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::conf::C_SECTION_PROJECT;
use crate::spec::{FillError, SpecProjectPaths};
use crate::util::persist_file_atomic;

/// In-memory configuration document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    root: Mapping,
}

impl ConfigDocument {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse YAML text; an empty or `null` document is an empty mapping.
    pub fn from_yaml_str(text: &str, path: &Path) -> Result<Self, FillError> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let value: Value =
            serde_yaml::from_str(text).map_err(|err| FillError::ConfigInvalid {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        match value {
            Value::Null => Ok(Self::new()),
            Value::Mapping(root) => Ok(Self { root }),
            other => Err(FillError::ConfigInvalid {
                path: path.to_path_buf(),
                message: format!("root must be a mapping, got {}", describe_value_kind(&other)),
            }),
        }
    }

    /// Read the document at `path`.
    pub fn load(path: &Path) -> Result<Self, FillError> {
        let text = match fs::read_to_string(path) {
            Ok(v) => v,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(FillError::ConfigNotFound(path.to_path_buf()));
            }
            Err(source) => {
                return Err(FillError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::from_yaml_str(&text, path)
    }

    /// Like [`Self::load`], but a missing file is an empty document.
    pub fn load_or_default(path: &Path) -> Result<Self, FillError> {
        match Self::load(path) {
            Err(FillError::ConfigNotFound(_)) => Ok(Self::new()),
            other => other,
        }
    }

    /// Serialize with keys in insertion order.
    pub fn to_yaml_string(&self) -> Result<String, String> {
        serde_yaml::to_string(&self.root).map_err(|err| format!("yaml write error: {err}"))
    }

    /// Replace the document at `path` atomically.
    pub fn save(&self, path: &Path) -> Result<(), FillError> {
        let text = self.to_yaml_string().map_err(|message| FillError::ConfigInvalid {
            path: path.to_path_buf(),
            message,
        })?;
        persist_file_atomic(path, ".yaml", |path_tmp| {
            fs::write(path_tmp, text.as_bytes()).map_err(|source| FillError::Io {
                path: path_tmp.to_path_buf(),
                source,
            })
        })
    }

    /// Root mapping.
    pub fn root(&self) -> &Mapping {
        &self.root
    }

    /// Mutable root mapping.
    pub fn root_mut(&mut self) -> &mut Mapping {
        &mut self.root
    }

    /// Top-level section; `None` when absent or `null`.
    pub fn section(&self, key: &str) -> Option<&Value> {
        get_non_null(&self.root, key)
    }

    /// Nested mapping section; `None` when absent, `null` or not a mapping.
    pub fn section_mapping(&self, keys: &[&str]) -> Option<&Mapping> {
        let mut cursor = &self.root;
        for key in keys {
            cursor = get_non_null(cursor, key)?.as_mapping()?;
        }
        Some(cursor)
    }

    /// `project` paths; malformed entries fall back to unset.
    pub fn project_paths(&self) -> SpecProjectPaths {
        let Some(value) = self.section(C_SECTION_PROJECT) else {
            return SpecProjectPaths::default();
        };
        match serde_yaml::from_value::<SpecProjectPaths>(value.clone()) {
            Ok(paths) => SpecProjectPaths {
                template: paths.template.filter(|s| !s.trim().is_empty()),
                output: paths.output.filter(|s| !s.trim().is_empty()),
            },
            Err(err) => {
                debug!("Ignoring malformed project section: {err}");
                SpecProjectPaths::default()
            }
        }
    }

    /// Walk `keys`, creating (or replacing non-mapping values with) empty mappings.
    pub fn ensure_mapping(&mut self, keys: &[&str]) -> Option<&mut Mapping> {
        let mut cursor = &mut self.root;
        for key in keys {
            let slot = cursor
                .entry(Value::String((*key).to_string()))
                .or_insert(Value::Null);
            if !slot.is_mapping() {
                *slot = Value::Mapping(Mapping::new());
            }
            cursor = slot.as_mapping_mut()?;
        }
        Some(cursor)
    }
}

/// Mapping lookup by string key, treating `null` as absent.
pub fn get_non_null<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

/// Short kind name for diagnostics.
pub fn describe_value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn parse(text: &str) -> ConfigDocument {
        ConfigDocument::from_yaml_str(text, &PathBuf::from("test.yaml")).expect("parse config")
    }

    #[test]
    fn empty_and_null_documents_are_empty() {
        assert_eq!(parse(""), ConfigDocument::new());
        assert_eq!(parse("~\n"), ConfigDocument::new());
        assert!(parse("").section("summary").is_none());
    }

    #[test]
    fn non_mapping_root_is_invalid() {
        let err = ConfigDocument::from_yaml_str("- a\n- b\n", &PathBuf::from("x.yaml"))
            .expect_err("list root");
        assert!(matches!(err, FillError::ConfigInvalid { .. }));
    }

    #[test]
    fn null_sections_read_as_absent() {
        let doc = parse("summary:\n  inputs: ~\nbudget: ~\n");
        assert!(doc.section("budget").is_none());
        assert!(doc.section_mapping(&["summary", "inputs"]).is_none());
        assert!(doc.section_mapping(&["summary"]).is_some());
    }

    #[test]
    fn project_paths_skip_blank_and_malformed_values() {
        let doc = parse("project:\n  template: ' '\n  output: out.xlsx\n");
        assert_eq!(
            doc.project_paths(),
            SpecProjectPaths {
                template: None,
                output: Some("out.xlsx".to_string()),
            }
        );

        let doc = parse("project: [1, 2]\n");
        assert_eq!(doc.project_paths(), SpecProjectPaths::default());
    }

    #[test]
    fn ensure_mapping_creates_and_replaces() {
        let mut doc = parse("summary: 3\n");
        let inputs = doc
            .ensure_mapping(&["summary", "inputs"])
            .expect("mapping");
        inputs.insert(Value::from("room_count"), Value::from(42));

        assert_eq!(
            doc.section_mapping(&["summary", "inputs"])
                .and_then(|m| m.get("room_count")),
            Some(&Value::from(42))
        );
    }

    #[test]
    fn save_then_load_keeps_key_order() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("config.yaml");

        let doc = parse("waterfall:\n  tier1_hurdle: 0.08\nbudget: {}\nproject:\n  output: a.xlsx\n");
        doc.save(&path).expect("save");

        let loaded = ConfigDocument::load(&path).expect("load");
        let l_keys: Vec<&str> = loaded.root().keys().filter_map(Value::as_str).collect();
        assert_eq!(l_keys, vec!["waterfall", "budget", "project"]);
    }

    #[test]
    fn load_missing_file_is_config_not_found() {
        let err = ConfigDocument::load(Path::new("definitely/not/here.yaml")).expect_err("missing");
        assert!(matches!(err, FillError::ConfigNotFound(_)));
        assert_eq!(
            ConfigDocument::load_or_default(Path::new("definitely/not/here.yaml")).ok(),
            Some(ConfigDocument::new())
        );
    }
}
