//! JSON / YAML inputs projected onto the Config Tree
//!
//! Mappings keep their order, scalars become values, lists of scalars are
//! joined with `,` so they read back through the usual list accessors.

use serde_json::Value as Json;
use serde_yaml::Value as Yaml;

use crate::error::AllInOneError;

use super::ConfigTree;

pub fn from_json(text: &str) -> Result<ConfigTree, AllInOneError> {
    let value: Json = serde_json::from_str(text)?;
    json_node("", &value)
}

pub fn from_yaml(text: &str) -> Result<ConfigTree, AllInOneError> {
    let value: Yaml = serde_yaml::from_str(text)?;
    yaml_node("", &value)
}

fn json_node(path: &str, value: &Json) -> Result<ConfigTree, AllInOneError> {
    match value {
        Json::Object(map) => {
            let mut tree = ConfigTree::new();
            for (key, child) in map {
                tree.push_child(key.clone(), json_node(&join(path, key), child)?);
            }
            Ok(tree)
        }
        Json::Array(items) => {
            let scalars = items
                .iter()
                .map(json_scalar)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| nested_list(path))?;
            Ok(ConfigTree::with_value(scalars.join(",")))
        }
        scalar => json_scalar(scalar)
            .map(ConfigTree::with_value)
            .ok_or_else(|| nested_list(path)),
    }
}

fn json_scalar(value: &Json) -> Option<String> {
    match value {
        Json::Null => Some(String::new()),
        Json::Bool(b) => Some(b.to_string()),
        Json::Number(n) => Some(n.to_string()),
        Json::String(s) => Some(s.clone()),
        Json::Array(_) | Json::Object(_) => None,
    }
}

fn yaml_node(path: &str, value: &Yaml) -> Result<ConfigTree, AllInOneError> {
    match value {
        Yaml::Mapping(map) => {
            let mut tree = ConfigTree::new();
            for (key, child) in map {
                let key = yaml_scalar(key).ok_or_else(|| AllInOneError::MalformedValue {
                    path: path.to_string(),
                    value: format!("{key:?}"),
                    expected: "scalar mapping key",
                })?;
                let child = yaml_node(&join(path, &key), child)?;
                tree.push_child(key, child);
            }
            Ok(tree)
        }
        Yaml::Sequence(items) => {
            let scalars = items
                .iter()
                .map(yaml_scalar)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| nested_list(path))?;
            Ok(ConfigTree::with_value(scalars.join(",")))
        }
        Yaml::Tagged(tagged) => yaml_node(path, &tagged.value),
        scalar => yaml_scalar(scalar)
            .map(ConfigTree::with_value)
            .ok_or_else(|| nested_list(path)),
    }
}

fn yaml_scalar(value: &Yaml) -> Option<String> {
    match value {
        Yaml::Null => Some(String::new()),
        Yaml::Bool(b) => Some(b.to_string()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::String(s) => Some(s.clone()),
        Yaml::Tagged(tagged) => yaml_scalar(&tagged.value),
        Yaml::Sequence(_) | Yaml::Mapping(_) => None,
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn nested_list(path: &str) -> AllInOneError {
    AllInOneError::MalformedValue {
        path: path.to_string(),
        value: "nested list".to_string(),
        expected: "list of scalars",
    }
}
