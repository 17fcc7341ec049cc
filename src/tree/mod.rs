//! Config Tree - ordered, nested key/value store
//!
//! The single data model every other component reads. A node carries a scalar
//! value (possibly empty) and an ordered list of named children; a key may
//! repeat among siblings. Paths use `.` between segments.
//!
//! Typed access goes through [`ConfigTree::get`] and friends, which fail with
//! `MissingKey` / `MalformedValue` instead of panicking.

mod convert;
pub mod info;
pub mod value;

use std::path::Path;

use tracing::debug;

use crate::error::AllInOneError;

pub use value::{parse_list, split_list, FromConfigValue, Separator};

/// Path separator for nested lookups
pub const PATH_SEP: char = '.';

/// Ordered tree of string keys to scalar values and nested trees
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigTree {
    value: String,
    children: Vec<(String, ConfigTree)>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leaf node holding `value`
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            children: Vec::new(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Immediate children in declaration order
    pub fn children(&self) -> impl Iterator<Item = (&str, &ConfigTree)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    // ─────────────────────────────────────────────────────────────
    // Single-level access (keys may contain the path separator)
    // ─────────────────────────────────────────────────────────────

    /// First immediate child named `key`
    pub fn child(&self, key: &str) -> Option<&ConfigTree> {
        self.children
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn child_mut(&mut self, key: &str) -> Option<&mut ConfigTree> {
        self.children
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.child(key).is_some()
    }

    /// Append a child, even if `key` already exists.
    pub fn push_child(&mut self, key: impl Into<String>, tree: ConfigTree) -> &mut ConfigTree {
        self.children.push((key.into(), tree));
        let last = self.children.len() - 1;
        &mut self.children[last].1
    }

    /// First child named `key`, appended empty if absent.
    pub fn child_or_insert(&mut self, key: &str) -> &mut ConfigTree {
        match self.children.iter().position(|(k, _)| k == key) {
            Some(idx) => &mut self.children[idx].1,
            None => self.push_child(key, ConfigTree::new()),
        }
    }

    /// Remove every immediate child named `key`; returns how many went away.
    pub fn erase(&mut self, key: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|(k, _)| k != key);
        before - self.children.len()
    }

    /// Every immediate child whose key starts with `prefix`, paired with the
    /// rest of the key. Used for `alignment:NAME`, `condition NAME`, ...
    pub fn children_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a ConfigTree)> + 'a {
        self.children
            .iter()
            .filter_map(move |(k, v)| k.strip_prefix(prefix).map(|suffix| (suffix, v)))
    }

    // ─────────────────────────────────────────────────────────────
    // Path access
    // ─────────────────────────────────────────────────────────────

    /// Follow a dotted path. An empty path is the node itself.
    pub fn find(&self, path: &str) -> Option<&ConfigTree> {
        if path.is_empty() {
            return Some(self);
        }
        path.split(PATH_SEP)
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Set the value at `path`, creating intermediate nodes.
    pub fn put(&mut self, path: &str, value: impl Into<String>) -> &mut ConfigTree {
        let node = self.node_at(path);
        node.value = value.into();
        node
    }

    /// Replace (or create) the subtree at `path`.
    pub fn put_child(&mut self, path: &str, tree: ConfigTree) -> &mut ConfigTree {
        let node = self.node_at(path);
        *node = tree;
        node
    }

    fn node_at(&mut self, path: &str) -> &mut ConfigTree {
        if path.is_empty() {
            return self;
        }
        path.split(PATH_SEP)
            .fold(self, |node, segment| node.child_or_insert(segment))
    }

    // ─────────────────────────────────────────────────────────────
    // Typed accessors
    // ─────────────────────────────────────────────────────────────

    /// Scalar at `path` cast to `T`
    pub fn get<T: FromConfigValue>(&self, path: &str) -> Result<T, AllInOneError> {
        self.get_opt(path)?.ok_or_else(|| AllInOneError::MissingKey {
            path: path.to_string(),
        })
    }

    /// Like [`get`](Self::get), falling back to `default` only when absent.
    pub fn get_or<T: FromConfigValue>(&self, path: &str, default: T) -> Result<T, AllInOneError> {
        Ok(self.get_opt(path)?.unwrap_or(default))
    }

    pub fn get_opt<T: FromConfigValue>(&self, path: &str) -> Result<Option<T>, AllInOneError> {
        match self.find(path) {
            None => Ok(None),
            Some(node) => T::from_config_value(&node.value)
                .map(Some)
                .ok_or_else(|| AllInOneError::MalformedValue {
                    path: path.to_string(),
                    value: node.value.clone(),
                    expected: T::EXPECTED,
                }),
        }
    }

    /// Scalar at `path` split on `sep`, each token cast to `T`
    pub fn get_list<T: FromConfigValue>(
        &self,
        path: &str,
        sep: Separator,
    ) -> Result<Vec<T>, AllInOneError> {
        let node = self.find(path).ok_or_else(|| AllInOneError::MissingKey {
            path: path.to_string(),
        })?;
        parse_list(&node.value, sep).map_err(|token| AllInOneError::MalformedValue {
            path: path.to_string(),
            value: token,
            expected: T::EXPECTED,
        })
    }

    pub fn get_list_or<T: FromConfigValue>(
        &self,
        path: &str,
        sep: Separator,
        default: Vec<T>,
    ) -> Result<Vec<T>, AllInOneError> {
        if self.find(path).is_none() {
            return Ok(default);
        }
        self.get_list(path, sep)
    }

    /// Subtree at `path`
    pub fn get_child(&self, path: &str) -> Result<&ConfigTree, AllInOneError> {
        self.find(path).ok_or_else(|| AllInOneError::MissingKey {
            path: path.to_string(),
        })
    }

    pub fn get_optional_child(&self, path: &str) -> Option<&ConfigTree> {
        self.find(path)
    }

    // ─────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────

    /// Load a configuration file, picking the reader from the extension:
    /// `.json`, `.yaml`/`.yml`, anything else is INFO.
    pub fn from_file(path: &Path) -> Result<Self, AllInOneError> {
        if !path.is_file() {
            return Err(AllInOneError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        debug!(path = %path.display(), format = ?ext, "Reading configuration");
        match ext.as_deref() {
            Some("json") => convert::from_json(&std::fs::read_to_string(path)?),
            Some("yaml") | Some("yml") => convert::from_yaml(&std::fs::read_to_string(path)?),
            _ => info::read_info_file(path),
        }
    }
}
