//! Alignment variants, declared under the top-level `alignments` block or as
//! top-level `alignment:NAME` blocks

use crate::constants::ALIGNMENTS_KEY;
use crate::error::AllInOneError;
use crate::tree::ConfigTree;

use super::color::{parse_color, DEFAULT_COLOR};

/// Prefix for condition overrides: `"condition TrackerAlignmentRcd" value`
pub const CONDITION_PREFIX: &str = "condition ";

/// Default ROOT line/marker style
pub const DEFAULT_STYLE: i32 = 1;

/// A record to override in the conditions database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub record: String,
    pub value: String,
}

/// A named set of alignment constants to validate
#[derive(Debug, Clone)]
pub struct AlignmentVariant {
    pub name: String,
    pub globaltag: String,
    /// Directory of an already-produced validation, if any
    pub path: Option<String>,
    pub color: i32,
    pub style: i32,
    pub conditions: Vec<Condition>,
    /// Declared subtree, copied verbatim into job fragments
    pub raw: ConfigTree,
}

impl AlignmentVariant {
    pub fn from_tree(name: &str, tree: &ConfigTree) -> Result<Self, AllInOneError> {
        Self::from_scoped_tree(&format!("{ALIGNMENTS_KEY}.{name}"), name, tree)
    }

    /// Like [`from_tree`](Self::from_tree), with errors reported under `scope`
    pub fn from_scoped_tree(
        scope: &str,
        name: &str,
        tree: &ConfigTree,
    ) -> Result<Self, AllInOneError> {
        let scoped = |err: AllInOneError| err.scoped(scope);

        let globaltag = tree.get::<String>("globaltag").map_err(scoped)?;
        let path = tree
            .get_opt::<String>("path")
            .map_err(scoped)?
            .filter(|p| !p.is_empty());

        let color = match tree.get_opt::<String>("color").map_err(scoped)? {
            None => DEFAULT_COLOR,
            Some(raw) => parse_color(&raw).ok_or_else(|| AllInOneError::InvalidColor {
                alignment: name.to_string(),
                value: raw.clone(),
            })?,
        };
        let style = tree.get_or("style", DEFAULT_STYLE).map_err(scoped)?;

        let conditions = tree
            .children_with_prefix(CONDITION_PREFIX)
            .map(|(record, node)| Condition {
                record: record.trim().to_string(),
                value: node.value().to_string(),
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            globaltag,
            path,
            color,
            style,
            conditions,
            raw: tree.clone(),
        })
    }

    /// True when this variant already carries results for `block`
    pub fn has_result_for(&self, block: &str) -> bool {
        self.raw.contains(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::info::read_info;

    fn variant(text: &str) -> Result<AlignmentVariant, AllInOneError> {
        let tree = read_info(text, "t").unwrap();
        AlignmentVariant::from_tree("A1", &tree)
    }

    #[test]
    fn full_declaration() {
        let a = variant(
            r#"
globaltag auto:phase1_2022_realistic
path      /eos/previous
color     kBlue+1
style     2
"condition TrackerAlignmentRcd" sqlite_file:a.db
"condition TrackerSurfaceDeformationRcd" frontier://x
"#,
        )
        .unwrap();
        assert_eq!(a.globaltag, "auto:phase1_2022_realistic");
        assert_eq!(a.path.as_deref(), Some("/eos/previous"));
        assert_eq!(a.color, 601);
        assert_eq!(a.style, 2);
        assert_eq!(a.conditions.len(), 2);
        assert_eq!(a.conditions[0].record, "TrackerAlignmentRcd");
        assert_eq!(a.conditions[0].value, "sqlite_file:a.db");
    }

    #[test]
    fn defaults() {
        let a = variant("globaltag GT\n").unwrap();
        assert_eq!(a.path, None);
        assert_eq!(a.color, DEFAULT_COLOR);
        assert_eq!(a.style, DEFAULT_STYLE);
        assert!(a.conditions.is_empty());
    }

    #[test]
    fn globaltag_is_required() {
        match variant("color kRed\n") {
            Err(AllInOneError::MissingKey { path }) => assert_eq!(path, "alignments.A1.globaltag"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn prefixed_block_reports_its_own_path() {
        let tree = read_info("color kRed\n", "t").unwrap();
        match AlignmentVariant::from_scoped_tree("alignment:A1", "A1", &tree) {
            Err(AllInOneError::MissingKey { path }) => assert_eq!(path, "alignment:A1.globaltag"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn bad_colour_and_style() {
        assert!(matches!(
            variant("globaltag GT\ncolor purple\n"),
            Err(AllInOneError::InvalidColor { .. })
        ));
        assert!(matches!(
            variant("globaltag GT\nstyle dashed\n"),
            Err(AllInOneError::MalformedValue { .. })
        ));
    }

    #[test]
    fn results_marker() {
        let a = variant("globaltag GT\nres1 { done true }\n").unwrap();
        assert!(a.has_result_for("res1"));
        assert!(!a.has_result_for("res2"));
    }
}
