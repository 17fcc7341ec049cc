//! Plot descriptors: top-level `plot:NAME` blocks
//!
//! Cosmetics plus the list of validations shown on the figure:
//! `"validate res1" "A1, A2"` draws block `res1` for alignments A1 and A2.

use crate::error::AllInOneError;
use crate::tree::{parse_list, ConfigTree, Separator};

pub const PLOT_PREFIX: &str = "plot:";
pub const VALIDATE_PREFIX: &str = "validate ";

/// One `validate BLOCK = alignments` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotValidate {
    pub block: String,
    pub alignments: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PlotDescriptor {
    pub name: String,
    pub legendoptions: String,
    pub title: String,
    pub curves: String,
    pub usefit: bool,
    pub validates: Vec<PlotValidate>,
}

impl PlotDescriptor {
    pub fn from_tree(name: &str, tree: &ConfigTree) -> Result<Self, AllInOneError> {
        let scope = format!("{PLOT_PREFIX}{name}");
        let scoped = |e: AllInOneError| e.scoped(&scope);

        let validates = tree
            .children_with_prefix(VALIDATE_PREFIX)
            .map(|(block, node)| {
                let block = block.trim();
                parse_list::<String>(node.value(), Separator::CommaOrWhitespace)
                    .map(|alignments| PlotValidate {
                        block: block.to_string(),
                        alignments,
                    })
                    .map_err(|token| AllInOneError::MalformedValue {
                        path: format!("{scope}.{VALIDATE_PREFIX}{block}"),
                        value: token,
                        expected: "alignment name",
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_string(),
            legendoptions: tree.get_or("legendoptions", String::new()).map_err(scoped)?,
            title: tree.get_or("title", String::new()).map_err(scoped)?,
            curves: tree.get_or("curves", String::new()).map_err(scoped)?,
            usefit: tree.get_or("usefit", false).map_err(scoped)?,
            validates,
        })
    }

    /// Every `plot:NAME` block at the top of `root`, in declaration order
    pub fn all_from(root: &ConfigTree) -> Result<Vec<Self>, AllInOneError> {
        root.children_with_prefix(PLOT_PREFIX)
            .map(|(name, tree)| Self::from_tree(name, tree))
            .collect()
    }
}
