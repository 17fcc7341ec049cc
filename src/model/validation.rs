//! Validation blocks: one named unit of work under `validations`

use std::fmt;

use crate::constants::RESERVED_BLOCK_NAMES;
use crate::error::AllInOneError;
use crate::iov::{resolve_iovs, Iov};
use crate::tree::{ConfigTree, Separator};

/// Validation kinds, in expansion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValidationKind {
    /// Geometry comparison of two alignments
    Gcp,
    /// Residuals for one alignment at one IOV
    DmrSingle,
    /// Several singles combined at one IOV
    DmrMerge,
    /// Merges combined across IOVs
    DmrTrend,
}

impl ValidationKind {
    /// Expansion order: every kind only depends on kinds before it
    pub const ALL: [ValidationKind; 4] = [
        ValidationKind::Gcp,
        ValidationKind::DmrSingle,
        ValidationKind::DmrMerge,
        ValidationKind::DmrTrend,
    ];

    /// Where the blocks of this kind live in the config
    pub fn config_path(self) -> &'static str {
        match self {
            ValidationKind::Gcp => "validations.GCP",
            ValidationKind::DmrSingle => "validations.DMR.single",
            ValidationKind::DmrMerge => "validations.DMR.merge",
            ValidationKind::DmrTrend => "validations.DMR.trend",
        }
    }

    pub fn job_prefix(self) -> &'static str {
        match self {
            ValidationKind::Gcp => "GCP",
            ValidationKind::DmrSingle => "DMRsingle",
            ValidationKind::DmrMerge => "DMRmerge",
            ValidationKind::DmrTrend => "DMRtrend",
        }
    }

    /// Program the scheduler runs for jobs of this kind
    pub fn executable(self) -> &'static str {
        match self {
            ValidationKind::Gcp => "GCP",
            ValidationKind::DmrSingle => "DMRsingle",
            ValidationKind::DmrMerge => "DMRmerge",
            ValidationKind::DmrTrend => "DMRtrends",
        }
    }

    /// Directory under the job root
    pub fn directory(self) -> &'static str {
        match self {
            ValidationKind::Gcp => "GCP",
            ValidationKind::DmrSingle => "DMR/single",
            ValidationKind::DmrMerge => "DMR/merge",
            ValidationKind::DmrTrend => "DMR/trend",
        }
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationKind::Gcp => write!(f, "GCP"),
            ValidationKind::DmrSingle => write!(f, "DMR single"),
            ValidationKind::DmrMerge => write!(f, "DMR merge"),
            ValidationKind::DmrTrend => write!(f, "DMR trend"),
        }
    }
}

/// A validation block with its IOVs resolved and references read
#[derive(Debug, Clone)]
pub struct ValidationBlock {
    pub name: String,
    pub kind: ValidationKind,
    /// Remaining parameters; `IOV`/`IOVs` already stripped
    pub params: ConfigTree,
    pub iovs: Vec<Iov>,
    /// Alignments the block runs on (`reference` + `test` for GCP)
    pub alignments: Vec<String>,
    /// Single blocks a merge or trend summarises
    pub singles: Vec<String>,
    /// Merge blocks a trend summarises
    pub merges: Vec<String>,
}

impl ValidationBlock {
    pub fn from_tree(
        kind: ValidationKind,
        name: &str,
        tree: &ConfigTree,
    ) -> Result<Self, AllInOneError> {
        if RESERVED_BLOCK_NAMES.contains(&name) {
            return Err(AllInOneError::ReservedBlockName {
                name: name.to_string(),
            });
        }
        let scope = format!("{}.{}", kind.config_path(), name);
        let mut params = tree.clone();
        let iovs = resolve_iovs(&scope, &mut params)?;

        let names = |key: &str| -> Result<Vec<String>, AllInOneError> {
            params
                .get_list(key, Separator::CommaOrWhitespace)
                .map_err(|e| e.scoped(&scope))
        };
        let names_or_empty = |key: &str| -> Result<Vec<String>, AllInOneError> {
            params
                .get_list_or(key, Separator::CommaOrWhitespace, Vec::new())
                .map_err(|e| e.scoped(&scope))
        };

        let (alignments, singles, merges) = match kind {
            ValidationKind::Gcp => {
                let reference = params.get::<String>("reference").map_err(|e| e.scoped(&scope))?;
                let test = params.get::<String>("test").map_err(|e| e.scoped(&scope))?;
                (vec![reference, test], Vec::new(), Vec::new())
            }
            ValidationKind::DmrSingle => (names("alignments")?, Vec::new(), Vec::new()),
            ValidationKind::DmrMerge => (Vec::new(), names("singles")?, Vec::new()),
            ValidationKind::DmrTrend => {
                if !params.contains("merges") && !params.contains("singles") {
                    return Err(AllInOneError::MissingKey {
                        path: format!("{scope}.merges"),
                    });
                }
                (Vec::new(), names_or_empty("singles")?, names_or_empty("merges")?)
            }
        };

        Ok(Self {
            name: name.to_string(),
            kind,
            params,
            iovs,
            alignments,
            singles,
            merges,
        })
    }
}
