//! Error types with fix suggestions

use std::path::PathBuf;

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Every failure the compiler can hit. All of them are fatal to the run.
#[derive(Error, Debug)]
pub enum AllInOneError {
    // ─────────────────────────────────────────────────────────────
    // Input files (AIO-001 to AIO-004)
    // ─────────────────────────────────────────────────────────────
    #[error("AIO-001: Configuration file '{}' not found", path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("AIO-002: Parse error in {file}:{line}: {details}")]
    InfoParse {
        file: String,
        line: usize,
        details: String,
    },

    #[error("AIO-003: JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("AIO-004: YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ─────────────────────────────────────────────────────────────
    // Typed access (AIO-010 to AIO-012)
    // ─────────────────────────────────────────────────────────────
    #[error("AIO-010: Missing key '{path}'")]
    MissingKey { path: String },

    #[error("AIO-011: Value '{value}' at '{path}' is not a valid {expected}")]
    MalformedValue {
        path: String,
        value: String,
        expected: &'static str,
    },

    #[error("AIO-012: Invalid colour '{value}' for alignment '{alignment}'")]
    InvalidColor { alignment: String, value: String },

    // ─────────────────────────────────────────────────────────────
    // Intervals of validity (AIO-020 to AIO-021)
    // ─────────────────────────────────────────────────────────────
    #[error("AIO-020: Block '{block}' declares both IOV and IOVs")]
    ConflictingIovSpecification { block: String },

    #[error("AIO-021: IOVs of block '{block}' are not sorted: {iovs:?}")]
    UnsortedIovs { block: String, iovs: Vec<u32> },

    // ─────────────────────────────────────────────────────────────
    // Structure and references (AIO-030 to AIO-041)
    // ─────────────────────────────────────────────────────────────
    #[error("AIO-030: Output directory '{}' already exists", path.display())]
    OutputAlreadyExists { path: PathBuf },

    #[error("AIO-031: No validation declared (expected validations.GCP or validations.DMR)")]
    NoValidationDeclared,

    #[error("AIO-032: Block '{block}' references unknown alignment '{alignment}'")]
    UnknownAlignment { alignment: String, block: String },

    #[error("AIO-033: Alignment '{name}' is declared more than once")]
    DuplicateAlignment { name: String },

    #[error("AIO-034: {kind} block '{name}' is declared more than once")]
    DuplicateBlock { kind: String, name: String },

    #[error("AIO-035: Block '{block}' references unknown single '{single}'")]
    UnknownSingleReference { block: String, single: String },

    #[error("AIO-036: Trend '{trend}' references unknown merge '{merge}'")]
    UnknownMergeReference { trend: String, merge: String },

    #[error("AIO-037: IOV {iov} of merge '{merge}' is not covered by single '{single}'")]
    MergeIovNotCovered {
        merge: String,
        single: String,
        iov: u32,
    },

    #[error("AIO-038: Singles referenced by merge '{merge}' share no IOV")]
    DisjointMergeIovs { merge: String },

    #[error("AIO-039: Plot '{plot}' validates unknown block '{block}'")]
    UnknownValidationReference { plot: String, block: String },

    #[error("AIO-040: Job name '{name}' is produced twice")]
    DuplicateJobName { name: String },

    #[error("AIO-041: Job name '{name}' contains characters the scheduler rejects")]
    InvalidJobName { name: String },

    #[error("AIO-042: Block name '{name}' is reserved for a top-level fragment key")]
    ReservedBlockName { name: String },

    // ─────────────────────────────────────────────────────────────
    // Materialisation (AIO-050 to AIO-053)
    // ─────────────────────────────────────────────────────────────
    #[error("AIO-050: Job directory '{}' already exists", path.display())]
    JobDirectoryExists { path: PathBuf },

    #[error("AIO-051: Cannot create directory '{}': {source}", path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("AIO-052: Cannot write '{}': {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("AIO-053: Job '{child}' depends on '{parent}' which is not in the DAG yet")]
    ParentNotDeclared { child: String, parent: String },

    // ─────────────────────────────────────────────────────────────
    // Submission (AIO-060 to AIO-061)
    // ─────────────────────────────────────────────────────────────
    #[error("AIO-060: Cannot run submit command '{command}': {source}")]
    SubmitSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("AIO-061: Submit command '{command}' exited with status {code}")]
    SubmitFailed { command: String, code: i32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AllInOneError {
    /// Prefix the key path of `MissingKey` / `MalformedValue` with the block
    /// the lookup ran in, so messages name the full path from the root.
    pub fn scoped(self, prefix: &str) -> Self {
        match self {
            AllInOneError::MissingKey { path } => AllInOneError::MissingKey {
                path: format!("{prefix}.{path}"),
            },
            AllInOneError::MalformedValue {
                path,
                value,
                expected,
            } => AllInOneError::MalformedValue {
                path: format!("{prefix}.{path}"),
                value,
                expected,
            },
            other => other,
        }
    }

    /// Process exit code for this failure.
    ///
    /// A failed submission hands the scheduler's own status back to the shell.
    pub fn exit_code(&self) -> i32 {
        use AllInOneError::*;
        match self {
            ConfigNotFound { .. }
            | InfoParse { .. }
            | Json(_)
            | Yaml(_)
            | MissingKey { .. }
            | MalformedValue { .. }
            | InvalidColor { .. }
            | ConflictingIovSpecification { .. }
            | UnsortedIovs { .. } => 2,

            OutputAlreadyExists { .. }
            | NoValidationDeclared
            | UnknownAlignment { .. }
            | DuplicateAlignment { .. }
            | DuplicateBlock { .. }
            | UnknownSingleReference { .. }
            | UnknownMergeReference { .. }
            | MergeIovNotCovered { .. }
            | DisjointMergeIovs { .. }
            | UnknownValidationReference { .. }
            | DuplicateJobName { .. }
            | InvalidJobName { .. }
            | ReservedBlockName { .. }
            | ParentNotDeclared { .. } => 3,

            JobDirectoryExists { .. }
            | DirectoryCreateFailed { .. }
            | WriteFailed { .. }
            | Io(_) => 4,

            SubmitSpawn { .. } => 5,
            SubmitFailed { code, .. } => {
                if *code == 0 {
                    5
                } else {
                    *code
                }
            }
        }
    }
}

impl FixSuggestion for AllInOneError {
    fn fix_suggestion(&self) -> Option<&str> {
        use AllInOneError::*;
        match self {
            ConfigNotFound { .. } => Some("Check the path to the configuration file"),
            InfoParse { .. } => Some("Check braces and quoting around the reported line"),
            Json(_) => Some("Check JSON syntax (try parsing with jq)"),
            Yaml(_) => Some("Check YAML syntax: indentation and quoting"),
            MissingKey { .. } => Some("Add the key to the configuration"),
            MalformedValue { .. } => Some("Fix the value so it matches the expected type"),
            InvalidColor { .. } => Some("Use a ROOT colour such as kRed, kBlue+2 or a plain number"),
            ConflictingIovSpecification { .. } => Some("Keep either IOV (one value) or IOVs (a list), not both"),
            UnsortedIovs { .. } => Some("List IOVs in ascending order"),
            OutputAlreadyExists { .. } => Some("Remove the old directory or change 'name' in the config"),
            NoValidationDeclared => Some("Declare at least one block under validations.GCP or validations.DMR"),
            UnknownAlignment { .. } => Some("Declare the alignment under 'alignments' or as an 'alignment:NAME' block"),
            DuplicateAlignment { .. } => Some("Give each alignment a unique name"),
            DuplicateBlock { .. } => Some("Give each validation block a unique name within its kind"),
            UnknownSingleReference { .. } => Some("Reference a block declared under validations.DMR.single"),
            UnknownMergeReference { .. } => Some("Reference a block declared under validations.DMR.merge"),
            MergeIovNotCovered { .. } => Some("Add the IOV to the single block or drop it from the merge"),
            DisjointMergeIovs { .. } => Some("Merge singles that share at least one IOV"),
            UnknownValidationReference { .. } => Some("Check the block name after 'validate' in the plot"),
            DuplicateJobName { .. } => Some("Rename one of the blocks so their job names differ"),
            InvalidJobName { .. } => Some("Use only letters, digits, '_', '.', '+' and '-' in block and alignment names"),
            ReservedBlockName { .. } => Some("Rename the block; LFS, output, input and alignments are taken"),
            JobDirectoryExists { .. } => Some("Remove the stale job directory"),
            DirectoryCreateFailed { .. } | WriteFailed { .. } | Io(_) => {
                Some("Check file path and permissions")
            }
            ParentNotDeclared { .. } => None,
            SubmitSpawn { .. } => Some("Check that the submit command is installed or set ALLINONE_SUBMIT_CMD"),
            SubmitFailed { .. } => Some("Inspect the scheduler output; the DAG is left in place for a manual submit"),
        }
    }
}
