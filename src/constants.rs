//! Centralized constants for file layout and submission
//!
//! Everything the scheduler reads by name lives here.

// ═══════════════════════════════════════════════════════════════
// Job root layout
// ═══════════════════════════════════════════════════════════════

/// DAG description file, written at the top of the job root
pub const DAG_FILE: &str = "dag";

/// Submit description shared by every job of a run
pub const SUBMIT_FILE: &str = "condor.sub";

/// Per-job configuration fragment, written inside each job directory
pub const JOB_CONFIG_FILE: &str = "config.info";

// ═══════════════════════════════════════════════════════════════
// Config keys
// ═══════════════════════════════════════════════════════════════

pub const NAME_KEY: &str = "name";
pub const LFS_KEY: &str = "LFS";
pub const ALIGNMENTS_KEY: &str = "alignments";
pub const VALIDATIONS_KEY: &str = "validations";

/// Top-level repeated-block form of an alignment: `alignment:NAME { ... }`
pub const ALIGNMENT_PREFIX: &str = "alignment:";

/// Where a job writes its results, set in every fragment
pub const OUTPUT_KEY: &str = "output";

/// Result files a trend reads, one per upstream job
pub const INPUT_KEY: &str = "input";

/// Single result a merge reads, set inside `alignments.<name>`
pub const FILE_KEY: &str = "file";

/// Luminosity mask; `{}` in its value is replaced by the job's IOV
pub const GOODLUMI_KEY: &str = "goodlumi";

/// Merge statistics, handed to trends as `variables`
pub const METHODS_KEY: &str = "methods";
pub const VARIABLES_KEY: &str = "variables";

/// Summary a merge job leaves in its output directory
pub const MERGE_SUMMARY_FILE: &str = "OfflineValidationSummary.root";

/// Top-level fragment keys; a block of that name would shadow them
pub const RESERVED_BLOCK_NAMES: [&str; 4] = [LFS_KEY, OUTPUT_KEY, INPUT_KEY, ALIGNMENTS_KEY];

// ═══════════════════════════════════════════════════════════════
// Submission
// ═══════════════════════════════════════════════════════════════

/// Command used to hand the DAG over to the scheduler
pub const DEFAULT_SUBMIT_CMD: &str = "condor_submit_dag";

/// Environment variable overriding [`DEFAULT_SUBMIT_CMD`]
pub const SUBMIT_CMD_ENV: &str = "ALLINONE_SUBMIT_CMD";

/// Submit description written into the job root.
///
/// DAGMan fills `exec` and `dir` from each job's VARS line.
pub const SUBMIT_DESCRIPTION: &str = "\
universe   = vanilla
executable = $(exec)
arguments  = config.info
initialdir = $(dir)
output     = $(dir)/stdout.txt
error      = $(dir)/stderr.txt
log        = $(dir)/condor.log
queue
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_description_reads_dag_vars() {
        assert!(SUBMIT_DESCRIPTION.contains("$(exec)"));
        assert!(SUBMIT_DESCRIPTION.contains("$(dir)"));
        assert!(SUBMIT_DESCRIPTION.contains(JOB_CONFIG_FILE));
    }
}
