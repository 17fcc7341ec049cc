//! DAGMan text emitter
//!
//! ```text
//! JOB DMRsingle_res1_A1 condor.sub
//! VARS DMRsingle_res1_A1 exec="DMRsingle" dir="/work/out/DMR/single/res1/A1"
//! JOB DMRmerge_m1 condor.sub
//! VARS DMRmerge_m1 exec="DMRmerge" dir="/work/out/DMR/merge/m1"
//! PARENT DMRsingle_res1_A1 CHILD DMRmerge_m1
//! ```
//!
//! Append-only. A `PARENT` line may only name jobs already declared.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use crate::constants::SUBMIT_FILE;
use crate::error::AllInOneError;

use super::job::Job;

pub struct DagWriter<W: Write> {
    out: W,
    declared: HashSet<String>,
}

impl<W: Write> DagWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            declared: HashSet::new(),
        }
    }

    /// Append the node declaration of `job`, then its dependency line.
    ///
    /// `dir` is the job's working directory as the scheduler should see it.
    pub fn write_job(&mut self, job: &Job, dir: &Path) -> Result<(), AllInOneError> {
        if let Some(parent) = job.parents.iter().find(|p| !self.declared.contains(*p)) {
            return Err(AllInOneError::ParentNotDeclared {
                child: job.name.clone(),
                parent: parent.clone(),
            });
        }

        writeln!(self.out, "JOB {} {}", job.name, SUBMIT_FILE)?;
        writeln!(
            self.out,
            "VARS {} exec=\"{}\" dir=\"{}\"",
            job.name,
            escape(job.executable()),
            escape(&dir.display().to_string())
        )?;
        if !job.parents.is_empty() {
            writeln!(
                self.out,
                "PARENT {} CHILD {}",
                job.parents.join(" "),
                job.name
            )?;
        }

        self.declared.insert(job.name.clone());
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }

    /// Jobs declared so far
    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// VARS values are double-quoted; quotes and backslashes inside are escaped.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
