//! Job graph built from expanded validation blocks
//!
//! Jobs are stored in expansion order, which is also DAG order: a job's
//! parents are always inserted before it.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::AllInOneError;
use crate::iov::Iov;
use crate::model::{PlotDescriptor, ValidationKind};

use super::job::Job;

#[derive(Debug, Default)]
pub struct JobGraph {
    root: PathBuf,
    jobs: Vec<Job>,
    /// job name -> index in `jobs`
    by_name: HashMap<String, usize>,
    /// (kind, block) -> indices in `jobs`, in expansion order
    by_block: BTreeMap<(ValidationKind, String), Vec<usize>>,
    plots: Vec<PlotDescriptor>,
}

impl JobGraph {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Add a job. Names are unique per run.
    pub fn insert(&mut self, job: Job) -> Result<&Job, AllInOneError> {
        if self.by_name.contains_key(&job.name) {
            return Err(AllInOneError::DuplicateJobName { name: job.name });
        }
        let idx = self.jobs.len();
        self.by_name.insert(job.name.clone(), idx);
        self.by_block
            .entry((job.kind, job.block.clone()))
            .or_default()
            .push(idx);
        self.jobs.push(job);
        Ok(&self.jobs[idx])
    }

    pub fn get(&self, name: &str) -> Option<&Job> {
        self.by_name.get(name).map(|&idx| &self.jobs[idx])
    }

    /// All jobs in expansion order
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs expanded from one block
    pub fn jobs_of<'a>(
        &'a self,
        kind: ValidationKind,
        block: &str,
    ) -> impl Iterator<Item = &'a Job> + 'a {
        self.by_block
            .get(&(kind, block.to_string()))
            .into_iter()
            .flatten()
            .map(move |&idx| &self.jobs[idx])
    }

    /// Parent/child pairs
    pub fn edge_count(&self) -> usize {
        self.jobs.iter().map(|j| j.parents.len()).sum()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute-or-relative working directory of `job`, as the root was given
    pub fn working_dir(&self, job: &Job) -> PathBuf {
        self.root.join(&job.subdir)
    }

    pub fn plots(&self) -> &[PlotDescriptor] {
        &self.plots
    }

    pub fn set_plots(&mut self, plots: Vec<PlotDescriptor>) {
        self.plots = plots;
    }

    /// Serializable overview for `--json`
    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            root: self.root.display().to_string(),
            jobs: self
                .jobs
                .iter()
                .map(|job| JobSummary {
                    name: job.name.clone(),
                    exec: job.executable(),
                    dir: self.working_dir(job).display().to_string(),
                    iov: job.iov,
                    alignments: job.alignments.clone(),
                    parents: job.parents.clone(),
                })
                .collect(),
            edges: self.edge_count(),
            plots: self.plots.iter().map(|p| p.name.clone()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GraphSummary {
    pub root: String,
    pub jobs: Vec<JobSummary>,
    pub edges: usize,
    pub plots: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub name: String,
    pub exec: &'static str,
    pub dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iov: Option<Iov>,
    pub alignments: Vec<String>,
    pub parents: Vec<String>,
}
