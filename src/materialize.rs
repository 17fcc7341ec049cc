//! Job Materializer - one directory, one `config.info` and one DAG node per job
//!
//! Output layout:
//!
//! ```text
//! <root>/
//! ├── condor.sub                 shared submit description
//! ├── dag                        DAGMan input
//! ├── GCP/cmp1/config.info
//! └── DMR/single/res1/A1/1/config.info
//! ```
//!
//! No rollback: a failure leaves every job written so far in place, and the
//! existing root keeps a second run from mixing with it.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::constants::{DAG_FILE, JOB_CONFIG_FILE, SUBMIT_DESCRIPTION, SUBMIT_FILE};
use crate::dag::{DagWriter, Job, JobSink};
use crate::error::AllInOneError;
use crate::tree::info::write_info_file;

pub struct Materializer {
    /// Absolute job root
    root: PathBuf,
    dag_path: PathBuf,
    dag: DagWriter<BufWriter<File>>,
}

impl Materializer {
    /// Create the job root with its submit description and an empty DAG.
    pub fn create(root: &Path) -> Result<Self, AllInOneError> {
        if root.exists() {
            return Err(AllInOneError::OutputAlreadyExists {
                path: root.to_path_buf(),
            });
        }
        info!(root = %root.display(), "Creating directory");
        fs::create_dir_all(root).map_err(|source| AllInOneError::DirectoryCreateFailed {
            path: root.to_path_buf(),
            source,
        })?;
        let root = fs::canonicalize(root)?;

        let submit_path = root.join(SUBMIT_FILE);
        fs::write(&submit_path, SUBMIT_DESCRIPTION).map_err(|source| {
            AllInOneError::WriteFailed {
                path: submit_path.clone(),
                source,
            }
        })?;

        let dag_path = root.join(DAG_FILE);
        debug!(path = %dag_path.display(), "Opening dag file");
        let file = File::create(&dag_path).map_err(|source| AllInOneError::WriteFailed {
            path: dag_path.clone(),
            source,
        })?;

        Ok(Self {
            root,
            dag_path,
            dag: DagWriter::new(BufWriter::new(file)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dag_path(&self) -> &Path {
        &self.dag_path
    }

    /// Write one job: directory, configuration fragment, DAG lines.
    pub fn materialize(&mut self, job: &Job) -> Result<(), AllInOneError> {
        let dir = self.root.join(&job.subdir);
        if dir.exists() {
            return Err(AllInOneError::JobDirectoryExists { path: dir });
        }
        debug!(dir = %dir.display(), "The validation will be performed in");
        fs::create_dir_all(&dir).map_err(|source| AllInOneError::DirectoryCreateFailed {
            path: dir.clone(),
            source,
        })?;
        write_info_file(&job.config, &dir.join(JOB_CONFIG_FILE))?;

        debug!(job = %job.name, "Queuing job");
        self.dag.write_job(job, &dir).map_err(|e| self.on_dag(e))?;
        self.dag.flush().map_err(|e| self.on_dag(e.into()))
    }

    /// Flush and close the DAG; returns its path.
    pub fn finish(mut self) -> Result<PathBuf, AllInOneError> {
        info!(jobs = self.dag.len(), "Closing dag file");
        self.dag.flush().map_err(|e| self.on_dag(e.into()))?;
        Ok(self.dag_path)
    }

    /// Plain I/O failures on the DAG stream name the DAG file
    fn on_dag(&self, err: AllInOneError) -> AllInOneError {
        match err {
            AllInOneError::Io(source) => AllInOneError::WriteFailed {
                path: self.dag_path.clone(),
                source,
            },
            other => other,
        }
    }
}

impl JobSink for Materializer {
    fn accept(&mut self, job: &Job) -> Result<(), AllInOneError> {
        self.materialize(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValidationKind;
    use crate::tree::{info::read_info_file, ConfigTree};

    fn job(name: &str, subdir: &str, parents: &[&str]) -> Job {
        let mut config = ConfigTree::new();
        config.put("LFS", "/eos/lfs");
        Job {
            name: name.into(),
            kind: ValidationKind::DmrSingle,
            block: "res1".into(),
            iov: None,
            alignments: vec![],
            subdir: PathBuf::from(subdir),
            config,
            parents: parents.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn writes_root_files_and_jobs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("out");
        let mut m = Materializer::create(&root).unwrap();
        assert!(root.join(SUBMIT_FILE).is_file());

        m.materialize(&job("s1", "DMR/single/res1/A1", &[])).unwrap();
        let fragment = read_info_file(&root.join("DMR/single/res1/A1").join(JOB_CONFIG_FILE)).unwrap();
        assert_eq!(fragment.get::<String>("LFS").unwrap(), "/eos/lfs");

        m.materialize(&job("m", "DMR/merge/m", &["s1"])).unwrap();
        let dag_path = m.finish().unwrap();
        let dag = fs::read_to_string(dag_path).unwrap();
        let lines: Vec<&str> = dag.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "JOB s1 condor.sub");
        assert!(lines[1].starts_with("VARS s1 exec=\"DMRsingle\" dir=\""));
        assert_eq!(lines[4], "PARENT s1 CHILD m");
    }

    #[test]
    fn refuses_existing_paths() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            Materializer::create(tmp.path()),
            Err(AllInOneError::OutputAlreadyExists { .. })
        ));

        let root = tmp.path().join("out");
        let mut m = Materializer::create(&root).unwrap();
        fs::create_dir_all(root.join("GCP/c")).unwrap();
        assert!(matches!(
            m.materialize(&job("g", "GCP/c", &[])),
            Err(AllInOneError::JobDirectoryExists { .. })
        ));
    }

    #[test]
    fn undeclared_parent_leaves_directory_but_no_dag_line() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("out");
        let mut m = Materializer::create(&root).unwrap();
        assert!(matches!(
            m.materialize(&job("m", "DMR/merge/m", &["ghost"])),
            Err(AllInOneError::ParentNotDeclared { .. })
        ));
        let dag_path = m.finish().unwrap();
        assert_eq!(fs::read_to_string(dag_path).unwrap(), "");
    }
}
