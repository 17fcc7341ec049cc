//! Tracker alignment validation - compile one configuration into a DAG of jobs

pub mod constants;
pub mod dag;
pub mod error;
pub mod iov;
pub mod materialize;
pub mod model;
pub mod submit;
pub mod tree;

pub use dag::{Job, JobGraph, JobGraphBuilder, JobSink};
pub use error::{AllInOneError, FixSuggestion};
pub use materialize::Materializer;
pub use submit::{CondorSubmitter, Submitter};
pub use tree::ConfigTree;
