//! Job graph: naming, expansion, and DAGMan output

pub mod builder;
pub mod emit;
pub mod graph;
pub mod job;

pub use builder::{JobGraphBuilder, JobSink};
pub use emit::DagWriter;
pub use graph::{GraphSummary, JobGraph, JobSummary};
pub use job::{iov_points, layout, Job, JobLayout};
