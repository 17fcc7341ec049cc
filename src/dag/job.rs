//! Job records and their naming/layout rules

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AllInOneError;
use crate::iov::Iov;
use crate::model::ValidationKind;
use crate::tree::ConfigTree;

/// Block and alignment names end up in job names and directory names
static NAME_COMPONENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_+\-][A-Za-z0-9_.+\-]*$").unwrap());

/// One schedulable unit of work
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique within a run
    pub name: String,
    pub kind: ValidationKind,
    /// Validation block the job was expanded from
    pub block: String,
    pub iov: Option<Iov>,
    /// Alignments embedded in the fragment, in declaration order
    pub alignments: Vec<String>,
    /// Working directory, relative to the job root
    pub subdir: PathBuf,
    /// Resolved configuration written to the job directory
    pub config: ConfigTree,
    /// Jobs that must finish first
    pub parents: Vec<String>,
}

impl Job {
    pub fn executable(&self) -> &'static str {
        self.kind.executable()
    }
}

/// Name and working directory of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLayout {
    pub name: String,
    pub subdir: PathBuf,
}

/// Derive the job name and directory.
///
/// `iov_suffix` is only set when the block expands to more than one IOV,
/// so a single-IOV block keeps the bare `<prefix>_<block>` name.
pub fn layout(
    kind: ValidationKind,
    block: &str,
    alignment: Option<&str>,
    iov_suffix: Option<Iov>,
) -> Result<JobLayout, AllInOneError> {
    let mut name = format!("{}_{}", kind.job_prefix(), block);
    let mut subdir = PathBuf::from(kind.directory()).join(block);

    if let Some(alignment) = alignment {
        name.push('_');
        name.push_str(alignment);
        subdir.push(alignment);
    }
    if let Some(iov) = iov_suffix {
        name.push_str(&format!("_{iov}"));
        subdir.push(iov.to_string());
    }

    let components_ok = NAME_COMPONENT.is_match(block)
        && alignment.map_or(true, |a| NAME_COMPONENT.is_match(a));
    if !components_ok {
        return Err(AllInOneError::InvalidJobName { name });
    }

    Ok(JobLayout { name, subdir })
}

/// `(IOV, name suffix)` for every job a block expands to.
///
/// No IOVs still gives one job; a lone IOV is set but not suffixed.
pub fn iov_points(iovs: &[Iov]) -> Vec<(Option<Iov>, Option<Iov>)> {
    match iovs {
        [] => vec![(None, None)],
        [only] => vec![(Some(*only), None)],
        many => many.iter().map(|iov| (Some(*iov), Some(*iov))).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn gcp_single_iov_has_no_suffix() {
        let l = layout(ValidationKind::Gcp, "cmp1", None, None).unwrap();
        assert_eq!(l.name, "GCP_cmp1");
        assert_eq!(l.subdir, Path::new("GCP/cmp1"));
    }

    #[test]
    fn single_with_alignment_and_iov() {
        let l = layout(ValidationKind::DmrSingle, "res1", Some("A1"), Some(2)).unwrap();
        assert_eq!(l.name, "DMRsingle_res1_A1_2");
        assert_eq!(l.subdir, Path::new("DMR/single/res1/A1/2"));
    }

    #[test]
    fn merge_and_trend_layout() {
        let m = layout(ValidationKind::DmrMerge, "m1", None, Some(7)).unwrap();
        assert_eq!(m.name, "DMRmerge_m1_7");
        assert_eq!(m.subdir, Path::new("DMR/merge/m1/7"));
        let t = layout(ValidationKind::DmrTrend, "t1", None, None).unwrap();
        assert_eq!(t.name, "DMRtrend_t1");
        assert_eq!(t.subdir, Path::new("DMR/trend/t1"));
    }

    #[test]
    fn rejects_unsafe_names() {
        assert!(matches!(
            layout(ValidationKind::Gcp, "has space", None, None),
            Err(AllInOneError::InvalidJobName { .. })
        ));
        assert!(layout(ValidationKind::Gcp, "..", None, None).is_err());
        assert!(layout(ValidationKind::DmrSingle, "ok", Some("a/b"), None).is_err());
        assert!(layout(ValidationKind::Gcp, "v1.2-final+fix", None, None).is_ok());
    }

    #[test]
    fn iov_points_by_count() {
        assert_eq!(iov_points(&[]), vec![(None, None)]);
        assert_eq!(iov_points(&[5]), vec![(Some(5), None)]);
        assert_eq!(
            iov_points(&[1, 2]),
            vec![(Some(1), Some(1)), (Some(2), Some(2))]
        );
    }
}
