//! Job graph builder
//!
//! Expands validation blocks into jobs, kind by kind (GCP, then DMR single,
//! merge, trend), and streams every job to a [`JobSink`] as soon as it
//! exists. A later kind only ever depends on earlier ones, so parents always
//! reach the sink before their children.
//!
//! Every fragment names the job's `output` under `LFS`. Downstream jobs are
//! pointed at their parents' outputs: a merge through
//! `alignments.<name>.file`, a trend through `input`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::constants::{
    ALIGNMENTS_KEY, ALIGNMENT_PREFIX, FILE_KEY, GOODLUMI_KEY, INPUT_KEY, LFS_KEY,
    MERGE_SUMMARY_FILE, METHODS_KEY, NAME_KEY, OUTPUT_KEY, VALIDATIONS_KEY, VARIABLES_KEY,
};
use crate::error::AllInOneError;
use crate::iov::{Iov, IOV_KEY};
use crate::model::plot::PLOT_PREFIX;
use crate::model::{AlignmentVariant, PlotDescriptor, ValidationBlock, ValidationKind};
use crate::tree::{ConfigTree, Separator};

use super::graph::JobGraph;
use super::job::{iov_points, layout, Job};

const KNOWN_KINDS: [&str; 2] = ["GCP", "DMR"];
const KNOWN_DMR_KINDS: [&str; 3] = ["single", "merge", "trend"];

/// Receives each job right after it is added to the graph
pub trait JobSink {
    fn accept(&mut self, job: &Job) -> Result<(), AllInOneError>;
}

/// Collects jobs in memory
impl JobSink for Vec<Job> {
    fn accept(&mut self, job: &Job) -> Result<(), AllInOneError> {
        self.push(job.clone());
        Ok(())
    }
}

/// What a single or merge block turned into, for the stages that read it
#[derive(Debug, Clone)]
struct ExpandedBlock {
    iovs: Vec<Iov>,
    alignments: Vec<String>,
}

/// Per-run state of one `build` call
struct Expansion<'s, S> {
    graph: JobGraph,
    expanded: HashMap<(ValidationKind, String), ExpandedBlock>,
    sink: &'s mut S,
}

pub struct JobGraphBuilder {
    root: PathBuf,
    lfs: String,
    /// `LFS/<last component of name>`, prefix of every job output
    output_base: String,
    alignments: Vec<AlignmentVariant>,
    blocks: Vec<ValidationBlock>,
    plots: Vec<PlotDescriptor>,
}

impl JobGraphBuilder {
    /// Read globals and project the typed records.
    ///
    /// Nothing is written here: every check that can fail without touching
    /// the filesystem runs before the job root exists.
    pub fn new(config: &ConfigTree) -> Result<Self, AllInOneError> {
        let name: String = config.get(NAME_KEY)?;
        if name.trim().is_empty() {
            return Err(AllInOneError::MalformedValue {
                path: NAME_KEY.to_string(),
                value: name,
                expected: "directory path",
            });
        }
        let lfs: String = config.get(LFS_KEY)?;
        if !config.contains(ALIGNMENTS_KEY)
            && config.children_with_prefix(ALIGNMENT_PREFIX).next().is_none()
        {
            return Err(AllInOneError::MissingKey {
                path: ALIGNMENTS_KEY.to_string(),
            });
        }

        let root = PathBuf::from(&name);
        if root.exists() {
            return Err(AllInOneError::OutputAlreadyExists { path: root });
        }
        let run_name = root
            .file_name()
            .map_or_else(|| name.clone(), |n| n.to_string_lossy().into_owned());
        let output_base = format!("{}/{}", lfs.trim_end_matches('/'), run_name);

        let validations = config.child(VALIDATIONS_KEY);
        let declared = validations.map_or(false, |v| KNOWN_KINDS.iter().any(|k| v.contains(k)));
        if !declared {
            return Err(AllInOneError::NoValidationDeclared);
        }
        if let Some(validations) = validations {
            warn_unknown_kinds(validations);
        }

        let alignments = read_alignments(config)?;
        debug!(count = alignments.len(), "Alignments declared");

        let mut blocks = Vec::new();
        for kind in ValidationKind::ALL {
            blocks.extend(read_blocks(config, kind)?);
        }

        let plots = PlotDescriptor::all_from(config)?;

        let builder = Self {
            root,
            lfs,
            output_base,
            alignments,
            blocks,
            plots,
        };
        builder.check_plots()?;
        Ok(builder)
    }

    /// Job root, as written in the config
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Expand every block, handing each job to `sink` before the next one
    /// is derived.
    pub fn build<S: JobSink>(self, sink: &mut S) -> Result<JobGraph, AllInOneError> {
        let mut run = Expansion {
            graph: JobGraph::new(&self.root),
            expanded: HashMap::new(),
            sink,
        };

        for kind in ValidationKind::ALL {
            let blocks: Vec<&ValidationBlock> =
                self.blocks.iter().filter(|b| b.kind == kind).collect();
            if blocks.is_empty() {
                continue;
            }
            info!("Generating {kind} configuration files");

            for block in blocks {
                debug!(block = %block.name, iovs = ?block.iovs, "Expanding block");
                match kind {
                    ValidationKind::Gcp => self.expand_gcp(block, &mut run)?,
                    ValidationKind::DmrSingle => self.expand_single(block, &mut run)?,
                    ValidationKind::DmrMerge => self.expand_merge(block, &mut run)?,
                    ValidationKind::DmrTrend => self.expand_trend(block, &mut run)?,
                }
            }
        }

        let mut graph = run.graph;
        graph.set_plots(self.plots);
        Ok(graph)
    }

    // ─────────────────────────────────────────────────────────────
    // Expansion per kind
    // ─────────────────────────────────────────────────────────────

    /// One job per IOV comparing `reference` against `test`
    fn expand_gcp<S: JobSink>(
        &self,
        block: &ValidationBlock,
        run: &mut Expansion<'_, S>,
    ) -> Result<(), AllInOneError> {
        let variants = block
            .alignments
            .iter()
            .map(|name| self.alignment(name, &block.name))
            .collect::<Result<Vec<_>, _>>()?;

        for (iov, suffix) in iov_points(&block.iovs) {
            let layout = layout(block.kind, &block.name, None, suffix)?;
            let config = self.fragment(block, iov, &variants, &layout.subdir);
            let job = Job {
                name: layout.name,
                kind: block.kind,
                block: block.name.clone(),
                iov,
                alignments: dedup(&block.alignments),
                subdir: layout.subdir,
                config,
                parents: Vec::new(),
            };
            self.emit(run, job)?;
        }
        Ok(())
    }

    /// One job per (IOV, alignment) pair, skipping alignments that already
    /// carry results for this block
    fn expand_single<S: JobSink>(
        &self,
        block: &ValidationBlock,
        run: &mut Expansion<'_, S>,
    ) -> Result<(), AllInOneError> {
        let mut pending = Vec::new();
        for name in &block.alignments {
            let variant = self.alignment(name, &block.name)?;
            if variant.has_result_for(&block.name) {
                info!(
                    block = %block.name,
                    alignment = %name,
                    "Results already declared, skipping"
                );
                continue;
            }
            pending.push(variant);
        }

        for (iov, suffix) in iov_points(&block.iovs) {
            for &variant in &pending {
                let layout = layout(block.kind, &block.name, Some(&variant.name), suffix)?;
                let config = self.fragment(block, iov, &[variant], &layout.subdir);
                let job = Job {
                    name: layout.name,
                    kind: block.kind,
                    block: block.name.clone(),
                    iov,
                    alignments: vec![variant.name.clone()],
                    subdir: layout.subdir,
                    config,
                    parents: Vec::new(),
                };
                self.emit(run, job)?;
            }
        }

        run.expanded.insert(
            (block.kind, block.name.clone()),
            ExpandedBlock {
                iovs: block.iovs.clone(),
                alignments: dedup(&block.alignments),
            },
        );
        Ok(())
    }

    /// One job per merge IOV, waiting on the singles of that IOV and reading
    /// their outputs through `alignments.<name>.file`
    fn expand_merge<S: JobSink>(
        &self,
        block: &ValidationBlock,
        run: &mut Expansion<'_, S>,
    ) -> Result<(), AllInOneError> {
        let singles = block
            .singles
            .iter()
            .map(|single| {
                run.expanded
                    .get(&(ValidationKind::DmrSingle, single.clone()))
                    .cloned()
                    .map(|expanded| (single.as_str(), expanded))
                    .ok_or_else(|| AllInOneError::UnknownSingleReference {
                        block: block.name.clone(),
                        single: single.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let iovs = merge_iovs(block, &singles)?;
        let alignment_names = dedup(singles.iter().flat_map(|(_, s)| s.alignments.iter()));
        let variants = alignment_names
            .iter()
            .map(|name| self.alignment(name, &block.name))
            .collect::<Result<Vec<_>, _>>()?;

        for (iov, suffix) in iov_points(&iovs) {
            let inputs: Vec<&Job> = singles
                .iter()
                .flat_map(|(single, _)| {
                    run.graph
                        .jobs_of(ValidationKind::DmrSingle, single)
                        .filter(move |job| job.iov.is_none() || job.iov == iov)
                })
                .collect();
            let parents = dedup(inputs.iter().map(|job| &job.name));

            // alignment -> outputs of the singles that ran on it
            let mut files: Vec<(&str, Vec<String>)> = Vec::new();
            for job in &inputs {
                let output = self.output(&job.subdir);
                for alignment in &job.alignments {
                    match files.iter_mut().find(|(name, _)| *name == alignment.as_str()) {
                        Some((_, outputs)) => {
                            if !outputs.contains(&output) {
                                outputs.push(output.clone());
                            }
                        }
                        None => files.push((alignment.as_str(), vec![output.clone()])),
                    }
                }
            }

            let layout = layout(block.kind, &block.name, None, suffix)?;
            let mut config = self.fragment(block, iov, &variants, &layout.subdir);
            let embedded = config.child_or_insert(ALIGNMENTS_KEY);
            for (alignment, outputs) in files {
                let node = embedded.child_or_insert(alignment);
                node.erase(FILE_KEY);
                node.push_child(FILE_KEY, ConfigTree::with_value(outputs.join(",")));
            }

            let job = Job {
                name: layout.name,
                kind: block.kind,
                block: block.name.clone(),
                iov,
                alignments: alignment_names.clone(),
                subdir: layout.subdir,
                config,
                parents,
            };
            self.emit(run, job)?;
        }

        run.expanded.insert(
            (block.kind, block.name.clone()),
            ExpandedBlock {
                iovs,
                alignments: alignment_names,
            },
        );
        Ok(())
    }

    /// A single job across all IOVs of the referenced merges and singles.
    ///
    /// The fragment lists the upstream results under `input`, their IOVs
    /// under `<block>.IOV` and the merges' `methods` under
    /// `<block>.variables`.
    fn expand_trend<S: JobSink>(
        &self,
        block: &ValidationBlock,
        run: &mut Expansion<'_, S>,
    ) -> Result<(), AllInOneError> {
        if !block.iovs.is_empty() {
            warn!(
                block = %block.name,
                iovs = ?block.iovs,
                "Trends span every IOV of their inputs; declared IOVs are replaced"
            );
        }

        let mut upstream: Vec<(ValidationKind, &str)> = Vec::new();
        for merge in &block.merges {
            if !run
                .expanded
                .contains_key(&(ValidationKind::DmrMerge, merge.clone()))
            {
                return Err(AllInOneError::UnknownMergeReference {
                    trend: block.name.clone(),
                    merge: merge.clone(),
                });
            }
            upstream.push((ValidationKind::DmrMerge, merge.as_str()));
        }
        for single in &block.singles {
            if !run
                .expanded
                .contains_key(&(ValidationKind::DmrSingle, single.clone()))
            {
                return Err(AllInOneError::UnknownSingleReference {
                    block: block.name.clone(),
                    single: single.clone(),
                });
            }
            upstream.push((ValidationKind::DmrSingle, single.as_str()));
        }

        let alignment_names = dedup(upstream.iter().flat_map(|(kind, name)| {
            run.expanded
                .get(&(*kind, name.to_string()))
                .map(|e| e.alignments.clone())
                .unwrap_or_default()
        }));
        let variants = alignment_names
            .iter()
            .map(|name| self.alignment(name, &block.name))
            .collect::<Result<Vec<_>, _>>()?;

        let inputs: Vec<&Job> = upstream
            .iter()
            .flat_map(|(kind, name)| run.graph.jobs_of(*kind, name))
            .collect();
        let parents = dedup(inputs.iter().map(|job| &job.name));
        let files = dedup(inputs.iter().map(|job| {
            let output = self.output(&job.subdir);
            match job.kind {
                ValidationKind::DmrMerge => format!("{output}/{MERGE_SUMMARY_FILE}"),
                _ => output,
            }
        }));
        let mut iovs: Vec<Iov> = Vec::new();
        for iov in inputs.iter().filter_map(|job| job.iov) {
            if !iovs.contains(&iov) {
                iovs.push(iov);
            }
        }
        let variables = self.merge_methods(&block.merges)?;

        let layout = layout(block.kind, &block.name, None, None)?;
        let mut config = self.fragment(block, None, &variants, &layout.subdir);
        if !files.is_empty() {
            config.push_child(INPUT_KEY, ConfigTree::with_value(files.join(",")));
        }
        let params = config.child_or_insert(&block.name);
        if !iovs.is_empty() {
            let list: Vec<String> = iovs.iter().map(Iov::to_string).collect();
            params.push_child(IOV_KEY, ConfigTree::with_value(list.join(",")));
        }
        if !variables.is_empty() {
            params.erase(VARIABLES_KEY);
            params.push_child(VARIABLES_KEY, ConfigTree::with_value(variables.join(",")));
        }

        let job = Job {
            name: layout.name,
            kind: block.kind,
            block: block.name.clone(),
            iov: None,
            alignments: alignment_names,
            subdir: layout.subdir,
            config,
            parents,
        };
        self.emit(run, job)
    }

    // ─────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────

    fn alignment(&self, name: &str, block: &str) -> Result<&AlignmentVariant, AllInOneError> {
        self.alignments
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| AllInOneError::UnknownAlignment {
                alignment: name.to_string(),
                block: block.to_string(),
            })
    }

    /// Where the job in `subdir` writes its results
    fn output(&self, subdir: &Path) -> String {
        format!("{}/{}", self.output_base, subdir.display())
    }

    /// `methods` of the named merge blocks, first occurrence kept
    fn merge_methods(&self, merges: &[String]) -> Result<Vec<String>, AllInOneError> {
        let mut methods = Vec::new();
        for merge in merges {
            let Some(block) = self
                .blocks
                .iter()
                .find(|b| b.kind == ValidationKind::DmrMerge && &b.name == merge)
            else {
                continue;
            };
            let listed: Vec<String> = block
                .params
                .get_list_or(METHODS_KEY, Separator::CommaOrWhitespace, Vec::new())
                .map_err(|e| e.scoped(&format!("{}.{}", block.kind.config_path(), block.name)))?;
            methods.extend(listed);
        }
        Ok(dedup(methods))
    }

    /// Configuration handed to one job: `LFS`, its `output`, the alignments
    /// it reads, and the block's own parameters with `IOV` pinned.
    fn fragment(
        &self,
        block: &ValidationBlock,
        iov: Option<Iov>,
        variants: &[&AlignmentVariant],
        subdir: &Path,
    ) -> ConfigTree {
        let mut tree = ConfigTree::new();
        tree.push_child(LFS_KEY, ConfigTree::with_value(self.lfs.as_str()));
        tree.push_child(OUTPUT_KEY, ConfigTree::with_value(self.output(subdir)));

        let mut embedded = ConfigTree::new();
        for variant in variants {
            if !embedded.contains(&variant.name) {
                embedded.push_child(variant.name.clone(), variant.raw.clone());
            }
        }
        tree.push_child(ALIGNMENTS_KEY, embedded);

        let mut params = block.params.clone();
        if let Some(iov) = iov {
            params.erase(IOV_KEY);
            params.push_child(IOV_KEY, ConfigTree::with_value(iov.to_string()));
            if let Some(goodlumi) = params.child_mut(GOODLUMI_KEY) {
                let filled = goodlumi.value().replace("{}", &iov.to_string());
                goodlumi.set_value(filled);
            }
        }
        tree.push_child(block.name.clone(), params);
        tree
    }

    fn emit<S: JobSink>(&self, run: &mut Expansion<'_, S>, job: Job) -> Result<(), AllInOneError> {
        info!(job = %job.name, exec = job.executable(), "Declaring job");
        debug!(dir = %run.graph.working_dir(&job).display(), parents = ?job.parents, "Working directory");
        let job = run.graph.insert(job)?;
        run.sink.accept(job)
    }

    /// Plots are cosmetic but must point at things that exist
    fn check_plots(&self) -> Result<(), AllInOneError> {
        let blocks: HashSet<&str> = self.blocks.iter().map(|b| b.name.as_str()).collect();
        for plot in &self.plots {
            let scope = format!("{PLOT_PREFIX}{}", plot.name);
            for validate in &plot.validates {
                if !blocks.contains(validate.block.as_str()) {
                    return Err(AllInOneError::UnknownValidationReference {
                        plot: plot.name.clone(),
                        block: validate.block.clone(),
                    });
                }
                for alignment in &validate.alignments {
                    self.alignment(alignment, &scope)?;
                }
            }
        }
        Ok(())
    }
}

/// Alignments from the `alignments` block, then from top-level
/// `alignment:NAME` blocks. A name may be declared once across both.
fn read_alignments(config: &ConfigTree) -> Result<Vec<AlignmentVariant>, AllInOneError> {
    let listed = config
        .child(ALIGNMENTS_KEY)
        .into_iter()
        .flat_map(|tree| tree.children())
        .map(|(name, tree)| (format!("{ALIGNMENTS_KEY}.{name}"), name, tree));
    let prefixed = config
        .children_with_prefix(ALIGNMENT_PREFIX)
        .map(|(name, tree)| (format!("{ALIGNMENT_PREFIX}{name}"), name, tree));

    let mut alignments: Vec<AlignmentVariant> = Vec::new();
    for (scope, name, tree) in listed.chain(prefixed) {
        if alignments.iter().any(|a| a.name == name) {
            return Err(AllInOneError::DuplicateAlignment {
                name: name.to_string(),
            });
        }
        alignments.push(AlignmentVariant::from_scoped_tree(&scope, name, tree)?);
    }
    Ok(alignments)
}


/// Blocks of one kind in declaration order
fn read_blocks(
    config: &ConfigTree,
    kind: ValidationKind,
) -> Result<Vec<ValidationBlock>, AllInOneError> {
    let Some(tree) = config.find(kind.config_path()) else {
        return Ok(Vec::new());
    };

    let mut seen = HashSet::new();
    let mut blocks = Vec::new();
    for (name, subtree) in tree.children() {
        if !seen.insert(name) {
            return Err(AllInOneError::DuplicateBlock {
                kind: kind.to_string(),
                name: name.to_string(),
            });
        }
        blocks.push(ValidationBlock::from_tree(kind, name, subtree)?);
    }
    Ok(blocks)
}

fn warn_unknown_kinds(validations: &ConfigTree) {
    for (kind, _) in validations.children() {
        if !KNOWN_KINDS.contains(&kind) {
            warn!(kind, "Unknown validation kind, skipping");
        }
    }
    if let Some(dmr) = validations.child("DMR") {
        for (kind, _) in dmr.children() {
            if !KNOWN_DMR_KINDS.contains(&kind) {
                warn!(kind = %format!("DMR.{kind}"), "Unknown validation kind, skipping");
            }
        }
    }
}

/// IOVs a merge block expands to.
///
/// Declared IOVs win and must be produced by every referenced single that
/// has an IOV dimension. Otherwise the merge runs on the IOVs all such
/// singles share, in the order of the first one. Singles without IOVs run
/// once and feed every merge job.
fn merge_iovs(
    block: &ValidationBlock,
    singles: &[(&str, ExpandedBlock)],
) -> Result<Vec<Iov>, AllInOneError> {
    let constraining: Vec<&(&str, ExpandedBlock)> =
        singles.iter().filter(|(_, s)| !s.iovs.is_empty()).collect();

    if !block.iovs.is_empty() {
        for &iov in &block.iovs {
            if let Some((single, _)) = constraining.iter().find(|(_, s)| !s.iovs.contains(&iov)) {
                return Err(AllInOneError::MergeIovNotCovered {
                    merge: block.name.clone(),
                    single: single.to_string(),
                    iov,
                });
            }
        }
        return Ok(block.iovs.clone());
    }

    let Some((first, rest)) = constraining.split_first() else {
        return Ok(Vec::new());
    };
    let common: Vec<Iov> = first
        .1
        .iovs
        .iter()
        .copied()
        .filter(|iov| rest.iter().all(|(_, s)| s.iovs.contains(iov)))
        .collect();
    if common.is_empty() {
        return Err(AllInOneError::DisjointMergeIovs {
            merge: block.name.clone(),
        });
    }
    Ok(common)
}

/// First occurrence of every name, order kept
fn dedup<I, T>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = name.as_ref();
        if !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::info::read_info;

    const ALIGNMENTS: &str = r#"
alignments
{
    A1
    {
        globaltag GT1
        color     kRed
    }
    A2
    {
        globaltag GT2
    }
}
"#;

    fn config(root: &Path, body: &str) -> ConfigTree {
        let text = format!(
            "name \"{}\"\nLFS /eos/lfs\n{ALIGNMENTS}{body}",
            root.join("out").display()
        );
        read_info(&text, "test.info").unwrap()
    }

    fn compile(body: &str) -> Result<(JobGraph, Vec<Job>), AllInOneError> {
        let tmp = tempfile::tempdir().unwrap();
        let tree = config(tmp.path(), body);
        let mut sink = Vec::new();
        let graph = JobGraphBuilder::new(&tree)?.build(&mut sink)?;
        Ok((graph, sink))
    }

    fn names(jobs: &[Job]) -> Vec<&str> {
        jobs.iter().map(|j| j.name.as_str()).collect()
    }

    #[test]
    fn gcp_single_iov() {
        let (graph, sink) = compile(
            "validations { GCP { cmp1 { reference A1\ntest A2\nIOV 5\n } } }\n",
        )
        .unwrap();
        assert_eq!(names(&sink), vec!["GCP_cmp1"]);
        let job = graph.get("GCP_cmp1").unwrap();
        assert_eq!(job.subdir, Path::new("GCP/cmp1"));
        assert_eq!(job.iov, Some(5));
        assert_eq!(job.config.get::<String>("LFS").unwrap(), "/eos/lfs");
        assert!(job.config.find("alignments.A1").is_some());
        assert!(job.config.find("alignments.A2").is_some());
        assert_eq!(job.config.get::<u32>("cmp1.IOV").unwrap(), 5);
    }

    #[test]
    fn gcp_without_iov_expands_once() {
        let (_, sink) = compile("validations { GCP { cmp1 { reference A1\ntest A1\n } } }\n").unwrap();
        assert_eq!(names(&sink), vec!["GCP_cmp1"]);
        assert_eq!(sink[0].iov, None);
        assert!(!sink[0].config.contains("IOV"));
        assert!(sink[0].config.find("cmp1.IOV").is_none());
        assert_eq!(sink[0].config.get_child("alignments").unwrap().len(), 1);
    }

    #[test]
    fn single_expands_iov_by_alignment() {
        let (_, sink) = compile(
            "validations { DMR { single { res1 { alignments A1,A2\nIOVs 1,2\n } } } }\n",
        )
        .unwrap();
        assert_eq!(
            names(&sink),
            vec![
                "DMRsingle_res1_A1_1",
                "DMRsingle_res1_A2_1",
                "DMRsingle_res1_A1_2",
                "DMRsingle_res1_A2_2",
            ]
        );
        for job in &sink {
            assert_eq!(job.config.get_child("alignments").unwrap().len(), 1);
            assert!(!job.config.get_child("res1").unwrap().contains("IOVs"));
        }
    }

    #[test]
    fn alignments_with_results_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let mut tree = config(
            tmp.path(),
            "validations { DMR { single { res1 { alignments A1 A2\nIOVs 1 2\n } } } }\n",
        );
        tree.put("alignments.A1.res1", "done");
        let mut sink = Vec::new();
        JobGraphBuilder::new(&tree).unwrap().build(&mut sink).unwrap();
        assert_eq!(names(&sink), vec!["DMRsingle_res1_A2_1", "DMRsingle_res1_A2_2"]);
    }

    #[test]
    fn merge_waits_on_matching_singles() {
        let (graph, _) = compile(
            r#"
validations
{
    DMR
    {
        single
        {
            res1 { alignments A1
                   IOVs 1 2 3
            }
            res2 { alignments A2
                   IOVs 2 3
            }
        }
        merge
        {
            m1 { singles res1, res2
            }
        }
    }
}
"#,
        )
        .unwrap();
        let merges: Vec<&Job> = graph.jobs_of(ValidationKind::DmrMerge, "m1").collect();
        let merge_names: Vec<&str> = merges.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(merge_names, vec!["DMRmerge_m1_2", "DMRmerge_m1_3"]);
        assert_eq!(
            merges[0].parents,
            vec!["DMRsingle_res1_A1_2", "DMRsingle_res2_A2_2"]
        );
        assert_eq!(merges[0].alignments, vec!["A1", "A2"]);
        assert_eq!(merges[0].config.get::<u32>("m1.IOV").unwrap(), 2);
    }

    #[test]
    fn merge_declared_iovs_must_be_covered() {
        let err = compile(
            "validations { DMR {\nsingle { res1 { alignments A1\nIOVs 1 2\n } }\nmerge { m1 { singles res1\nIOVs 2 4\n } }\n} }\n",
        )
        .unwrap_err();
        match err {
            AllInOneError::MergeIovNotCovered { merge, single, iov } => {
                assert_eq!((merge.as_str(), single.as_str(), iov), ("m1", "res1", 4));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn disjoint_singles_cannot_merge() {
        let err = compile(
            "validations { DMR {\nsingle {\nres1 { alignments A1\nIOV 1\n }\nres2 { alignments A2\nIOV 2\n }\n}\nmerge { m1 { singles res1 res2\n } }\n} }\n",
        )
        .unwrap_err();
        assert!(matches!(err, AllInOneError::DisjointMergeIovs { .. }));
    }

    #[test]
    fn unknown_single_stops_before_merge_jobs() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = config(
            tmp.path(),
            "validations { DMR {\nsingle { res1 { alignments A1\n } }\nmerge { m1 { singles nope\n } }\n} }\n",
        );
        let mut sink = Vec::new();
        let err = JobGraphBuilder::new(&tree).unwrap().build(&mut sink).unwrap_err();
        assert!(matches!(err, AllInOneError::UnknownSingleReference { .. }));
        assert_eq!(names(&sink), vec!["DMRsingle_res1_A1"]);
    }

    #[test]
    fn trend_depends_on_whole_chain() {
        let (graph, sink) = compile(
            "validations { DMR {\nsingle { res1 { alignments A1 A2\nIOVs 1 2\n } }\nmerge { m1 { singles res1\n } }\ntrend { t1 { merges m1\nIOV 9\n } }\n} }\n",
        )
        .unwrap();
        assert_eq!(sink.last().unwrap().name, "DMRtrend_t1");
        let trend = graph.get("DMRtrend_t1").unwrap();
        assert_eq!(trend.parents, vec!["DMRmerge_m1_1", "DMRmerge_m1_2"]);
        assert_eq!(trend.iov, None);
        assert_eq!(trend.config.get::<String>("t1.IOV").unwrap(), "1,2");
        assert_eq!(trend.alignments, vec!["A1", "A2"]);
        assert_eq!(graph.edge_count(), 4 + 2);
    }

    #[test]
    fn gcp_expands_once_per_iov() {
        let (graph, sink) = compile(
            "validations { GCP { cmp1 { reference A1\ntest A2\nIOVs 1 2 3\n } } }\n",
        )
        .unwrap();
        assert_eq!(names(&sink), vec!["GCP_cmp1_1", "GCP_cmp1_2", "GCP_cmp1_3"]);
        assert_eq!(graph.len(), 3);
        for (job, iov) in sink.iter().zip([1, 2, 3]) {
            assert_eq!(job.subdir, Path::new("GCP/cmp1").join(iov.to_string()));
            assert_eq!(job.iov, Some(iov));
            assert_eq!(job.config.get::<u32>("cmp1.IOV").unwrap(), iov);
            assert_eq!(job.config.get_child("alignments").unwrap().len(), 2);
        }
    }

    #[test]
    fn colliding_job_names_fail_the_build() {
        let tmp = tempfile::tempdir().unwrap();
        let text = format!(
            r#"
name "{}"
LFS  /eos/lfs
alignments
{{
    c
    {{
        globaltag GT1
    }}
    b_c
    {{
        globaltag GT2
    }}
}}
validations
{{
    DMR
    {{
        single
        {{
            a_b
            {{
                alignments c
            }}
            a
            {{
                alignments b_c
            }}
        }}
    }}
}}
"#,
            tmp.path().join("out").display()
        );
        let tree = read_info(&text, "test.info").unwrap();

        let mut sink = Vec::new();
        let err = JobGraphBuilder::new(&tree).unwrap().build(&mut sink).unwrap_err();
        match err {
            AllInOneError::DuplicateJobName { name } => assert_eq!(name, "DMRsingle_a_b_c"),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(names(&sink), vec!["DMRsingle_a_b_c"]);
    }

    #[test]
    fn every_job_names_its_output() {
        let (graph, _) = compile(
            "validations {\nGCP { cmp1 { reference A1\ntest A2\n } }\nDMR { single { res1 { alignments A1\nIOVs 1 2\n } } }\n}\n",
        )
        .unwrap();
        assert_eq!(
            graph.get("GCP_cmp1").unwrap().config.get::<String>("output").unwrap(),
            "/eos/lfs/out/GCP/cmp1"
        );
        assert_eq!(
            graph
                .get("DMRsingle_res1_A1_2")
                .unwrap()
                .config
                .get::<String>("output")
                .unwrap(),
            "/eos/lfs/out/DMR/single/res1/A1/2"
        );
    }

    #[test]
    fn goodlumi_gets_the_iov() {
        let (graph, _) = compile(
            "validations { DMR { single { res1 { alignments A1\nIOVs 1 2\ngoodlumi \"/lumi/run{}.json\"\n } } } }\n",
        )
        .unwrap();
        for iov in [1, 2] {
            let job = graph.get(&format!("DMRsingle_res1_A1_{iov}")).unwrap();
            assert_eq!(
                job.config.get::<String>("res1.goodlumi").unwrap(),
                format!("/lumi/run{iov}.json")
            );
        }
    }

    #[test]
    fn merge_reads_single_outputs() {
        let (graph, _) = compile(
            r#"
validations
{
    DMR
    {
        single
        {
            res1 { alignments A1 A2
                   IOVs 1 2
            }
            res2 { alignments A1
                   IOVs 1 2
            }
        }
        merge
        {
            m1 { singles res1 res2
            }
        }
    }
}
"#,
        )
        .unwrap();
        let merge = graph.get("DMRmerge_m1_2").unwrap();
        assert_eq!(
            merge.config.get::<String>("output").unwrap(),
            "/eos/lfs/out/DMR/merge/m1/2"
        );
        assert_eq!(
            merge.config.get::<String>("alignments.A1.file").unwrap(),
            "/eos/lfs/out/DMR/single/res1/A1/2,/eos/lfs/out/DMR/single/res2/A1/2"
        );
        assert_eq!(
            merge.config.get::<String>("alignments.A2.file").unwrap(),
            "/eos/lfs/out/DMR/single/res1/A2/2"
        );
        assert_eq!(merge.config.get::<String>("alignments.A1.globaltag").unwrap(), "GT1");
    }

    #[test]
    fn trend_reads_merge_summaries() {
        let (graph, _) = compile(
            "validations { DMR {\nsingle { res1 { alignments A1\nIOVs 1 2\n } }\nmerge { m1 { singles res1\nmethods median rmsNorm\n } }\ntrend { t1 { merges m1\n } }\n} }\n",
        )
        .unwrap();
        let trend = graph.get("DMRtrend_t1").unwrap();
        assert_eq!(
            trend.config.get::<String>("input").unwrap(),
            "/eos/lfs/out/DMR/merge/m1/1/OfflineValidationSummary.root,/eos/lfs/out/DMR/merge/m1/2/OfflineValidationSummary.root"
        );
        assert_eq!(trend.config.get::<String>("t1.IOV").unwrap(), "1,2");
        assert_eq!(trend.config.get::<String>("t1.variables").unwrap(), "median,rmsNorm");
        assert_eq!(
            trend.config.get::<String>("output").unwrap(),
            "/eos/lfs/out/DMR/trend/t1"
        );
    }

    #[test]
    fn alignment_blocks_at_top_level() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("out");
        let text = format!(
            "name \"{}\"\nLFS /eos/lfs\n\"alignment:A1\" {{\nglobaltag GT1\n}}\n\"alignment:A2\" {{\nglobaltag GT2\ncolor kGrey\n}}\nvalidations {{ GCP {{ c {{\nreference A1\ntest A2\n}} }} }}\n",
            root.display()
        );
        let tree = read_info(&text, "t").unwrap();
        let mut sink = Vec::new();
        JobGraphBuilder::new(&tree).unwrap().build(&mut sink).unwrap();
        assert_eq!(names(&sink), vec!["GCP_c"]);
        assert_eq!(sink[0].config.get::<String>("alignments.A2.globaltag").unwrap(), "GT2");

        // both forms feed one lookup
        let mixed = config(tmp.path(), "\"alignment:A3\" {\nglobaltag GT3\n}\nvalidations { GCP { c {\nreference A1\ntest A3\n} } }\n");
        let mut sink = Vec::new();
        JobGraphBuilder::new(&mixed).unwrap().build(&mut sink).unwrap();
        assert!(sink[0].config.find("alignments.A3").is_some());

        let twice = config(tmp.path(), "\"alignment:A1\" {\nglobaltag GT9\n}\nvalidations { GCP { c {\nreference A1\ntest A2\n} } }\n");
        match JobGraphBuilder::new(&twice) {
            Err(AllInOneError::DuplicateAlignment { name }) => assert_eq!(name, "A1"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }

        let none = read_info(
            &format!("name \"{}\"\nLFS /x\nvalidations {{ GCP {{ c {{\nreference A1\ntest A2\n}} }} }}\n", root.display()),
            "t",
        )
        .unwrap();
        match JobGraphBuilder::new(&none) {
            Err(AllInOneError::MissingKey { path }) => assert_eq!(path, "alignments"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn trend_unknown_merge() {
        let err = compile("validations { DMR { trend { t1 { merges m9\n } } } }\n").unwrap_err();
        assert!(matches!(err, AllInOneError::UnknownMergeReference { .. }));
    }

    #[test]
    fn globals_and_declarations() {
        assert!(matches!(
            compile("").unwrap_err(),
            AllInOneError::NoValidationDeclared
        ));
        assert!(matches!(
            compile("validations { GCP { c { reference A1\ntest A9\n } } }\n").unwrap_err(),
            AllInOneError::UnknownAlignment { .. }
        ));
        assert!(matches!(
            compile("validations { GCP {\nc { reference A1\ntest A2\n }\nc { reference A1\ntest A2\n }\n} }\n")
                .unwrap_err(),
            AllInOneError::DuplicateBlock { .. }
        ));

        let tree = read_info("LFS /x\nalignments { }\n", "t").unwrap();
        match JobGraphBuilder::new(&tree) {
            Err(AllInOneError::MissingKey { path }) => assert_eq!(path, "name"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn existing_root_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("out")).unwrap();
        let tree = config(tmp.path(), "validations { GCP { c { reference A1\ntest A2\n } } }\n");
        assert!(matches!(
            JobGraphBuilder::new(&tree),
            Err(AllInOneError::OutputAlreadyExists { .. })
        ));
    }

    #[test]
    fn plots_are_checked_up_front() {
        let err = compile(
            "validations { GCP { c { reference A1\ntest A2\n } } }\n\"plot:p\" { \"validate zz\" A1\n }\n",
        )
        .unwrap_err();
        assert!(matches!(err, AllInOneError::UnknownValidationReference { .. }));

        let (graph, sink) = compile(
            "validations { GCP { c { reference A1\ntest A2\n } } }\n\"plot:p\" { \"validate c\" A1\n }\n",
        )
        .unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(graph.plots()[0].name, "p");
    }

    #[test]
    fn merge_iov_policy() {
        let block = |iovs: Vec<Iov>| ValidationBlock {
            name: "m".into(),
            kind: ValidationKind::DmrMerge,
            params: ConfigTree::new(),
            iovs,
            alignments: vec![],
            singles: vec![],
            merges: vec![],
        };
        let single = |iovs: Vec<Iov>| ExpandedBlock {
            iovs,
            alignments: vec![],
        };

        let singles = [("a", single(vec![3, 1])), ("b", single(vec![])), ("c", single(vec![1, 3, 5]))];
        assert_eq!(merge_iovs(&block(vec![]), &singles).unwrap(), vec![3, 1]);
        assert_eq!(merge_iovs(&block(vec![1]), &singles).unwrap(), vec![1]);
        assert_eq!(merge_iovs(&block(vec![]), &[("b", single(vec![]))]).unwrap(), Vec::<Iov>::new());
    }
}
