//! IOV Resolver - intervals of validity declared on a validation block
//!
//! A block carries either `IOV` (one run number) or `IOVs` (an ascending
//! list), never both. Neither means the block has no IOV dimension and
//! expands to exactly one job.
//!
//! Resolution consumes the declaration: both keys are removed from the block,
//! so job fragments only ever see the single concrete `IOV` the builder sets.

use tracing::warn;

use crate::error::AllInOneError;
use crate::tree::{ConfigTree, Separator};

/// Interval of validity: the first run it applies to
pub type Iov = u32;

pub const IOV_KEY: &str = "IOV";
pub const IOVS_KEY: &str = "IOVs";

/// Resolve and strip the IOV declaration of `tree`.
///
/// `scope` is the block's path from the config root, used in errors.
pub fn resolve_iovs(scope: &str, tree: &mut ConfigTree) -> Result<Vec<Iov>, AllInOneError> {
    let single = tree.contains(IOV_KEY);
    let list = tree.contains(IOVS_KEY);

    let iovs = match (single, list) {
        (true, true) => {
            return Err(AllInOneError::ConflictingIovSpecification {
                block: scope.to_string(),
            })
        }
        (true, false) => vec![tree.get::<Iov>(IOV_KEY).map_err(|e| e.scoped(scope))?],
        (false, true) => {
            let mut iovs: Vec<Iov> = tree
                .get_list(IOVS_KEY, Separator::CommaOrWhitespace)
                .map_err(|e| e.scoped(scope))?;
            if iovs.windows(2).any(|w| w[0] > w[1]) {
                return Err(AllInOneError::UnsortedIovs {
                    block: scope.to_string(),
                    iovs,
                });
            }
            let declared = iovs.len();
            iovs.dedup();
            if iovs.len() != declared {
                warn!(block = scope, ?iovs, "Repeated IOVs collapsed");
            }
            iovs
        }
        (false, false) => Vec::new(),
    };

    tree.erase(IOV_KEY);
    tree.erase(IOVS_KEY);
    Ok(iovs)
}
