//! Typed records projected from the Config Tree
//!
//! Built once by fallible constructors; immutable afterwards.

pub mod alignment;
pub mod color;
pub mod plot;
pub mod validation;

pub use alignment::{AlignmentVariant, Condition};
pub use plot::{PlotDescriptor, PlotValidate};
pub use validation::{ValidationBlock, ValidationKind};
