pub mod args;
pub mod best_of;
pub mod config;
pub mod dtype;
pub mod error;
pub mod kernels;
pub mod padding;
pub mod profile;
pub mod tensor;
pub mod test_utils;

pub use args::{parse_arguments, ProfileSettings};
pub use best_of::{io_size, padded_size, Alternative, BestOf, BestOfRow, ProblemSize, ProblemSizeFn};
pub use config::{BestOfConfig, ParallelConfig};
pub use dtype::AnyTensor;
pub use error::{LayoutError, Result};
pub use kernels::{pad, shrink, shrink_block, shrink_naive, transpose01_and_pad};
pub use padding::Padding;
pub use profile::{format_report, run_profile, LayerShape, ALEXNET_LAYERS};
pub use tensor::{DType, Element, Shape4, Tensor4};
