mod buffer;
mod cancel;
mod codec;
mod error;
mod fs_util;
mod merge;
mod options;
mod run;
mod sorter;

pub use crate::cancel::CancelToken;
pub use crate::error::{Result, SortError};
pub use crate::merge::MergeCursor;
pub use crate::options::{Comparer, Compression, SortOptions};
pub use crate::sorter::Sorter;
