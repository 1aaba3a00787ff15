pub mod config;
pub mod error;
pub mod types;

pub use error::{HscError, HscResult};
pub use types::{KeyFit, PaddingPolicy};
