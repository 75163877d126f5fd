pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, ChartFormat, ClassifierKind, FileConfig};
pub use error::{FeedlensError, Result};
pub use types::*;
