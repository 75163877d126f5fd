pub mod aggregate;
pub mod classify;
pub mod ingest;
pub mod pipeline;
pub mod recommend;
pub mod render;
pub mod report;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use classify::{Classifier, ClassifiedRecord, KeywordClassifier, RemoteClassifier, TopicClassifier};
pub use pipeline::{run, run_dir, AnalysisRun};
pub use render::{ChartRenderer, PngRenderer, VegaLiteRenderer};
pub use report::{Report, ReportWriter, WriteOutcome};
