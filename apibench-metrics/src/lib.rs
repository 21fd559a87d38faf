mod metrics;
mod registry;
mod series;

pub use metrics::{HistogramSummary, new_latency_histogram, summarize_histogram};
pub use registry::{SeriesKey, SeriesRegistry};
pub use series::{RequestSeries, SeriesSnapshot};
