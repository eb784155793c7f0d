pub mod aggregator;
pub mod normalize;

pub use aggregator::{
    CallRecord, EndpointSummary, ErrorKind, ErrorSummary, TelemetryAggregator, TelemetrySummary, OVERFLOW_ENDPOINT,
    UNKNOWN_ERROR_KIND,
};
pub use normalize::{normalize_endpoint, UNKNOWN_ENDPOINT};
