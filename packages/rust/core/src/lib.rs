//! Request orchestration and result shaping for entsoe.
//!
//! This crate ties the catalog, resolver and flattener together into the
//! `get_data` workflow: parameter filling, rate-limited transport, archive
//! unpacking, oversized-range recovery, and row merging.

pub mod archive;
pub mod merge;
pub mod pairs;
pub mod params;
pub mod pipeline;
pub mod ratelimit;
pub mod split;
pub mod timestamps;
pub mod transport;
pub mod window;

pub use merge::{DEFAULT_EXTENDS, merge_rows};
pub use pairs::{AreaPair, expand_pairs};
pub use params::{RequestParams, fill_parameters};
pub use pipeline::{
    AreaQuery, DataQuery, EntsoeClient, Failure, ProgressReporter, QueryResult, RequestState,
    SilentProgress,
};
pub use ratelimit::CallLimiter;
pub use split::{LimitUnit, RangeLimit, split_interval};
pub use timestamps::add_sample_timestamps;
pub use transport::{FetchResponse, HttpTransport, Transport};
pub use window::TimeWindow;
