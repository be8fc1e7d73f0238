//! Simulator log post-processing (`simlog`)
//!
//! Parses the logs of a cache hierarchy simulator and of an out-of-order pipeline
//! simulator into records, derives their storage and resource metrics, and selects
//! the best configuration of each trace.

// Modules
pub mod cache;
pub mod config;
pub mod field;
pub mod pipeline;
pub mod select;
pub mod summary;

// Exports
pub use self::{
	cache::{CacheDerived, CacheLogParser, CacheRecord},
	config::Config,
	field::{FieldMap, FieldValue},
	pipeline::{PipelineDerived, PipelineLogParser, PipelineRecord},
	select::{SelectionResult, Traced},
};
