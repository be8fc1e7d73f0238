//! Cache hierarchy simulator logs
//!
//! Each log file holds the results of a single trace, as a stream of lines
//! where the L2 average access time ends every configuration.

// Modules
pub mod parser;

// Exports
pub use self::parser::{CacheAccumulator, CacheLogParser};

// Imports
use crate::{
	config::CacheSchema,
	select::{self, LexicographicMin, SelectionResult, Traced},
};

/// Cache geometry
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Geometry {
	/// Log2 of the capacity
	pub c: u32,

	/// Log2 of the block size
	pub b: u32,

	/// Log2 of the associativity
	pub s: u32,
}

impl Geometry {
	/// Maximum log2 of the capacity
	pub const MAX_C: u32 = 48;

	/// Creates a geometry, checking that it's valid
	pub fn new(c: u32, b: u32, s: u32) -> Result<Self, anyhow::Error> {
		anyhow::ensure!(c <= Self::MAX_C, "Capacity 2^{c} is larger than 2^{}", Self::MAX_C);
		anyhow::ensure!(b <= c, "Block size 2^{b} is larger than capacity 2^{c}");
		anyhow::ensure!(s <= c, "Associativity 2^{s} is larger than capacity 2^{c}");

		Ok(Self { c, b, s })
	}

	/// Returns the number of blocks
	pub fn blocks(&self) -> u64 {
		1 << (self.c - self.b)
	}

	/// Returns the data storage, in bytes
	pub fn data_storage(&self) -> u64 {
		1 << self.c
	}

	/// Returns the tag storage, in bytes, with `metadata_bits` per block.
	///
	/// Each block stores its tag, everything but the `c - s` index bits of a 64-bit
	/// address, along with its metadata.
	pub fn tag_storage(&self, metadata_bits: u32) -> u64 {
		let tag_bits = 64 - u64::from(self.c - self.s);
		self.blocks() * (tag_bits + u64::from(metadata_bits)) / 8
	}
}

/// Cache level configuration
#[derive(PartialEq, Eq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct CacheLevel {
	/// Geometry
	pub geometry: Geometry,

	/// Replacement policy
	pub replace_policy: String,

	/// Early restart, if reported for this level
	pub early_restart: Option<String>,
}

/// Cache record.
///
/// Configuration and results of a single run over a trace.
#[derive(PartialEq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct CacheRecord {
	/// Trace
	pub trace: String,

	/// L1 configuration
	pub l1: Option<CacheLevel>,

	/// Victim cache entries
	pub victim_cache_entries: Option<u64>,

	/// L2 configuration
	pub l2: Option<CacheLevel>,

	/// L1 average access time
	pub l1_aat: f64,

	/// L2 average access time
	pub l2_aat: f64,
}

impl CacheRecord {
	/// Creates an empty record for `trace`
	pub fn new(trace: impl Into<String>) -> Self {
		Self {
			trace:                trace.into(),
			l1:                   None,
			victim_cache_entries: None,
			l2:                   None,
			l1_aat:               0.0,
			l2_aat:               0.0,
		}
	}
}

/// Cache record with derived metrics.
///
/// Storage of an absent level is zero. The victim cache isn't sized.
#[derive(PartialEq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct CacheDerived {
	/// Record
	#[serde(flatten)]
	pub record: CacheRecord,

	pub l1_data_storage: u64,
	pub l1_tag_storage:  u64,
	pub l2_data_storage: u64,
	pub l2_tag_storage:  u64,

	/// Sum of the average access times of both levels
	pub total_access_time: f64,

	/// Sum of the data and tag storage of both levels
	pub total_size: u64,
}

impl CacheDerived {
	/// Derives all metrics of `record`
	pub fn derive(record: CacheRecord, schema: &CacheSchema) -> Self {
		let storage = |level: &Option<CacheLevel>, metadata_bits| {
			level.as_ref().map_or((0, 0), |level| {
				(level.geometry.data_storage(), level.geometry.tag_storage(metadata_bits))
			})
		};
		let (l1_data_storage, l1_tag_storage) = storage(&record.l1, schema.l1_metadata_bits);
		let (l2_data_storage, l2_tag_storage) = storage(&record.l2, schema.l2_metadata_bits);

		Self {
			total_access_time: record.l1_aat + record.l2_aat,
			total_size: l1_data_storage + l1_tag_storage + l2_data_storage + l2_tag_storage,
			record,
			l1_data_storage,
			l1_tag_storage,
			l2_data_storage,
			l2_tag_storage,
		}
	}
}

impl Traced for CacheDerived {
	fn trace(&self) -> &str {
		&self.record.trace
	}
}

/// Derives the metrics of all records
pub fn derive_all(records: impl IntoIterator<Item = CacheRecord>, schema: &CacheSchema) -> Vec<CacheDerived> {
	records
		.into_iter()
		.map(|record| CacheDerived::derive(record, schema))
		.collect()
}

/// Selects the best configuration of each trace.
///
/// Minimizes the total access time, breaking ties by the total size.
pub fn select_best(table: &[CacheDerived]) -> Vec<SelectionResult<CacheDerived>> {
	select::select_per_trace(table, &LexicographicMin {
		primary:   |record: &CacheDerived| record.total_access_time,
		secondary: |record: &CacheDerived| record.total_size,
	})
}
