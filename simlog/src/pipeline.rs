//! Pipeline simulator logs
//!
//! Each log file holds the runs of a single trace, as blocks separated by rule lines.
//! Every block reports its own configuration and output, independently of the others.

// Modules
pub mod parser;

// Exports
pub use self::parser::PipelineLogParser;

// Imports
use {
	crate::{
		config::{OverlayConfig, PipelineFields, PipelineSchema, SelectionConfig, UtilizationWeights},
		field::{FieldMap, FieldValue},
		select::{self, FloorThenMin, Overlay, SelectionResult, Traced},
	},
	anyhow::Context,
};

/// Pipeline record
#[derive(PartialEq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct PipelineRecord {
	/// Trace
	pub trace: String,

	/// Configuration and output fields
	#[serde(flatten)]
	pub fields: FieldMap,
}

impl PipelineRecord {
	/// Creates an empty record for `trace`
	pub fn new(trace: impl Into<String>) -> Self {
		Self {
			trace:  trace.into(),
			fields: FieldMap::new(),
		}
	}
}

impl AsRef<FieldMap> for PipelineRecord {
	fn as_ref(&self) -> &FieldMap {
		&self.fields
	}
}

/// Branch predictor addressing scheme
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum PredictorScheme {
	/// History bits concatenated with address bits
	GSelect,

	/// Everything else, with history bits split across the index
	GSplit,
}

impl PredictorScheme {
	/// Returns the log2 of the number of branch pattern table entries, before clamping
	pub fn raw_shift(self, history_bits: i64, pattern_bits: i64) -> Result<i64, anyhow::Error> {
		let shift = match self {
			Self::GSelect => pattern_bits.checked_add(history_bits),
			Self::GSplit => history_bits
				.checked_mul(2)
				.and_then(|history_bits| history_bits.checked_sub(pattern_bits)),
		};

		shift
			.and_then(|shift| shift.checked_sub(12))
			.with_context(|| format!("Branch pattern table shift overflows (H={history_bits}, P={pattern_bits})"))
	}

	/// Returns the branch pattern table size.
	///
	/// The table has at least a single entry.
	pub fn pattern_table_size(self, history_bits: i64, pattern_bits: i64) -> Result<u64, anyhow::Error> {
		let shift = self.raw_shift(history_bits, pattern_bits)?.max(0);
		anyhow::ensure!(
			shift < 64,
			"Branch pattern table of 2^{shift} entries is too large (H={history_bits}, P={pattern_bits})"
		);

		Ok(1 << shift)
	}
}

/// Structural configuration of a record
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
struct Structure {
	history_bits:   i64,
	pattern_bits:   i64,
	fetch_width:    i64,
	dispatch_width: i64,
	num_pregs:      i64,
	rob_entries:    i64,
	sched_q_per_fu: i64,
	num_alu:        i64,
	num_mul:        i64,
	num_lsu:        i64,
}

impl Structure {
	/// Reads the structure of `fields`.
	///
	/// Returns `None` if any structural field is absent, and errors if any is malformed or negative.
	fn read(fields: &FieldMap, names: &PipelineFields) -> Result<Option<Self>, anyhow::Error> {
		let field = |name: &str| -> Result<Option<i64>, anyhow::Error> {
			let value = fields.int(name)?;
			if let Some(value) = value {
				anyhow::ensure!(value >= 0, "Field {name:?} is negative: {value}");
			}
			Ok(value)
		};

		let (
			Some(history_bits),
			Some(pattern_bits),
			Some(fetch_width),
			Some(dispatch_width),
			Some(num_pregs),
			Some(rob_entries),
			Some(sched_q_per_fu),
			Some(num_alu),
			Some(num_mul),
			Some(num_lsu),
		) = (
			field(&names.history_bits)?,
			field(&names.pattern_bits)?,
			field(&names.fetch_width)?,
			field(&names.dispatch_width)?,
			field(&names.num_pregs)?,
			field(&names.rob_entries)?,
			field(&names.sched_q_per_fu)?,
			field(&names.num_alu)?,
			field(&names.num_mul)?,
			field(&names.num_lsu)?,
		)
		else {
			return Ok(None);
		};

		Ok(Some(Self {
			history_bits,
			pattern_bits,
			fetch_width,
			dispatch_width,
			num_pregs,
			rob_entries,
			sched_q_per_fu,
			num_alu,
			num_mul,
			num_lsu,
		}))
	}

	/// Returns the reservation station size
	fn reservation_station_size(&self) -> Result<i64, anyhow::Error> {
		self.num_alu
			.checked_add(self.num_mul)
			.and_then(|num_fus| num_fus.checked_add(self.num_lsu))
			.and_then(|num_fus| num_fus.checked_mul(self.sched_q_per_fu))
			.with_context(|| {
				format!(
					"Reservation station size overflows (SchedQ entries per FU={}, ALU={}, MUL={}, LSU={})",
					self.sched_q_per_fu, self.num_alu, self.num_mul, self.num_lsu
				)
			})
	}
}

/// Pipeline record with derived metrics.
///
/// Records without a complete structural configuration, such as blocks that never
/// finished their setup, have no structural metrics.
#[derive(PartialEq, Clone, Debug)]
#[derive(serde::Serialize)]
pub struct PipelineDerived {
	/// Record
	#[serde(flatten)]
	pub record: PipelineRecord,

	pub branch_pattern_table_size: Option<u64>,
	pub reservation_station_size:  Option<i64>,
	pub resource_utilization:      Option<f64>,

	/// Fraction of correctly predicted branches, if any branches were reported
	pub branch_prediction_accuracy: Option<f64>,

	/// Instructions per cycle, if reported
	#[serde(skip)]
	pub ipc: Option<f64>,
}

impl PipelineDerived {
	/// Derives all metrics of `record`.
	///
	/// Malformed, negative or overflowing fields are an error.
	pub fn derive(
		record: PipelineRecord,
		schema: &PipelineSchema,
		weights: &UtilizationWeights,
	) -> Result<Self, anyhow::Error> {
		let names = &schema.fields;

		let (branch_pattern_table_size, reservation_station_size, resource_utilization) =
			match Structure::read(&record.fields, names)? {
				Some(structure) => {
					let scheme = match record.fields.string(&names.predictor) {
						Some(predictor) if predictor == schema.gselect_name => PredictorScheme::GSelect,
						_ => PredictorScheme::GSplit,
					};
					let branch_pattern_table_size =
						scheme.pattern_table_size(structure.history_bits, structure.pattern_bits)?;
					let reservation_station_size = structure.reservation_station_size()?;

					let resource_utilization = weights.branch_pattern_table * branch_pattern_table_size as f64 +
						weights.fetch_width * structure.fetch_width as f64 +
						weights.dispatch_width * structure.dispatch_width as f64 +
						weights.num_pregs * structure.num_pregs as f64 +
						weights.reservation_station * reservation_station_size as f64 +
						weights.num_alu * structure.num_alu as f64 +
						weights.num_mul * structure.num_mul as f64 +
						weights.num_lsu * structure.num_lsu as f64 +
						weights.rob_entries * structure.rob_entries as f64;

					(
						Some(branch_pattern_table_size),
						Some(reservation_station_size),
						Some(resource_utilization),
					)
				},
				None => {
					tracing::debug!(trace = %record.trace, "Record has no complete configuration");
					(None, None, None)
				},
			};

		let total_branches = record.fields.float(&names.total_branches)?;
		let mispredicts = record.fields.float(&names.branch_mispredicts)?.unwrap_or(0.0);
		let branch_prediction_accuracy = total_branches
			.filter(|&total| total > 0.0)
			.map(|total| (total - mispredicts) / total);

		let ipc = record.fields.float(&names.ipc)?;

		Ok(Self {
			record,
			branch_pattern_table_size,
			reservation_station_size,
			resource_utilization,
			branch_prediction_accuracy,
			ipc,
		})
	}
}

impl Traced for PipelineDerived {
	fn trace(&self) -> &str {
		&self.record.trace
	}
}

impl AsRef<FieldMap> for PipelineDerived {
	fn as_ref(&self) -> &FieldMap {
		&self.record.fields
	}
}

/// Derives the metrics of all records
pub fn derive_all(
	records: impl IntoIterator<Item = PipelineRecord>,
	schema: &PipelineSchema,
	weights: &UtilizationWeights,
) -> Result<Vec<PipelineDerived>, anyhow::Error> {
	records
		.into_iter()
		.map(|record| {
			let trace = record.trace.clone();
			PipelineDerived::derive(record, schema, weights)
				.with_context(|| format!("Unable to derive metrics of a record of trace {trace:?}"))
		})
		.collect()
}

/// Selects the best configuration of each trace.
///
/// Out of the records within `ipc_floor_ratio` of the trace's best IPC, picks the one
/// with the least resource utilization. Records without a complete configuration are never picked.
pub fn select_best(table: &[PipelineDerived], config: &SelectionConfig) -> Vec<SelectionResult<PipelineDerived>> {
	select::select_per_trace(table, &FloorThenMin {
		metric:      |record: &PipelineDerived| record.ipc,
		floor_ratio: config.ipc_floor_ratio,
		cost:        |record: &PipelineDerived| record.resource_utilization,
	})
}

/// Computes the IPC / resource utilization percentile overlay of each trace
pub fn overlay(table: &[PipelineDerived], config: &OverlayConfig) -> Vec<Overlay<PipelineDerived>> {
	select::percentile_overlay(
		table,
		config,
		|record| record.ipc,
		|record| record.resource_utilization,
	)
}

/// Returns all records where `field` equals `value`
pub fn filter_eq<R: AsRef<FieldMap> + Clone>(table: &[R], field: &str, value: &FieldValue) -> Vec<R> {
	self::filter_matching(table, &[(field, value.clone())])
}

/// Returns all records where every field equals it's value
pub fn filter_matching<R: AsRef<FieldMap> + Clone>(table: &[R], conditions: &[(&str, FieldValue)]) -> Vec<R> {
	table
		.iter()
		.filter(|record| {
			let fields: &FieldMap = (*record).as_ref();
			conditions.iter().all(|(field, value)| {
				fields
					.get(field)
					.is_some_and(|record_value| record_value.matches(value))
			})
		})
		.cloned()
		.collect()
}

/// Returns all records where both fields are present and equal
pub fn filter_fields_equal<R: AsRef<FieldMap> + Clone>(table: &[R], lhs: &str, rhs: &str) -> Vec<R> {
	table
		.iter()
		.filter(|record| {
			let fields: &FieldMap = (*record).as_ref();
			match (fields.get(lhs), fields.get(rhs)) {
				(Some(lhs), Some(rhs)) => lhs.matches(rhs),
				_ => false,
			}
		})
		.cloned()
		.collect()
}

/// Returns the structural columns and IPC of every configured record with an IPC, by column name
pub fn structure_columns(table: &[PipelineDerived], schema: &PipelineSchema) -> Result<Vec<(String, Vec<f64>)>, anyhow::Error> {
	let names = &schema.fields;
	let records = table
		.iter()
		.filter(|record| record.ipc.is_some())
		.filter_map(|record| {
			Some((
				record,
				record.branch_pattern_table_size?,
				record.reservation_station_size?,
			))
		})
		.collect::<Vec<_>>();

	let mut columns = vec![
		(
			"branch_pattern_table_size".to_owned(),
			records
				.iter()
				.map(|&(_, branch_pattern_table_size, _)| branch_pattern_table_size as f64)
				.collect::<Vec<_>>(),
		),
		(
			"reservation_station_size".to_owned(),
			records
				.iter()
				.map(|&(_, _, reservation_station_size)| reservation_station_size as f64)
				.collect(),
		),
	];

	for name in [
		&names.fetch_width,
		&names.dispatch_width,
		&names.num_pregs,
		&names.rob_entries,
		&names.num_alu,
		&names.num_mul,
		&names.num_lsu,
		&names.ipc,
	] {
		let column = records
			.iter()
			.map(|(record, ..)| record.record.fields.float(name).map(Option::unwrap_or_default))
			.collect::<Result<Vec<_>, _>>()
			.with_context(|| format!("Unable to read column {name:?}"))?;
		columns.push((name.clone(), column));
	}

	Ok(columns)
}
