//! Configuration
//!
//! Every tag, pattern, field name and weight the parsers, derivers and selectors
//! use lives here, so that several simulator schemas can coexist.

/// Configuration
#[derive(Clone, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
	/// Cache simulator log schema
	pub cache: CacheSchema,

	/// Pipeline simulator log schema
	pub pipeline: PipelineSchema,

	/// Resource utilization weights
	pub weights: UtilizationWeights,

	/// Selection parameters
	pub selection: SelectionConfig,
}

/// Cache simulator log schema.
///
/// Each pattern is only tried on lines starting with it's tag.
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CacheSchema {
	pub l1_config_tag:     String,
	pub l1_config_pattern: String,
	pub victim_tag:        String,
	pub victim_pattern:    String,
	pub l2_config_tag:     String,
	pub l2_config_pattern: String,
	pub l1_aat_tag:        String,
	pub l1_aat_pattern:    String,

	/// Tag of the line that ends each record
	pub l2_aat_tag:     String,
	pub l2_aat_pattern: String,

	/// Metadata bits per L1 block
	pub l1_metadata_bits: u32,

	/// Metadata bits per L2 block
	pub l2_metadata_bits: u32,
}

impl Default for CacheSchema {
	fn default() -> Self {
		Self {
			l1_config_tag:     "L1 (C,B,S):".to_owned(),
			l1_config_pattern: r"L1 \(C,B,S\): \((\d+),(\d+),(\d+)\). Replace policy: (\w+)".to_owned(),
			victim_tag:        "Victim cache entries:".to_owned(),
			victim_pattern:    r"Victim cache entries: (\d+)".to_owned(),
			l2_config_tag:     "L2 (C,B,S):".to_owned(),
			l2_config_pattern: r"L2 \(C,B,S\): \((\d+),(\d+),(\d+)\). Replace policy: (\w+). Early Restart: (\w+)"
				.to_owned(),
			l1_aat_tag:        "L1 average access time (AAT):".to_owned(),
			l1_aat_pattern:    r"L1 average access time \(AAT\): (\d*\.\d+)".to_owned(),
			l2_aat_tag:        "L2 average access time (AAT):".to_owned(),
			l2_aat_pattern:    r"L2 average access time \(AAT\): (\d*\.\d+)".to_owned(),
			l1_metadata_bits:  2,
			l2_metadata_bits:  1,
		}
	}
}

/// Pipeline simulator log schema
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineSchema {
	/// Character that block separator lines are made of
	pub block_rule_char: char,

	/// Separator ending the trace name in a log file's name
	pub trace_name_separator: char,

	pub processor_header: String,
	pub branch_predictor_header: String,
	pub setup_complete_marker: String,
	pub output_header: String,

	/// Field names
	pub fields: PipelineFields,

	/// Predictor name that selects the `GSELECT` addressing scheme
	pub gselect_name: String,
}

impl Default for PipelineSchema {
	fn default() -> Self {
		Self {
			block_rule_char:         '=',
			trace_name_separator:    '_',
			processor_header:        "SIMULATION CONFIGURATION (PROCESSOR)".to_owned(),
			branch_predictor_header: "SIMULATION CONFIGURATION (BRANCH PREDICTOR)".to_owned(),
			setup_complete_marker:   "SETUP COMPLETE - STARTING SIMULATION".to_owned(),
			output_header:           "SIMULATION OUTPUT".to_owned(),
			fields:                  PipelineFields::default(),
			gselect_name:            "GSELECT".to_owned(),
		}
	}
}

/// Pipeline field names
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineFields {
	pub predictor:          String,
	pub history_bits:       String,
	pub pattern_bits:       String,
	pub fetch_width:        String,
	pub dispatch_width:     String,
	pub num_pregs:          String,
	pub rob_entries:        String,
	pub sched_q_per_fu:     String,
	pub num_alu:            String,
	pub num_mul:            String,
	pub num_lsu:            String,
	pub ipc:                String,
	pub total_branches:     String,
	pub branch_mispredicts: String,
}

impl Default for PipelineFields {
	fn default() -> Self {
		Self {
			predictor:          "Predictor (M)".to_owned(),
			history_bits:       "H".to_owned(),
			pattern_bits:       "P".to_owned(),
			fetch_width:        "Fetch width".to_owned(),
			dispatch_width:     "Dispatch width".to_owned(),
			num_pregs:          "Num. PREGS".to_owned(),
			rob_entries:        "ROB entries".to_owned(),
			sched_q_per_fu:     "Num. SchedQ entries per FU".to_owned(),
			num_alu:            "Num. ALU FUs".to_owned(),
			num_mul:            "Num. MUL FUs".to_owned(),
			num_lsu:            "Num. LSU FUs".to_owned(),
			ipc:                "IPC".to_owned(),
			total_branches:     "Total branch instructions".to_owned(),
			branch_mispredicts: "Branch Mispredictions".to_owned(),
		}
	}
}

/// Resource utilization weights, as relative area cost per structure
#[derive(Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UtilizationWeights {
	pub branch_pattern_table: f64,
	pub fetch_width:          f64,
	pub dispatch_width:       f64,
	pub num_pregs:            f64,
	pub reservation_station:  f64,
	pub num_alu:              f64,
	pub num_mul:              f64,
	pub num_lsu:              f64,
	pub rob_entries:          f64,
}

impl Default for UtilizationWeights {
	fn default() -> Self {
		Self {
			branch_pattern_table: 0.5,
			fetch_width:          1.0,
			dispatch_width:       1.0,
			num_pregs:            3.0,
			reservation_station:  1.5,
			num_alu:              2.0,
			num_mul:              5.0,
			num_lsu:              4.0,
			rob_entries:          4.0,
		}
	}
}

/// Selection parameters
#[derive(Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
	/// Fraction of the best IPC a candidate must reach
	pub ipc_floor_ratio: f64,

	/// Overlay parameters
	pub overlay: OverlayConfig,
}

impl Default for SelectionConfig {
	fn default() -> Self {
		Self {
			ipc_floor_ratio: 0.9,
			overlay:         OverlayConfig::default(),
		}
	}
}

/// Percentile overlay parameters
#[derive(Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
	/// Fraction of the maximum metric a record must reach to be retained
	pub retain_ratio: f64,

	/// Cost quantile (`0.0..=1.0`) under which retained records are kept
	pub cost_quantile: f64,

	/// Fraction of the maximum metric a record must reach to be highlighted
	pub highlight_ratio: f64,
}

impl Default for OverlayConfig {
	fn default() -> Self {
		Self {
			retain_ratio:    0.8,
			cost_quantile:   0.1,
			highlight_ratio: 0.9,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_config_keeps_defaults() {
		let config = serde_json::from_str::<Config>(r#"{ "weights": { "rob_entries": 8.0 }, "cache": { "l2_metadata_bits": 3 } }"#)
			.expect("Unable to parse config");

		assert_eq!(config.weights.rob_entries, 8.0);
		assert_eq!(config.weights.num_pregs, 3.0);
		assert_eq!(config.cache.l1_metadata_bits, 2);
		assert_eq!(config.cache.l2_metadata_bits, 3);
		assert_eq!(config.pipeline.fields.ipc, "IPC");
		assert_eq!(config.selection.ipc_floor_ratio, 0.9);
	}
}
