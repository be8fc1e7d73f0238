//! Pipeline log parser

// Imports
use {
	super::PipelineRecord,
	crate::{config::PipelineSchema, field::FieldValue},
	anyhow::Context,
	simlog_util::LineExt,
	std::{fs, path::Path},
};

/// Pipeline log parser
#[derive(Clone, Debug)]
pub struct PipelineLogParser {
	/// Schema
	schema: PipelineSchema,
}

impl PipelineLogParser {
	/// Creates a parser for `schema`
	pub fn new(schema: PipelineSchema) -> Self {
		Self { schema }
	}

	/// Returns the trace name of a log file, the part of it's name before the first separator
	pub fn trace_name(&self, path: &Path) -> Result<String, anyhow::Error> {
		let file_name = path
			.file_name()
			.context("Log path has no file name")?
			.to_str()
			.context("Log file name wasn't utf-8")?;

		let trace = match file_name.split_once(self.schema.trace_name_separator) {
			Some((trace, _)) => trace,
			None => file_name,
		};
		Ok(trace.to_owned())
	}

	/// Splits `text` into it's blocks.
	///
	/// Blocks are trimmed, and empty blocks are skipped.
	pub fn blocks<'t>(&self, text: &'t str) -> Vec<&'t str> {
		let mut blocks = vec![];
		let mut block_start = 0;
		let mut offset = 0;
		for line in text.split_inclusive('\n') {
			if line.is_rule_of(self.schema.block_rule_char) {
				blocks.push(&text[block_start..offset]);
				block_start = offset + line.len();
			}
			offset += line.len();
		}
		blocks.push(&text[block_start..]);

		blocks
			.into_iter()
			.map(str::trim)
			.filter(|block| !block.is_empty())
			.collect()
	}

	/// Returns the processor and branch predictor configuration sections of `block`, if all of their markers exist
	fn config_sections<'b>(&self, block: &'b str) -> Option<(&'b str, &'b str)> {
		let schema = &self.schema;
		let (_, rest) = block.split_once(&schema.processor_header)?;
		let (processor, rest) = rest.split_once(&schema.branch_predictor_header)?;
		let (branch_predictor, _) = rest.split_once(&schema.setup_complete_marker)?;

		Some((processor, branch_predictor))
	}

	/// Returns the output section of `block`, the lines after it's header
	fn output_section<'b>(&self, block: &'b str) -> Option<&'b str> {
		let (_, rest) = block.split_once(&self.schema.output_header)?;
		let (_, output) = rest.split_once('\n')?;

		Some(output)
	}

	/// Parses a block of `trace`.
	///
	/// Blocks without any sections still produce a record, with only the trace.
	pub fn parse_block(&self, trace: &str, block: &str) -> PipelineRecord {
		let mut record = PipelineRecord::new(trace);
		let mut parse_section = |section: &str| {
			for (key, value) in section.lines().filter_map(str::split_key_value) {
				record.fields.insert(key, FieldValue::parse(value));
			}
		};

		match self.config_sections(block) {
			Some((processor, branch_predictor)) => {
				parse_section(processor);
				parse_section(branch_predictor);
			},
			None => tracing::debug!(trace, "Block has no configuration section"),
		}

		if let Some(output) = self.output_section(block) {
			parse_section(output);
		}

		tracing::trace!(?record, "Parsed pipeline block");
		record
	}

	/// Parses all records of `trace` from `text`
	pub fn parse_str(&self, trace: &str, text: &str) -> Vec<PipelineRecord> {
		self.blocks(text)
			.into_iter()
			.map(|block| self.parse_block(trace, block))
			.collect()
	}

	/// Parses all records of the log file at `path`.
	///
	/// The trace is named after the file.
	pub fn parse_file(&self, path: &Path) -> Result<Vec<PipelineRecord>, anyhow::Error> {
		let trace = self.trace_name(path)?;
		let text = fs::read_to_string(path).with_context(|| format!("Unable to read pipeline log {path:?}"))?;

		let records = self.parse_str(&trace, &text);
		tracing::info!(%trace, ?path, records = records.len(), "Parsed pipeline log");

		Ok(records)
	}
}
