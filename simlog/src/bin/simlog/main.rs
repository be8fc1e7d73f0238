//! Simulator log post-processing (`simlog`)

// Modules
mod args;

// Imports
use {
	self::args::{Args, OutputArgs, SubCmd},
	anyhow::Context,
	clap::Parser,
	simlog::{
		cache::{self, CacheLevel, CacheLogParser},
		pipeline::{self, PipelineDerived, PipelineLogParser},
		summary::{self, CorrelationMatrix, MetricSummary},
		Config,
	},
	simlog_util::{logger, DisplayWrapper},
	std::{
		fmt,
		fs,
		path::{Path, PathBuf},
	},
};

fn main() -> Result<(), anyhow::Error> {
	// Get arguments
	let args = Args::parse();
	logger::pre_init::debug(format!("Args: {args:?}"));

	// Initialize logging
	logger::init(args.log_file.as_deref(), args.log_file_append);

	// Read the config file
	let config = match &args.config_file {
		Some(config_path) => {
			let config_file = fs::File::open(config_path).context("Unable to open config file")?;
			serde_json::from_reader::<_, Config>(config_file).context("Unable to parse config file")?
		},
		None => Config::default(),
	};
	tracing::debug!(?config, "Loaded config");

	match args.sub_cmd {
		SubCmd::Cache {
			trace_dir,
			traces,
			extension,
			output,
		} => self::run_cache(&config, &trace_dir, &traces, &extension, &output),
		SubCmd::Pipeline {
			files,
			output,
			overlay_output,
			summary_output,
		} => self::run_pipeline(
			&config,
			&files,
			&output,
			overlay_output.as_deref(),
			summary_output.as_deref(),
		),
	}
}

/// Processes the cache simulator logs of `traces`
fn run_cache(
	config: &Config,
	trace_dir: &Path,
	traces: &[String],
	extension: &str,
	output: &OutputArgs,
) -> Result<(), anyhow::Error> {
	let parser = CacheLogParser::new(&config.cache).context("Unable to create cache log parser")?;

	let mut records = vec![];
	for trace in traces {
		let path = trace_dir.join(format!("{trace}.{extension}"));
		match parser.parse_file(trace, &path) {
			Ok(trace_records) => records.extend(trace_records),
			Err(err) => tracing::warn!(%trace, ?path, "Skipping cache log: {err:?}"),
		}
	}

	let table = cache::derive_all(records, &config.cache);
	let best = cache::select_best(&table);
	for result in &best {
		let record = &result.best.record;
		tracing::info!(
			trace = %result.trace,
			l1 = %self::display_level(record.l1.as_ref()),
			victim_cache_entries = ?record.victim_cache_entries,
			l2 = %self::display_level(record.l2.as_ref()),
			total_access_time = result.best.total_access_time,
			total_size = result.best.total_size,
			candidates = result.candidates.len(),
			"Best cache configuration"
		);
	}

	self::write_outputs(output, &table, &best)
}

/// Processes the pipeline simulator logs in `files`
fn run_pipeline(
	config: &Config,
	files: &[PathBuf],
	output: &OutputArgs,
	overlay_output: Option<&Path>,
	summary_output: Option<&Path>,
) -> Result<(), anyhow::Error> {
	let parser = PipelineLogParser::new(config.pipeline.clone());

	let mut table = vec![];
	for path in files {
		let res = parser
			.parse_file(path)
			.and_then(|records| pipeline::derive_all(records, &config.pipeline, &config.weights));
		match res {
			Ok(file_table) => table.extend(file_table),
			Err(err) => tracing::warn!(?path, "Skipping pipeline log: {err:?}"),
		}
	}

	let best = pipeline::select_best(&table, &config.selection);
	for result in &best {
		let fields = DisplayWrapper::new(|f: &mut fmt::Formatter| {
			for (name, value) in result.best.record.fields.iter() {
				write!(f, "[{name}: {value}]")?;
			}
			Ok(())
		});
		tracing::info!(
			trace = %result.trace,
			%fields,
			ipc = ?result.best.ipc,
			resource_utilization = ?result.best.resource_utilization,
			candidates = result.candidates.len(),
			"Best pipeline configuration"
		);
	}

	self::write_outputs(output, &table, &best)?;

	if let Some(overlay_path) = overlay_output {
		let overlay = pipeline::overlay(&table, &config.selection.overlay);
		self::write_json(overlay_path, &overlay[..]).context("Unable to write overlay")?;
	}

	if let Some(summary_path) = summary_output {
		let columns = pipeline::structure_columns(&table, &config.pipeline)?;
		let summary = Summary {
			ipc:         summary::summarize(&table, |record: &PipelineDerived| record.ipc),
			correlation: summary::correlation_matrix(&columns).context("Unable to correlate structure with IPC")?,
		};
		self::write_json(summary_path, &summary).context("Unable to write summary")?;
	}

	Ok(())
}

/// Summary output
#[derive(Debug)]
#[derive(serde::Serialize)]
struct Summary {
	/// IPC summary of each trace
	ipc: Vec<MetricSummary>,

	/// Correlation between the structure and IPC
	correlation: CorrelationMatrix,
}

/// Displays a cache level as `(c,b,s) policy`
fn display_level(level: Option<&CacheLevel>) -> impl fmt::Display + '_ {
	DisplayWrapper::new(move |f: &mut fmt::Formatter| match level {
		Some(level) => {
			let geometry = level.geometry;
			write!(f, "({},{},{}) {}", geometry.c, geometry.b, geometry.s, level.replace_policy)
		},
		None => f.pad("-"),
	})
}

/// Writes the derived and best tables, if requested
fn write_outputs<T: serde::Serialize, B: serde::Serialize>(
	output: &OutputArgs,
	table: &[T],
	best: &[B],
) -> Result<(), anyhow::Error> {
	if let Some(output_path) = &output.output {
		self::write_json(output_path, table).context("Unable to write derived table")?;
	}

	if let Some(best_path) = &output.best_output {
		self::write_json(best_path, best).context("Unable to write best configurations")?;
	}

	Ok(())
}

/// Writes `value` as json to `path`
fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), anyhow::Error> {
	let output_file = fs::File::create(path).with_context(|| format!("Unable to create output file {path:?}"))?;
	serde_json::to_writer_pretty(output_file, value).context("Unable to write to output file")?;
	tracing::info!(?path, "Wrote output");

	Ok(())
}
