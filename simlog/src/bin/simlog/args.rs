//! Arguments

// Imports
use std::path::PathBuf;

/// Arguments
#[derive(Debug)]
#[derive(clap::Parser)]
pub struct Args {
	/// Log file
	///
	/// Specifies a file to perform verbose logging to.
	/// You can use `RUST_LOG_FILE` to set filtering options
	#[clap(long = "log-file")]
	pub log_file: Option<PathBuf>,

	/// Whether to append to the log file
	#[clap(long = "log-file-append")]
	pub log_file_append: bool,

	/// Config file
	///
	/// Uses the default configuration if not passed.
	#[clap(long = "config")]
	pub config_file: Option<PathBuf>,

	/// Sub-command
	#[command(subcommand)]
	pub sub_cmd: SubCmd,
}

/// Sub-command
#[derive(Debug)]
#[derive(clap::Subcommand)]
pub enum SubCmd {
	/// Cache hierarchy simulator logs
	///
	/// Selects the configuration with the least total access time, then the least total size.
	#[clap(name = "cache")]
	Cache {
		/// Directory with the logs
		#[clap(long = "trace-dir", default_value = ".")]
		trace_dir: PathBuf,

		/// Traces to read, each from `<trace-dir>/<trace>.<extension>`
		#[clap(long = "trace", required = true)]
		traces: Vec<String>,

		/// Log file extension
		#[clap(long = "extension", default_value = "out")]
		extension: String,

		#[clap(flatten)]
		output: OutputArgs,
	},

	/// Pipeline simulator logs
	///
	/// Selects the configuration with the least resource utilization, out of those
	/// close enough to the best IPC.
	#[clap(name = "pipeline")]
	Pipeline {
		/// Log files.
		///
		/// Each file's trace is the part of it's name before the first separator.
		#[clap(required = true)]
		files: Vec<PathBuf>,

		#[clap(flatten)]
		output: OutputArgs,

		/// Percentile overlay output file
		#[clap(long = "overlay-output")]
		overlay_output: Option<PathBuf>,

		/// IPC summary and correlation output file
		#[clap(long = "summary-output")]
		summary_output: Option<PathBuf>,
	},
}

/// Output arguments
#[derive(Debug)]
#[derive(clap::Args)]
pub struct OutputArgs {
	/// Derived table output file
	#[clap(long = "output")]
	pub output: Option<PathBuf>,

	/// Best configuration per trace output file
	#[clap(long = "best-output")]
	pub best_output: Option<PathBuf>,
}
