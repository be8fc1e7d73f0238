//! Logger

// Imports
use {
	std::{
		fs,
		io::{self, IsTerminal},
		path::Path,
		sync::Mutex,
	},
	tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter},
};

/// Initializes the logger.
///
/// Logs to stderr, filtered by `RUST_LOG`, and, if `log_file` is set, to that
/// file as well, filtered by `RUST_LOG_FILE`.
///
/// # Panics
/// Panics if a global subscriber was already set.
pub fn init(log_file: Option<&Path>, log_file_append: bool) {
	let term_layer = fmt::layer()
		.with_writer(io::stderr)
		.with_ansi(io::stderr().is_terminal())
		.with_filter(self::env_filter("RUST_LOG", LevelFilter::INFO));

	// Note: If we can't open the log file, we still want to log to stderr
	let mut log_file_err = None;
	let file_layer = log_file.and_then(|path| {
		let file = fs::OpenOptions::new()
			.create(true)
			.write(true)
			.append(log_file_append)
			.truncate(!log_file_append)
			.open(path);

		match file {
			Ok(file) => Some(
				fmt::layer()
					.with_writer(Mutex::new(file))
					.with_ansi(false)
					.with_filter(self::env_filter("RUST_LOG_FILE", LevelFilter::DEBUG)),
			),
			Err(err) => {
				log_file_err = Some((path.to_path_buf(), err));
				None
			},
		}
	});

	tracing_subscriber::registry().with(term_layer).with(file_layer).init();

	if let Some((path, err)) = log_file_err {
		tracing::warn!(?path, ?err, "Unable to open log file");
	}

	// Finally flush everything logged before we were initialized
	for msg in pre_init::take_messages() {
		tracing::debug!("{msg}");
	}
}

/// Creates an env filter from `env_var`, defaulting to `default_level`
fn env_filter(env_var: &str, default_level: LevelFilter) -> EnvFilter {
	EnvFilter::builder()
		.with_default_directive(default_level.into())
		.with_env_var(env_var)
		.from_env_lossy()
}

/// Logging before the logger is initialized
pub mod pre_init {
	// Imports
	use std::sync::Mutex;

	/// Messages buffered until the logger is initialized
	static MESSAGES: Mutex<Vec<String>> = Mutex::new(Vec::new());

	/// Buffers a debug message
	pub fn debug(msg: impl Into<String>) {
		// Note: A poisoned lock only means another thread panicked mid-push, the buffer is still valid
		MESSAGES
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.push(msg.into());
	}

	/// Takes all buffered messages
	pub(super) fn take_messages() -> Vec<String> {
		std::mem::take(&mut *MESSAGES.lock().unwrap_or_else(|err| err.into_inner()))
	}

}
