//! Cache log parser

// Imports
use {
	super::{CacheLevel, CacheRecord, Geometry},
	crate::config::CacheSchema,
	anyhow::Context,
	regex::{Captures, Regex},
	std::{
		fs,
		io::{self, BufRead},
		path::Path,
	},
};

/// Line pattern, only tried on lines starting with it's tag
#[derive(Clone, Debug)]
struct LinePattern {
	/// Tag
	tag: String,

	/// Pattern
	regex: Regex,
}

impl LinePattern {
	/// Compiles a line pattern, checking it has at least `min_groups` capture groups
	fn new(tag: &str, pattern: &str, min_groups: usize) -> Result<Self, anyhow::Error> {
		let regex = Regex::new(pattern).with_context(|| format!("Unable to compile pattern {pattern:?}"))?;
		anyhow::ensure!(
			regex.captures_len() > min_groups,
			"Pattern {pattern:?} has {} capture groups, expected at least {min_groups}",
			regex.captures_len() - 1
		);

		Ok(Self {
			tag: tag.to_owned(),
			regex,
		})
	}

	/// Matches a line against this pattern
	fn captures<'l>(&self, line: &'l str) -> Option<Captures<'l>> {
		if !line.starts_with(&self.tag) {
			return None;
		}

		let captures = self.regex.captures(line);
		if captures.is_none() {
			tracing::trace!(tag = %self.tag, line, "Pattern didn't match tagged line, skipping it");
		}
		captures
	}
}

/// Parses a capture group
fn parse_group<T>(captures: &Captures, idx: usize) -> Result<T, anyhow::Error>
where
	T: std::str::FromStr,
	T::Err: std::error::Error + Send + Sync + 'static,
{
	let group = captures.get(idx).context("Missing capture group")?.as_str();
	group
		.parse()
		.with_context(|| format!("Unable to parse capture group {idx}: {group:?}"))
}

/// Parses a cache level from captures of `(c, b, s, replace_policy, early_restart)`
fn parse_level(captures: &Captures) -> Result<CacheLevel, anyhow::Error> {
	let geometry = Geometry::new(
		self::parse_group(captures, 1)?,
		self::parse_group(captures, 2)?,
		self::parse_group(captures, 3)?,
	)
	.context("Invalid geometry")?;

	Ok(CacheLevel {
		geometry,
		replace_policy: captures
			.get(4)
			.map_or_else(String::new, |policy| policy.as_str().to_owned()),
		early_restart: captures.get(5).map(|early_restart| early_restart.as_str().to_owned()),
	})
}

/// Cache log parser
#[derive(Clone, Debug)]
pub struct CacheLogParser {
	l1_config: LinePattern,
	victim:    LinePattern,
	l2_config: LinePattern,
	l1_aat:    LinePattern,
	l2_aat:    LinePattern,
}

impl CacheLogParser {
	/// Creates a parser for `schema`
	pub fn new(schema: &CacheSchema) -> Result<Self, anyhow::Error> {
		Ok(Self {
			l1_config: LinePattern::new(&schema.l1_config_tag, &schema.l1_config_pattern, 3)
				.context("Invalid L1 configuration pattern")?,
			victim:    LinePattern::new(&schema.victim_tag, &schema.victim_pattern, 1)
				.context("Invalid victim cache pattern")?,
			l2_config: LinePattern::new(&schema.l2_config_tag, &schema.l2_config_pattern, 3)
				.context("Invalid L2 configuration pattern")?,
			l1_aat:    LinePattern::new(&schema.l1_aat_tag, &schema.l1_aat_pattern, 1)
				.context("Invalid L1 access time pattern")?,
			l2_aat:    LinePattern::new(&schema.l2_aat_tag, &schema.l2_aat_pattern, 1)
				.context("Invalid L2 access time pattern")?,
		})
	}

	/// Creates an accumulator for a log of `trace`
	pub fn accumulator(&self, trace: impl Into<String>) -> CacheAccumulator<'_> {
		CacheAccumulator {
			parser:  self,
			current: CacheRecord::new(trace),
		}
	}

	/// Returns an iterator over all records of `trace` in `reader`, parsing them lazily.
	///
	/// After the first error, the iterator ends.
	pub fn records<'a, R: BufRead + 'a>(
		&'a self,
		trace: String,
		mut reader: R,
	) -> impl Iterator<Item = Result<CacheRecord, anyhow::Error>> + 'a {
		let mut accumulator = self.accumulator(trace);
		let mut line = String::new();
		let mut line_idx = 0_usize;
		let mut failed = false;
		std::iter::from_fn(move || {
			while !failed {
				line.clear();
				line_idx += 1;
				let res = match reader.read_line(&mut line) {
					Ok(0) => return None,
					Ok(_) => accumulator.observe(line.trim_end_matches(['\r', '\n'])),
					Err(err) => Err(anyhow::Error::new(err).context("Unable to read line")),
				};

				match res {
					Ok(Some(record)) => return Some(Ok(record)),
					Ok(None) => continue,
					Err(err) => {
						failed = true;
						return Some(Err(err.context(format!("Unable to parse line {line_idx}"))));
					},
				}
			}

			None
		})
	}

	/// Parses all records of `trace` from `reader`
	pub fn parse_reader<R: BufRead>(&self, trace: &str, reader: R) -> Result<Vec<CacheRecord>, anyhow::Error> {
		self.records(trace.to_owned(), reader).collect()
	}

	/// Parses all records of `trace` from `text`
	pub fn parse_str(&self, trace: &str, text: &str) -> Result<Vec<CacheRecord>, anyhow::Error> {
		self.parse_reader(trace, text.as_bytes())
	}

	/// Parses all records of `trace` from the log file at `path`
	pub fn parse_file(&self, trace: &str, path: &Path) -> Result<Vec<CacheRecord>, anyhow::Error> {
		let file = fs::File::open(path).with_context(|| format!("Unable to open cache log {path:?}"))?;
		let records = self
			.parse_reader(trace, io::BufReader::new(file))
			.with_context(|| format!("Unable to parse cache log {path:?}"))?;
		tracing::info!(trace, ?path, records = records.len(), "Parsed cache log");

		Ok(records)
	}
}

/// Cache record accumulator.
///
/// Fields persist across records of the same log, so each record carries
/// the last value seen of every field.
#[derive(Clone, Debug)]
pub struct CacheAccumulator<'p> {
	/// Parser
	parser: &'p CacheLogParser,

	/// Current record
	current: CacheRecord,
}

impl CacheAccumulator<'_> {
	/// Observes a line.
	///
	/// Returns the finalized record when the line ends it.
	pub fn observe(&mut self, line: &str) -> Result<Option<CacheRecord>, anyhow::Error> {
		let parser = self.parser;

		if let Some(captures) = parser.l1_config.captures(line) {
			self.current.l1 = Some(self::parse_level(&captures).context("Unable to parse L1 configuration")?);
		}
		else if let Some(captures) = parser.victim.captures(line) {
			let entries = self::parse_group(&captures, 1).context("Unable to parse victim cache entries")?;
			self.current.victim_cache_entries = Some(entries);
		}
		else if let Some(captures) = parser.l2_config.captures(line) {
			self.current.l2 = Some(self::parse_level(&captures).context("Unable to parse L2 configuration")?);
		}
		else if let Some(captures) = parser.l1_aat.captures(line) {
			self.current.l1_aat = self::parse_group(&captures, 1).context("Unable to parse L1 access time")?;
		}
		else if let Some(captures) = parser.l2_aat.captures(line) {
			self.current.l2_aat = self::parse_group(&captures, 1).context("Unable to parse L2 access time")?;
			return Ok(Some(self.finalize()));
		}

		Ok(None)
	}

	/// Finalizes the current record
	pub fn finalize(&self) -> CacheRecord {
		let record = self.current.clone();
		tracing::debug!(?record, "Finalized cache record");
		record
	}

	/// Returns the record being built
	pub fn current(&self) -> &CacheRecord {
		&self.current
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const LOG: &str = "\
Cache Settings
L1 (C,B,S): (10,6,2). Replace policy: MIP
Victim cache entries: 2
L2 (C,B,S): (15,6,3). Replace policy: LIP. Early Restart: false
L1 average access time (AAT): 3.500
L2 average access time (AAT): 12.25

L1 (C,B,S): (11,6,2). Replace policy: MIP
L1 average access time (AAT): 2.750
L2 average access time (AAT): .5
";

	fn parser() -> CacheLogParser {
		CacheLogParser::new(&CacheSchema::default()).expect("Unable to create parser")
	}

	#[test]
	fn records_end_on_l2_access_time() {
		let records = parser().parse_str("gcc", LOG).expect("Unable to parse log");
		assert_eq!(records.len(), 2);

		let first = &records[0];
		assert_eq!(first.trace, "gcc");
		assert_eq!(
			first.l1.as_ref().map(|level| level.geometry),
			Some(Geometry { c: 10, b: 6, s: 2 })
		);
		assert_eq!(first.l1.as_ref().map(|level| level.replace_policy.as_str()), Some("MIP"));
		assert_eq!(first.victim_cache_entries, Some(2));
		assert_eq!(
			first.l2.as_ref().and_then(|level| level.early_restart.as_deref()),
			Some("false")
		);
		assert_eq!(first.l1_aat, 3.5);
		assert_eq!(first.l2_aat, 12.25);
	}

	#[test]
	fn fields_persist_across_records() {
		let records = parser().parse_str("gcc", LOG).expect("Unable to parse log");

		let second = &records[1];
		assert_eq!(second.l1.as_ref().map(|level| level.geometry.c), Some(11));
		assert_eq!(second.l2, records[0].l2);
		assert_eq!(second.victim_cache_entries, Some(2));
		assert_eq!(second.l1_aat, 2.75);
		assert_eq!(second.l2_aat, 0.5);
	}

	#[test]
	fn accumulator_finalizes_only_on_terminal_line() {
		let parser = parser();
		let mut accumulator = parser.accumulator("mcf");

		let lines = LOG.lines().take(5);
		for line in lines {
			assert_eq!(accumulator.observe(line).expect("Unable to observe line"), None);
		}
		assert_eq!(accumulator.current().l1_aat, 3.5);

		let record = accumulator
			.observe("L2 average access time (AAT): 1.0")
			.expect("Unable to observe line")
			.expect("Record wasn't finalized");
		assert_eq!(record.l2_aat, 1.0);
		assert_eq!(&record, accumulator.current());
	}

	#[test]
	fn unmatched_tagged_lines_are_skipped() {
		let log = "\
L1 (C,B,S): disabled
Victim cache entries: none
L2 average access time (AAT): 4
L2 average access time (AAT): 4.0
";
		let records = parser().parse_str("xz", log).expect("Unable to parse log");

		assert_eq!(records.len(), 1);
		assert_eq!(records[0].l1, None);
		assert_eq!(records[0].victim_cache_entries, None);
	}

	#[test]
	fn malformed_numbers_fail() {
		let log = "L1 (C,B,S): (99999999999,6,2). Replace policy: MIP\nL2 average access time (AAT): 1.0\n";
		let err = parser().parse_str("xz", log).expect_err("Parsed malformed log");
		assert!(format!("{err:#}").contains("line 1"));

		let log = "L1 (C,B,S): (60,6,2). Replace policy: MIP\n";
		assert!(parser().parse_str("xz", log).is_err());
	}

	#[test]
	fn logs_without_terminal_line_have_no_records() {
		let log = "L1 (C,B,S): (10,6,2). Replace policy: MIP\nL1 average access time (AAT): 3.5\n";
		assert!(parser().parse_str("xz", log).expect("Unable to parse log").is_empty());
		assert!(parser().parse_str("xz", "").expect("Unable to parse log").is_empty());
	}

	#[test]
	fn invalid_schemas_are_rejected() {
		let schema = CacheSchema {
			l2_aat_pattern: "L2 average access time".to_owned(),
			..CacheSchema::default()
		};
		assert!(CacheLogParser::new(&schema).is_err());

		let schema = CacheSchema {
			victim_pattern: "(".to_owned(),
			..CacheSchema::default()
		};
		assert!(CacheLogParser::new(&schema).is_err());
	}
}
