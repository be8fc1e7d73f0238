//! Configuration selection
//!
//! Picks one record per trace out of a derived table. Both policies are generic
//! over the record type, and only see it through the metric closures they're given.

// Modules
pub mod overlay;

// Exports
pub use self::overlay::{percentile_overlay, Overlay};

// Imports
use std::{cmp::Ordering, collections::HashMap};

/// A record that belongs to a trace
pub trait Traced {
	/// Returns the trace this record belongs to
	fn trace(&self) -> &str;
}

/// Selection policy
pub trait Policy<R> {
	/// Selects a record out of all records of a trace.
	///
	/// Returns `None` if no record qualifies.
	fn select<'a>(&self, group: &[&'a R]) -> Option<Choice<'a, R>>;
}

/// Choice made by a [`Policy`]
#[derive(Clone, Debug)]
pub struct Choice<'a, R> {
	/// Chosen record
	pub best: &'a R,

	/// Qualifying records the best one was chosen from
	pub candidates: Vec<&'a R>,
}

/// Selection of a single trace
#[derive(Clone, Debug)]
#[derive(serde::Serialize)]
pub struct SelectionResult<R> {
	/// Trace
	pub trace: String,

	/// Chosen record
	pub best: R,

	/// Qualifying records the best one was chosen from
	pub candidates: Vec<R>,
}

/// Groups records by trace, in order of each trace's first appearance
pub fn group_by_trace<R: Traced>(records: &[R]) -> Vec<(&str, Vec<&R>)> {
	let mut group_idxs = HashMap::<&str, usize>::new();
	let mut groups = Vec::<(&str, Vec<&R>)>::new();
	for record in records {
		let trace = record.trace();
		let group_idx = *group_idxs.entry(trace).or_insert_with(|| {
			groups.push((trace, vec![]));
			groups.len() - 1
		});
		groups[group_idx].1.push(record);
	}

	groups
}

/// Selects one record per trace with `policy`.
///
/// Traces where no record qualifies are left out of the result.
pub fn select_per_trace<R: Traced + Clone, P: Policy<R>>(records: &[R], policy: &P) -> Vec<SelectionResult<R>> {
	self::group_by_trace(records)
		.into_iter()
		.filter_map(|(trace, group)| {
			let Some(choice) = policy.select(&group) else {
				tracing::warn!(trace, records = group.len(), "No record qualified for selection");
				return None;
			};

			Some(SelectionResult {
				trace:      trace.to_owned(),
				best:       choice.best.clone(),
				candidates: choice.candidates.into_iter().cloned().collect(),
			})
		})
		.collect()
}

/// Lexicographic minimization.
///
/// Strictly minimizes `primary`, and among exact ties minimizes `secondary`.
/// The first record wins any remaining tie.
/// The candidates are all records tied on the minimum `primary`.
#[derive(Clone, Copy, Debug)]
pub struct LexicographicMin<P, S> {
	/// Primary metric
	pub primary: P,

	/// Tie-breaking metric
	pub secondary: S,
}

impl<R, P, S, K> Policy<R> for LexicographicMin<P, S>
where
	P: Fn(&R) -> f64,
	S: Fn(&R) -> K,
	K: Ord,
{
	fn select<'a>(&self, group: &[&'a R]) -> Option<Choice<'a, R>> {
		let best = group.iter().copied().reduce(|best, record| {
			let ord = (self.primary)(record)
				.total_cmp(&(self.primary)(best))
				.then_with(|| (self.secondary)(record).cmp(&(self.secondary)(best)));
			match ord {
				Ordering::Less => record,
				Ordering::Equal | Ordering::Greater => best,
			}
		})?;

		let best_primary = (self.primary)(best);
		let candidates = group
			.iter()
			.copied()
			.filter(|&record| (self.primary)(record).total_cmp(&best_primary).is_eq())
			.collect();

		Some(Choice { best, candidates })
	}
}

/// Performance floor, then minimum cost.
///
/// Records with a metric of at least `floor_ratio` times the best metric qualify,
/// and out of those the one with the least cost is chosen, the first winning ties.
/// Records without a metric or a cost never qualify, although the best metric
/// is taken over every record with one.
#[derive(Clone, Copy, Debug)]
pub struct FloorThenMin<M, C> {
	/// Performance metric
	pub metric: M,

	/// Fraction of the best metric a record must reach
	pub floor_ratio: f64,

	/// Cost
	pub cost: C,
}

impl<R, M, C> Policy<R> for FloorThenMin<M, C>
where
	M: Fn(&R) -> Option<f64>,
	C: Fn(&R) -> Option<f64>,
{
	fn select<'a>(&self, group: &[&'a R]) -> Option<Choice<'a, R>> {
		let best_metric = self::max_metric(group, &self.metric)?;
		let floor = self.floor_ratio * best_metric;

		let candidates = self::records_above(group, &self.metric, floor)
			.into_iter()
			.filter(|&record| (self.cost)(record).is_some())
			.collect::<Vec<_>>();
		let best = self::min_cost(&candidates, &self.cost)?;

		Some(Choice { best, candidates })
	}
}

/// Returns the maximum metric of all records, if any has one
pub(crate) fn max_metric<R>(records: &[&R], metric: impl Fn(&R) -> Option<f64>) -> Option<f64> {
	records
		.iter()
		.filter_map(|&record| metric(record))
		.filter(|value| !value.is_nan())
		.reduce(f64::max)
}

/// Returns all records with a metric of at least `floor`
pub(crate) fn records_above<'a, R>(
	records: &[&'a R],
	metric: impl Fn(&R) -> Option<f64>,
	floor: f64,
) -> Vec<&'a R> {
	records
		.iter()
		.copied()
		.filter(|&record| metric(record).is_some_and(|value| value >= floor))
		.collect()
}

/// Returns the first record with the least cost, ignoring records without one
pub(crate) fn min_cost<'a, R>(records: &[&'a R], cost: impl Fn(&R) -> Option<f64>) -> Option<&'a R> {
	records
		.iter()
		.filter_map(|&record| Some((record, cost(record)?)))
		.reduce(|(best, best_cost), (record, record_cost)| match record_cost.total_cmp(&best_cost) {
			Ordering::Less => (record, record_cost),
			Ordering::Equal | Ordering::Greater => (best, best_cost),
		})
		.map(|(record, _)| record)
}

/// Returns the `q`-th quantile of `values`, interpolating linearly between the closest ranks.
///
/// Returns `None` if there are no values.
pub fn quantile(values: impl IntoIterator<Item = f64>, q: f64) -> Option<f64> {
	let mut values = values.into_iter().collect::<Vec<_>>();
	if values.is_empty() {
		return None;
	}
	values.sort_by(f64::total_cmp);

	let pos = q.clamp(0.0, 1.0) * (values.len() - 1) as f64;
	let lo = pos.floor() as usize;
	let hi = pos.ceil() as usize;
	Some(values[lo] + (values[hi] - values[lo]) * (pos - lo as f64))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(PartialEq, Clone, Debug)]
	struct Row {
		trace: &'static str,
		aat:   f64,
		size:  u64,
		ipc:   Option<f64>,
		ru:    Option<f64>,
	}

	impl Traced for Row {
		fn trace(&self) -> &str {
			self.trace
		}
	}

	fn row(trace: &'static str, aat: f64, size: u64) -> Row {
		Row {
			trace,
			aat,
			size,
			ipc: None,
			ru: None,
		}
	}

	fn ipc_row(trace: &'static str, ipc: f64, ru: f64) -> Row {
		Row {
			trace,
			aat: 0.0,
			size: 0,
			ipc: Some(ipc),
			ru: Some(ru),
		}
	}

	fn lex_min() -> LexicographicMin<impl Fn(&Row) -> f64, impl Fn(&Row) -> u64> {
		LexicographicMin {
			primary:   |row: &Row| row.aat,
			secondary: |row: &Row| row.size,
		}
	}

	fn floor_then_min() -> FloorThenMin<impl Fn(&Row) -> Option<f64>, impl Fn(&Row) -> Option<f64>> {
		FloorThenMin {
			metric:      |row: &Row| row.ipc,
			floor_ratio: 0.9,
			cost:        |row: &Row| row.ru,
		}
	}

	#[test]
	fn groups_in_first_seen_order() {
		let rows = [row("mcf", 1.0, 1), row("gcc", 1.0, 1), row("mcf", 2.0, 1), row("leela", 1.0, 1)];
		let groups = group_by_trace(&rows);

		let traces = groups.iter().map(|(trace, _)| *trace).collect::<Vec<_>>();
		assert_eq!(traces, ["mcf", "gcc", "leela"]);
		assert_eq!(groups[0].1.len(), 2);
	}

	#[test]
	fn primary_metric_dominates_size() {
		let rows = [row("gcc", 5.0, 100), row("gcc", 5.0, 50), row("gcc", 3.0, 200)];
		let results = select_per_trace(&rows, &lex_min());

		assert_eq!(results.len(), 1);
		assert_eq!(results[0].best, rows[2]);
		assert_eq!(results[0].candidates, [rows[2].clone()]);
	}

	#[test]
	fn size_breaks_primary_ties() {
		let rows = [row("gcc", 5.0, 100), row("gcc", 5.0, 50)];
		let results = select_per_trace(&rows, &lex_min());

		assert_eq!(results[0].best, rows[1]);
		assert_eq!(results[0].candidates.len(), 2);
	}

	#[test]
	fn first_record_wins_full_ties() {
		let mut rows = [row("gcc", 5.0, 50), row("gcc", 5.0, 50)];
		rows[1].ru = Some(1.0);
		let results = select_per_trace(&rows, &lex_min());

		assert_eq!(results[0].best, rows[0]);
	}

	#[test]
	fn floor_excludes_cheaper_slow_records() {
		let rows = [ipc_row("mcf", 1.0, 50.0), ipc_row("mcf", 0.95, 10.0), ipc_row("mcf", 0.80, 5.0)];
		let results = select_per_trace(&rows, &floor_then_min());

		assert_eq!(results.len(), 1);
		assert_eq!(results[0].best, rows[1]);
		assert_eq!(results[0].candidates, [rows[0].clone(), rows[1].clone()]);
	}

	#[test]
	fn floor_is_inclusive() {
		let rows = [ipc_row("mcf", 1.0, 50.0), ipc_row("mcf", 0.9, 10.0)];
		let results = select_per_trace(&rows, &floor_then_min());

		assert_eq!(results[0].best, rows[1]);
	}

	#[test]
	fn records_without_cost_never_win() {
		let mut rows = [ipc_row("mcf", 1.0, 50.0), ipc_row("mcf", 0.95, 0.0), ipc_row("mcf", 1.2, 0.0)];
		rows[1].ru = None;
		rows[2].ru = None;
		let results = select_per_trace(&rows, &floor_then_min());

		// Note: The uncosted record still sets the floor, so the only costed one doesn't qualify
		assert!(results.is_empty());

		let results = select_per_trace(&rows[..2], &floor_then_min());
		assert_eq!(results[0].best, rows[0]);
		assert_eq!(results[0].candidates, [rows[0].clone()]);
	}

	#[test]
	fn traces_are_selected_independently() {
		let rows = [
			ipc_row("mcf", 1.0, 50.0),
			ipc_row("xz", 2.0, 70.0),
			ipc_row("mcf", 0.5, 1.0),
			ipc_row("xz", 1.9, 60.0),
		];
		let results = select_per_trace(&rows, &floor_then_min());

		let best = results.iter().map(|result| (result.trace.as_str(), &result.best)).collect::<Vec<_>>();
		assert_eq!(best, [("mcf", &rows[0]), ("xz", &rows[3])]);
	}

	#[test]
	fn records_without_metric_never_qualify() {
		let rows = [row("nab", 0.0, 0), ipc_row("mcf", 1.0, 1.0)];
		let results = select_per_trace(&rows, &floor_then_min());

		assert_eq!(results.len(), 1);
		assert_eq!(results[0].trace, "mcf");
	}

	#[test]
	fn empty_table_selects_nothing() {
		let rows: [Row; 0] = [];
		assert!(select_per_trace(&rows, &lex_min()).is_empty());
		assert!(select_per_trace(&rows, &floor_then_min()).is_empty());
	}

	#[test]
	fn quantiles_interpolate() {
		let values = [10.0, 40.0, 20.0, 30.0];
		assert_eq!(quantile(values, 0.0), Some(10.0));
		assert_eq!(quantile(values, 1.0), Some(40.0));
		assert_eq!(quantile(values, 0.5), Some(25.0));
		assert!((quantile(values, 0.1).expect("No quantile") - 13.0).abs() < 1e-9);
		assert_eq!(quantile([7.0], 0.1), Some(7.0));
		assert_eq!(quantile(Vec::new(), 0.5), None);
	}
}
