//! Metric summaries

// Imports
use {
	crate::select::{self, Traced},
	average::{Mean, Variance},
	itertools::Itertools,
};

/// Five-number summary of a metric over a trace
#[derive(PartialEq, Clone, Debug)]
#[derive(serde::Serialize)]
pub struct MetricSummary {
	pub trace:          String,
	pub count:          usize,
	pub mean:           f64,
	pub min:            f64,
	pub first_quartile: f64,
	pub median:         f64,
	pub third_quartile: f64,
	pub max:            f64,
}

/// Summarizes `metric` over each trace, in order of first appearance.
///
/// Records without the metric are ignored, and traces without any are left out.
pub fn summarize<R: Traced>(records: &[R], metric: impl Fn(&R) -> Option<f64>) -> Vec<MetricSummary> {
	select::group_by_trace(records)
		.into_iter()
		.filter_map(|(trace, group)| {
			let values = group.iter().filter_map(|&record| metric(record)).collect::<Vec<_>>();
			let (min, max) = values.iter().copied().minmax().into_option()?;
			let quantile = |q| select::quantile(values.iter().copied(), q);

			Some(MetricSummary {
				trace: trace.to_owned(),
				count: values.len(),
				mean: values.iter().copied().collect::<Mean>().mean(),
				min,
				first_quartile: quantile(0.25)?,
				median: quantile(0.5)?,
				third_quartile: quantile(0.75)?,
				max,
			})
		})
		.collect()
}

/// Correlation matrix
#[derive(PartialEq, Clone, Debug)]
#[derive(serde::Serialize)]
pub struct CorrelationMatrix {
	/// Column names
	pub columns: Vec<String>,

	/// Pearson correlation of each pair of columns.
	///
	/// `None` where either column is constant or there are less than 2 rows.
	pub values: Vec<Vec<Option<f64>>>,
}

/// Computes the correlation matrix of `columns`.
///
/// Errors if the columns don't all have the same length.
pub fn correlation_matrix(columns: &[(String, Vec<f64>)]) -> Result<CorrelationMatrix, anyhow::Error> {
	anyhow::ensure!(
		columns.iter().map(|(_, column)| column.len()).all_equal(),
		"Columns must all have the same length: {:?}",
		columns
			.iter()
			.map(|(name, column)| (name.as_str(), column.len()))
			.collect::<Vec<_>>()
	);

	let values = columns
		.iter()
		.map(|(_, lhs)| columns.iter().map(|(_, rhs)| self::pearson(lhs, rhs)).collect())
		.collect();

	Ok(CorrelationMatrix {
		columns: columns.iter().map(|(name, _)| name.clone()).collect(),
		values,
	})
}

/// Returns the pearson correlation of `lhs` and `rhs`
fn pearson(lhs: &[f64], rhs: &[f64]) -> Option<f64> {
	if lhs.len() < 2 {
		return None;
	}

	let lhs_var = lhs.iter().copied().collect::<Variance>();
	let rhs_var = rhs.iter().copied().collect::<Variance>();
	let (lhs_mean, rhs_mean) = (lhs_var.mean(), rhs_var.mean());

	let covariance = lhs
		.iter()
		.zip(rhs)
		.map(|(lhs, rhs)| (lhs - lhs_mean) * (rhs - rhs_mean))
		.sum::<f64>() /
		(lhs.len() - 1) as f64;
	let deviations = (lhs_var.sample_variance() * rhs_var.sample_variance()).sqrt();

	match deviations > 0.0 {
		true => Some(covariance / deviations),
		false => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Sample(&'static str, Option<f64>);

	impl Traced for Sample {
		fn trace(&self) -> &str {
			self.0
		}
	}

	#[test]
	fn summaries() {
		let samples = [
			Sample("mcf", Some(4.0)),
			Sample("xz", Some(1.0)),
			Sample("mcf", Some(1.0)),
			Sample("mcf", None),
			Sample("mcf", Some(3.0)),
			Sample("mcf", Some(2.0)),
			Sample("nab", None),
		];
		let summaries = summarize(&samples, |sample| sample.1);
		assert_eq!(summaries.len(), 2);

		assert_eq!(summaries[0], MetricSummary {
			trace:          "mcf".to_owned(),
			count:          4,
			mean:           2.5,
			min:            1.0,
			first_quartile: 1.75,
			median:         2.5,
			third_quartile: 3.25,
			max:            4.0,
		});
		assert_eq!(summaries[1].trace, "xz");
		assert_eq!(summaries[1].median, 1.0);
	}

	#[test]
	fn correlations() {
		let columns = [
			("x".to_owned(), vec![1.0, 2.0, 3.0, 4.0]),
			("y".to_owned(), vec![2.0, 4.0, 6.0, 8.0]),
			("z".to_owned(), vec![4.0, 3.0, 2.0, 1.0]),
			("c".to_owned(), vec![5.0, 5.0, 5.0, 5.0]),
		];
		let matrix = correlation_matrix(&columns).expect("Unable to correlate");
		assert_eq!(matrix.columns, ["x", "y", "z", "c"]);

		let close = |value: Option<f64>, expected: f64| value.is_some_and(|value| (value - expected).abs() < 1e-9);
		assert!(close(matrix.values[0][0], 1.0));
		assert!(close(matrix.values[0][1], 1.0));
		assert!(close(matrix.values[0][2], -1.0));
		assert!(close(matrix.values[2][1], -1.0));
		assert_eq!(matrix.values[0][3], None);
		assert_eq!(matrix.values[3][3], None);
	}

	#[test]
	fn correlations_need_two_rows() {
		let matrix = correlation_matrix(&[("x".to_owned(), vec![1.0]), ("y".to_owned(), vec![2.0])])
			.expect("Unable to correlate");
		assert_eq!(matrix.values, [[None::<f64>, None], [None, None]]);
	}

	#[test]
	fn mismatched_columns_fail() {
		let columns = [("x".to_owned(), vec![1.0, 2.0]), ("y".to_owned(), vec![2.0])];
		let err = correlation_matrix(&columns).expect_err("Correlated mismatched columns");
		assert!(err.to_string().contains("same length"));

		assert!(correlation_matrix(&[]).is_ok_and(|matrix| matrix.columns.is_empty()));
	}
}
