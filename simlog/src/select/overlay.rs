//! Percentile overlay

// Imports
use {
	super::Traced,
	crate::config::OverlayConfig,
};

/// Percentile overlay of a single trace
#[derive(Clone, Debug)]
#[derive(serde::Serialize)]
pub struct Overlay<R> {
	/// Trace
	pub trace: String,

	/// Maximum metric of the trace
	pub max_metric: f64,

	/// Cost threshold the retained records are under
	pub cost_threshold: f64,

	/// Cheapest records out of those close to the maximum metric
	pub retained: Vec<R>,

	/// Cheapest record out of those closest to the maximum metric
	pub highlighted: Option<R>,
}

/// Computes the percentile overlay of every trace.
///
/// For each trace, keeps the records with a metric of at least `retain_ratio` of the maximum,
/// then out of those keeps the ones with a cost under the `cost_quantile`-th quantile.
/// Separately, highlights the cheapest record out of those with a metric of at least
/// `highlight_ratio` of the maximum.
///
/// Records without a cost are never retained nor highlighted, and traces without
/// any metric, or without any cost close to the maximum, are left out.
pub fn percentile_overlay<R: Traced + Clone>(
	records: &[R],
	config: &OverlayConfig,
	metric: impl Fn(&R) -> Option<f64>,
	cost: impl Fn(&R) -> Option<f64>,
) -> Vec<Overlay<R>> {
	super::group_by_trace(records)
		.into_iter()
		.filter_map(|(trace, group)| {
			let max_metric = super::max_metric(&group, &metric)?;

			let close = super::records_above(&group, &metric, config.retain_ratio * max_metric);
			let cost_threshold = super::quantile(close.iter().filter_map(|&record| cost(record)), config.cost_quantile)?;
			let retained = close
				.into_iter()
				.filter(|&record| cost(record).is_some_and(|record_cost| record_cost <= cost_threshold))
				.cloned()
				.collect::<Vec<_>>();

			let closest = super::records_above(&group, &metric, config.highlight_ratio * max_metric);
			let highlighted = super::min_cost(&closest, &cost).cloned();

			tracing::debug!(
				trace,
				max_metric,
				cost_threshold,
				retained = retained.len(),
				"Computed percentile overlay"
			);
			Some(Overlay {
				trace: trace.to_owned(),
				max_metric,
				cost_threshold,
				retained,
				highlighted,
			})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(PartialEq, Clone, Debug)]
	struct Point {
		trace: &'static str,
		ipc:   f64,
		ru:    f64,
	}

	impl Traced for Point {
		fn trace(&self) -> &str {
			self.trace
		}
	}

	fn point(ipc: f64, ru: f64) -> Point {
		Point { trace: "xz", ipc, ru }
	}

	#[test]
	fn retains_cheap_records_close_to_peak() {
		// Note: All but the last record are within 80% of the peak
		let points = (0..10)
			.map(|idx| point(1.0 - 0.01 * idx as f64, 100.0 - 10.0 * idx as f64))
			.chain([point(0.5, 1.0)])
			.collect::<Vec<_>>();

		let overlays = percentile_overlay(&points, &OverlayConfig::default(), |point| Some(point.ipc), |point| Some(point.ru));
		assert_eq!(overlays.len(), 1);

		let overlay = &overlays[0];
		assert_eq!(overlay.trace, "xz");
		assert_eq!(overlay.max_metric, 1.0);

		// Costs 10..=100, so the 10th percentile is 10 + 0.9 * 10
		assert!((overlay.cost_threshold - 19.0).abs() < 1e-9);
		assert_eq!(overlay.retained, [points[9].clone()]);
		assert_eq!(overlay.highlighted.as_ref(), Some(&points[9]));
	}

	#[test]
	fn highlight_uses_its_own_floor() {
		let points = [point(1.0, 50.0), point(0.85, 5.0), point(0.95, 20.0)];
		let overlays = percentile_overlay(&points, &OverlayConfig::default(), |point| Some(point.ipc), |point| Some(point.ru));

		let overlay = &overlays[0];
		assert_eq!(overlay.retained, [points[1].clone()]);
		assert_eq!(overlay.highlighted.as_ref(), Some(&points[2]));
	}

	#[test]
	fn uncosted_records_are_ignored() {
		let points = [point(1.0, 50.0), point(0.98, 0.0), point(0.95, 20.0)];
		let overlays = percentile_overlay(
			&points,
			&OverlayConfig::default(),
			|point| Some(point.ipc),
			|point| (point.ru > 0.0).then_some(point.ru),
		);

		let overlay = &overlays[0];
		assert!((overlay.cost_threshold - 23.0).abs() < 1e-9);
		assert_eq!(overlay.retained, [points[2].clone()]);
		assert_eq!(overlay.highlighted.as_ref(), Some(&points[2]));
	}

	#[test]
	fn traces_without_metric_are_skipped() {
		let points = [point(1.0, 1.0)];
		let overlays = percentile_overlay(&points, &OverlayConfig::default(), |_| None, |point| Some(point.ru));
		assert!(overlays.is_empty());
	}
}
