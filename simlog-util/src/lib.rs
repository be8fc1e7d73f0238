//! Utilities

// Modules
pub mod logger;

// Imports
use std::{cell::RefCell, fmt};

/// Extension trait for `str` to inspect simulator log lines
#[extend::ext(name = LineExt)]
pub impl str {
	/// Returns whether this line is a rule made only of `rule_char`.
	///
	/// Empty lines are not rules.
	fn is_rule_of(&self, rule_char: char) -> bool {
		let line = self.trim_end_matches(['\r', '\n']);
		!line.is_empty() && line.chars().all(|ch| ch == rule_char)
	}

	/// Splits a `key: value` line into it's trimmed key and value.
	///
	/// Returns `None` unless the key is non-empty, the first colon is followed by
	/// whitespace and the value is non-empty.
	fn split_key_value(&self) -> Option<(&str, &str)> {
		let (key, value) = self.split_once(':')?;
		if !value.starts_with(char::is_whitespace) {
			return None;
		}

		let (key, value) = (key.trim(), value.trim());
		match key.is_empty() || value.is_empty() {
			true => None,
			false => Some((key, value)),
		}
	}
}

/// [`fmt::Display`] helper to display using a `FnMut(&mut fmt::Formatter)`
pub struct DisplayWrapper<F: FnMut(&mut fmt::Formatter) -> fmt::Result>(RefCell<F>);

impl<F: FnMut(&mut fmt::Formatter) -> fmt::Result> DisplayWrapper<F> {
	/// Creates a new display wrapper
	#[must_use]
	pub const fn new(func: F) -> Self {
		Self(RefCell::new(func))
	}
}


impl<F: FnMut(&mut fmt::Formatter) -> fmt::Result> fmt::Display for DisplayWrapper<F> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		// Note: `f` cannot be re-entrant, so this cannot fail
		self.0.borrow_mut()(f)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rule_lines() {
		assert!("=====".is_rule_of('='));
		assert!("===\r".is_rule_of('='));
		assert!(!"".is_rule_of('='));
		assert!(!"== Begin cycle 1 ==".is_rule_of('='));
	}

	#[test]
	fn key_value_lines() {
		assert_eq!("Fetch width: 4".split_key_value(), Some(("Fetch width", "4")));
		assert_eq!("  Predictor (M):   GSELECT  ".split_key_value(), Some(("Predictor (M)", "GSELECT")));
		assert_eq!("IPC: 1.5: extra".split_key_value(), Some(("IPC", "1.5: extra")));
		assert_eq!("Stage Fetch: ".split_key_value(), None);
		assert_eq!("key:value".split_key_value(), None);
		assert_eq!(": value".split_key_value(), None);
		assert_eq!("no colon here".split_key_value(), None);
	}

	#[test]
	fn display_wrapper() {
		let wrapper = DisplayWrapper::new(|f| write!(f, "{}-{}", 1, 2));
		assert_eq!(wrapper.to_string(), "1-2");
	}
}
