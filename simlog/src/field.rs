//! Record fields

// Imports
use {
	anyhow::Context,
	std::{collections::BTreeMap, fmt},
};

/// Field value, typed when parsed
#[derive(PartialEq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
	Int(i64),
	Float(f64),
	Str(String),
}

impl FieldValue {
	/// Parses a value, as an integer if possible, else as a finite float, else keeping it as a string
	pub fn parse(value: &str) -> Self {
		if let Ok(value) = value.parse::<i64>() {
			return Self::Int(value);
		}

		// Note: `nan`, `inf` and out of range floats are kept as strings
		if let Some(value) = value.parse::<f64>().ok().filter(|value| value.is_finite()) {
			return Self::Float(value);
		}

		Self::Str(value.to_owned())
	}

	/// Returns whether this value equals `other`, comparing numbers by value
	pub fn matches(&self, other: &Self) -> bool {
		match (self.as_f64(), other.as_f64()) {
			(Some(lhs), Some(rhs)) => lhs == rhs,
			_ => self == other,
		}
	}

	/// Returns this value as a float, if it's numeric
	pub fn as_f64(&self) -> Option<f64> {
		match *self {
			Self::Int(value) => Some(value as f64),
			Self::Float(value) => Some(value),
			Self::Str(_) => None,
		}
	}
}

impl fmt::Display for FieldValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Int(value) => write!(f, "{value}"),
			Self::Float(value) => write!(f, "{value}"),
			Self::Str(value) => write!(f, "{value}"),
		}
	}
}

impl From<i64> for FieldValue {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<f64> for FieldValue {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<&str> for FieldValue {
	fn from(value: &str) -> Self {
		Self::Str(value.to_owned())
	}
}

/// Field map.
///
/// Absent fields read as their default, while present fields of the wrong type are errors.
#[derive(PartialEq, Clone, Default, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct FieldMap {
	// Note: We use a `BTreeMap` so the output columns always come out in the same order
	fields: BTreeMap<String, FieldValue>,
}

impl FieldMap {
	/// Creates an empty field map
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts a field, replacing any previous value
	pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
		self.fields.insert(name.into(), value);
	}

	/// Returns a field
	pub fn get(&self, name: &str) -> Option<&FieldValue> {
		self.fields.get(name)
	}

	/// Returns whether there are no fields
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Returns the number of fields
	pub fn len(&self) -> usize {
		self.fields.len()
	}

	/// Iterates over all fields, by name
	pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
		self.fields.iter().map(|(name, value)| (name.as_str(), value))
	}

	/// Returns an integer field, or `None` if absent
	pub fn int(&self, name: &str) -> Result<Option<i64>, anyhow::Error> {
		match self.get(name) {
			None => Ok(None),
			Some(FieldValue::Int(value)) => Ok(Some(*value)),
			Some(value) => anyhow::bail!("Field {name:?} is not an integer: {value:?}"),
		}
	}

	/// Returns a numeric field, or `None` if absent
	pub fn float(&self, name: &str) -> Result<Option<f64>, anyhow::Error> {
		match self.get(name) {
			None => Ok(None),
			Some(value) => value
				.as_f64()
				.map(Some)
				.with_context(|| format!("Field {name:?} is not a number: {value:?}")),
		}
	}

	/// Returns a field as a string, or `None` if absent
	pub fn string(&self, name: &str) -> Option<String> {
		self.get(name).map(FieldValue::to_string)
	}
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for FieldMap {
	fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
		Self {
			fields: iter.into_iter().map(|(name, value)| (name.into(), value)).collect(),
		}
	}
}
