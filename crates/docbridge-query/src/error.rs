//! Translation and builder errors

/// Result type for query translation and command building
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors raised while translating conditions or assembling commands
///
/// These are raised before anything reaches the database and are never worth
/// retrying: the request itself is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
	/// An operator or logical connective has no native counterpart
	#[error("Unsupported operator: {0}")]
	UnsupportedOperator(String),

	/// An operator received an operand of the wrong shape
	#[error("Invalid operand for {operator}: {reason}")]
	InvalidOperand { operator: String, reason: String },

	/// `updates`, `wheres` and `methods` differ in length
	#[error(
		"Parameter count mismatch: {updates} updates, {wheres} wheres, {methods} methods"
	)]
	ParameterCountMismatch {
		updates: usize,
		wheres: usize,
		methods: usize,
	},

	/// An update method is neither `UpdateOne` nor `UpdateMany`
	#[error("Unknown update method {method:?} at index {index}")]
	UnknownUpdateMethod { index: usize, method: String },
}

impl QueryError {
	pub(crate) fn invalid_operand(operator: impl Into<String>, reason: impl Into<String>) -> Self {
		QueryError::InvalidOperand {
			operator: operator.into(),
			reason: reason.into(),
		}
	}
}
