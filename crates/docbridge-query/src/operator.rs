//! Abstract operators and their native MongoDB tokens

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Comparison operators available on a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
	Eq,
	Ne,
	Gt,
	Gte,
	Lt,
	Lte,
	In,
	NotIn,
	IsTrue,
	IsFalse,
	IsNull,
	IsNotNull,
	IsEmpty,
	IsNotEmpty,
	Between,
}

impl Operator {
	/// Every operator, in declaration order
	pub const ALL: [Operator; 15] = [
		Operator::Eq,
		Operator::Ne,
		Operator::Gt,
		Operator::Gte,
		Operator::Lt,
		Operator::Lte,
		Operator::In,
		Operator::NotIn,
		Operator::IsTrue,
		Operator::IsFalse,
		Operator::IsNull,
		Operator::IsNotNull,
		Operator::IsEmpty,
		Operator::IsNotEmpty,
		Operator::Between,
	];

	/// Name used by the dynamic document form
	pub fn name(&self) -> &'static str {
		match self {
			Operator::Eq => "eq",
			Operator::Ne => "ne",
			Operator::Gt => "gt",
			Operator::Gte => "gte",
			Operator::Lt => "lt",
			Operator::Lte => "lte",
			Operator::In => "in",
			Operator::NotIn => "notIn",
			Operator::IsTrue => "isTrue",
			Operator::IsFalse => "isFalse",
			Operator::IsNull => "isNull",
			Operator::IsNotNull => "isNotNull",
			Operator::IsEmpty => "isEmpty",
			Operator::IsNotEmpty => "isNotEmpty",
			Operator::Between => "between",
		}
	}
}

impl fmt::Display for Operator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for Operator {
	type Err = QueryError;

	/// Parse an operator name
	///
	/// # Examples
	///
	/// ```
	/// use docbridge_query::Operator;
	///
	/// assert_eq!("gte".parse::<Operator>().unwrap(), Operator::Gte);
	/// assert!("like".parse::<Operator>().is_err());
	/// ```
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Operator::ALL
			.into_iter()
			.find(|op| op.name() == s)
			.ok_or_else(|| QueryError::UnsupportedOperator(s.to_string()))
	}
}

/// Logical connectives joining sub-conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connective {
	And,
	Or,
}

impl Connective {
	/// Parse a connective key of the dynamic document form (`$and`, `$or`)
	pub fn from_key(key: &str) -> Result<Self, QueryError> {
		match key {
			"$and" => Ok(Connective::And),
			"$or" => Ok(Connective::Or),
			other => Err(QueryError::UnsupportedOperator(other.to_string())),
		}
	}
}

/// Maps abstract operators onto MongoDB query operator tokens
///
/// Stateless; every method is an associated function.
pub struct OperatorTranslator;

impl OperatorTranslator {
	/// Native token for a single-operator clause
	///
	/// Operators whose translation is a composite clause (`IsEmpty`,
	/// `IsNotEmpty`, `Between`) have no single token and return `None`.
	///
	/// # Examples
	///
	/// ```
	/// use docbridge_query::{Operator, OperatorTranslator};
	///
	/// assert_eq!(OperatorTranslator::native(Operator::NotIn), Some("$nin"));
	/// assert_eq!(OperatorTranslator::native(Operator::IsNull), Some("$eq"));
	/// assert_eq!(OperatorTranslator::native(Operator::Between), None);
	/// ```
	pub fn native(operator: Operator) -> Option<&'static str> {
		match operator {
			Operator::Eq | Operator::IsTrue | Operator::IsFalse | Operator::IsNull => Some("$eq"),
			Operator::Ne | Operator::IsNotNull => Some("$ne"),
			Operator::Gt => Some("$gt"),
			Operator::Gte => Some("$gte"),
			Operator::Lt => Some("$lt"),
			Operator::Lte => Some("$lte"),
			Operator::In => Some("$in"),
			Operator::NotIn => Some("$nin"),
			Operator::IsEmpty | Operator::IsNotEmpty | Operator::Between => None,
		}
	}

	/// Native token for a logical connective
	pub fn connective(connective: Connective) -> &'static str {
		match connective {
			Connective::And => "$and",
			Connective::Or => "$or",
		}
	}
}
