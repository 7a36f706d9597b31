//! Provider-neutral operation outcomes

use bson::Bson;
use serde::Serialize;

use crate::driver::{BulkUpdateSummary, DeleteSummary, UpdateSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationStatus {
	Success,
	Failure,
	/// The write was not acknowledged by the server
	Pending,
}

/// Result of an update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
	/// `Success` when at least one document matched
	pub status: OperationStatus,
	pub modified_count: u64,
	pub upserted_count: u64,
	pub upserted_ids: Vec<Bson>,
}

impl UpdateOutcome {
	/// Outcome of an update that never reached the database
	pub fn empty() -> Self {
		Self {
			status: OperationStatus::Failure,
			modified_count: 0,
			upserted_count: 0,
			upserted_ids: Vec::new(),
		}
	}
}

impl From<UpdateSummary> for UpdateOutcome {
	fn from(summary: UpdateSummary) -> Self {
		let upserted_ids: Vec<Bson> = summary.upserted_id.into_iter().collect();
		Self {
			status: matched_status(summary.matched_count),
			modified_count: summary.modified_count,
			upserted_count: upserted_ids.len() as u64,
			upserted_ids,
		}
	}
}

impl From<BulkUpdateSummary> for UpdateOutcome {
	fn from(summary: BulkUpdateSummary) -> Self {
		Self {
			status: matched_status(summary.matched_count),
			modified_count: summary.modified_count,
			upserted_count: summary.upserted_count,
			upserted_ids: summary.upserted_ids,
		}
	}
}

/// Result of a remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemoveOutcome {
	pub status: OperationStatus,
	pub deleted_count: u64,
}

impl From<DeleteSummary> for RemoveOutcome {
	fn from(summary: DeleteSummary) -> Self {
		let status = match (summary.acknowledged, summary.deleted_count) {
			(false, _) => OperationStatus::Pending,
			(true, 0) => OperationStatus::Failure,
			(true, _) => OperationStatus::Success,
		};
		Self {
			status,
			deleted_count: summary.deleted_count,
		}
	}
}

fn matched_status(matched: u64) -> OperationStatus {
	if matched > 0 {
		OperationStatus::Success
	} else {
		OperationStatus::Failure
	}
}
