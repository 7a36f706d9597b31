//! Transactional session state
//!
//! A [`TransactionalSession`] holds at most one driver session with an open
//! transaction:
//!
//! ```text
//! Idle --start--> Active --commit | rollback--> Idle
//! ```
//!
//! Starting while `Active` is rejected with
//! [`AdapterError::PendingSession`]. Committing or rolling back while `Idle`
//! does nothing. A failed commit or rollback keeps the session `Active` so
//! the caller can inspect the error and retry; [`TransactionalSession::release`]
//! abandons it instead.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::classifier::ErrorClassifier;
use crate::driver::DocumentDriver;
use crate::error::{AdapterError, Result, SessionOperation};

/// Holder of the adapter's single transactional session
pub struct TransactionalSession<D: DocumentDriver> {
	driver: Arc<D>,
	active: Mutex<Option<D::Session>>,
}

impl<D: DocumentDriver> TransactionalSession<D> {
	pub fn new(driver: Arc<D>) -> Self {
		Self {
			driver,
			active: Mutex::new(None),
		}
	}

	pub async fn is_active(&self) -> bool {
		self.active.lock().await.is_some()
	}

	/// Open a session and start a transaction on it
	///
	/// The driver is not contacted when a transaction is already active.
	pub async fn start_transaction(&self) -> Result<()> {
		let mut active = self.active.lock().await;
		if active.is_some() {
			return Err(AdapterError::PendingSession);
		}

		let mut session = self
			.driver
			.start_session()
			.await
			.map_err(|e| ErrorClassifier::classify_session(e, SessionOperation::Start))?;

		if let Err(e) = self.driver.start_transaction(&mut session).await {
			self.driver.end_session(session).await;
			return Err(ErrorClassifier::classify_session(e, SessionOperation::Start));
		}

		*active = Some(session);
		tracing::info!("Transaction started");
		Ok(())
	}

	/// Commit the active transaction and release its session
	pub async fn commit_transaction(&self) -> Result<()> {
		let mut active = self.active.lock().await;
		let Some(session) = active.as_mut() else {
			tracing::debug!("Commit requested without an active transaction");
			return Ok(());
		};

		self.driver
			.commit_transaction(session)
			.await
			.map_err(|e| ErrorClassifier::classify_session(e, SessionOperation::Commit))?;

		if let Some(session) = active.take() {
			self.driver.end_session(session).await;
		}
		tracing::info!("Transaction committed");
		Ok(())
	}

	/// Abort the active transaction and release its session
	pub async fn rollback_transaction(&self) -> Result<()> {
		let mut active = self.active.lock().await;
		let Some(session) = active.as_mut() else {
			tracing::debug!("Rollback requested without an active transaction");
			return Ok(());
		};

		self.driver
			.abort_transaction(session)
			.await
			.map_err(|e| ErrorClassifier::classify_session(e, SessionOperation::Abort))?;

		if let Some(session) = active.take() {
			self.driver.end_session(session).await;
		}
		tracing::info!("Transaction rolled back");
		Ok(())
	}

	/// Drop the active session without committing or aborting
	///
	/// The server discards the transaction when its session ends. This is
	/// the way out of a transaction whose commit failed, since the driver
	/// refuses to abort after a commit attempt. Returns whether a session
	/// was active.
	pub async fn release(&self) -> bool {
		let Some(session) = self.active.lock().await.take() else {
			return false;
		};
		self.driver.end_session(session).await;
		tracing::info!("Transaction session released");
		true
	}

	/// Run `f` inside a transaction
	///
	/// Commits when `f` succeeds, rolls back when it fails. A rollback
	/// failure is logged; the error of `f` is returned. Whenever the
	/// transaction cannot be finished the session is released, so the
	/// caller can run `with_transaction` again, for instance after a
	/// retryable commit error.
	pub async fn with_transaction<F, Fut, T>(&self, f: F) -> Result<T>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		self.start_transaction().await?;

		match f().await {
			Ok(value) => {
				if let Err(e) = self.commit_transaction().await {
					self.release().await;
					return Err(e);
				}
				Ok(value)
			}
			Err(e) => {
				if let Err(rollback) = self.rollback_transaction().await {
					tracing::warn!(error = %rollback, "Rollback after failed transaction body failed");
					self.release().await;
				}
				Err(e)
			}
		}
	}

	/// Lock the session slot if a transaction is active
	///
	/// Returns `None` without holding the lock when idle, so commands
	/// outside a transaction do not wait on each other.
	pub(crate) async fn active(&self) -> Option<MutexGuard<'_, Option<D::Session>>> {
		let guard = self.active.lock().await;
		guard.is_some().then_some(guard)
	}
}
