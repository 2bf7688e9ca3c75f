//! Handlers for actor-initiated operations.
//!
//! Each handler covers one actor's surface: checkout, cancellation and
//! deletion for customers, approve/reject for vendors, assignment
//! responses and delivery progress for partners, and partner selection
//! for the resolver. Handlers always load fresh persisted state, ask the
//! lifecycle engine for a decision, and let the transition applier
//! execute the writes.

pub mod assignment;
pub mod customer;
pub mod partner;
pub mod vendor;

pub use assignment::AssignmentHandler;
pub use customer::CustomerHandler;
pub use partner::PartnerHandler;
pub use vendor::VendorHandler;

use dispatch_lifecycle::{TransitionDenied, UnknownAction};
use dispatch_storage::StorageError;
use thiserror::Error;

/// Errors surfaced to the initiating actor.
///
/// Every rejected operation names the precondition that failed so the
/// caller can refresh and show actual current state instead of retrying
/// blindly. Conflicts are recoverable by refetch-and-retry; authorization
/// and not-found errors are fatal to the request; a missing partner is a
/// distinct condition the vendor can retry later.
#[derive(Debug, Error)]
pub enum CoordinatorError {
	/// The record changed since it was read. Refetch and retry.
	#[error("Conflict: {0}")]
	Conflict(String),
	/// The lifecycle engine denied the transition.
	#[error("{0}")]
	Denied(#[from] TransitionDenied),
	/// The actor does not own the record it tried to mutate.
	#[error("Not authorized: {0}")]
	Unauthorized(String),
	/// A referenced order, request, partner or address is missing.
	#[error("Not found: {0}")]
	NotFound(String),
	/// No active, located partner exists right now. The order stays
	/// approved; retry later.
	#[error("No partner available")]
	NoPartnerAvailable,
	/// The vendor has no pickup location, so assignment cannot run.
	#[error("Vendor location missing")]
	VendorLocationMissing,
	/// The request payload was malformed.
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	/// The storage layer failed.
	#[error("Storage error: {0}")]
	Storage(String),
	/// The second write of a lockstep pair failed after the first
	/// succeeded. The records disagree; this is surfaced, never hidden.
	#[error("State diverged for order {order_id}: {message}")]
	Divergence { order_id: String, message: String },
}

impl From<StorageError> for CoordinatorError {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::NotFound => CoordinatorError::NotFound("record not found".into()),
			StorageError::Conflict => {
				CoordinatorError::Conflict("state changed since last read".into())
			},
			other => CoordinatorError::Storage(other.to_string()),
		}
	}
}

impl From<UnknownAction> for CoordinatorError {
	fn from(err: UnknownAction) -> Self {
		CoordinatorError::InvalidRequest(err.to_string())
	}
}
