//! Partner assignment module for the dispatch coordinator.
//!
//! This module selects which delivery partner a newly approved order
//! should be offered to. Strategies implement the [`AssignmentInterface`]
//! trait; the [`AssignmentService`] wraps the configured strategy and
//! applies the eligibility rules that hold for every strategy (the
//! partner must be active and must have a reported position).
//!
//! Selection is advisory: the caller records the resulting request and
//! owns the one-live-request-per-order guarantee. Strategies only rank.

use async_trait::async_trait;
use dispatch_types::{ConfigSchema, ImplementationRegistry, PartnerProfile, VendorProfile};
use thiserror::Error;

pub mod implementations {
	pub mod nearest;
}

/// Errors that can occur while selecting a partner.
#[derive(Debug, Error)]
pub enum AssignmentError {
	/// No eligible partner exists for this order right now.
	#[error("No partner available")]
	NoPartnerAvailable,
	/// The vendor has no pickup location, so distance cannot be ranked.
	#[error("Vendor has no pickup location")]
	VendorLocationMissing,
	/// The strategy was misconfigured.
	#[error("Invalid configuration: {0}")]
	InvalidConfiguration(String),
}

/// Trait defining the interface for partner selection strategies.
#[async_trait]
pub trait AssignmentInterface: Send + Sync {
	/// Picks one partner id from the candidate pool.
	///
	/// Candidates are pre-filtered for eligibility; an empty pool is
	/// reported as [`AssignmentError::NoPartnerAvailable`] before the
	/// strategy runs.
	async fn select_partner(
		&self,
		vendor: &VendorProfile,
		candidates: &[PartnerProfile],
	) -> Result<String, AssignmentError>;

	/// Returns the configuration schema for this strategy.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for assignment factory functions.
pub type AssignmentFactory =
	fn(&toml::Value) -> Result<Box<dyn AssignmentInterface>, AssignmentError>;

/// Registry trait for assignment strategy implementations.
pub trait AssignmentRegistry: ImplementationRegistry<Factory = AssignmentFactory> {}

/// Returns all built-in strategy implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AssignmentFactory)> {
	use implementations::nearest;
	vec![(nearest::Registry::NAME, nearest::Registry::factory())]
}

/// Service wrapping the configured assignment strategy.
pub struct AssignmentService {
	strategy: Box<dyn AssignmentInterface>,
}

impl AssignmentService {
	/// Creates a new AssignmentService with the given strategy.
	pub fn new(strategy: Box<dyn AssignmentInterface>) -> Self {
		Self { strategy }
	}

	/// Selects a partner for an order placed with `vendor`.
	///
	/// Filters the pool down to active partners with a reported position,
	/// then delegates ranking to the strategy.
	pub async fn select_partner(
		&self,
		vendor: &VendorProfile,
		partners: &[PartnerProfile],
	) -> Result<String, AssignmentError> {
		let candidates: Vec<PartnerProfile> = partners
			.iter()
			.filter(|p| p.active && p.coordinates.is_some())
			.cloned()
			.collect();
		if candidates.is_empty() {
			return Err(AssignmentError::NoPartnerAvailable);
		}
		self.strategy.select_partner(vendor, &candidates).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use dispatch_types::Coordinates;

	struct FirstCandidate;

	#[async_trait]
	impl AssignmentInterface for FirstCandidate {
		async fn select_partner(
			&self,
			_vendor: &VendorProfile,
			candidates: &[PartnerProfile],
		) -> Result<String, AssignmentError> {
			Ok(candidates[0].id.clone())
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			unimplemented!("not used in tests")
		}
	}

	fn vendor() -> VendorProfile {
		VendorProfile {
			id: "v1".into(),
			business_name: "Store".into(),
			coordinates: Some(Coordinates { lat: 0.0, lon: 0.0 }),
		}
	}

	fn partner(id: &str, active: bool, located: bool) -> PartnerProfile {
		PartnerProfile {
			id: id.into(),
			name: id.into(),
			coordinates: located.then_some(Coordinates { lat: 1.0, lon: 1.0 }),
			active,
		}
	}

	#[tokio::test]
	async fn filters_inactive_and_unlocated_partners() {
		let service = AssignmentService::new(Box::new(FirstCandidate));
		let pool = vec![
			partner("p1", false, true),
			partner("p2", true, false),
			partner("p3", true, true),
		];
		let chosen = service.select_partner(&vendor(), &pool).await.unwrap();
		assert_eq!(chosen, "p3");
	}

	#[tokio::test]
	async fn empty_pool_means_no_partner_available() {
		let service = AssignmentService::new(Box::new(FirstCandidate));
		let err = service
			.select_partner(&vendor(), &[partner("p1", false, false)])
			.await
			.unwrap_err();
		assert!(matches!(err, AssignmentError::NoPartnerAvailable));
	}
}
