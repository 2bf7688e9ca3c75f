//! Nearest-partner assignment strategy.
//!
//! Ranks candidates by great-circle distance from the vendor's pickup
//! location and picks the closest. An optional `max_radius_km` bound
//! treats partners beyond it as unavailable.

use crate::{AssignmentError, AssignmentFactory, AssignmentInterface, AssignmentRegistry};
use async_trait::async_trait;
use dispatch_types::{
	ConfigSchema, Coordinates, Field, FieldType, ImplementationRegistry, PartnerProfile, Schema,
	ValidationError, VendorProfile,
};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two coordinate pairs, in kilometres.
fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
	let d_lat = (b.lat - a.lat).to_radians();
	let d_lon = (b.lon - a.lon).to_radians();
	let h = (d_lat / 2.0).sin().powi(2)
		+ a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
	2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Strategy that offers the order to the closest eligible partner.
pub struct NearestPartner {
	/// Partners farther than this from the vendor are skipped.
	max_radius_km: Option<f64>,
}

impl NearestPartner {
	pub fn new(max_radius_km: Option<f64>) -> Self {
		Self { max_radius_km }
	}
}

#[async_trait]
impl AssignmentInterface for NearestPartner {
	async fn select_partner(
		&self,
		vendor: &VendorProfile,
		candidates: &[PartnerProfile],
	) -> Result<String, AssignmentError> {
		let pickup = vendor
			.coordinates
			.ok_or(AssignmentError::VendorLocationMissing)?;

		let mut best: Option<(&PartnerProfile, f64)> = None;
		for partner in candidates {
			// The service guarantees candidates are located.
			let Some(position) = partner.coordinates else {
				continue;
			};
			let distance = distance_km(pickup, position);
			if let Some(radius) = self.max_radius_km {
				if distance > radius {
					continue;
				}
			}
			match best {
				Some((_, d)) if d <= distance => {},
				_ => best = Some((partner, distance)),
			}
		}

		match best {
			Some((partner, distance)) => {
				tracing::debug!(
					partner_id = %partner.id,
					vendor_id = %vendor.id,
					distance_km = distance,
					"Selected nearest partner"
				);
				Ok(partner.id.clone())
			},
			None => Err(AssignmentError::NoPartnerAvailable),
		}
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NearestPartnerSchema)
	}
}

/// Configuration schema for the nearest-partner strategy.
pub struct NearestPartnerSchema;

impl ConfigSchema for NearestPartnerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![], vec![Field::new("max_radius_km", FieldType::Float)]);
		schema.validate(config)
	}
}

/// Registry entry for the nearest-partner strategy.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "nearest";
	type Factory = AssignmentFactory;

	fn factory() -> Self::Factory {
		create_strategy
	}
}

impl AssignmentRegistry for Registry {}

/// Factory function to create the nearest-partner strategy from configuration.
///
/// Configuration parameters:
/// - `max_radius_km` (optional): skip partners farther than this
pub fn create_strategy(
	config: &toml::Value,
) -> Result<Box<dyn AssignmentInterface>, AssignmentError> {
	NearestPartnerSchema
		.validate(config)
		.map_err(|e| AssignmentError::InvalidConfiguration(e.to_string()))?;
	let max_radius_km = config.get("max_radius_km").and_then(|v| v.as_float());
	Ok(Box::new(NearestPartner::new(max_radius_km)))
}
