//! HTTP server for the dispatch coordinator API.
//!
//! Exposes the coordinator to its three client dashboards: checkout and
//! order views for customers, review actions for vendors, assignment
//! responses and delivery progress for partners, plus position tracking.

use axum::{
	routing::{delete, get, post, put},
	Router,
};
use dispatch_config::ApiConfig;
use dispatch_core::CoordinatorEngine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::apis::{orders, profiles, tracking};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the coordinator engine for processing requests.
	pub coordinator: Arc<CoordinatorEngine>,
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	coordinator: Arc<CoordinatorEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app_state = AppState { coordinator };

	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", post(orders::create_order).get(orders::list_orders))
				.route(
					"/orders/{id}",
					get(orders::get_order).delete(orders::delete_order),
				)
				.route("/orders/{id}/transitions", post(orders::transition_order))
				.route("/orders/{id}/tracking", get(tracking::get_position))
				.route("/orders/{id}/position", post(tracking::report_position))
				.route("/customers/{id}/orders", get(orders::customer_orders))
				.route("/vendors/{id}/orders", get(orders::vendor_orders))
				.route("/vendors", post(profiles::upsert_vendor))
				.route("/partners", post(profiles::upsert_partner))
				.route("/partners/{id}", put(profiles::upsert_partner_by_id))
				.route("/partners/{id}/requests", get(orders::partner_requests))
				.route("/requests/{id}", delete(orders::delete_request))
				.route("/addresses", post(profiles::create_address)),
		)
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(app_state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Dispatch API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}
