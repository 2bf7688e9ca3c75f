//! Core coordinator engine orchestrating the fulfillment lifecycle.
//!
//! The engine owns the handlers and the event loop. Actor requests arrive
//! through the handlers (usually via the HTTP API); the loop reacts to
//! the events those requests publish, chasing approvals and partner
//! rejections with assignment attempts, and sweeps on a timer for orders
//! the event path missed.

pub mod event_bus;
pub mod lifecycle;

use crate::handlers::{AssignmentHandler, CustomerHandler, PartnerHandler, VendorHandler};
use crate::state::TransitionApplier;
use dispatch_assignment::AssignmentService;
use dispatch_config::Config;
use dispatch_storage::StoreService;
use dispatch_tracking::TrackingService;
use dispatch_types::{CoordinatorEvent, OrderEvent, OrderStatus, RequestEvent, RequestStatus};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Service error: {0}")]
	Service(String),
}

/// Main coordinator engine.
#[derive(Clone)]
pub struct CoordinatorEngine {
	/// Coordinator configuration.
	pub(crate) config: Config,
	/// Record store shared by every handler.
	pub(crate) store: Arc<StoreService>,
	/// Event bus for change notifications.
	pub(crate) event_bus: event_bus::EventBus,
	/// Customer-facing handler.
	pub(crate) customer_handler: Arc<CustomerHandler>,
	/// Vendor-facing handler.
	pub(crate) vendor_handler: Arc<VendorHandler>,
	/// Partner-facing handler.
	pub(crate) partner_handler: Arc<PartnerHandler>,
	/// Resolver-side assignment handler.
	pub(crate) assignment_handler: Arc<AssignmentHandler>,
	/// Position tracking service.
	pub(crate) tracking: Arc<TrackingService>,
}

impl CoordinatorEngine {
	/// Creates a new coordinator engine with the given services.
	pub fn new(
		config: Config,
		store: Arc<StoreService>,
		assignment: Arc<AssignmentService>,
		event_bus: event_bus::EventBus,
	) -> Self {
		let applier = Arc::new(TransitionApplier::new(store.clone(), event_bus.clone()));
		let customer_handler = Arc::new(CustomerHandler::new(
			store.clone(),
			applier.clone(),
			event_bus.clone(),
		));
		let vendor_handler = Arc::new(VendorHandler::new(store.clone(), applier.clone()));
		let partner_handler = Arc::new(PartnerHandler::new(
			store.clone(),
			applier.clone(),
			event_bus.clone(),
		));
		let assignment_handler = Arc::new(AssignmentHandler::new(
			store.clone(),
			assignment,
			event_bus.clone(),
		));
		let tracking = Arc::new(TrackingService::new(store.clone()));

		Self {
			config,
			store,
			event_bus,
			customer_handler,
			vendor_handler,
			partner_handler,
			assignment_handler,
			tracking,
		}
	}

	/// Main execution loop for the coordinator engine.
	///
	/// Reacts to approvals and partner rejections with assignment
	/// attempts, and sweeps on the configured interval for approved
	/// orders that are still waiting. Returns when a shutdown signal
	/// arrives.
	pub async fn run(&self) -> Result<(), EngineError> {
		let mut event_receiver = self.event_bus.subscribe();
		let mut sweep_interval = tokio::time::interval(Duration::from_secs(
			self.config.coordinator.poll_interval_seconds,
		));
		let semaphore = Arc::new(Semaphore::new(
			self.config.coordinator.max_concurrent_transitions,
		));

		loop {
			tokio::select! {
				// Chase lifecycle events with assignment attempts.
				Ok(event) = event_receiver.recv() => {
					match event {
						CoordinatorEvent::Order(OrderEvent::StatusChanged {
							order_id,
							to: OrderStatus::Approved,
							..
						}) => {
							self.spawn_handler(&semaphore, move |engine| async move {
								engine.try_assign(&order_id).await
							})
							.await;
						}
						CoordinatorEvent::Request(RequestEvent::StatusChanged {
							order_id,
							to: RequestStatus::RejectedByPartner,
							..
						}) => {
							self.spawn_handler(&semaphore, move |engine| async move {
								engine.try_assign(&order_id).await
							})
							.await;
						}
						_ => {}
					}
				}

				// Polling fallback for orders the event path missed.
				_ = sweep_interval.tick() => {
					self.spawn_handler(&semaphore, move |engine| async move {
						engine.assignment_handler.sweep().await;
						Ok(())
					})
					.await;
				}

				// Shutdown signal
				_ = tokio::signal::ctrl_c() => {
					break;
				}
			}
		}

		Ok(())
	}

	/// Attempts assignment for one order.
	///
	/// Expected outcomes (no partner yet, somebody else won the race)
	/// are not errors; anything else is surfaced from the task.
	async fn try_assign(&self, order_id: &str) -> Result<(), EngineError> {
		use crate::handlers::CoordinatorError;
		match self.assignment_handler.assign(order_id).await {
			Ok(_) => Ok(()),
			Err(CoordinatorError::NoPartnerAvailable)
			| Err(CoordinatorError::VendorLocationMissing) => {
				tracing::debug!(order_id = %order_id, "No partner available yet");
				Ok(())
			},
			Err(CoordinatorError::Denied(_)) | Err(CoordinatorError::Conflict(_)) => Ok(()),
			Err(e) => Err(EngineError::Service(format!(
				"Failed to assign order {}: {}",
				order_id, e
			))),
		}
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the record store.
	pub fn store(&self) -> &Arc<StoreService> {
		&self.store
	}

	/// Returns the customer handler.
	pub fn customer(&self) -> &Arc<CustomerHandler> {
		&self.customer_handler
	}

	/// Returns the vendor handler.
	pub fn vendor(&self) -> &Arc<VendorHandler> {
		&self.vendor_handler
	}

	/// Returns the partner handler.
	pub fn partner(&self) -> &Arc<PartnerHandler> {
		&self.partner_handler
	}

	/// Returns the assignment handler.
	pub fn assignment(&self) -> &Arc<AssignmentHandler> {
		&self.assignment_handler
	}

	/// Returns the tracking service.
	pub fn tracking(&self) -> &Arc<TrackingService> {
		&self.tracking
	}

	/// Helper method to spawn handler tasks with semaphore-based
	/// concurrency control.
	async fn spawn_handler<F, Fut>(&self, semaphore: &Arc<Semaphore>, handler: F)
	where
		F: FnOnce(CoordinatorEngine) -> Fut + Send + 'static,
		Fut: Future<Output = Result<(), EngineError>> + Send,
	{
		let engine = self.clone();
		match semaphore.clone().acquire_owned().await {
			Ok(permit) => {
				tokio::spawn(async move {
					let _permit = permit; // Keep permit alive for duration of task
					if let Err(e) = handler(engine).await {
						tracing::error!("Handler error: {}", e);
					}
				});
			},
			Err(e) => {
				tracing::error!("Failed to acquire semaphore permit: {}", e);
			},
		}
	}
}
