//! Aggregation and synchronization services.

pub mod backend;
pub mod context;
pub mod error;
pub mod mutation;
pub mod orchestrator;
pub mod reference;
pub mod repository;
pub mod retry;
pub mod session;
pub mod state;
pub mod visibility;

pub use backend::{BackendError, Backends, ContentSource, ReferenceSource, SubunitSource};
pub use context::{AggregationContext, PortalSnapshot};
pub use error::{AppError, ContextError, FailureScope, FetchFailure};
pub use orchestrator::{LoadOutcome, LoadPhase, LoadReport};
pub use reference::ReferenceCache;
pub use retry::{RetryPolicy, RetryingFetcher};
