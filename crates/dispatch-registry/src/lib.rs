//! Client-side caches of the dispatch tables and the workflow that ties them together.
//!
//! The store is authoritative. Registries only ever hold what a fetch or a write returned,
//! and any change notice from the store replaces the whole cache with a fresh fetch.

pub mod assignment;
pub mod cache;
pub mod dashboard;
pub mod incidents;
pub mod resources;
mod sync;

pub use assignment::{AssignmentReceipt, Dispatcher};
pub use cache::{FetchOutcome, FetchTicket, Keyed, RecordCache, Snapshot};
pub use dashboard::{DanglingAssignment, DashboardSummary, MapMarker, MapView, StatusCounts};
pub use incidents::IncidentRegistry;
pub use resources::ResourceRegistry;
