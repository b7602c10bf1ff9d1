//! The management API: bearer-token authenticated CRUD under `/api/v1/*`
//! over the store (§4.H, §6).

pub mod endpoints;
pub mod extractors;
pub mod middleware;

pub use endpoints::router;
pub use middleware::AppState;
