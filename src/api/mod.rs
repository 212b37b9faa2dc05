//! Invocation surface: the event shapes, the handler and its HTTP routes

pub mod event;
pub mod handler;
pub mod routes;

pub use event::{ProxyRequest, ProxyResponse};
pub use handler::{Outcome, StatusHandler};
pub use routes::router;
