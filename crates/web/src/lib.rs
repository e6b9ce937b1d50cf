//! HTTP and WebSocket surface for the offers dashboard.

pub mod events;
pub mod server;
pub mod state;
pub mod ws;

pub use events::DashboardEvent;
pub use server::create_router;
pub use state::{AppState, WebConfig};
