use serde::Serialize;
use storage::Offer;

/// Events pushed to dashboard WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// The latest poll cycle's batch, most recently fetched first.
    OffersUpdate { offers: Vec<Offer> },
}
