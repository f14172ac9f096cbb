//! Backend tool providers.
//!
//! Three independent services, each owning a disjoint set of tool names:
//! address lookup (Nominatim), routing (OSRM) and tile-layer metadata.

pub mod geo;
mod geocoding;
mod routing;
mod tiles;

pub use geocoding::{GeocodingProvider, NominatimClient};
pub use routing::{OsrmClient, Profile, RoutingProvider};
pub use tiles::{TileLayer, TilesProvider, TILE_LAYERS};

use crate::config::Settings;
use crate::error::{KartError, Result};
use crate::tools::{ErrorCode, ToolProvider, ToolResult, ToolUsage};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The standard providers in catalog order: geocoding, routing, tiles.
pub fn default_providers(settings: &Settings) -> Result<Vec<Arc<dyn ToolProvider>>> {
    let providers: Vec<Arc<dyn ToolProvider>> = vec![
        Arc::new(GeocodingProvider::new(&settings.geocoding)?),
        Arc::new(RoutingProvider::new(&settings.routing)?),
        Arc::new(TilesProvider),
    ];
    Ok(providers)
}

fn build_http_client(user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(|e| KartError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Handler timeout from configured seconds; nonsensical values fall back to 10s.
fn seconds(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs.min(3600.0))
    } else {
        Duration::from_secs(10)
    }
}

/// Convert a failed request into an error result with usage attached.
fn request_failure(
    service: &str,
    error: &reqwest::Error,
    endpoint: &str,
    started: Instant,
) -> ToolResult {
    let result = if error.is_timeout() {
        ToolResult::error(ErrorCode::Timeout, format!("{} request timed out", service))
    } else {
        ToolResult::error(ErrorCode::HttpError, format!("{} API error: {}", service, error))
    };
    result.with_usage(ToolUsage::since(endpoint, started))
}
