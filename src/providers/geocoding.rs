//! Address lookup backed by Nominatim, with POI search through Overpass.

use super::geo::GeoPoint;
use super::{build_http_client, request_failure, seconds};
use crate::config::GeocodingSettings;
use crate::error::Result;
use crate::tools::{
    decode_arguments, ErrorCode, ProviderInfo, ToolArguments, ToolProvider, ToolResult, ToolSpec,
    ToolUsage,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

const SERVICE: &str = "Nominatim";
const MAX_POI_RESULTS: usize = 10;
const POI_RADIUS_STEPS: [f64; 4] = [1.0, 1.5, 3.0, 5.0];

/// Query keywords and the Overpass tag filters they stand for.
const POI_FILTERS: &[(&str, &[&str])] = &[
    ("restaurant", &[r#"["amenity"="restaurant"]"#]),
    ("cafe", &[r#"["amenity"="cafe"]"#]),
    ("coffee", &[r#"["amenity"="cafe"]"#]),
    ("bar", &[r#"["amenity"="bar"]"#]),
    ("pub", &[r#"["amenity"="pub"]"#]),
    ("museum", &[r#"["tourism"="museum"]"#]),
    ("hotel", &[r#"["tourism"="hotel"]"#]),
    ("hospital", &[r#"["amenity"="hospital"]"#]),
    ("pharmacy", &[r#"["amenity"="pharmacy"]"#]),
    ("park", &[r#"["leisure"="park"]"#]),
    ("school", &[r#"["amenity"="school"]"#]),
    ("shop", &[r#"["shop"]"#]),
    (
        "grocery",
        &[r#"["shop"="supermarket"]"#, r#"["shop"="convenience"]"#],
    ),
    ("church", &[r#"["amenity"="place_of_worship"]"#]),
    (
        "mosque",
        &[r#"["amenity"="place_of_worship"]["religion"="muslim"]"#],
    ),
];

/// HTTP client for the Nominatim and Overpass APIs.
pub struct NominatimClient {
    http: reqwest::Client,
    base_url: String,
    overpass_url: String,
    timeout: Duration,
    overpass_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    lat: String,
    #[serde(default)]
    lon: String,
    #[serde(default)]
    importance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    address: Map<String, Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    fn position(&self) -> Option<GeoPoint> {
        match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => Some(GeoPoint::new(lat, lon)),
            (_, _, Some(center)) => Some(GeoPoint::new(center.lat, center.lon)),
            _ => None,
        }
    }

    fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).and_then(Value::as_str)
    }
}

impl NominatimClient {
    pub fn new(settings: &GeocodingSettings) -> Result<Self> {
        Ok(Self {
            http: build_http_client(&settings.user_agent)?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            overpass_url: settings.overpass_url.clone(),
            timeout: seconds(settings.timeout_seconds),
            overpass_timeout: seconds(settings.overpass_timeout_seconds),
        })
    }

    /// Geocode an address or place name.
    #[instrument(skip(self))]
    pub async fn forward_geocode(&self, query: &str, limit: u32) -> ToolResult {
        let started = Instant::now();
        let endpoint = format!("{}/search", self.base_url);
        let limit = limit.to_string();

        let response = self
            .http
            .get(&endpoint)
            .query(&[("q", query), ("format", "json"), ("limit", limit.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let places: Vec<NominatimPlace> = match response {
            Ok(r) => match r.json().await {
                Ok(places) => places,
                Err(e) => return request_failure(SERVICE, &e, &endpoint, started),
            },
            Err(e) => return request_failure(SERVICE, &e, &endpoint, started),
        };
        let usage = ToolUsage::since(&endpoint, started);

        if places.is_empty() {
            return ToolResult::success(json!({"results": [], "query": query}))
                .with_message("No results found")
                .with_usage(usage);
        }

        let results: Vec<Value> = places
            .iter()
            .map(|p| {
                json!({
                    "name": p.display_name,
                    "latitude": p.lat.parse::<f64>().unwrap_or(0.0),
                    "longitude": p.lon.parse::<f64>().unwrap_or(0.0),
                    "importance": p.importance.unwrap_or(0.0),
                })
            })
            .collect();

        ToolResult::success(json!({"results": results, "query": query}))
            .with_message(format!("Found {} result(s)", results.len()))
            .with_usage(usage)
    }

    /// Reverse geocode a coordinate to an address.
    #[instrument(skip(self))]
    pub async fn reverse_geocode(&self, point: GeoPoint) -> ToolResult {
        if !point.is_valid() {
            return invalid_coordinates(point);
        }

        let started = Instant::now();
        let endpoint = format!("{}/reverse", self.base_url);
        let lat = point.latitude.to_string();
        let lon = point.longitude.to_string();

        let response = self
            .http
            .get(&endpoint)
            .query(&[("lat", lat.as_str()), ("lon", lon.as_str()), ("format", "json")])
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let place: NominatimReverse = match response {
            Ok(r) => match r.json().await {
                Ok(place) => place,
                Err(e) => return request_failure(SERVICE, &e, &endpoint, started),
            },
            Err(e) => return request_failure(SERVICE, &e, &endpoint, started),
        };
        let usage = ToolUsage::since(&endpoint, started);

        if let Some(error) = place.error {
            return ToolResult::error(ErrorCode::NotFound, format!("Nominatim: {}", error))
                .with_usage(usage);
        }

        ToolResult::success(json!({
            "address": place.address,
            "display_name": place.display_name,
            "latitude": point.latitude,
            "longitude": point.longitude,
        }))
        .with_message("Reverse geocoding successful")
        .with_usage(usage)
    }

    /// Find points of interest near a location, widening the radius until something turns up.
    #[instrument(skip(self))]
    pub async fn poi_search(&self, query: &str, center: GeoPoint, radius: f64) -> ToolResult {
        if !center.is_valid() {
            return invalid_coordinates(center);
        }
        if radius <= 0.0 {
            return ToolResult::error(ErrorCode::InvalidInput, "Search radius must be positive");
        }

        let started = Instant::now();
        let filters = poi_filters(query);

        let mut elements = Vec::new();
        let mut search_radius = radius;
        for step in POI_RADIUS_STEPS {
            search_radius = radius * step;
            elements = self.search_overpass(center, search_radius, &filters).await;
            if !elements.is_empty() {
                break;
            }
            debug!("No POIs within {:.0}m, widening search", search_radius);
        }
        let usage = ToolUsage::since(&self.overpass_url, started);

        if elements.is_empty() {
            return ToolResult::success(json!({
                "results": [],
                "query": query,
                "center": [center.latitude, center.longitude],
            }))
            .with_message(format!(
                "No {}(s) found within {}m radius. Try a different search term.",
                query, search_radius as i64
            ))
            .with_usage(usage);
        }

        let mut results: Vec<(f64, Value)> = elements
            .iter()
            .filter_map(|element| {
                let position = element.position()?;
                let distance = center.distance_to(&position);
                Some((distance, format_poi(element, position, distance)))
            })
            .collect();
        results.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let total_found = results.len();
        let top: Vec<Value> = results
            .into_iter()
            .take(MAX_POI_RESULTS)
            .map(|(_, poi)| poi)
            .collect();

        ToolResult::success(json!({
            "results": top,
            "query": query,
            "center": [center.latitude, center.longitude],
            "search_radius_meters": search_radius as i64,
            "total_found": total_found,
        }))
        .with_message(format!(
            "Found {} {}(s) near the location (showing top {})",
            total_found, query, MAX_POI_RESULTS
        ))
        .with_usage(usage)
    }

    /// One Overpass round-trip. Failures count as "nothing found" so the caller can widen.
    async fn search_overpass(
        &self,
        center: GeoPoint,
        radius: f64,
        filters: &[String],
    ) -> Vec<OverpassElement> {
        let query = overpass_query(center, radius, filters);

        let response = self
            .http
            .post(&self.overpass_url)
            .body(query)
            .timeout(self.overpass_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match response {
            Ok(r) => match r.json::<OverpassResponse>().await {
                Ok(body) => body.elements,
                Err(e) => {
                    debug!("Overpass returned unreadable body: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                debug!("Overpass request failed: {}", e);
                Vec::new()
            }
        }
    }
}

fn invalid_coordinates(point: GeoPoint) -> ToolResult {
    ToolResult::error(
        ErrorCode::InvalidInput,
        format!(
            "Invalid coordinates: latitude {} longitude {}",
            point.latitude, point.longitude
        ),
    )
}

/// Tag filters for a POI query, falling back to a case-insensitive name match.
fn poi_filters(query: &str) -> Vec<String> {
    let query_lower = query.trim().to_lowercase();

    POI_FILTERS
        .iter()
        .find(|(keyword, _)| query_lower.contains(keyword))
        .map(|(_, filters)| filters.iter().map(|f| f.to_string()).collect())
        .unwrap_or_else(|| {
            let escaped = query.trim().replace('\\', "\\\\").replace('"', "\\\"");
            vec![format!(r#"["name"~"{}",i]"#, escaped)]
        })
}

fn overpass_query(center: GeoPoint, radius: f64, filters: &[String]) -> String {
    let around = format!(
        "(around:{},{},{})",
        radius as i64, center.latitude, center.longitude
    );
    let mut statements = String::new();
    for filter in filters {
        for kind in ["node", "way", "relation"] {
            statements.push_str(&format!("{}{}{};", kind, around, filter));
        }
    }

    format!("[out:json];\n({});\nout center;", statements)
}

fn format_poi(element: &OverpassElement, position: GeoPoint, distance: f64) -> Value {
    let name = element
        .tag("name")
        .or_else(|| element.tag("brand"))
        .unwrap_or("Unnamed");
    let kind = element
        .tag("amenity")
        .or_else(|| element.tag("tourism"))
        .or_else(|| element.tag("leisure"))
        .or_else(|| element.tag("shop"))
        .unwrap_or("POI");

    let phone = element.tag("phone");
    let website = element.tag("website");
    let opening_hours = element.tag("opening_hours");
    let details = if phone.is_some() || website.is_some() || opening_hours.is_some() {
        json!({"phone": phone, "website": website, "opening_hours": opening_hours})
    } else {
        Value::Null
    };

    json!({
        "name": name,
        "latitude": position.latitude,
        "longitude": position.longitude,
        "type": kind,
        "distance_meters": distance as i64,
        "details": details,
    })
}

fn default_limit() -> u32 {
    5
}

fn default_radius() -> f64 {
    1000.0
}

#[derive(Debug, Deserialize)]
struct ForwardGeocodeArgs {
    query: String,
    #[serde(default = "default_limit")]
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeArgs {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct PoiSearchArgs {
    query: String,
    latitude: f64,
    longitude: f64,
    #[serde(default = "default_radius")]
    radius: f64,
}

/// Address lookup provider: `forward_geocode`, `reverse_geocode`, `poi_search`.
pub struct GeocodingProvider {
    client: NominatimClient,
}

impl GeocodingProvider {
    pub fn new(settings: &GeocodingSettings) -> Result<Self> {
        Ok(Self {
            client: NominatimClient::new(settings)?,
        })
    }
}

#[async_trait]
impl ToolProvider for GeocodingProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "Geocoding Server".to_string(),
            description: "OpenStreetMap Nominatim-based geocoding service for forward/reverse geocoding and POI search".to_string(),
            base_url: Some(self.client.base_url.clone()),
            resources: Vec::new(),
        }
    }

    fn catalog(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "forward_geocode",
                "Convert an address or place name to geographic coordinates (latitude/longitude)",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The address or place name to geocode (e.g., 'New York City', '1600 Pennsylvania Avenue')"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of results to return (default: 5)",
                            "default": 5
                        }
                    },
                    "required": ["query"]
                }),
            ),
            ToolSpec::new(
                "reverse_geocode",
                "Convert geographic coordinates (latitude/longitude) to an address",
                json!({
                    "type": "object",
                    "properties": {
                        "latitude": {
                            "type": "number",
                            "description": "Latitude in decimal degrees (e.g., 40.7128)"
                        },
                        "longitude": {
                            "type": "number",
                            "description": "Longitude in decimal degrees (e.g., -74.0060)"
                        }
                    },
                    "required": ["latitude", "longitude"]
                }),
            ),
            ToolSpec::new(
                "poi_search",
                "Search for points of interest (restaurants, hotels, landmarks, etc.) near a location",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The type of POI to search for (e.g., 'restaurants', 'hotels', 'museums')"
                        },
                        "latitude": {
                            "type": "number",
                            "description": "Latitude of the center point"
                        },
                        "longitude": {
                            "type": "number",
                            "description": "Longitude of the center point"
                        },
                        "radius": {
                            "type": "number",
                            "description": "Search radius in meters (default: 1000)",
                            "default": 1000
                        }
                    },
                    "required": ["query", "latitude", "longitude"]
                }),
            ),
        ]
    }

    async fn handle(&self, name: &str, arguments: &ToolArguments) -> ToolResult {
        match name {
            "forward_geocode" => match decode_arguments::<ForwardGeocodeArgs>(name, arguments) {
                Ok(args) => self.client.forward_geocode(&args.query, args.limit).await,
                Err(invalid) => invalid,
            },
            "reverse_geocode" => match decode_arguments::<ReverseGeocodeArgs>(name, arguments) {
                Ok(args) => {
                    self.client
                        .reverse_geocode(GeoPoint::new(args.latitude, args.longitude))
                        .await
                }
                Err(invalid) => invalid,
            },
            "poi_search" => match decode_arguments::<PoiSearchArgs>(name, arguments) {
                Ok(args) => {
                    self.client
                        .poi_search(
                            &args.query,
                            GeoPoint::new(args.latitude, args.longitude),
                            args.radius,
                        )
                        .await
                }
                Err(invalid) => invalid,
            },
            _ => ToolResult::unknown_tool(name),
        }
    }
}
