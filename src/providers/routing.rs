//! Routing backed by the OSRM HTTP API.

use super::geo::{osrm_path, GeoPoint};
use super::{build_http_client, request_failure, seconds};
use crate::config::RoutingSettings;
use crate::error::Result;
use crate::tools::{
    decode_arguments, ErrorCode, ProviderInfo, ToolArguments, ToolProvider, ToolResult, ToolSpec,
    ToolUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

const SERVICE: &str = "OSRM";

/// Travel mode understood by OSRM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Car,
    Bike,
    Foot,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Car => "car",
            Profile::Bike => "bike",
            Profile::Foot => "foot",
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP client for an OSRM server.
pub struct OsrmClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OsrmClient {
    pub fn new(settings: &RoutingSettings) -> Result<Self> {
        Ok(Self {
            http: build_http_client(&settings.user_agent)?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: seconds(settings.timeout_seconds),
        })
    }

    /// Fastest route between two points.
    #[instrument(skip(self))]
    pub async fn route(&self, start: GeoPoint, end: GeoPoint, profile: Profile) -> ToolResult {
        if let Some(invalid) = check_points(&[start, end]) {
            return invalid;
        }

        let started = Instant::now();
        let endpoint = format!(
            "{}/route/v1/{}/{}",
            self.base_url,
            profile,
            osrm_path(&[start, end])
        );
        let params = [("overview", "full"), ("steps", "true"), ("geometries", "geojson")];

        let body = match self.fetch(&endpoint, &params, started).await {
            Ok(body) => body,
            Err(failure) => return failure,
        };
        let usage = ToolUsage::since(&endpoint, started);

        let code = body["code"].as_str().unwrap_or("Ok");
        let route = body["routes"].as_array().and_then(|routes| routes.first());
        let route = match route {
            Some(route) if code == "Ok" => route,
            _ if code == "Ok" || code == "NoRoute" => {
                return ToolResult::error(ErrorCode::NoRoute, "No route found").with_usage(usage)
            }
            _ => return osrm_error(&body).with_usage(usage),
        };

        let distance = route["distance"].as_f64().unwrap_or(0.0);
        let duration = route["duration"].as_f64().unwrap_or(0.0);

        ToolResult::success(json!({
            "distance_meters": distance,
            "duration_seconds": duration,
            "geometry": route["geometry"],
            "legs": route["legs"],
            "profile": profile,
        }))
        .with_message(format!(
            "Route found: {:.1} km, {:.1} minutes",
            distance / 1000.0,
            duration / 60.0
        ))
        .with_usage(usage)
    }

    /// Travel-time table between every source and every destination.
    #[instrument(skip(self))]
    pub async fn distance_matrix(
        &self,
        sources: &[GeoPoint],
        destinations: &[GeoPoint],
        profile: Profile,
    ) -> ToolResult {
        if sources.is_empty() || destinations.is_empty() {
            return ToolResult::error(
                ErrorCode::InvalidInput,
                "Sources and destinations must not be empty",
            );
        }

        let points: Vec<GeoPoint> = sources.iter().chain(destinations).copied().collect();
        if let Some(invalid) = check_points(&points) {
            return invalid;
        }

        let started = Instant::now();
        let endpoint = format!(
            "{}/table/v1/{}/{}",
            self.base_url,
            profile,
            osrm_path(&points)
        );
        let source_indices = index_list(0..sources.len());
        let destination_indices = index_list(sources.len()..points.len());
        let params = [
            ("sources", source_indices.as_str()),
            ("destinations", destination_indices.as_str()),
        ];

        let body = match self.fetch(&endpoint, &params, started).await {
            Ok(body) => body,
            Err(failure) => return failure,
        };
        let usage = ToolUsage::since(&endpoint, started);

        if body["code"].as_str() != Some("Ok") {
            return osrm_error(&body).with_usage(usage);
        }

        ToolResult::success(json!({
            "distances": body["distances"],
            "durations": body["durations"],
            "sources": body["sources"],
            "destinations": body["destinations"],
            "profile": profile,
        }))
        .with_message(format!(
            "Distance matrix computed for {} sources and {} destinations",
            sources.len(),
            destinations.len()
        ))
        .with_usage(usage)
    }

    /// Snap a GPS trace onto the road network.
    #[instrument(skip(self))]
    pub async fn match_trace(&self, coordinates: &[GeoPoint], profile: Profile) -> ToolResult {
        if coordinates.len() < 2 {
            return ToolResult::error(ErrorCode::InvalidInput, "Need at least 2 coordinates");
        }
        if let Some(invalid) = check_points(coordinates) {
            return invalid;
        }

        let started = Instant::now();
        let endpoint = format!(
            "{}/match/v1/{}/{}",
            self.base_url,
            profile,
            osrm_path(coordinates)
        );
        let params = [("overview", "full"), ("geometries", "geojson")];

        let body = match self.fetch(&endpoint, &params, started).await {
            Ok(body) => body,
            Err(failure) => return failure,
        };
        let usage = ToolUsage::since(&endpoint, started);

        if body["code"].as_str() != Some("Ok") {
            return osrm_error(&body).with_usage(usage);
        }

        let segments = body["matchings"].as_array().map_or(0, Vec::len);
        ToolResult::success(json!({
            "matchings": body["matchings"],
            "tracepoints": body["tracepoints"],
            "profile": profile,
        }))
        .with_message(format!("Matched {} segment(s)", segments))
        .with_usage(usage)
    }

    /// GET an OSRM endpoint.
    ///
    /// OSRM reports routing failures (`NoRoute`, `InvalidQuery`, ...) as 4xx
    /// responses with a JSON `code`; those bodies are returned for the caller
    /// to classify instead of being treated as transport errors.
    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        started: Instant,
    ) -> std::result::Result<Value, ToolResult> {
        let response = self
            .http
            .get(endpoint)
            .query(params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| request_failure(SERVICE, &e, endpoint, started))?;

        let status = response.status();
        match response.json::<Value>().await {
            Ok(body) if status.is_success() || body.get("code").is_some() => Ok(body),
            Err(e) if status.is_success() => Err(request_failure(SERVICE, &e, endpoint, started)),
            _ => {
                debug!("OSRM answered {} without a routing code", status);
                Err(ToolResult::error(
                    ErrorCode::HttpError,
                    format!("OSRM API error: HTTP {}", status),
                )
                .with_usage(ToolUsage::since(endpoint, started)))
            }
        }
    }
}

fn check_points(points: &[GeoPoint]) -> Option<ToolResult> {
    points.iter().find(|p| !p.is_valid()).map(|p| {
        ToolResult::error(
            ErrorCode::InvalidInput,
            format!(
                "Invalid coordinates: latitude {} longitude {}",
                p.latitude, p.longitude
            ),
        )
    })
}

fn osrm_error(body: &Value) -> ToolResult {
    let message = body["message"].as_str().unwrap_or("Unknown error");
    ToolResult::error(ErrorCode::OsrmError, format!("OSRM error: {}", message))
}

fn index_list(range: std::ops::Range<usize>) -> String {
    range
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Deserialize)]
struct RouteArgs {
    start_latitude: f64,
    start_longitude: f64,
    end_latitude: f64,
    end_longitude: f64,
    #[serde(default)]
    profile: Profile,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixArgs {
    sources: Vec<GeoPoint>,
    destinations: Vec<GeoPoint>,
    #[serde(default)]
    profile: Profile,
}

#[derive(Debug, Deserialize)]
struct MatchTraceArgs {
    coordinates: Vec<GeoPoint>,
    #[serde(default)]
    profile: Profile,
}

/// Routing provider: `route`, `distance_matrix`, `match_trace`.
pub struct RoutingProvider {
    client: OsrmClient,
}

impl RoutingProvider {
    pub fn new(settings: &RoutingSettings) -> Result<Self> {
        Ok(Self {
            client: OsrmClient::new(settings)?,
        })
    }

    async fn distance_matrix(&self, args: DistanceMatrixArgs) -> ToolResult {
        // /table only returns durations; a single pair goes through /route to get distance too.
        if let ([source], [destination]) = (args.sources.as_slice(), args.destinations.as_slice()) {
            debug!("Serving 1x1 distance matrix with a route request");
            return self.client.route(*source, *destination, args.profile).await;
        }

        self.client
            .distance_matrix(&args.sources, &args.destinations, args.profile)
            .await
    }
}

fn point_pairs_schema(description: &str) -> Value {
    json!({
        "type": "array",
        "description": description,
        "items": {
            "type": "array",
            "minItems": 2,
            "maxItems": 2,
            "items": {"type": "number"}
        }
    })
}

fn profile_schema() -> Value {
    json!({
        "type": "string",
        "description": "Routing profile: 'car', 'bike', or 'foot'",
        "enum": ["car", "bike", "foot"],
        "default": "car"
    })
}

#[async_trait]
impl ToolProvider for RoutingProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "Routing Server".to_string(),
            description: "OpenStreetMap Routing Machine (OSRM) service for route calculation, distance matrix, and trace matching".to_string(),
            base_url: Some(self.client.base_url.clone()),
            resources: Vec::new(),
        }
    }

    fn catalog(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "route",
                "Calculate the best route between two points",
                json!({
                    "type": "object",
                    "properties": {
                        "start_latitude": {
                            "type": "number",
                            "description": "Starting latitude (e.g., 40.7128)"
                        },
                        "start_longitude": {
                            "type": "number",
                            "description": "Starting longitude (e.g., -74.0060)"
                        },
                        "end_latitude": {
                            "type": "number",
                            "description": "Ending latitude"
                        },
                        "end_longitude": {
                            "type": "number",
                            "description": "Ending longitude"
                        },
                        "profile": profile_schema()
                    },
                    "required": ["start_latitude", "start_longitude", "end_latitude", "end_longitude"]
                }),
            ),
            ToolSpec::new(
                "distance_matrix",
                "Calculate distances and travel times between multiple source and destination points",
                json!({
                    "type": "object",
                    "properties": {
                        "sources": point_pairs_schema("List of [latitude, longitude] pairs for source points"),
                        "destinations": point_pairs_schema("List of [latitude, longitude] pairs for destination points"),
                        "profile": profile_schema()
                    },
                    "required": ["sources", "destinations"]
                }),
            ),
            ToolSpec::new(
                "match_trace",
                "Match a GPS trace (sequence of coordinates) to the road network",
                json!({
                    "type": "object",
                    "properties": {
                        "coordinates": point_pairs_schema("List of [latitude, longitude] pairs representing the trace"),
                        "profile": profile_schema()
                    },
                    "required": ["coordinates"]
                }),
            ),
        ]
    }

    async fn handle(&self, name: &str, arguments: &ToolArguments) -> ToolResult {
        match name {
            "route" => match decode_arguments::<RouteArgs>(name, arguments) {
                Ok(args) => {
                    self.client
                        .route(
                            GeoPoint::new(args.start_latitude, args.start_longitude),
                            GeoPoint::new(args.end_latitude, args.end_longitude),
                            args.profile,
                        )
                        .await
                }
                Err(invalid) => invalid,
            },
            "distance_matrix" => match decode_arguments::<DistanceMatrixArgs>(name, arguments) {
                Ok(args) => self.distance_matrix(args).await,
                Err(invalid) => invalid,
            },
            "match_trace" => match decode_arguments::<MatchTraceArgs>(name, arguments) {
                Ok(args) => self.client.match_trace(&args.coordinates, args.profile).await,
                Err(invalid) => invalid,
            },
            _ => ToolResult::unknown_tool(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolStatus;
    use wiremock::matchers::{method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> RoutingProvider {
        RoutingProvider::new(&RoutingSettings {
            base_url: server.uri(),
            timeout_seconds: 2.0,
            ..RoutingSettings::default()
        })
        .unwrap()
    }

    fn args(value: Value) -> ToolArguments {
        value.as_object().cloned().unwrap()
    }

    fn route_body() -> Value {
        json!({
            "code": "Ok",
            "routes": [{
                "distance": 12500.0,
                "duration": 900.0,
                "geometry": {"type": "LineString", "coordinates": [[-74.006, 40.7128], [-73.9855, 40.758]]},
                "legs": [{"steps": []}]
            }]
        })
    }

    #[tokio::test]
    async fn test_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/route/v1/bike/-74.006,40.7128;-73.9855,40.758"))
            .and(query_param("geometries", "geojson"))
            .respond_with(ResponseTemplate::new(200).set_body_json(route_body()))
            .expect(1)
            .mount(&server)
            .await;

        let result = provider(&server)
            .handle(
                "route",
                &args(json!({
                    "start_latitude": 40.7128,
                    "start_longitude": -74.006,
                    "end_latitude": 40.758,
                    "end_longitude": -73.9855,
                    "profile": "bike"
                })),
            )
            .await;

        assert_eq!(result.status(), ToolStatus::Success);
        let data = result.data().unwrap();
        assert_eq!(data["distance_meters"], 12500.0);
        assert_eq!(data["duration_seconds"], 900.0);
        assert_eq!(data["profile"], "bike");
        assert_eq!(result.message(), Some("Route found: 12.5 km, 15.0 minutes"));
    }

    #[tokio::test]
    async fn test_no_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/route/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "NoRoute",
                "message": "Impossible route between points"
            })))
            .mount(&server)
            .await;

        let result = provider(&server)
            .handle(
                "route",
                &args(json!({
                    "start_latitude": 60.0,
                    "start_longitude": 5.0,
                    "end_latitude": 40.0,
                    "end_longitude": -74.0
                })),
            )
            .await;

        assert_eq!(result.error_code(), Some(ErrorCode::NoRoute));
        assert!(result.data().is_none());
    }

    #[tokio::test]
    async fn test_unknown_profile_is_invalid_input() {
        let server = MockServer::start().await;
        let result = provider(&server)
            .handle(
                "route",
                &args(json!({
                    "start_latitude": 60.0,
                    "start_longitude": 5.0,
                    "end_latitude": 61.0,
                    "end_longitude": 5.0,
                    "profile": "plane"
                })),
            )
            .await;
        assert_eq!(result.error_code(), Some(ErrorCode::InvalidInput));
    }

    #[tokio::test]
    async fn test_single_pair_matrix_uses_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/route/v1/car/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(route_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/table/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = provider(&server)
            .handle(
                "distance_matrix",
                &args(json!({
                    "sources": [[40.7128, -74.006]],
                    "destinations": [[40.758, -73.9855]]
                })),
            )
            .await;

        assert!(result.is_success());
        let data = result.data().unwrap();
        assert_eq!(data["distance_meters"], 12500.0);
        assert_eq!(data["duration_seconds"], 900.0);
    }

    #[tokio::test]
    async fn test_matrix_uses_table_indices() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/table/v1/foot/10.75,59.91;10.76,59.92;10.77,59.93"))
            .and(query_param("sources", "0"))
            .and(query_param("destinations", "1,2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "Ok",
                "durations": [[600.0, 840.0]],
                "sources": [{"location": [10.75, 59.91]}],
                "destinations": [{"location": [10.76, 59.92]}, {"location": [10.77, 59.93]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = provider(&server)
            .handle(
                "distance_matrix",
                &args(json!({
                    "sources": [[59.91, 10.75]],
                    "destinations": [[59.92, 10.76], [59.93, 10.77]],
                    "profile": "foot"
                })),
            )
            .await;

        assert!(result.is_success());
        let data = result.data().unwrap();
        assert_eq!(data["durations"], json!([[600.0, 840.0]]));
        assert_eq!(data["distances"], Value::Null);
        assert_eq!(
            result.message(),
            Some("Distance matrix computed for 1 sources and 2 destinations")
        );
    }

    #[tokio::test]
    async fn test_matrix_requires_points() {
        let server = MockServer::start().await;
        let result = provider(&server)
            .handle(
                "distance_matrix",
                &args(json!({"sources": [], "destinations": [[1.0, 2.0]]})),
            )
            .await;
        assert_eq!(result.error_code(), Some(ErrorCode::InvalidInput));
    }

    #[tokio::test]
    async fn test_match_trace() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/match/v1/car/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "Ok",
                "matchings": [{"confidence": 0.9}],
                "tracepoints": [null, {"location": [10.76, 59.92]}]
            })))
            .mount(&server)
            .await;

        let result = provider(&server)
            .handle(
                "match_trace",
                &args(json!({"coordinates": [[59.91, 10.75], [59.92, 10.76]]})),
            )
            .await;

        assert!(result.is_success());
        assert_eq!(result.message(), Some("Matched 1 segment(s)"));
    }

    #[tokio::test]
    async fn test_match_trace_needs_two_points() {
        let server = MockServer::start().await;
        let result = provider(&server)
            .handle("match_trace", &args(json!({"coordinates": [[59.91, 10.75]]})))
            .await;
        assert_eq!(result.error_code(), Some(ErrorCode::InvalidInput));
        assert_eq!(result.message(), Some("Need at least 2 coordinates"));
    }

    #[tokio::test]
    async fn test_osrm_error_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "NoMatch",
                "message": "Could not match the trace."
            })))
            .mount(&server)
            .await;

        let result = provider(&server)
            .handle(
                "match_trace",
                &args(json!({"coordinates": [[59.91, 10.75], [59.92, 10.76]]})),
            )
            .await;

        assert_eq!(result.error_code(), Some(ErrorCode::OsrmError));
        assert_eq!(result.message(), Some("OSRM error: Could not match the trace."));
    }

    #[tokio::test]
    async fn test_server_error_without_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let result = provider(&server)
            .handle(
                "match_trace",
                &args(json!({"coordinates": [[59.91, 10.75], [59.92, 10.76]]})),
            )
            .await;

        assert_eq!(result.error_code(), Some(ErrorCode::HttpError));
        assert!(result.usage().is_some());
    }
}
