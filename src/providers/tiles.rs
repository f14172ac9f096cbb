//! Static tile-layer metadata.

use crate::tools::{
    decode_arguments, ErrorCode, ProviderInfo, ToolArguments, ToolProvider, ToolResult, ToolSpec,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A raster tile source the assistant can recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileLayer {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub url_template: &'static str,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub attribution: &'static str,
    pub license: &'static str,
}

pub static TILE_LAYERS: &[TileLayer] = &[
    TileLayer {
        id: "openstreetmap",
        name: "OpenStreetMap",
        description: "The Free and Open Collaborative Mapping Project",
        url_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
        min_zoom: 0,
        max_zoom: 19,
        attribution: "&copy; OpenStreetMap contributors",
        license: "ODbL",
    },
    TileLayer {
        id: "stamen_toner",
        name: "Stamen Toner",
        description: "Minimalist map tiles",
        url_template: "https://tiles.stadiamaps.com/tiles/stamen_toner/{z}/{x}/{y}.png",
        min_zoom: 0,
        max_zoom: 20,
        attribution: "Map tiles by Stadia Maps, Data by OpenStreetMap",
        license: "CC BY 3.0",
    },
    TileLayer {
        id: "stamen_tonerbackground",
        name: "Stamen Toner Background",
        description: "Toner map without labels",
        url_template: "https://tiles.stadiamaps.com/tiles/stamen_toner_background/{z}/{x}/{y}.png",
        min_zoom: 0,
        max_zoom: 20,
        attribution: "Map tiles by Stadia Maps, Data by OpenStreetMap",
        license: "CC BY 3.0",
    },
    TileLayer {
        id: "carto_positron",
        name: "CARTO Positron",
        description: "Light basemap with detailed labels",
        url_template: "https://cartodb-basemaps-a.global.ssl.fastly.net/light_all/{z}/{x}/{y}.png",
        min_zoom: 0,
        max_zoom: 19,
        attribution: "&copy; OpenStreetMap contributors &copy; CARTO",
        license: "CC BY 4.0",
    },
    TileLayer {
        id: "carto_voyager",
        name: "CARTO Voyager",
        description: "Colorful and detailed basemap",
        url_template: "https://cartodb-basemaps-a.global.ssl.fastly.net/rastered_and_labels/{z}/{x}/{y}.png",
        min_zoom: 0,
        max_zoom: 19,
        attribution: "&copy; OpenStreetMap contributors &copy; CARTO",
        license: "CC BY 4.0",
    },
    TileLayer {
        id: "usgs_topo",
        name: "USGS Topo",
        description: "USGS topographic maps",
        url_template: "https://basemap.nationalmap.gov/arcgis/rest/services/USGSTopo/MapServer/tile/{z}/{y}/{x}",
        min_zoom: 0,
        max_zoom: 16,
        attribution: "USGS",
        license: "Public Domain",
    },
];

impl TileLayer {
    pub fn find(id: &str) -> Option<&'static TileLayer> {
        TILE_LAYERS.iter().find(|layer| layer.id == id)
    }
}

#[derive(Debug, Deserialize)]
struct ProviderIdArgs {
    #[serde(default)]
    provider_id: String,
}

fn not_found(id: &str) -> ToolResult {
    ToolResult::error(ErrorCode::NotFound, format!("Provider '{}' not found", id))
}

/// Tile metadata provider. Serves from [`TILE_LAYERS`] without any I/O.
pub struct TilesProvider;

impl TilesProvider {
    fn list(&self) -> ToolResult {
        let providers: Vec<Value> = TILE_LAYERS
            .iter()
            .map(|layer| {
                json!({
                    "id": layer.id,
                    "name": layer.name,
                    "description": layer.description,
                })
            })
            .collect();

        let count = providers.len();
        ToolResult::success(json!({ "providers": providers, "count": count }))
            .with_message(format!("Found {} tile providers", count))
    }

    fn provider_info(&self, id: &str) -> ToolResult {
        match TileLayer::find(id) {
            Some(layer) => ToolResult::success(json!(layer))
                .with_message(format!("Provider information for {}", id)),
            None => not_found(id),
        }
    }

    fn attribution(&self, id: &str) -> ToolResult {
        match TileLayer::find(id) {
            Some(layer) => ToolResult::success(json!({
                "provider_id": layer.id,
                "attribution": layer.attribution,
            }))
            .with_message(format!("Attribution for {}", id)),
            None => not_found(id),
        }
    }
}

fn provider_id_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "provider_id": {
                "type": "string",
                "description": description
            }
        },
        "required": ["provider_id"]
    })
}

#[async_trait]
impl ToolProvider for TilesProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "Tiles/Metadata Server".to_string(),
            description: "Map tile provider metadata service with provider list, URL templates, and attributions".to_string(),
            base_url: None,
            resources: TILE_LAYERS.iter().map(|l| l.id.to_string()).collect(),
        }
    }

    fn catalog(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "list_tile_providers",
                "List all available tile layer providers with basic information",
                json!({"type": "object", "properties": {}, "required": []}),
            ),
            ToolSpec::new(
                "get_tile_provider_info",
                "Get detailed information about a specific tile provider including URL template and attribution",
                provider_id_schema(
                    "The ID of the tile provider (e.g., 'openstreetmap', 'carto_positron')",
                ),
            ),
            ToolSpec::new(
                "get_tile_attribution",
                "Get the attribution/credit string for a specific tile provider",
                provider_id_schema("The ID of the tile provider"),
            ),
        ]
    }

    async fn handle(&self, name: &str, arguments: &ToolArguments) -> ToolResult {
        match name {
            "list_tile_providers" => self.list(),
            "get_tile_provider_info" => match decode_arguments::<ProviderIdArgs>(name, arguments) {
                Ok(args) => self.provider_info(&args.provider_id),
                Err(invalid) => invalid,
            },
            "get_tile_attribution" => match decode_arguments::<ProviderIdArgs>(name, arguments) {
                Ok(args) => self.attribution(&args.provider_id),
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

    fn args(value: Value) -> ToolArguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_layer_ids_are_unique() {
        let mut ids: Vec<&str> = TILE_LAYERS.iter().map(|l| l.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), TILE_LAYERS.len());
        assert_eq!(TILE_LAYERS.len(), 6);
    }

    #[test]
    fn test_layers_have_sane_zoom_and_template() {
        for layer in TILE_LAYERS {
            assert!(layer.min_zoom <= layer.max_zoom, "{}", layer.id);
            assert!(layer.url_template.contains("{z}"), "{}", layer.id);
            assert!(!layer.attribution.is_empty(), "{}", layer.id);
        }
    }

    #[tokio::test]
    async fn test_list_providers() {
        let result = TilesProvider.handle("list_tile_providers", &ToolArguments::new()).await;
        assert_eq!(result.status(), ToolStatus::Success);
        let data = result.data().unwrap();
        assert_eq!(data["count"], 6);
        assert_eq!(data["providers"][0]["id"], "openstreetmap");
        assert_eq!(result.message(), Some("Found 6 tile providers"));
    }

    #[tokio::test]
    async fn test_provider_info_includes_id() {
        let result = TilesProvider
            .handle(
                "get_tile_provider_info",
                &args(json!({"provider_id": "usgs_topo"})),
            )
            .await;
        let data = result.data().unwrap();
        assert_eq!(data["id"], "usgs_topo");
        assert_eq!(data["max_zoom"], 16);
        assert_eq!(data["license"], "Public Domain");
    }

    #[tokio::test]
    async fn test_attribution() {
        let result = TilesProvider
            .handle(
                "get_tile_attribution",
                &args(json!({"provider_id": "openstreetmap"})),
            )
            .await;
        assert_eq!(
            result.data().unwrap()["attribution"],
            "&copy; OpenStreetMap contributors"
        );
    }

    #[tokio::test]
    async fn test_unknown_provider_is_not_found() {
        for tool in ["get_tile_provider_info", "get_tile_attribution"] {
            let result = TilesProvider
                .handle(tool, &args(json!({"provider_id": "nonexistent"})))
                .await;
            assert_eq!(result.error_code(), Some(ErrorCode::NotFound));
            assert_eq!(result.message(), Some("Provider 'nonexistent' not found"));
        }
    }

    #[test]
    fn test_info_lists_resources() {
        let info = TilesProvider.info();
        assert_eq!(info.name, "Tiles/Metadata Server");
        assert!(info.resources.contains(&"carto_voyager".to_string()));
        assert!(info.base_url.is_none());
    }
}
