//! Earth Engine REST adapter for the remote asset service port

pub mod expr;

use std::collections::BTreeMap;
use std::future::Future;

use chrono::Utc;
use reclass_core::config::{LayeredConfig, TOKEN_ENV};
use reclass_core::error::{ReclassError, Result};
use reclass_core::models::TaskHandle;
use reclass_core::ports::{AssetService, AssetType, ImageExportRequest, TableExportRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use expr::{argument, array, constant, invoke, load_image, load_table, Expression};

/// Errors raised while talking to Earth Engine
#[derive(Debug, Error)]
pub enum EarthEngineError {
    #[error("No access token: set {0}")]
    MissingToken(&'static str),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Earth Engine API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Failed to create async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl From<EarthEngineError> for ReclassError {
    fn from(err: EarthEngineError) -> Self {
        match err {
            EarthEngineError::MissingToken(var) => ReclassError::ConfigMissing { key: var.to_string() },
            other => ReclassError::Remote {
                message: other.to_string(),
            },
        }
    }
}

/// Asset metadata as returned by `GET .../assets/{id}`
#[derive(Debug, Deserialize)]
struct AssetInfo {
    #[serde(rename = "type")]
    asset_type: String,
    #[serde(default)]
    bands: Vec<BandInfo>,
}

#[derive(Debug, Deserialize)]
struct BandInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FeaturePage {
    #[serde(default)]
    features: Vec<FeatureInfo>,
}

#[derive(Debug, Deserialize)]
struct FeatureInfo {
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ComputeResponse {
    result: Value,
}

/// Long running operation returned by export calls
#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
}

/// Error body of a failed API call
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Earth Engine client backed by the v1 REST API
pub struct EarthEngineClient {
    /// API root (e.g., "https://earthengine.googleapis.com/v1")
    endpoint: String,

    /// Cloud project the calls are billed to
    project: String,

    /// OAuth2 bearer token
    token: String,

    /// Scale used when computing histograms, in meters
    histogram_scale: f64,

    /// HTTP client
    client: reqwest::Client,

    /// Runtime driving the async HTTP calls from the blocking port methods
    runtime: tokio::runtime::Runtime,
}

impl EarthEngineClient {
    /// Create a new client
    pub fn new(
        endpoint: impl Into<String>,
        project: impl Into<String>,
        token: impl Into<String>,
    ) -> std::result::Result<Self, EarthEngineError> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project: project.into(),
            token: token.into(),
            histogram_scale: reclass_core::config::DEFAULT_EXPORT_SCALE,
            client: reqwest::Client::new(),
            runtime,
        })
    }

    /// Create a client from the layered configuration, reading the token
    /// from the environment
    pub fn from_config(config: &LayeredConfig) -> std::result::Result<Self, EarthEngineError> {
        let token = std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(EarthEngineError::MissingToken(TOKEN_ENV))?;

        let mut client = Self::new(&config.ee_endpoint.value, &config.ee_project.value, token)?;
        client.histogram_scale = config.export_scale.value;
        Ok(client)
    }

    /// Full asset name; legacy ids ("users/...") live under the legacy project
    pub fn asset_name(asset_id: &str) -> String {
        if asset_id.starts_with("projects/") {
            asset_id.to_string()
        } else {
            format!("projects/earthengine-legacy/assets/{}", asset_id)
        }
    }

    fn project_url(&self, method: &str) -> String {
        format!("{}/projects/{}/{}", self.endpoint, self.project, method)
    }

    fn run<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> std::result::Result<T, EarthEngineError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(EarthEngineError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    fn get<T: serde::de::DeserializeOwned>(&self, url: String) -> std::result::Result<T, EarthEngineError> {
        tracing::debug!(%url, "GET");
        self.run(async {
            let response = self.client.get(&url).bearer_auth(&self.token).send().await?;
            Self::read_json(response).await
        })
    }

    fn post<T: serde::de::DeserializeOwned>(&self, url: String, body: Value) -> std::result::Result<T, EarthEngineError> {
        tracing::debug!(%url, "POST");
        self.run(async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.token)
                .json(&body)
                .send()
                .await?;
            Self::read_json(response).await
        })
    }

    fn asset_info(&self, asset_id: &str) -> std::result::Result<AssetInfo, EarthEngineError> {
        self.get(format!("{}/{}", self.endpoint, Self::asset_name(asset_id)))
    }

    fn compute(&self, expression: Value) -> std::result::Result<Value, EarthEngineError> {
        let response: ComputeResponse = self.post(self.project_url("value:compute"), json!({ "expression": expression }))?;
        Ok(response.result)
    }

    fn submit(&self, method: &str, body: Value, description: &str) -> std::result::Result<TaskHandle, EarthEngineError> {
        let operation: Operation = self.post(self.project_url(method), body)?;
        let id = operation
            .name
            .rsplit('/')
            .next()
            .unwrap_or(operation.name.as_str())
            .to_string();
        Ok(TaskHandle {
            id,
            description: description.to_string(),
            submitted_at: Utc::now(),
        })
    }
}

/// Band remapped to destination codes under its original name, legend
/// properties set
pub fn remap_image_expression(request: &ImageExportRequest) -> Value {
    let image = load_image(&request.source_asset);
    let remap = invoke(
        "Image.remap",
        vec![
            ("image", image.clone()),
            ("from", constant(request.from.clone())),
            ("to", constant(request.to.clone())),
            ("defaultValue", constant(request.default_value)),
            ("bandName", constant(request.band.as_str())),
        ],
    );
    // Image.remap names its output band "remapped"
    let remapped = invoke(
        "Image.select",
        vec![
            ("input", remap),
            ("bandSelectors", constant(vec!["remapped"])),
            ("newNames", constant(vec![request.band.as_str()])),
        ],
    );
    let reprojected = invoke(
        "Image.reproject",
        vec![
            ("image", remapped),
            ("crs", invoke("Image.projection", vec![("image", image)])),
            ("scale", constant(request.scale)),
        ],
    );
    let properties: serde_json::Map<String, Value> = request
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    let with_legend = invoke(
        "Element.setMulti",
        vec![("object", reprojected), ("properties", constant(Value::Object(properties)))],
    );
    Expression::new().finish(with_legend)
}

/// Every feature gets `output_property` looked up from its `property` value.
/// The lookup compares stored values, so `mapping` must hold them unchanged.
pub fn remap_table_expression(request: &TableExportRequest) -> Value {
    let from: Vec<Value> = request.mapping.iter().map(|(src, _)| src.clone()).collect();
    let to: Vec<Value> = request.mapping.iter().map(|(_, dst)| Value::from(*dst)).collect();

    let mut expression = Expression::new();
    let value = invoke(
        "Element.get",
        vec![("object", argument("feature")), ("property", constant(request.property.as_str()))],
    );
    let index = invoke("List.indexOf", vec![("list", constant(from)), ("element", value)]);
    let code = invoke("List.get", vec![("list", constant(to)), ("index", index)]);
    let body = invoke(
        "Element.set",
        vec![
            ("object", argument("feature")),
            ("key", constant(request.output_property.as_str())),
            ("value", code),
        ],
    );
    let function = expression.function(&["feature"], body);
    let mapped = invoke(
        "Collection.map",
        vec![("collection", load_table(&request.source_asset)), ("baseAlgorithm", function)],
    );
    expression.finish(mapped)
}

/// `[distinct values, count of features without a value]`. The array
/// aggregate skips features where the property is null or missing, so
/// those are counted separately.
pub fn distinct_values_expression(asset_id: &str, property: &str) -> Value {
    let table = load_table(asset_id);
    let values = invoke(
        "AggregateFeatureCollection.array",
        vec![("collection", table.clone()), ("property", constant(property))],
    );
    let distinct = invoke("List.distinct", vec![("list", values)]);

    let has_value = invoke("Filter.notNull", vec![("properties", constant(vec![property]))]);
    let without_value = invoke(
        "Collection.filter",
        vec![
            ("collection", table),
            ("filter", invoke("Filter.not", vec![("filter", has_value)])),
        ],
    );
    let missing = invoke("Collection.size", vec![("collection", without_value)]);

    Expression::new().finish(array(vec![distinct, missing]))
}

fn distinct_values(result: Value) -> std::result::Result<Vec<Value>, EarthEngineError> {
    let unexpected = |other: &Value| EarthEngineError::UnexpectedResponse(format!("expected [list, count], got {}", other));
    let Value::Array(parts) = &result else {
        return Err(unexpected(&result));
    };
    match parts.as_slice() {
        [Value::Array(values), missing] => {
            let mut values = values.clone();
            let missing = missing.as_u64().ok_or_else(|| unexpected(&result))?;
            if missing > 0 && !values.iter().any(Value::is_null) {
                values.push(Value::Null);
            }
            Ok(values)
        }
        _ => Err(unexpected(&result)),
    }
}

impl AssetService for EarthEngineClient {
    fn asset_type(&self, asset_id: &str) -> Result<AssetType> {
        Ok(AssetType::parse(&self.asset_info(asset_id)?.asset_type))
    }

    fn band_names(&self, asset_id: &str) -> Result<Vec<String>> {
        Ok(self.asset_info(asset_id)?.bands.into_iter().map(|b| b.id).collect())
    }

    fn first_feature_properties(&self, asset_id: &str) -> Result<Vec<String>> {
        let page: FeaturePage = self.get(format!(
            "{}/{}:listFeatures?pageSize=1",
            self.endpoint,
            Self::asset_name(asset_id)
        ))?;
        Ok(page
            .features
            .into_iter()
            .next()
            .map(|f| f.properties.into_iter().map(|(k, _)| k).collect())
            .unwrap_or_default())
    }

    fn frequency_histogram(&self, asset_id: &str, band: &str) -> Result<BTreeMap<String, f64>> {
        let image = invoke(
            "Image.select",
            vec![("input", load_image(asset_id)), ("bandSelectors", constant(vec![band]))],
        );
        let reduced = invoke(
            "Image.reduceRegion",
            vec![
                ("image", image.clone()),
                ("reducer", invoke("Reducer.frequencyHistogram", vec![])),
                ("geometry", invoke("Image.geometry", vec![("feature", image)])),
                ("scale", constant(self.histogram_scale)),
                ("maxPixels", constant(reclass_core::config::DEFAULT_MAX_PIXELS)),
                ("bestEffort", constant(true)),
            ],
        );
        let result = self.compute(Expression::new().finish(reduced))?;

        let histogram = result
            .get(band)
            .and_then(Value::as_object)
            .ok_or_else(|| EarthEngineError::UnexpectedResponse(format!("no histogram for band {}", band)))?;
        Ok(histogram
            .iter()
            .map(|(value, count)| (value.clone(), count.as_f64().unwrap_or(0.0)))
            .collect())
    }

    fn aggregate_array(&self, asset_id: &str, property: &str) -> Result<Vec<Value>> {
        let result = self.compute(distinct_values_expression(asset_id, property))?;
        Ok(distinct_values(result)?)
    }

    fn export_image(&self, request: &ImageExportRequest) -> Result<TaskHandle> {
        let body = json!({
            "expression": remap_image_expression(request),
            "description": request.description,
            "maxPixels": format!("{:.0}", request.max_pixels),
            "assetExportOptions": {
                "earthEngineDestination": { "name": Self::asset_name(&request.asset_id) },
                "pyramidingPolicy": request.pyramiding_policy.to_uppercase(),
            },
        });
        let task = self.submit("image:export", body, &request.description)?;
        tracing::info!(task = %task.id, asset = %request.asset_id, "Earth Engine image export queued");
        Ok(task)
    }

    fn export_table(&self, request: &TableExportRequest) -> Result<TaskHandle> {
        let body = json!({
            "expression": remap_table_expression(request),
            "description": request.description,
            "assetExportOptions": {
                "earthEngineDestination": { "name": Self::asset_name(&request.asset_id) },
            },
        });
        let task = self.submit("table:export", body, &request.description)?;
        tracing::info!(task = %task.id, asset = %request.asset_id, "Earth Engine table export queued");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_request() -> ImageExportRequest {
        let mut properties = BTreeMap::new();
        properties.insert("visualization_0_type".to_string(), "categorical".to_string());
        ImageExportRequest {
            source_asset: "users/me/lc".to_string(),
            band: "b1".to_string(),
            from: vec![1, 2],
            to: vec![10, 20],
            default_value: 0,
            asset_id: "users/me/lc_reclass".to_string(),
            description: "lc_reclass".to_string(),
            scale: 30.0,
            max_pixels: 1e13,
            pyramiding_policy: "mode".to_string(),
            properties,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = EarthEngineClient::new("https://example.test/v1/", "my-project", "token").unwrap();
        assert_eq!(client.endpoint, "https://example.test/v1");
        assert_eq!(
            client.project_url("value:compute"),
            "https://example.test/v1/projects/my-project/value:compute"
        );
    }

    #[test]
    fn test_asset_name() {
        assert_eq!(
            EarthEngineClient::asset_name("users/me/lc"),
            "projects/earthengine-legacy/assets/users/me/lc"
        );
        assert_eq!(
            EarthEngineClient::asset_name("projects/p/assets/lc"),
            "projects/p/assets/lc"
        );
    }

    #[test]
    fn test_remap_image_expression() {
        let graph = remap_image_expression(&image_request());
        let root = &graph["values"]["0"]["functionInvocationValue"];
        assert_eq!(root["functionName"], "Element.setMulti");
        assert_eq!(
            root["arguments"]["properties"]["constantValue"]["visualization_0_type"],
            "categorical"
        );

        let rename = &root["arguments"]["object"]["functionInvocationValue"]["arguments"]["image"]
            ["functionInvocationValue"];
        assert_eq!(rename["functionName"], "Image.select");
        assert_eq!(rename["arguments"]["bandSelectors"]["constantValue"], json!(["remapped"]));
        assert_eq!(rename["arguments"]["newNames"]["constantValue"], json!(["b1"]));

        let remap = &rename["arguments"]["input"]["functionInvocationValue"];
        assert_eq!(remap["functionName"], "Image.remap");
        assert_eq!(remap["arguments"]["from"]["constantValue"], json!([1, 2]));
        assert_eq!(remap["arguments"]["to"]["constantValue"], json!([10, 20]));
        assert_eq!(remap["arguments"]["defaultValue"]["constantValue"], 0);
    }

    #[test]
    fn test_remap_table_expression() {
        let request = TableExportRequest {
            source_asset: "users/me/parcels".to_string(),
            property: "landuse".to_string(),
            output_property: "reclass".to_string(),
            mapping: vec![(json!("a"), 1), (json!(7), 2), (json!("1"), 3)],
            asset_id: "users/me/parcels_reclass".to_string(),
            description: "parcels_reclass".to_string(),
        };

        let graph = remap_table_expression(&request);
        assert_eq!(graph["result"], "1");
        let body = &graph["values"]["0"]["functionInvocationValue"];
        assert_eq!(body["functionName"], "Element.set");
        assert_eq!(body["arguments"]["key"]["constantValue"], "reclass");
        let index = &body["arguments"]["value"]["functionInvocationValue"]["arguments"]["index"]
            ["functionInvocationValue"];
        assert_eq!(index["arguments"]["list"]["constantValue"], json!(["a", 7, "1"]));
        let code = &body["arguments"]["value"]["functionInvocationValue"];
        assert_eq!(code["arguments"]["list"]["constantValue"], json!([1, 2, 3]));
    }

    #[test]
    fn test_distinct_values_expression() {
        let graph = distinct_values_expression("users/me/parcels", "landuse");
        let parts = &graph["values"]["0"]["arrayValue"]["values"];
        assert_eq!(parts[0]["functionInvocationValue"]["functionName"], "List.distinct");
        assert_eq!(parts[1]["functionInvocationValue"]["functionName"], "Collection.size");
    }

    #[test]
    fn test_distinct_values_adds_null_for_missing() {
        assert_eq!(distinct_values(json!([["a", "b"], 2])).unwrap(), vec![json!("a"), json!("b"), json!(null)]);
        assert_eq!(distinct_values(json!([["a"], 0])).unwrap(), vec![json!("a")]);
        assert!(distinct_values(json!(["a"])).is_err());
    }

    #[test]
    fn test_error_mapping() {
        let err: ReclassError = EarthEngineError::MissingToken(TOKEN_ENV).into();
        assert!(matches!(err, ReclassError::ConfigMissing { .. }));

        let err: ReclassError = EarthEngineError::Api {
            status: 404,
            message: "Asset not found".to_string(),
        }
        .into();
        assert!(err.to_string().contains("Asset not found"));
    }
}
