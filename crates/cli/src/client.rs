//! API client for the ignition forecast service

use anyhow::{Context, Result};
use reqwest::{multipart, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// API client for the ignition forecast service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            // Forecasts over many piles can take a while
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let response = request.send().await.context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, detail);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        Self::send(self.client.get(self.url(path)?)).await
    }

    /// Make a GET request with query parameters
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T> {
        Self::send(self.client.get(self.url(path)?).query(query)).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        Self::send(self.client.post(self.url(path)?).json(body)).await
    }

    /// Make a POST request without a body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        Self::send(self.client.post(self.url(path)?)).await
    }

    /// Upload a CSV file as the multipart field `file`
    pub async fn upload_csv(&self, file: &Path, kind: Option<&str>) -> Result<UploadResponse> {
        let filename = file
            .file_name()
            .and_then(|n| n.to_str())
            .context("Upload path has no file name")?
            .to_string();

        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;

        let part = multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str("text/csv")?;
        let form = multipart::Form::new().part("file", part);

        let mut request = self.client.post(self.url("api/upload-csv")?).multipart(form);
        if let Some(kind) = kind {
            request = request.query(&[("kind", kind)]);
        }
        Self::send(request).await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub kind: String,
    pub inserted_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_ignition_date: Option<String>,
    pub predicted_days_to_fire: f64,
    pub risk_level: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub date: String,
    pub warehouse: i64,
    pub pile_id: String,
    pub predicted_ignition_date: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub period: String,
    pub summary_by_day: Vec<DailyCount>,
    pub high_risk_incidents: Vec<Incident>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyWeather {
    pub date: String,
    pub avg_temp: f64,
    pub avg_humidity: i64,
    pub total_precip: f64,
    pub avg_wind_speed: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperaturePoint {
    pub date: String,
    pub temp: f64,
    pub shift: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirePoint {
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PileHistory {
    pub temperatures: Vec<TemperaturePoint>,
    pub weather: Vec<DailyWeather>,
    pub fires: Vec<FirePoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseList {
    pub warehouses: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackList {
    pub stacks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PileAge {
    pub pile_age_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub version: String,
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::io::Write;

    #[tokio::test]
    async fn test_get_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/warehouses")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"warehouses": [3, 4]}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let list: WarehouseList = client.get("api/warehouses").await.unwrap();

        mock.assert_async().await;
        assert_eq!(list.warehouses, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_query_parameters_are_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/dashboard-summary-test")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("start_date".into(), "2025-11-21".into()),
                Matcher::UrlEncoded("end_date".into(), "2025-11-25".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"period": "2025-11-21 — 2025-11-25",
                    "summary_by_day": [{"date": "2025-11-22", "count": 1}],
                    "high_risk_incidents": []}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let summary: ForecastSummary = client
            .get_with_query(
                "api/dashboard-summary-test",
                &[("start_date", "2025-11-21"), ("end_date", "2025-11-25")],
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(summary.summary_by_day[0].count, 1);
    }

    #[tokio::test]
    async fn test_api_error_surfaces_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/predict")
            .with_status(503)
            .with_body(r#"{"error": "no model loaded", "code": "SERVICE_UNAVAILABLE"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .post::<PredictionResult, _>("api/predict", &serde_json::json!({}))
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("503"));
        assert!(message.contains("no model loaded"));
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/upload-csv")
            .match_query(Matcher::UrlEncoded("kind".into(), "weather".into()))
            .match_body(Matcher::Regex(r#"filename="station\.csv""#.into()))
            .with_status(200)
            .with_body(r#"{"filename": "station.csv", "kind": "weather", "inserted_rows": 2}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("station.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "2025-11-20 09:00:00,3.0,1012.0,80,0.5,180,4.0,6.0,75,10000,3").unwrap();

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client.upload_csv(&path, Some("weather")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.inserted_rows, 2);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
