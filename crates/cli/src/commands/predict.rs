//! Single-pile prediction and model management commands

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use std::path::Path;

use crate::client::{ApiClient, PredictionResult, ReloadResponse};
use crate::output::{color_risk, format_days, print_json, print_success, OutputFormat};

/// Load a prediction request body from a JSON file, applying `--date`
pub fn load_request(input: &Path, date: Option<String>) -> Result<Value> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let mut body: Value = serde_json::from_str(&content).context("Input is not valid JSON")?;

    let fields = body
        .as_object_mut()
        .context("Input must be a JSON object of feature fields")?;
    if let Some(date) = date {
        fields.insert("current_date".to_string(), Value::String(date));
    }

    Ok(body)
}

/// Predict days to ignition for one pile
pub async fn predict(
    client: &ApiClient,
    input: &Path,
    date: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let body = load_request(input, date)?;
    let result: PredictionResult = client.post("api/predict", &body).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Ignition Prediction".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Days to ignition:   {}",
                format_days(result.predicted_days_to_fire)
            );
            println!(
                "Ignition date:      {}",
                result.predicted_ignition_date.as_deref().unwrap_or("-")
            );
            println!("Risk level:         {}", color_risk(&result.risk_level));
            println!();
            println!("{}", result.message);
        }
    }

    Ok(())
}

/// Ask the service to reload its model from disk
pub async fn reload_model(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response: ReloadResponse = client.post_empty("api/model/reload").await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_success(&format!(
            "Model {} loaded (sha256 {})",
            response.version, response.checksum
        )),
    }

    Ok(())
}
