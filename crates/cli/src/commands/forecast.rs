//! Dashboard forecast command

use anyhow::{bail, Result};
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ForecastSummary};
use crate::output::{color_count, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Incidents")]
    count: String,
}

#[derive(Tabled)]
struct IncidentRow {
    #[tabled(rename = "Warehouse")]
    warehouse: i64,
    #[tabled(rename = "Pile")]
    pile_id: String,
    #[tabled(rename = "Ignition")]
    predicted_ignition_date: String,
    #[tabled(rename = "Details")]
    message: String,
}

/// Forecast incidents over an explicit window, or the days after the latest data
pub async fn show_forecast(
    client: &ApiClient,
    days: Option<u32>,
    start: Option<String>,
    end: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let summary: ForecastSummary = match (start, end) {
        (Some(start), Some(end)) => {
            client
                .get_with_query(
                    "api/dashboard-summary-test",
                    &[("start_date", start), ("end_date", end)],
                )
                .await?
        }
        (None, None) => match days {
            Some(days) => {
                client
                    .get_with_query("api/dashboard-summary", &[("forecast_days", days)])
                    .await?
            }
            None => client.get("api/dashboard-summary").await?,
        },
        _ => bail!("--start and --end must be given together"),
    };

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => render(&summary),
    }

    Ok(())
}

fn render(summary: &ForecastSummary) {
    println!("{} {}", "Forecast period:".bold(), summary.period.cyan());
    println!();

    let days = summary
        .summary_by_day
        .iter()
        .map(|d| DayRow {
            date: d.date.clone(),
            count: color_count(d.count),
        })
        .collect();
    print_table(days, "No days in forecast window");

    println!();
    println!("{}", "High-risk piles".bold());
    let incidents = summary
        .high_risk_incidents
        .iter()
        .map(|i| IncidentRow {
            warehouse: i.warehouse,
            pile_id: i.pile_id.clone(),
            predicted_ignition_date: i.predicted_ignition_date.clone(),
            message: i.message.clone(),
        })
        .collect();
    print_table(incidents, "No ignitions predicted in this window");
}
