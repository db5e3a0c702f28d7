//! Weather and pile history commands

use anyhow::{bail, Result};
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, DailyWeather, PileHistory};
use crate::output::{format_optional, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct WeatherRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Temp °C")]
    avg_temp: String,
    #[tabled(rename = "Humidity %")]
    avg_humidity: i64,
    #[tabled(rename = "Precip mm")]
    total_precip: String,
    #[tabled(rename = "Wind m/s")]
    avg_wind_speed: String,
}

impl From<&DailyWeather> for WeatherRow {
    fn from(day: &DailyWeather) -> Self {
        Self {
            date: day.date.clone(),
            avg_temp: format_optional(Some(day.avg_temp)),
            avg_humidity: day.avg_humidity,
            total_precip: format_optional(Some(day.total_precip)),
            avg_wind_speed: format_optional(day.avg_wind_speed),
        }
    }
}

#[derive(Tabled)]
struct TemperatureRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Max °C")]
    temp: String,
    #[tabled(rename = "Shift")]
    shift: i64,
}

/// Show daily weather, or one pile's timeline when a pile is given
pub async fn show_weather(
    client: &ApiClient,
    start: String,
    end: String,
    warehouse: Option<i64>,
    pile: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    match (warehouse, pile) {
        (None, None) => {
            let days: Vec<DailyWeather> = client
                .get_with_query("api/weather", &[("start", start), ("end", end)])
                .await?;
            match format {
                OutputFormat::Json => print_json(&days)?,
                OutputFormat::Table => print_table(
                    days.iter().map(WeatherRow::from).collect(),
                    "No weather observations in range",
                ),
            }
        }
        (Some(warehouse), Some(pile)) => {
            let history: PileHistory = client
                .get_with_query(
                    "api/pile-weather",
                    &[
                        ("warehouse", warehouse.to_string()),
                        ("pileId", pile.clone()),
                        ("start", start),
                        ("end", end),
                    ],
                )
                .await?;
            match format {
                OutputFormat::Json => print_json(&history)?,
                OutputFormat::Table => render_history(warehouse, &pile, &history),
            }
        }
        _ => bail!("--warehouse and --pile must be given together"),
    }

    Ok(())
}

fn render_history(warehouse: i64, pile: &str, history: &PileHistory) {
    println!(
        "{} {}",
        "Pile".bold(),
        format!("{}/{}", warehouse, pile).cyan()
    );
    print_table(
        history
            .temperatures
            .iter()
            .map(|t| TemperatureRow {
                date: t.date.clone(),
                temp: format_optional(Some(t.temp)),
                shift: t.shift,
            })
            .collect(),
        "No temperature readings in range",
    );

    println!();
    println!("{}", "Weather".bold());
    print_table(
        history.weather.iter().map(WeatherRow::from).collect(),
        "No weather observations in range",
    );

    if !history.fires.is_empty() {
        println!();
        let dates: Vec<&str> = history.fires.iter().map(|f| f.date.as_str()).collect();
        println!("{} {}", "Recorded fires:".red().bold(), dates.join(", "));
    }
}
