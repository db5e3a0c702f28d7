//! Warehouse and pile listing commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, PileAge, StackList, WarehouseList};
use crate::output::{print_info, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct WarehouseRow {
    #[tabled(rename = "Warehouse")]
    warehouse: i64,
}

#[derive(Tabled)]
struct PileRow {
    #[tabled(rename = "Pile")]
    pile_id: String,
}

/// List warehouses, or the piles of one warehouse
pub async fn list(client: &ApiClient, warehouse: Option<i64>, format: OutputFormat) -> Result<()> {
    match warehouse {
        None => {
            let list: WarehouseList = client.get("api/warehouses").await?;
            match format {
                OutputFormat::Json => print_json(&list)?,
                OutputFormat::Table => print_table(
                    list.warehouses
                        .into_iter()
                        .map(|warehouse| WarehouseRow { warehouse })
                        .collect(),
                    "No warehouses with temperature data",
                ),
            }
        }
        Some(warehouse) => {
            let list: StackList = client.get(&format!("api/stacks/{}", warehouse)).await?;
            match format {
                OutputFormat::Json => print_json(&list)?,
                OutputFormat::Table => print_table(
                    list.stacks
                        .into_iter()
                        .map(|pile_id| PileRow { pile_id })
                        .collect(),
                    &format!("No piles recorded for warehouse {}", warehouse),
                ),
            }
        }
    }

    Ok(())
}

/// Show how long ago a pile was formed
pub async fn show_age(
    client: &ApiClient,
    warehouse: i64,
    pile: &str,
    format: OutputFormat,
) -> Result<()> {
    let age: PileAge = client
        .get_with_query(
            "api/pile-age",
            &[("warehouse", warehouse.to_string()), ("pileId", pile.to_string())],
        )
        .await?;

    match format {
        OutputFormat::Json => print_json(&age)?,
        OutputFormat::Table => print_info(&format!(
            "Pile {} in warehouse {} is {} days old",
            pile, warehouse, age.pile_age_days
        )),
    }

    Ok(())
}
