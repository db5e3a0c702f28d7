//! CSV upload command

use anyhow::Result;
use std::path::Path;

use crate::client::ApiClient;
use crate::output::{print_info, print_json, print_success, OutputFormat};

/// Upload one CSV file; the server infers the kind from the name unless given
pub async fn upload_file(
    client: &ApiClient,
    file: &Path,
    kind: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let response = client.upload_csv(file, kind.as_deref()).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Uploaded {} as {} data",
                response.filename, response.kind
            ));
            print_info(&format!("{} rows stored", response.inserted_rows));
        }
    }

    Ok(())
}
