use anyhow::Result;
use tracing::info;

use crate::source::{SourceProject, XmgrClient};

/// Print the PAU ids a document references, one per line.
pub async fn pau_ids(client: &XmgrClient, document_id: &str) -> Result<()> {
    let ids = client.get_pau_ids_from_document(document_id).await?;
    if ids.is_empty() {
        info!(document_id, "Document references no PAUs");
    }
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

/// Print the first hit for a PAU id as JSON.
pub async fn pau(client: &XmgrClient, pau_id: &str) -> Result<()> {
    match client.get_pau(pau_id).await? {
        Some(pau) => println!("{}", serde_json::to_string_pretty(&pau)?),
        None => info!(pau_id, "No PAU found"),
    }
    Ok(())
}
