use mongodb::{bson::doc, options::ClientOptions, Client, Database};
use tracing::info;

use crate::store::StoreError;

pub async fn init_db(mongo_uri: &str, db_name: &str) -> Result<Database, StoreError> {
    let mut client_options = ClientOptions::parse(mongo_uri)
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to parse MongoDB URI: {e}")))?;

    client_options.app_name = Some("PollingApp".to_string());

    let client = Client::with_options(client_options)
        .map_err(|e| StoreError::Unavailable(format!("Failed to initialize MongoDB client: {e}")))?;

    let database = client.database(db_name);
    database.run_command(doc! { "ping": 1 }).await?;

    info!(db_name, "Database connection successful");

    Ok(database)
}
