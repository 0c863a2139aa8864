use crate::config::DatabaseConfig;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};

// The client pools connections internally; one handle is shared by all workers.
pub async fn connect(config: &DatabaseConfig) -> Result<Database, mongodb::error::Error> {
    let mut options = ClientOptions::parse(&config.url).await?;
    options.app_name = Some("streamme".to_string());
    let client = Client::with_options(options)?;
    Ok(client.database(&config.name))
}
