use anyhow::Result;
use leadpool_core::config::LeadpoolConfig;
use leadpool_core::{LeadService, LeadpoolServer};

pub async fn run(config: LeadpoolConfig) -> Result<()> {
    let service = LeadService::from_config(&config).await?;
    LeadpoolServer::new(service, config.server).serve().await
}
