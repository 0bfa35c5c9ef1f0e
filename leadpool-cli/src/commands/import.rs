use anyhow::{Context, Result};
use leadpool_core::classification::Role;
use leadpool_core::config::LeadpoolConfig;
use leadpool_core::model::{AgentIdentity, NewLead};
use leadpool_core::{Error, LeadService};
use std::path::Path;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub created: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

pub async fn run(config: &LeadpoolConfig, file: &Path, creator: &str) -> Result<()> {
    if config.storage.journal_path.is_none() {
        log::warn!("No journal configured; imported leads vanish when this command exits");
    }
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let requests: Vec<NewLead> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of leads", file.display()))?;

    let service = LeadService::from_config(config).await?;
    let report = import_leads(&service, requests, creator).await?;
    println!(
        "Imported {} leads ({} duplicates, {} invalid)",
        report.created, report.duplicates, report.invalid
    );
    Ok(())
}

/// Create each lead in file order; rejected rows are counted and skipped
pub async fn import_leads(
    service: &LeadService,
    requests: Vec<NewLead>,
    creator: &str,
) -> Result<ImportReport> {
    let actor = AgentIdentity::new(creator, creator, Role::LeadGeneration);
    let mut report = ImportReport::default();

    for (row, request) in requests.into_iter().enumerate() {
        match service.create_lead(&actor, request).await {
            Ok(_) => report.created += 1,
            Err(Error::Duplicate(msg)) => {
                log::warn!("Row {}: {}", row + 1, msg);
                report.duplicates += 1;
            }
            Err(e @ Error::Validation { .. }) => {
                log::warn!("Row {}: {}", row + 1, e);
                report.invalid += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("Import stopped at row {}", row + 1)),
        }
    }
    Ok(report)
}
