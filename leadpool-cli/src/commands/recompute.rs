use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use leadpool_core::config::LeadpoolConfig;
use leadpool_core::model::TimeWindow;
use leadpool_core::LeadService;

/// Both bounds or neither; clap enforces the pairing
pub fn parse_window(start: Option<&str>, end: Option<&str>) -> Result<Option<TimeWindow>> {
    let parse = |raw: &str| -> Result<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("'{}' is not an RFC 3339 timestamp", raw))?
            .with_timezone(&Utc))
    };
    match (start, end) {
        (Some(start), Some(end)) => Ok(Some(TimeWindow::new(parse(start)?, parse(end)?)?)),
        _ => Ok(None),
    }
}

pub async fn run(config: &LeadpoolConfig, window: Option<TimeWindow>) -> Result<()> {
    let service = LeadService::from_config(config).await?;
    let (snapshot, agents, telemarketers) = tokio::try_join!(
        service.recompute_inventory(window),
        service.recompute_agent_performance(),
        service.recompute_telemarketer_performance(),
    )?;

    log::info!(
        "Recomputed {} agent and {} telemarketer records",
        agents.len(),
        telemarketers.len()
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
