use anyhow::Result;
use leadpool_core::config::LeadpoolConfig;

pub fn run(config: &LeadpoolConfig) -> Result<()> {
    config.validate()?;
    println!("{}", serde_json::to_string_pretty(config)?);
    println!("Configuration OK");
    Ok(())
}
