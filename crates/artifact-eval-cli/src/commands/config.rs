//! Default configuration dump.

use anyhow::Result;
use artifact_eval::AnalysisConfig;

pub fn run() -> Result<()> {
    println!("{}", AnalysisConfig::default().to_json_string()?);
    Ok(())
}
