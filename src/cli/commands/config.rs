use crate::cli::utils::output_value;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub fn show(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let value = serde_json::to_value(config.redacted())?;
    output_value(&output_format, &value)
}
