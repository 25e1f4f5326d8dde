use anyhow::Result;

use crate::cli::options::OutputFormat;
use crate::modules::interface::ResPlayBook;

/// Render result records in the requested format
pub fn render_results(results: &[ResPlayBook], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(results
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(results)?),
    }
}

/// Print result records to stdout
pub fn print_results(results: &[ResPlayBook], format: OutputFormat) -> Result<()> {
    let rendered = render_results(results, format)?;
    if !rendered.is_empty() {
        println!("{rendered}");
    }
    Ok(())
}
