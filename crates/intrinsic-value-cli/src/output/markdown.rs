use std::fs;
use std::path::Path;
use tracing::info;

/// Write a rendered markdown report, creating parent directories as needed.
pub fn write_report(path: &str, markdown: &str) -> Result<(), Box<dyn std::error::Error>> {
    let target = Path::new(path);
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Cannot create report directory '{}': {}", parent.display(), e))?;
    }
    fs::write(target, markdown).map_err(|e| format!("Cannot write report '{}': {}", path, e))?;
    info!(path, bytes = markdown.len(), "wrote valuation report");
    Ok(())
}
