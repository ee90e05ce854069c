use anyhow::Result;
use console::style;

use super::Report;

const TRUNCATED_NOTE: &str = "Note: the transcript was cut to fit the model's context window.";

/// Human readable report: generated text or transcript, then the saved paths
pub fn format_as_text(report: &Report) -> String {
    let mut sections = Vec::new();

    if let Some(generated) = &report.generated {
        let heading = if report.paths.outline.is_some() { "Outline:" } else { "Summary:" };
        sections.push(format!("{}\n{}", style(heading).bold(), generated));
        if report.truncated {
            sections.push(style(TRUNCATED_NOTE).dim().to_string());
        }
    } else if let Some(transcript) = &report.transcript {
        sections.push(format!("{}\n{}", style("Transcript:").bold(), transcript));
    }

    sections.push(format_paths(report));
    sections.join("\n\n")
}

/// One `<Name> saved to: <path>` line per written file
pub fn format_paths(report: &Report) -> String {
    report
        .paths
        .iter()
        .map(|(name, path)| format!("{} saved to: {}", capitalize(name), path.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Machine readable report
pub fn format_as_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
