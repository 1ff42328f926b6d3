//! Formatting for terminal output.
//!
//! The `format_*` functions build plain strings and are what the tests look
//! at; the `display_*` functions style and print them.

use console::style;

use crate::boundary::ReleaseWarning;
use crate::cli::Summary;
use crate::planner::FlowPlan;
use crate::publish::PublishReport;

/// Print an error message in red to stderr.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Print a success message with a green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Print a status message with a yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

pub fn display_warning(warning: &ReleaseWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// One line naming the release about to happen
pub fn format_release_banner(plan: &FlowPlan) -> String {
    format!(
        "{} release from '{}': {} -> {}",
        plan.version.effective_level,
        plan.target_branch,
        plan.version.latest_tag,
        plan.version.next_tag_name
    )
}

/// Numbered list of plan steps, one per line
pub fn format_plan(plan: &FlowPlan) -> Vec<String> {
    let width = plan.steps.len().to_string().len();
    plan.steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{:>width$}. {}", i + 1, step, width = width))
        .collect()
}

/// Display the planned steps of a release.
pub fn display_plan(plan: &FlowPlan) {
    println!("\n{}", style(format_release_banner(plan)).bold());
    for line in format_plan(plan) {
        println!("  {}", line);
    }
}

pub fn format_summary(summary: &Summary) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("Branch:   {} ({})", summary.target_branch, summary.class));
    lines.push(format!(
        "Version:  {} -> {}",
        summary.previous_tag, summary.next_tag
    ));
    if let Some(branch) = &summary.release_branch {
        lines.push(format!("Release branch: {}", branch));
    }
    if summary.dry_run {
        lines.push("Dry run: nothing was changed".to_string());
        return lines;
    }
    lines.push(format!("Steps:    {}", summary.steps_executed));
    if !summary.pushed_branches.is_empty() {
        lines.push(format!("Pushed branches: {}", summary.pushed_branches.join(", ")));
    }
    if !summary.pushed_tags.is_empty() {
        lines.push(format!("Pushed tags: {}", summary.pushed_tags.join(", ")));
    }
    lines
}

/// Display the end-of-run summary, warnings first.
pub fn display_summary(summary: &Summary) {
    for warning in &summary.warnings {
        display_warning(warning);
    }
    println!("\n{}", style("Release summary:").bold().underlined());
    for line in format_summary(summary) {
        println!("  {}", line);
    }
    if !summary.dry_run {
        display_success(&format!("Released {}", style(&summary.next_tag).green()));
    }
}

pub fn display_publish_report(report: &PublishReport) {
    display_success(&format!(
        "Published v{} ({}) to item {}",
        report.version,
        report.archive.display(),
        style(&report.extension_id).cyan()
    ));
}
