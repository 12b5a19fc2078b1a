//! Output formatting for CLI commands.
//!
//! Every command renders through here in one of two modes: human-readable
//! text or JSON for programmatic use.
//!
//! Submodules:
//! - [`color`]: semantic colors, status icons, severity tags
//! - [`tree`]: workstream tree rendering with ASCII/Unicode connectors

pub mod color;
pub mod tree;

use std::env;
use std::io::{self, IsTerminal, Write};

use serde::Serialize;
use serde_json::json;

use crate::domain::{
    AggregateReport, CriticalPath, EffectiveAccess, ImpactReport, ItemId, PrincipalId, WorkItem,
    Workstream,
};

pub use color::{error, info, success, warning};
pub use tree::{print_stream_tree, StreamTreeNode};

use color::{bold, colored_status_icon, colorize_id, colorize_status, dimmed, risk_label, severity_tag};

// ============================================================================
// Output Configuration
// ============================================================================

const DEFAULT_TERMINAL_WIDTH: usize = 80;
const DEFAULT_MAX_CONTENT_WIDTH: usize = 80;

/// Output format mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format.
    Text,
    /// JSON format for programmatic use.
    Json,
}

/// Settings that control text rendering: width, icon set, colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Maximum content width for text wrapping.
    pub max_width: usize,
    /// Whether to use ASCII-only icons instead of Unicode.
    pub use_ascii: bool,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create an OutputConfig with explicit values.
    pub fn new(max_width: usize, use_ascii: bool, use_colors: bool) -> Self {
        Self {
            max_width,
            use_ascii,
            use_colors,
        }
    }

    /// Create an OutputConfig from the environment.
    ///
    /// Reads:
    /// - `TRELLIS_MAX_WIDTH`: maximum content width (default: 80)
    /// - `TRELLIS_ASCII`: "1"/"true" for ASCII-only icons (default: unicode)
    /// - `NO_COLOR`: standard env var, any value disables colors
    /// - `TRELLIS_COLOR`: "0"/"false" to disable colors explicitly
    ///
    /// Colors are also disabled when stdout is not a terminal or `TERM` is
    /// `dumb`.
    pub fn from_env() -> Self {
        let max_width = match env::var("TRELLIS_MAX_WIDTH") {
            Ok(s) if !s.is_empty() => match s.parse() {
                Ok(width) => width,
                Err(_) => {
                    tracing::warn!(
                        env_var = "TRELLIS_MAX_WIDTH",
                        value = %s,
                        default = DEFAULT_MAX_CONTENT_WIDTH,
                        "Invalid value, using default"
                    );
                    DEFAULT_MAX_CONTENT_WIDTH
                }
            },
            _ => DEFAULT_MAX_CONTENT_WIDTH,
        };

        let use_ascii = match env::var("TRELLIS_ASCII") {
            Ok(v) if v == "1" || v.eq_ignore_ascii_case("true") => true,
            Ok(v) if v == "0" || v.eq_ignore_ascii_case("false") || v.is_empty() => false,
            Ok(v) => {
                tracing::warn!(
                    env_var = "TRELLIS_ASCII",
                    value = %v,
                    "Invalid value (expected '1', 'true', '0', or 'false'), using default"
                );
                false
            }
            Err(_) => false,
        };

        // Respect NO_COLOR (https://no-color.org/), TERM=dumb, and pipes.
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("TERM").map(|t| t != "dumb").unwrap_or(true)
            && io::stdout().is_terminal()
            && env::var("TRELLIS_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);

        Self {
            max_width,
            use_ascii,
            use_colors,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_CONTENT_WIDTH,
            use_ascii: false,
            use_colors: true,
        }
    }
}

/// Effective content width: the narrower of the configured maximum and the
/// detected terminal.
fn content_width(config: &OutputConfig) -> usize {
    let terminal = terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(DEFAULT_TERMINAL_WIDTH);
    config.max_width.min(terminal)
}

/// Wrap text to the given width, preserving existing paragraph breaks.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    textwrap::wrap(text, width.max(20))
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

// ============================================================================
// Public Dispatch Functions
// ============================================================================

/// Print a simple message.
pub fn print_message(msg: &str) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{msg}")
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let output = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    writeln!(handle, "{output}")
}

/// Print one workstream.
pub fn print_stream(stream: &Workstream, mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(stream),
        OutputMode::Text => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let config = OutputConfig::from_env();
            write_stream_line(&mut handle, stream, &config)
        }
    }
}

fn write_stream_line<W: Write>(
    w: &mut W,
    stream: &Workstream,
    config: &OutputConfig,
) -> io::Result<()> {
    let parent = match stream.parent {
        Some(p) => format!(" under {}", colorize_id(&p.to_string(), config)),
        None => " (root)".to_string(),
    };
    writeln!(
        w,
        "{} {} {}{} {}",
        colorize_id(&stream.id.to_string(), config),
        stream.name,
        dimmed(&format!("depth {}", stream.depth), config),
        parent,
        dimmed(&format!("owner {}", stream.owner), config)
    )
}

/// Print one work item.
pub fn print_item(item: &WorkItem, mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(item),
        OutputMode::Text => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let config = OutputConfig::from_env();
            write_item_line(&mut handle, item, &config)
        }
    }
}

fn write_item_line<W: Write>(w: &mut W, item: &WorkItem, config: &OutputConfig) -> io::Result<()> {
    let date = item
        .target_date
        .map(|d| format!(" {}", dimmed(&d.to_string(), config)))
        .unwrap_or_default();
    writeln!(
        w,
        "{} {} {} {}{}",
        colored_status_icon(item.status, config),
        colorize_id(&item.id.to_string(), config),
        item.name,
        colorize_status(item.status, config),
        date
    )
}

/// Print a list of work items (the `ready` command).
pub fn print_items(items: &[WorkItem], mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&items),
        OutputMode::Text => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let config = OutputConfig::from_env();
            if items.is_empty() {
                return writeln!(handle, "No items ready to start.");
            }
            for item in items {
                write_item_line(&mut handle, item, &config)?;
            }
            Ok(())
        }
    }
}

/// Print resolved access for one principal on one workstream.
pub fn print_access(
    stream: &Workstream,
    principal: PrincipalId,
    access: &EffectiveAccess,
    mode: OutputMode,
) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&json!({
            "stream": stream.id,
            "principal": principal,
            "access": access,
        })),
        OutputMode::Text => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let config = OutputConfig::from_env();

            writeln!(
                handle,
                "{}",
                bold(
                    &format!("Access for principal {principal} on {} ({})", stream.id, stream.name),
                    &config
                )
            )?;

            if access.effective.is_empty() {
                return writeln!(handle, "  none");
            }

            let effective: Vec<String> =
                access.effective.iter().rev().map(|k| k.to_string()).collect();
            writeln!(handle, "  effective: {}", effective.join(", "))?;

            if !access.direct.is_empty() {
                let direct: Vec<String> = access.direct.iter().map(|k| k.to_string()).collect();
                writeln!(handle, "  direct:    {}", direct.join(", "))?;
            }
            for inherited in &access.inherited {
                writeln!(
                    handle,
                    "  inherited: {} {}",
                    inherited.kind,
                    dimmed(
                        &format!("from {} ({})", inherited.from_stream, inherited.from_name),
                        &config
                    )
                )?;
            }
            Ok(())
        }
    }
}

/// Print the transitive prerequisite chain of an item.
pub fn print_chain(item: ItemId, chain: &[ItemId], mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&json!({ "item": item, "chain": chain })),
        OutputMode::Text => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let config = OutputConfig::from_env();

            if chain.is_empty() {
                return writeln!(handle, "Item {item} has no prerequisites.");
            }
            let ids: Vec<String> = chain
                .iter()
                .map(|i| colorize_id(&i.to_string(), &config))
                .collect();
            writeln!(
                handle,
                "{} {}",
                bold(&format!("Prerequisites of {item}:"), &config),
                ids.join(&dimmed(" <- ", &config))
            )
        }
    }
}

/// Print a delay impact report alongside the critical path from its source.
pub fn print_impact(
    report: &ImpactReport,
    path: &CriticalPath,
    mode: OutputMode,
) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&json!({
            "impact": report,
            "critical_path": path,
        })),
        OutputMode::Text => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let config = OutputConfig::from_env();
            let width = content_width(&config);

            let direction = if report.delay_days >= 0 { "delayed" } else { "pulled in" };
            let headline = format!(
                "Item {} {} by {} day(s); {} downstream item(s) affected.",
                report.source,
                direction,
                report.delay_days.abs(),
                report.impacted.len()
            );
            for line in wrap_text(&headline, width) {
                writeln!(handle, "{line}")?;
            }

            for impacted in &report.impacted {
                writeln!(
                    handle,
                    "  {} {} {}",
                    severity_tag(impacted.severity, &config),
                    colorize_id(&impacted.item.to_string(), &config),
                    dimmed(&format!("recommend {}", impacted.recommended_date), &config)
                )?;
            }

            let ids: Vec<String> = path
                .items
                .iter()
                .map(|i| colorize_id(&i.to_string(), &config))
                .collect();
            writeln!(
                handle,
                "{} {} {}",
                bold("Critical path:", &config),
                ids.join(&dimmed(" -> ", &config)),
                format_args!("(length {}, risk {})", path.length, risk_label(path.risk, &config))
            )
        }
    }
}

/// Print a rollup report.
pub fn print_rollup(report: &AggregateReport, mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(report),
        OutputMode::Text => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let config = OutputConfig::from_env();

            writeln!(
                handle,
                "{} {}/{} completed ({}%)",
                bold(&format!("Workstream {}:", report.stream), &config),
                report.completed,
                report.total,
                report.completion_pct
            )?;

            for (status, count) in &report.status_counts {
                writeln!(
                    handle,
                    "  {} {}",
                    colorize_status(*status, &config),
                    count
                )?;
            }

            if !report.children.is_empty() {
                writeln!(handle, "{}", bold("Children:", &config))?;
                for child in &report.children {
                    writeln!(
                        handle,
                        "  {} {} {}/{} ({}%)",
                        colorize_id(&child.stream.to_string(), &config),
                        child.name,
                        child.completed,
                        child.total,
                        child.completion_pct
                    )?;
                }
            }
            Ok(())
        }
    }
}
