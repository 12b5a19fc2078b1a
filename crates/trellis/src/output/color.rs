//! Color and styling helpers for CLI output.
//!
//! Semantic theme:
//!   - Success/Done:   green  (completed items, 100% rollups)
//!   - Warning/Active: yellow (in-progress, medium severity)
//!   - Error/Blocked:  red    (high severity, high risk)
//!   - Info/Reference: cyan   (ids, tree roots)
//!   - Muted:          dimmed (connectors, cancelled items, low severity)
//!   - Emphasis:       bold   (section headers)

use colored::Colorize;

use crate::domain::{ItemStatus, RiskLevel, Severity};

use super::OutputConfig;

/// Apply semantic "success" color (green) to text.
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply semantic "error" color (red) to text.
pub fn error(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.red().to_string()
}

/// Apply semantic "warning" color (yellow) to text.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Apply semantic "info" color (cyan) to text.
pub fn info(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.cyan().to_string()
}

/// Bold text (section headers).
pub(crate) fn bold(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}

/// Dimmed text (connectors, muted detail).
pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

/// Colorize an id (cyan).
pub(crate) fn colorize_id(id: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return id.to_string();
    }
    id.cyan().to_string()
}

/// Color status text by item status.
pub(crate) fn colorize_status(status: ItemStatus, config: &OutputConfig) -> String {
    let text = format!("{status}");
    if !config.use_colors {
        return text;
    }
    match status {
        ItemStatus::Pending => text.white().to_string(),
        ItemStatus::InProgress => text.yellow().to_string(),
        ItemStatus::Completed => text.green().to_string(),
        ItemStatus::Cancelled => text.dimmed().to_string(),
    }
}

/// A colored status icon, with ASCII fallback.
pub(crate) fn colored_status_icon(status: ItemStatus, config: &OutputConfig) -> String {
    let icon = if config.use_ascii {
        match status {
            ItemStatus::Pending => ".",
            ItemStatus::InProgress => ">",
            ItemStatus::Completed => "x",
            ItemStatus::Cancelled => "-",
        }
    } else {
        match status {
            ItemStatus::Pending => "○",
            ItemStatus::InProgress => "◐",
            ItemStatus::Completed => "●",
            ItemStatus::Cancelled => "✗",
        }
    };
    if !config.use_colors {
        return icon.to_string();
    }
    match status {
        ItemStatus::Pending => icon.white().to_string(),
        ItemStatus::InProgress => icon.yellow().to_string(),
        ItemStatus::Completed => icon.green().to_string(),
        ItemStatus::Cancelled => icon.dimmed().to_string(),
    }
}

/// A `[severity]` tag, colored by level.
pub(crate) fn severity_tag(severity: Severity, config: &OutputConfig) -> String {
    let text = format!("[{severity}]");
    if !config.use_colors {
        return text;
    }
    match severity {
        Severity::High => text.red().bold().to_string(),
        Severity::Medium => text.yellow().to_string(),
        Severity::Low => text.dimmed().to_string(),
    }
}

/// Colored risk label.
pub(crate) fn risk_label(risk: RiskLevel, config: &OutputConfig) -> String {
    let text = format!("{risk}");
    if !config.use_colors {
        return text;
    }
    match risk {
        RiskLevel::High => text.red().bold().to_string(),
        RiskLevel::Low => text.green().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> OutputConfig {
        OutputConfig::new(80, true, false)
    }

    #[test]
    fn test_no_color_passthrough() {
        let config = plain();
        assert_eq!(success("ok", &config), "ok");
        assert_eq!(severity_tag(Severity::High, &config), "[high]");
        assert_eq!(risk_label(RiskLevel::Low, &config), "low");
    }

    #[test]
    fn test_ascii_icons() {
        let config = plain();
        assert_eq!(colored_status_icon(ItemStatus::Completed, &config), "x");
        assert_eq!(colored_status_icon(ItemStatus::Pending, &config), ".");
    }

    #[test]
    fn test_unicode_icons() {
        let config = OutputConfig::new(80, false, false);
        assert_eq!(colored_status_icon(ItemStatus::Completed, &config), "●");
    }
}
