//! Workstream tree rendering for `trellis stream tree` output.

use std::io::{self, Write};

use colored::Colorize;
use serde_json::json;

use super::color::{colorize_id, dimmed};
use super::{OutputConfig, OutputMode};

/// A node in a workstream tree, prepared for rendering.
#[derive(Debug, Clone)]
pub struct StreamTreeNode {
    /// Workstream id.
    pub id: i64,
    /// Workstream name.
    pub name: String,
    /// Item count directly on this workstream.
    pub item_count: usize,
    /// Child nodes, ordered by id.
    pub children: Vec<StreamTreeNode>,
}

/// Print one or more workstream trees with ASCII/Unicode connectors.
///
/// Renders a tree like:
/// ```text
/// ◆ 1 Platform (2 items)
/// ├── 2 Backend
/// │   └── 4 API (1 item)
/// └── 3 Frontend
/// ```
pub fn print_stream_tree(roots: &[StreamTreeNode], mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => {
            for root in roots {
                print_root(&mut handle, root, &config)?;
            }
            Ok(())
        }
        OutputMode::Json => {
            let value: Vec<serde_json::Value> = roots.iter().map(node_to_json).collect();
            let output = serde_json::to_string_pretty(&value).map_err(io::Error::other)?;
            writeln!(handle, "{output}")
        }
    }
}

fn node_to_json(node: &StreamTreeNode) -> serde_json::Value {
    json!({
        "id": node.id,
        "name": node.name,
        "item_count": node.item_count,
        "children": node.children.iter().map(node_to_json).collect::<Vec<_>>(),
    })
}

fn item_suffix(count: usize, config: &OutputConfig) -> String {
    match count {
        0 => String::new(),
        1 => format!(" {}", dimmed("(1 item)", config)),
        n => format!(" {}", dimmed(&format!("({n} items)"), config)),
    }
}

fn print_root<W: Write>(w: &mut W, root: &StreamTreeNode, config: &OutputConfig) -> io::Result<()> {
    let icon = if config.use_ascii { "*" } else { "◆" };
    let icon_str = if config.use_colors {
        icon.cyan().bold().to_string()
    } else {
        icon.to_string()
    };

    writeln!(
        w,
        "{} {} {}{}",
        icon_str,
        colorize_id(&root.id.to_string(), config),
        root.name,
        item_suffix(root.item_count, config)
    )?;
    print_children(w, &root.children, &[], config)
}

/// Recursively render children with connector lines.
///
/// `prefix_segments` tracks which ancestor levels still have siblings below,
/// used to draw the vertical continuation lines.
fn print_children<W: Write>(
    w: &mut W,
    children: &[StreamTreeNode],
    prefix_segments: &[bool],
    config: &OutputConfig,
) -> io::Result<()> {
    let (branch, corner, pipe, space) = if config.use_ascii {
        ("|-- ", "`-- ", "|   ", "    ")
    } else {
        ("├── ", "└── ", "│   ", "    ")
    };

    for (i, child) in children.iter().enumerate() {
        let is_last = i == children.len() - 1;

        let mut prefix = String::new();
        for &has_more in prefix_segments {
            prefix.push_str(&dimmed(if has_more { pipe } else { space }, config));
        }
        let connector = dimmed(if is_last { corner } else { branch }, config);

        writeln!(
            w,
            "{}{}{} {}{}",
            prefix,
            connector,
            colorize_id(&child.id.to_string(), config),
            child.name,
            item_suffix(child.item_count, config)
        )?;

        if !child.children.is_empty() {
            let mut next_segments = prefix_segments.to_vec();
            next_segments.push(!is_last);
            print_children(w, &child.children, &next_segments, config)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StreamTreeNode {
        StreamTreeNode {
            id: 1,
            name: "Platform".to_string(),
            item_count: 2,
            children: vec![
                StreamTreeNode {
                    id: 2,
                    name: "Backend".to_string(),
                    item_count: 0,
                    children: vec![StreamTreeNode {
                        id: 4,
                        name: "API".to_string(),
                        item_count: 1,
                        children: vec![],
                    }],
                },
                StreamTreeNode {
                    id: 3,
                    name: "Frontend".to_string(),
                    item_count: 0,
                    children: vec![],
                },
            ],
        }
    }

    #[test]
    fn test_ascii_connectors() {
        let config = OutputConfig::new(80, true, false);
        let mut buf = Vec::new();
        print_root(&mut buf, &sample(), &config).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("* 1 Platform (2 items)"));
        assert!(text.contains("|-- 2 Backend"));
        assert!(text.contains("|   `-- 4 API (1 item)"));
        assert!(text.contains("`-- 3 Frontend"));
    }

    #[test]
    fn test_unicode_connectors() {
        let config = OutputConfig::new(80, false, false);
        let mut buf = Vec::new();
        print_root(&mut buf, &sample(), &config).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("◆ 1 Platform"));
        assert!(text.contains("├── 2 Backend"));
        assert!(text.contains("└── 3 Frontend"));
    }

    #[test]
    fn test_json_shape() {
        let value = node_to_json(&sample());
        assert_eq!(value["id"], 1);
        assert_eq!(value["children"][0]["children"][0]["name"], "API");
    }
}
