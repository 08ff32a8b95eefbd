//! Output formatting for CLI operations.

use console::style;
use serde_json::json;
use zipcull::{ArchiveTree, NodeId, RewriteResult, Timestamp, TreeNode};

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats a tree as an indented outline
    fn format_tree(&self, tree: &ArchiveTree) -> String;

    /// Formats every node as one row
    fn format_list(&self, tree: &ArchiveTree) -> String;

    /// Formats rewrite results
    fn format_rewrite_result(&self, result: &RewriteResult) -> String;

    /// Formats the location of an extracted entry
    fn format_extracted(&self, entry: &str, path: &std::path::Path) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_tree(&self, tree: &ArchiveTree) -> String {
        let mut output = format!("{}\n", tree.archive().display());
        render_children(tree, NodeId::ROOT, 1, &mut output);
        output.push_str(&format!(
            "\n{} files, {} directories, {}\n",
            tree.file_count(),
            tree.dir_count(),
            format_size_kb(tree.total_size())
        ));
        output
    }

    fn format_list(&self, tree: &ArchiveTree) -> String {
        let mut output = String::new();
        output.push_str(&format!("{:>14} {:>19} {}\n", "Size", "Modified", "Name"));
        output.push_str(&"-".repeat(70));
        output.push('\n');

        for (_, node) in tree.walk(NodeId::ROOT).skip(1) {
            let size = node.size().map(format_size_kb).unwrap_or_default();
            let modified = node
                .modified()
                .map(format_timestamp)
                .unwrap_or_else(|| "-".to_string());
            output.push_str(&format!(
                "{:>14} {:>19} {}\n",
                size,
                modified,
                display_name(node, node.path().as_str())
            ));
        }

        output.push_str(&"-".repeat(70));
        output.push('\n');
        output.push_str(&format!(
            "{} files, {} directories, {} total\n",
            tree.file_count(),
            tree.dir_count(),
            format_size_kb(tree.total_size())
        ));
        output
    }

    fn format_rewrite_result(&self, result: &RewriteResult) -> String {
        if result.is_noop() {
            return "Nothing to delete, archive left unchanged\n".to_string();
        }
        format!(
            "Removed {} entries ({}), kept {} entries ({})\n",
            result.entries_deleted,
            format_size_kb(result.bytes_deleted),
            result.entries_kept,
            format_size_kb(result.bytes_kept)
        )
    }

    fn format_extracted(&self, _entry: &str, path: &std::path::Path) -> String {
        format!("{}\n", path.display())
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_tree(&self, tree: &ArchiveTree) -> String {
        let obj = json!({
            "archive": tree.archive().display().to_string(),
            "root": node_json(tree, NodeId::ROOT),
        });
        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_list(&self, tree: &ArchiveTree) -> String {
        let items: Vec<_> = tree
            .walk(NodeId::ROOT)
            .skip(1)
            .map(|(_, node)| {
                json!({
                    "path": node.path().as_str(),
                    "is_directory": node.is_dir(),
                    "size": node.size(),
                    "modified": node.modified().map(|t| t.as_unix_secs()),
                    "marked": node.is_marked(),
                })
            })
            .collect();
        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_rewrite_result(&self, result: &RewriteResult) -> String {
        let obj = json!({
            "entries_kept": result.entries_kept,
            "entries_deleted": result.entries_deleted,
            "bytes_kept": result.bytes_kept,
            "bytes_deleted": result.bytes_deleted,
        });
        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_extracted(&self, entry: &str, path: &std::path::Path) -> String {
        let obj = json!({
            "entry": entry,
            "path": path.display().to_string(),
        });
        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

fn render_children(tree: &ArchiveTree, id: NodeId, depth: usize, output: &mut String) {
    let node = tree.node(id);
    let indent = "  ".repeat(depth);
    for child in node.children() {
        let dir = tree.node(*child);
        output.push_str(&format!("{}{}/\n", indent, display_name(dir, dir.name())));
        render_children(tree, *child, depth + 1, output);
    }
    for file in node.files() {
        let file = tree.node(*file);
        output.push_str(&format!(
            "{}{}  {}\n",
            indent,
            display_name(file, file.name()),
            style(file.size().map(format_size_kb).unwrap_or_default()).dim()
        ));
    }
}

fn node_json(tree: &ArchiveTree, id: NodeId) -> serde_json::Value {
    let node = tree.node(id);
    json!({
        "name": node.name(),
        "path": node.path().as_str(),
        "marked": node.is_marked(),
        "directories": node.children().iter().map(|c| node_json(tree, *c)).collect::<Vec<_>>(),
        "files": node.files().iter().map(|f| {
            let file = tree.node(*f);
            json!({
                "name": file.name(),
                "path": file.path().as_str(),
                "size": file.size(),
                "modified": file.modified().map(|t| t.as_unix_secs()),
                "marked": file.is_marked(),
            })
        }).collect::<Vec<_>>(),
    })
}

/// Marked nodes are struck through in red.
fn display_name(node: &TreeNode, text: &str) -> String {
    if node.is_marked() {
        style(text).red().strikethrough().to_string()
    } else {
        text.to_string()
    }
}

/// Formats a byte count in KB with thousands separators and one decimal.
///
/// Anything below 0.1 KB, zero included, is shown as `0.1 KB`.
pub fn format_size_kb(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    if kb < 0.1 {
        return "0.1 KB".to_string();
    }

    let whole = kb.trunc() as u64;
    let fraction = kb - kb.trunc();
    let mut digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    while digits.len() > 3 {
        let tail = digits.split_off(digits.len() - 3);
        grouped = format!(",{}{}", tail, grouped);
    }
    grouped = format!("{}{}", digits, grouped);

    if fraction > 0.01 {
        format!("{}.{} KB", grouped, (fraction * 10.0) as u32)
    } else {
        format!("{} KB", grouped)
    }
}

/// Formats a timestamp as `YYYY/MM/DD HH:MM:SS`.
pub fn format_timestamp(time: Timestamp) -> String {
    format!(
        "{:04}/{:02}/{:02} {:02}:{:02}:{:02}",
        time.year(),
        time.month(),
        time.day(),
        time.hour(),
        time.minute(),
        time.second()
    )
}
