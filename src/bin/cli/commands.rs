//! Command implementations for the CLI tool.

use std::path::{Path, PathBuf};

use zipcull::{EntryPath, ExtractOptions, Session, SessionOptions, SharedTree};

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::create_formatter;
use crate::progress::RewriteProgress;

/// Configuration for the delete command.
pub struct DeleteConfig<'a> {
    pub archive_path: &'a Path,
    pub entries: &'a [String],
    pub yes: bool,
    pub dry_run: bool,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Tree command implementation
pub fn tree(archive_path: &Path, format: OutputFormat) -> ExitCode {
    let session = Session::new();
    let tree = match open_tree(&session, archive_path) {
        Ok(t) => t,
        Err(code) => return code,
    };
    let tree = tree.read().unwrap_or_else(|p| p.into_inner());
    print!("{}", create_formatter(format).format_tree(&tree));
    ExitCode::Success
}

/// List command implementation
pub fn list(archive_path: &Path, format: OutputFormat) -> ExitCode {
    let session = Session::new();
    let tree = match open_tree(&session, archive_path) {
        Ok(t) => t,
        Err(code) => return code,
    };
    let tree = tree.read().unwrap_or_else(|p| p.into_inner());
    print!("{}", create_formatter(format).format_list(&tree));
    ExitCode::Success
}

/// Delete command implementation
pub fn delete(config: &DeleteConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);
    let session = Session::new();
    let tree = match open_tree(&session, config.archive_path) {
        Ok(t) => t,
        Err(code) => return code,
    };

    for raw in config.entries {
        let requested = EntryPath::from(raw.as_str());
        let target = {
            let tree = tree.read().unwrap_or_else(|p| p.into_inner());
            tree.find(&requested).map(|id| {
                let node = tree.node(id);
                (node.path().clone(), node.is_dir())
            })
        };
        let Some((path, is_dir)) = target else {
            eprintln!("Error: no entry '{}' in {}", raw, config.archive_path.display());
            return ExitCode::NotFound;
        };

        let marked = if is_dir {
            session.set_marked_recursively(config.archive_path, &path, true)
        } else {
            session.set_marked(config.archive_path, &path, true)
        };
        if let Err(e) = marked {
            eprintln!("Error: {}", e);
            return error_to_exit_code(&e);
        }
    }

    let count = session.marked_count(config.archive_path);
    if !config.quiet || config.dry_run {
        let tree = tree.read().unwrap_or_else(|p| p.into_inner());
        print!("{}", formatter.format_tree(&tree));
    }
    if config.dry_run {
        return ExitCode::Success;
    }

    if !config.yes && !confirm_delete(config.archive_path, count) {
        eprintln!("Aborted, archive left unchanged");
        return ExitCode::Declined;
    }

    let progress = RewriteProgress::new(config.quiet);
    let bar = progress.bar();
    let result = match session.apply_deletions_with_progress(config.archive_path, progress) {
        Ok(r) => r,
        Err(e) => {
            bar.abandon_with_message("Failed");
            eprintln!("Error: {}", e);
            return error_to_exit_code(&e);
        }
    };
    bar.finish_and_clear();

    print!("{}", formatter.format_rewrite_result(&result));
    ExitCode::Success
}

/// Extract command implementation
pub fn extract(
    archive_path: &Path,
    entry: &str,
    scratch_dir: Option<PathBuf>,
    format: OutputFormat,
) -> ExitCode {
    let mut options = ExtractOptions::new();
    if let Some(dir) = scratch_dir {
        options = options.scratch_dir(dir);
    }
    let session = Session::with_options(SessionOptions::new().extract(options));

    match session.extract(archive_path, &EntryPath::from(entry)) {
        Ok(path) => {
            print!("{}", create_formatter(format).format_extracted(entry, &path));
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            error_to_exit_code(&e)
        }
    }
}

fn open_tree(session: &Session, path: &Path) -> Result<SharedTree, ExitCode> {
    session.open(path).map_err(|e| {
        eprintln!("Error opening archive: {}", e);
        error_to_exit_code(&e)
    })
}

/// Asks before rewriting; any prompt failure counts as "no".
fn confirm_delete(archive: &Path, count: usize) -> bool {
    use dialoguer::{Confirm, theme::ColorfulTheme};

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Remove {} entries from {}?",
            count,
            archive.display()
        ))
        .default(false)
        .interact()
        .unwrap_or(false)
}
