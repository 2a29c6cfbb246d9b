use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use console::style;
use log::{debug, warn};

use crate::utils::{display_path, ensure_dir_exists, format_file_size, unique_filename_where};
use crate::{FileAction, ImageRecord};

/// How a file reaches its destination folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Copy,
    Move,
}

impl Transfer {
    fn verb(self) -> &'static str {
        match self {
            Transfer::Copy => "copy",
            Transfer::Move => "move",
        }
    }
}

/// Result of performing actions on files
#[derive(Debug, Clone, Default)]
pub struct ActionResult {
    pub operations: Vec<FileOperation>,
    pub total_bytes: u64,
}

/// Represents a single file operation
#[derive(Debug, Clone)]
pub struct FileOperation {
    pub path: PathBuf,
    pub action: String,
    pub destination: Option<PathBuf>,
    pub success: bool,
    pub error: Option<String>,
    pub bytes: u64,
}

impl FileOperation {
    fn succeeded(path: &Path, action: &str, destination: Option<PathBuf>, bytes: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            action: action.to_string(),
            destination,
            success: true,
            error: None,
            bytes,
        }
    }

    fn failed(path: &Path, action: &str, error: String) -> Self {
        eprintln!("❌ {}: {}", path.display(), error);
        Self {
            path: path.to_path_buf(),
            action: action.to_string(),
            destination: None,
            success: false,
            error: Some(error),
            bytes: 0,
        }
    }
}

impl ActionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_operation(&mut self, operation: FileOperation) {
        if operation.success {
            self.total_bytes += operation.bytes;
        }
        self.operations.push(operation);
    }

    pub fn success_count(&self) -> usize {
        self.operations.iter().filter(|op| op.success).count()
    }

    pub fn error_count(&self) -> usize {
        self.operations.iter().filter(|op| !op.success).count()
    }

    pub fn print_summary(&self) {
        println!();
        println!("{}", style("📊 Action Summary").green().bold());
        println!("{}", style("-".repeat(20)).green());
        println!("Files processed: {}", self.operations.len());
        println!("Successful operations: {}", self.success_count());
        println!("Failed operations: {}", self.error_count());
        println!("Data affected: {}", format_file_size(self.total_bytes));

        if self.error_count() > 0 {
            println!();
            println!("{}", style("❌ Errors:").red().bold());
            for op in &self.operations {
                if let (false, Some(error)) = (op.success, &op.error) {
                    println!("  {}: {}", op.path.display(), error);
                }
            }
        }
    }
}

/// Apply `action` to every record. A failure on one file is recorded and the
/// rest are still processed.
pub fn apply_action(records: &[ImageRecord], action: &FileAction, dry_run: bool) -> ActionResult {
    let mut result = ActionResult::new();
    let mut planned = HashSet::new();

    for record in records {
        let operation = match action {
            FileAction::None => continue,
            FileAction::Copy(dir) => {
                transfer_file(&record.path, dir, Transfer::Copy, dry_run, &mut planned)
            }
            FileAction::Move(dir) => {
                transfer_file(&record.path, dir, Transfer::Move, dry_run, &mut planned)
            }
            FileAction::Delete => delete_file(&record.path, dry_run),
        };
        result.add_operation(operation);
    }

    result
}

/// Move every unreadable image into `dir` under a collision-free name
pub fn quarantine(records: &[ImageRecord], dir: &Path, dry_run: bool) -> ActionResult {
    let corrupted: Vec<ImageRecord> = records
        .iter()
        .filter(|record| !record.result.is_valid())
        .cloned()
        .collect();
    apply_action(&corrupted, &FileAction::Move(dir.to_path_buf()), dry_run)
}

/// Place each grouped record in `<output>/<group name>/`. Records without a
/// group assignment are left alone.
pub fn group_into_folders(
    records: &[ImageRecord],
    output: &Path,
    transfer: Transfer,
    dry_run: bool,
) -> ActionResult {
    let mut result = ActionResult::new();
    let mut planned = HashSet::new();

    for record in records {
        match record.result.group_name() {
            Some(group) => {
                let dir = output.join(group);
                result.add_operation(transfer_file(&record.path, &dir, transfer, dry_run, &mut planned));
            }
            None => debug!("{} has no group, leaving in place", record.path.display()),
        }
    }

    result
}

/// Run `program <path>` with its output discarded. Spawn failures and
/// non-zero exits are logged and reported as `false`.
pub fn run_command(program: &str, path: &Path) -> bool {
    let status = Command::new(program)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => true,
        Ok(status) => {
            warn!("{} exited with {} for {}", program, status, path.display());
            false
        }
        Err(e) => {
            warn!("Failed to run {}: {}", program, e);
            false
        }
    }
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|meta| meta.len()).unwrap_or(0)
}

/// Delete a file
fn delete_file(path: &Path, dry_run: bool) -> FileOperation {
    let bytes = file_len(path);

    if dry_run {
        println!("Would delete: {}", display_path(path));
        return FileOperation::succeeded(path, "delete", None, bytes);
    }

    match fs::remove_file(path) {
        Ok(_) => {
            println!("✅ Deleted: {}", display_path(path));
            FileOperation::succeeded(path, "delete", None, bytes)
        }
        Err(e) => FileOperation::failed(path, "delete", format!("Failed to delete: {}", e)),
    }
}

/// Copy or move a file into `target_dir` without overwriting anything there.
/// `planned` holds destinations already handed out in this batch, so a dry run
/// names collisions the way a real run would.
fn transfer_file(
    source: &Path,
    target_dir: &Path,
    transfer: Transfer,
    dry_run: bool,
    planned: &mut HashSet<PathBuf>,
) -> FileOperation {
    let verb = transfer.verb();
    let bytes = file_len(source);

    let Some(filename) = source.file_name() else {
        return FileOperation::failed(source, verb, "Path has no file name".to_string());
    };

    if !dry_run {
        if let Err(e) = ensure_dir_exists(target_dir) {
            return FileOperation::failed(
                source,
                verb,
                format!("Failed to create target directory {}: {}", target_dir.display(), e),
            );
        }
    }

    let target_path = unique_filename_where(target_dir, &filename.to_string_lossy(), |path| {
        path.exists() || planned.contains(path)
    });
    planned.insert(target_path.clone());

    if dry_run {
        println!("Would {}: {} -> {}", verb, display_path(source), display_path(&target_path));
        return FileOperation::succeeded(source, verb, Some(target_path), bytes);
    }

    let outcome = match transfer {
        Transfer::Copy => fs::copy(source, &target_path).map(|_| ()),
        Transfer::Move => move_file(source, &target_path),
    };

    match outcome {
        Ok(()) => {
            let done = match transfer {
                Transfer::Copy => "Copied",
                Transfer::Move => "Moved",
            };
            println!("✅ {}: {} -> {}", done, display_path(source), display_path(&target_path));
            FileOperation::succeeded(source, verb, Some(target_path), bytes)
        }
        Err(e) => FileOperation::failed(source, verb, format!("Failed to {}: {}", verb, e)),
    }
}

/// `rename`, falling back to copy and remove across filesystems
fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    if fs::rename(source, target).is_ok() {
        return Ok(());
    }
    fs::copy(source, target)?;
    if let Err(e) = fs::remove_file(source) {
        // leave exactly one copy behind
        let _ = fs::remove_file(target);
        return Err(e);
    }
    Ok(())
}
