//! Command registry for loading filter commands from disk.
//!
//! The registry scans the command directory for `*.json` descriptor files
//! and rebuilds its descriptor set wholesale on every load.

use std::path::{Path, PathBuf};

use super::descriptor::CommandDescriptor;
use super::error::LoadError;

/// Extension recognized for descriptor files.
pub const DESCRIPTOR_EXTENSION: &str = "json";

/// Sample descriptors copied into a fresh command directory.
pub const BUNDLED_SAMPLES: &[(&str, &str)] = &[
    ("format-json.json", include_str!("../../commands/format-json.json")),
    ("sort.json", include_str!("../../commands/sort.json")),
    ("unique.json", include_str!("../../commands/unique.json")),
    ("uppercase.json", include_str!("../../commands/uppercase.json")),
    ("uppercase-each.json", include_str!("../../commands/uppercase-each.json")),
];

/// Registry of filter commands loaded from one directory.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    /// Directory scanned for descriptors
    directory: PathBuf,

    /// Descriptors from the last load, in file-name order
    commands: Vec<CommandDescriptor>,
}

impl CommandRegistry {
    /// Create an empty registry for the given directory.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into(), commands: Vec::new() }
    }

    /// Seed the directory if needed and reload every descriptor.
    ///
    /// Returns everything that was skipped; the loaded count is [`len`].
    ///
    /// [`len`]: CommandRegistry::len
    pub fn load(&mut self) -> Vec<LoadError> {
        let mut errors = Vec::new();
        if let Err(e) = ensure_command_directory(&self.directory) {
            tracing::warn!(
                directory = ?self.directory,
                error = %e,
                "Failed to populate command directory"
            );
            errors.push(LoadError::Seed { path: self.directory.clone(), source: e });
        }

        let report = load_descriptors(&self.directory);
        self.commands = report.commands;
        errors.extend(report.errors);
        errors
    }

    /// The directory this registry reads from.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Get total number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Get a command by its identifier.
    pub fn get_by_id(&self, identifier: &str) -> Option<&CommandDescriptor> {
        self.commands.iter().find(|c| c.identifier == identifier)
    }

    /// Get all commands.
    pub fn get_all(&self) -> &[CommandDescriptor] {
        &self.commands
    }
}

/// Descriptors from one directory scan plus everything that was skipped.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Loaded descriptors, in file-name order
    pub commands: Vec<CommandDescriptor>,

    /// Skipped entries, in scan order
    pub errors: Vec<LoadError>,
}

/// Create `directory` and copy the bundled samples into it if it does not exist.
///
/// Returns `true` when samples were written. An existing directory is left
/// untouched, even if it is empty. Samples are written to a staging
/// directory next to `directory` and renamed into place, so a failed seed
/// leaves nothing behind and is retried on the next load.
pub fn ensure_command_directory(directory: &Path) -> std::io::Result<bool> {
    if directory.exists() {
        return Ok(false);
    }

    let parent = directory
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new().prefix(".apply-command-seed").tempdir_in(parent)?;
    for (name, content) in BUNDLED_SAMPLES {
        std::fs::write(staging.path().join(name), content)?;
    }

    if let Err(e) = std::fs::rename(staging.path(), directory) {
        // Someone else created it in the meantime; theirs wins.
        if directory.is_dir() {
            return Ok(false);
        }
        return Err(e);
    }

    tracing::info!(
        directory = ?directory,
        count = BUNDLED_SAMPLES.len(),
        "Populated command directory with samples"
    );
    Ok(true)
}

/// Load every descriptor in `directory`.
///
/// Fails soft: a listing error yields an empty set, and a bad entry is
/// logged, recorded in the report and skipped. When two files map to the
/// same identifier the later file in name order wins.
pub fn load_descriptors(directory: &Path) -> LoadReport {
    let mut report = LoadReport::default();

    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(directory = ?directory, error = %e, "Failed to list command directory");
            report.errors.push(LoadError::List { path: directory.to_path_buf(), source: e });
            return report;
        }
    };

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.is_file() && is_descriptor_file(&path) {
                    paths.push(path);
                }
            }
            Err(e) => {
                tracing::warn!(directory = ?directory, error = %e, "Skipping unreadable entry");
                report.errors.push(LoadError::List { path: directory.to_path_buf(), source: e });
            }
        }
    }
    paths.sort();

    for path in paths {
        match load_descriptor(&path) {
            Ok(descriptor) => {
                if let Some(existing) =
                    report.commands.iter_mut().find(|c| c.identifier == descriptor.identifier)
                {
                    tracing::warn!(
                        identifier = %descriptor.identifier,
                        replaced = ?existing.source,
                        by = ?descriptor.source,
                        "Duplicate command identifier"
                    );
                    *existing = descriptor;
                } else {
                    report.commands.push(descriptor);
                }
            }
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Skipping command descriptor");
                report.errors.push(e);
            }
        }
    }

    tracing::debug!(
        directory = ?directory,
        count = report.commands.len(),
        skipped = report.errors.len(),
        "Loaded commands"
    );
    report
}

/// Load a single descriptor file.
pub fn load_descriptor(path: &Path) -> Result<CommandDescriptor, LoadError> {
    let identifier = identifier_for(path).ok_or_else(|| LoadError::Invalid {
        path: path.to_path_buf(),
        reason: "file name is not valid UTF-8".to_string(),
    })?;

    let content = std::fs::read_to_string(path)
        .map_err(|e| LoadError::Read { path: path.to_path_buf(), source: e })?;

    CommandDescriptor::parse(&identifier, &content, path)
}

/// Identifier for a descriptor path: the file name without its extension.
pub fn identifier_for(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
}

fn is_descriptor_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(DESCRIPTOR_EXTENSION))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::core::DispatchMode;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_identifier_strips_extension() {
        assert_eq!(identifier_for(Path::new("/x/sort.json")).as_deref(), Some("sort"));
        assert_eq!(identifier_for(Path::new("a.b.json")).as_deref(), Some("a.b"));
    }

    #[test]
    fn test_load_skips_malformed_entries() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "good.json", r#"{"command": "sort", "args": []}"#);
        write(temp.path(), "broken.json", "{ not json");
        write(temp.path(), "missing-args.json", r#"{"command": "sort"}"#);
        write(temp.path(), "notes.txt", "ignored");

        let report = load_descriptors(temp.path());
        assert_eq!(report.commands.len(), 1);
        assert_eq!(report.commands[0].identifier, "good");
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| !matches!(e, LoadError::List { .. })));
    }

    #[test]
    fn test_load_is_sorted_by_file_name() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "zeta.json", r#"{"command": "cat", "args": []}"#);
        write(temp.path(), "alpha.json", r#"{"command": "cat", "args": []}"#);

        let ids: Vec<_> =
            load_descriptors(temp.path()).commands.into_iter().map(|c| c.identifier).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }

    // Needs a case-sensitive file system.
    #[cfg(target_os = "linux")]
    #[test]
    fn test_duplicate_identifier_last_wins() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "dup.JSON", r#"{"command": "first", "args": []}"#);
        write(temp.path(), "dup.json", r#"{"command": "second", "args": []}"#);

        let report = load_descriptors(temp.path());
        assert_eq!(report.commands.len(), 1);
        assert_eq!(report.commands[0].executable, "second");
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_missing_directory_is_seeded_once() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("commands");

        let mut registry = CommandRegistry::new(&dir);
        assert!(registry.load().is_empty());
        assert_eq!(registry.len(), BUNDLED_SAMPLES.len());
        assert!(registry.get_by_id("sort").is_some());
        assert_eq!(
            registry.get_by_id("uppercase-each").map(|c| c.mode.clone()),
            Some(DispatchMode::MultiplexReplace)
        );

        // Removing a sample must not bring it back on the next load.
        fs::remove_file(dir.join("sort.json")).unwrap();
        assert!(!ensure_command_directory(&dir).unwrap());
        assert!(registry.load().is_empty());
        assert_eq!(registry.len(), BUNDLED_SAMPLES.len() - 1);
        assert!(registry.get_by_id("sort").is_none());
    }

    #[test]
    fn test_existing_empty_directory_is_not_seeded() {
        let temp = TempDir::new().unwrap();
        let mut registry = CommandRegistry::new(temp.path());
        assert!(registry.load().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reload_rebuilds_wholesale() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "one.json", r#"{"command": "cat", "args": []}"#);

        let mut registry = CommandRegistry::new(temp.path());
        registry.load();
        assert_eq!(registry.len(), 1);

        fs::remove_file(temp.path().join("one.json")).unwrap();
        write(temp.path(), "two.json", r#"{"command": "cat", "args": []}"#);
        registry.load();
        assert_eq!(registry.len(), 1);
        assert!(registry.get_by_id("one").is_none());
        assert!(registry.get_by_id("two").is_some());
    }

    #[test]
    fn test_bundled_samples_parse() {
        for (name, content) in BUNDLED_SAMPLES {
            let id = identifier_for(Path::new(name)).unwrap();
            assert!(CommandDescriptor::parse(&id, content, Path::new(name)).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_seeding_leaves_no_staging_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("commands");

        assert!(ensure_command_directory(&dir).unwrap());
        let siblings: Vec<_> = fs::read_dir(dir.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(siblings, vec![std::ffi::OsString::from("commands")]);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), BUNDLED_SAMPLES.len());
    }

    #[test]
    fn test_failed_seed_is_reported_and_retried() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let dir = blocker.join("commands");

        let mut registry = CommandRegistry::new(&dir);
        let errors = registry.load();
        assert!(matches!(errors[0], LoadError::Seed { .. }));
        assert!(errors.iter().any(|e| matches!(e, LoadError::List { .. })));
        assert!(registry.is_empty());
        assert!(!dir.exists());

        // Once the parent is usable the next load seeds normally.
        fs::remove_file(&blocker).unwrap();
        assert!(registry.load().is_empty());
        assert_eq!(registry.len(), BUNDLED_SAMPLES.len());
    }

    #[test]
    fn test_missing_directory_listing_is_reported() {
        let report = load_descriptors(Path::new("/definitely/not/a/command/dir"));
        assert!(report.commands.is_empty());
        assert!(matches!(report.errors.as_slice(), [LoadError::List { .. }]));
    }
}
