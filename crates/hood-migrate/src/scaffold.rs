//! Project files written by the `hood` tool: migration sources, the
//! migrations module that registers them, the runner binary and the config
//! template.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use hood::Environments;
use tracing::info;

use crate::error::{MigrateError, Result};

/// Default directory for migration sources.
pub const MIGRATIONS_DIR: &str = "db/migrations";

/// Default name of the project's runner binary.
pub const RUNNER_BIN: &str = "migrate";

/// A migration source found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub timestamp: i64,
    pub name: String,
}

impl MigrationFile {
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}_{}.rs", self.timestamp, self.name)
    }

    /// Module name used in the generated `mod.rs`.
    #[must_use]
    pub fn module(&self) -> String {
        format!("m{}_{}", self.timestamp, self.name)
    }

    #[must_use]
    pub fn struct_name(&self) -> String {
        to_upper_camel(&self.name)
    }

    /// Parses `<timestamp>_<name>.rs`.
    fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".rs")?;
        let (stamp, name) = stem.split_once('_')?;
        let timestamp = stamp.parse().ok()?;
        is_valid_name(name).then(|| Self {
            timestamp,
            name: name.to_string(),
        })
    }
}

/// Names must start with a lowercase letter and contain only lowercase
/// letters, digits and underscores.
fn is_valid_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn to_upper_camel(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect()
}

/// Source of a new, empty migration.
#[must_use]
pub fn migration_template(file: &MigrationFile) -> String {
    format!(
        r"use hood_migrate::{{Migration, Operation}};

pub struct {name};

impl Migration for {name} {{
    fn timestamp(&self) -> i64 {{
        {timestamp}
    }}

    fn name(&self) -> &str {{
        {label:?}
    }}

    fn up(&self) -> Vec<Operation> {{
        vec![]
    }}

    fn down(&self) -> Vec<Operation> {{
        vec![]
    }}
}}
",
        name = file.struct_name(),
        timestamp = file.timestamp,
        label = file.name,
    )
}

/// Source of the migrations module registering `files` in order.
#[must_use]
pub fn mod_template(files: &[MigrationFile]) -> String {
    let mut out = String::from("// Generated by `hood create:migration`. Do not edit.\n\n");
    for file in files {
        let _ = writeln!(out, "#[path = \"{}\"]", file.file_name());
        let _ = writeln!(out, "mod {};", file.module());
    }
    if !files.is_empty() {
        out.push('\n');
    }
    out.push_str(
        "/// Every migration of the project.\n\
         pub fn runner() -> hood_migrate::Result<hood_migrate::Runner> {\n    \
         let mut runner = hood_migrate::Runner::new();\n",
    );
    for file in files {
        let _ = writeln!(
            out,
            "    runner.register({}::{})?;",
            file.module(),
            file.struct_name()
        );
    }
    out.push_str("    Ok(runner)\n}\n");
    out
}

/// Source of a runner binary at `src/bin/<bin>.rs` for a migrations
/// directory relative to the project root.
#[must_use]
pub fn runner_template(migrations_dir: &Path) -> String {
    let module = Path::new("../..").join(migrations_dir).join("mod.rs");
    format!(
        r#"#[path = "{}"]
mod migrations;

#[tokio::main]
async fn main() -> anyhow::Result<()> {{
    hood_migrate::cli::run(migrations::runner()?).await
}}
"#,
        module.display()
    )
}

/// Lists the migration sources in `dir`, ordered by timestamp. Files that do
/// not follow the `<timestamp>_<name>.rs` pattern are skipped; a missing
/// directory has no migrations.
///
/// # Errors
///
/// Returns an IO error if the directory cannot be read, or
/// [`MigrateError::DuplicateTimestamp`] if two files share a timestamp.
pub fn scan(dir: &Path) -> Result<Vec<MigrationFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|e| MigrateError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MigrateError::io(dir, e))?;
        if let Some(file) = entry.file_name().to_str().and_then(MigrationFile::parse) {
            files.push(file);
        }
    }
    files.sort_by_key(|f| f.timestamp);
    if let Some(pair) = files.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
        return Err(MigrateError::DuplicateTimestamp(pair[0].timestamp));
    }
    Ok(files)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| MigrateError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| MigrateError::io(path, e))
}

/// Writes `<dir>/<timestamp>_<name>.rs` and regenerates `<dir>/mod.rs`.
/// Returns the path of the new migration.
///
/// # Errors
///
/// Returns [`MigrateError::InvalidName`] for a name that cannot be a module
/// name, [`MigrateError::DuplicateTimestamp`] if a migration with the same
/// timestamp exists, or an IO error.
pub fn create_migration(dir: &Path, name: &str, timestamp: i64) -> Result<PathBuf> {
    if !is_valid_name(name) {
        return Err(MigrateError::InvalidName(name.to_string()));
    }
    let mut files = scan(dir)?;
    if files.iter().any(|f| f.timestamp == timestamp) {
        return Err(MigrateError::DuplicateTimestamp(timestamp));
    }
    let file = MigrationFile {
        timestamp,
        name: name.to_string(),
    };
    let path = dir.join(file.file_name());
    write(&path, &migration_template(&file))?;
    info!(path = %path.display(), "created migration");

    files.push(file);
    files.sort_by_key(|f| f.timestamp);
    write(&dir.join("mod.rs"), &mod_template(&files))?;
    Ok(path)
}

/// Regenerates `<dir>/mod.rs` from the sources on disk.
///
/// # Errors
///
/// Returns an IO error or [`MigrateError::DuplicateTimestamp`].
pub fn write_mod(dir: &Path) -> Result<PathBuf> {
    let files = scan(dir)?;
    let path = dir.join("mod.rs");
    write(&path, &mod_template(&files))?;
    Ok(path)
}

/// Writes `<root>/src/bin/<bin>.rs` unless it exists. Returns the path when
/// a file was written.
///
/// # Errors
///
/// Returns an IO error.
pub fn create_runner(root: &Path, migrations_dir: &Path, bin: &str) -> Result<Option<PathBuf>> {
    let path = root.join("src").join("bin").join(format!("{bin}.rs"));
    if path.exists() {
        return Ok(None);
    }
    write(&path, &runner_template(migrations_dir))?;
    info!(path = %path.display(), "created runner");
    Ok(Some(path))
}

/// Writes the environment template to `path`. An existing file is kept.
///
/// # Errors
///
/// Returns an IO error, including when the file already exists.
pub fn create_config(path: &Path) -> Result<()> {
    let json = Environments::template().to_json()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| MigrateError::io(parent, e))?;
    }
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| MigrateError::io(path, e))?;
    file.write_all(json.as_bytes())
        .map_err(|e| MigrateError::io(path, e))?;
    info!(path = %path.display(), "created config");
    Ok(())
}
