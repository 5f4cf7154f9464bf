// ── Library Directory ──
//
// A library is a directory on disk:
//   mindspire/
//     mindspire.yaml      settings
//     data/snapshot.json  knowledge bases and items
//     .gitignore          ignores temp files

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mindspire_core::{PersistencePort, Snapshot};

pub mod library;
pub mod markdown;
pub mod settings;

pub use library::Library;
pub use settings::{Settings, Theme};

// ── Constants ──

const SETTINGS_FILE: &str = "mindspire.yaml";
const DATA_DIR: &str = "data";
const SNAPSHOT_FILE: &str = "snapshot.json";
const GITIGNORE_CONTENT: &str = "*.tmp\n";

// ── Types ──

/// Handle to a library directory on disk.
#[derive(Debug, Clone)]
pub struct LibraryStore {
    pub root: PathBuf,
}

// ── Public API ──

impl LibraryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory layout. Idempotent: existing files are kept.
    pub fn init(&self) -> Result<()> {
        let data_dir = self.root.join(DATA_DIR);
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating directory: {}", data_dir.display()))?;

        if !self.settings_path().exists() {
            self.write_settings(&Settings::default())?;
        }

        let gitignore = self.root.join(".gitignore");
        if !gitignore.exists() {
            fs::write(&gitignore, GITIGNORE_CONTENT).context("writing .gitignore")?;
        }

        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.settings_path().exists()
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(DATA_DIR).join(SNAPSHOT_FILE)
    }

    /// Read settings, falling back to defaults when the file does not exist.
    pub fn read_settings(&self) -> Result<Settings> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading settings: {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(&content)
            .with_context(|| format!("parsing settings: {}", path.display()))
    }

    pub fn write_settings(&self, settings: &Settings) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("creating directory: {}", self.root.display()))?;
        let yaml = settings.to_yaml()?;
        fs::write(self.settings_path(), yaml).context("writing mindspire.yaml")?;
        Ok(())
    }
}

impl PersistencePort for LibraryStore {
    fn load(&self) -> mindspire_core::Result<Option<Snapshot>> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let snapshot = Snapshot::from_json(&content)?;
        Ok(Some(snapshot).filter(Snapshot::is_usable))
    }

    /// Write to a temp file next to the snapshot, then rename over it.
    fn save(&self, snapshot: &Snapshot) -> mindspire_core::Result<()> {
        let path = self.snapshot_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, snapshot.to_json()?)?;
        fs::rename(&tmp, &path)?;
        log::debug!("saved snapshot to {}", path.display());
        Ok(())
    }
}

/// Resolve the library root, defaulting to `./mindspire`.
pub fn resolve_root(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("mindspire"))
}
