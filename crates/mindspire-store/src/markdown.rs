// ── Markdown Import / Export ──
//
// A knowledge base maps onto a directory tree: folders become directories,
// files become `<name>.md`. Sibling order is kept in a two-digit prefix
// (`00-`, `01-`, ...) so a sorted directory listing reproduces it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use mindspire_core::{Engine, ItemId, ItemType, MindspireError};

// ── Types ──

/// Summary of a markdown import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub kb_id: String,
    pub folders: usize,
    pub files: usize,
    pub skipped: usize,
}

// ── Helpers ──

/// Make an item name safe to use as a single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Strip a `NN-` ordering prefix. Only exactly two digits count, so names
/// like `2023-10-01` survive.
pub fn strip_order_prefix(name: &str) -> &str {
    let bytes = name.as_bytes();
    let prefixed = bytes.len() > 3
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && bytes[2] == b'-';
    if prefixed {
        &name[3..]
    } else {
        name
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().is_some_and(|s| s.starts_with('.'))
}

// ── Export ──

/// Write every item of a knowledge base under `dir`. Returns the number of
/// folders and files written.
pub fn export_markdown(engine: &Engine, kb_id: &str, dir: &Path) -> Result<usize> {
    if !engine.knowledge_bases().iter().any(|kb| kb.id == kb_id) {
        return Err(MindspireError::UnknownKnowledgeBase(kb_id.to_string()).into());
    }
    fs::create_dir_all(dir).with_context(|| format!("creating directory: {}", dir.display()))?;
    let written = export_level(engine, kb_id, None, dir)?;
    log::info!("exported {written} items of {kb_id} to {}", dir.display());
    Ok(written)
}

fn export_level(
    engine: &Engine,
    kb_id: &str,
    parent_id: Option<&str>,
    dir: &Path,
) -> Result<usize> {
    let mut written = 0;
    for (index, item) in engine.children_of(kb_id, parent_id).into_iter().enumerate() {
        let base = format!("{index:02}-{}", sanitize_file_name(&item.name));
        match item.item_type {
            ItemType::Folder => {
                let path = dir.join(&base);
                fs::create_dir_all(&path)
                    .with_context(|| format!("creating directory: {}", path.display()))?;
                written += 1 + export_level(engine, kb_id, Some(&item.id), &path)?;
            }
            ItemType::File => {
                let path = dir.join(format!("{base}.md"));
                fs::write(&path, item.content.as_deref().unwrap_or_default())
                    .with_context(|| format!("writing file: {}", path.display()))?;
                written += 1;
            }
        }
    }
    Ok(written)
}

// ── Import ──

/// Create a knowledge base named `kb_name` from a directory of markdown
/// files. Every item goes through the engine. Hidden entries, non-markdown
/// files and entries with blank names are skipped.
///
/// The import runs against a copy of the engine that replaces `engine` only
/// once every entry is in; on error `engine` is unchanged.
pub fn import_into(engine: &mut Engine, dir: &Path, kb_name: &str) -> Result<ImportSummary> {
    if !dir.is_dir() {
        bail!("not a directory: {}", dir.display());
    }

    let mut staged = engine.clone();
    let summary = import_staged(&mut staged, dir, kb_name)?;
    *engine = staged;
    Ok(summary)
}

fn import_staged(engine: &mut Engine, dir: &Path, kb_name: &str) -> Result<ImportSummary> {
    let description = format!("Imported from {}", dir.display());
    let kb = engine.create_knowledge_base(kb_name, Some(&description))?;
    let mut summary = ImportSummary {
        kb_id: kb.id.clone(),
        folders: 0,
        files: 0,
        skipped: 0,
    };

    let mut folders: HashMap<PathBuf, ItemId> = HashMap::new();

    let walker = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("skipping unreadable entry: {e}");
                summary.skipped += 1;
                continue;
            }
        };
        let path = entry.path();

        let parent_id = match path.parent() {
            Some(p) if p == dir => None,
            Some(p) => match folders.get(p) {
                Some(id) => Some(id.clone()),
                None => {
                    summary.skipped += 1;
                    continue;
                }
            },
            None => None,
        };

        if entry.file_type().is_dir() {
            let raw = entry.file_name().to_string_lossy();
            let name = strip_order_prefix(&raw);
            if name.trim().is_empty() {
                log::warn!("skipping directory with a blank name: {}", path.display());
                summary.skipped += 1;
                continue;
            }
            let folder = engine.create_item(&kb.id, parent_id.as_deref(), ItemType::Folder, name)?;
            folders.insert(path.to_path_buf(), folder.id);
            summary.folders += 1;
            continue;
        }

        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            log::warn!("skipping non-markdown file: {}", path.display());
            summary.skipped += 1;
            continue;
        }

        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("skipping {}: {e}", path.display());
                summary.skipped += 1;
                continue;
            }
        };

        let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let name = strip_order_prefix(&stem);
        if name.trim().is_empty() {
            log::warn!("skipping file with a blank name: {}", path.display());
            summary.skipped += 1;
            continue;
        }
        let file = engine.create_item(&kb.id, parent_id.as_deref(), ItemType::File, name)?;
        engine.edit_content(&file.id, content);
        summary.files += 1;
    }

    log::info!(
        "imported {} folders and {} files into {} ({} skipped)",
        summary.folders,
        summary.files,
        kb.name,
        summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindspire_core::{seed, EngineConfig};

    fn seeded() -> Engine {
        Engine::from_snapshot(seed::default_snapshot(), EngineConfig::default())
    }

    fn relative_paths(root: &Path) -> Vec<String> {
        walkdir::WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_strip_order_prefix() {
        assert_eq!(strip_order_prefix("00-Onboarding"), "Onboarding");
        assert_eq!(strip_order_prefix("12-Plan"), "Plan");
        assert_eq!(strip_order_prefix("2023-10-01"), "2023-10-01");
        assert_eq!(strip_order_prefix("01-2023-10-01"), "2023-10-01");
        assert_eq!(strip_order_prefix("Notes"), "Notes");
        assert_eq!(strip_order_prefix("03-"), "03-");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("a/b"), "a-b");
        assert_eq!(sanitize_file_name("Q&A: notes?"), "Q&A- notes-");
        assert_eq!(sanitize_file_name("  "), "untitled");
        assert_eq!(sanitize_file_name(".."), "untitled");
    }

    #[test]
    fn test_export_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = seeded();

        let written = export_markdown(&engine, "kb-notes", tmp.path()).unwrap();
        assert_eq!(written, 3);
        assert_eq!(
            relative_paths(tmp.path()),
            vec![
                "00-Weekly Sync",
                "00-Weekly Sync/00-2023-10-01.md",
                "01-All Hands.md",
            ]
        );

        let body = fs::read_to_string(tmp.path().join("01-All Hands.md")).unwrap();
        assert!(body.starts_with("# All Hands Meeting"));
    }

    #[test]
    fn test_export_unknown_kb() {
        let tmp = tempfile::tempdir().unwrap();
        let err = export_markdown(&seeded(), "kb-missing", tmp.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MindspireError>(),
            Some(MindspireError::UnknownKnowledgeBase(id)) if id == "kb-missing"
        ));
    }

    #[test]
    fn test_import_restores_structure() {
        let tmp = tempfile::tempdir().unwrap();
        let mut engine = seeded();
        export_markdown(&engine, "kb-eng", tmp.path()).unwrap();

        let summary = import_into(&mut engine, tmp.path(), "Engineering Copy").unwrap();
        assert_eq!(summary.folders, 2);
        assert_eq!(summary.files, 3);
        assert_eq!(summary.skipped, 0);

        let original: Vec<(usize, String)> = engine
            .tree("kb-eng")
            .iter()
            .map(|e| (e.depth, e.item.name.clone()))
            .collect();
        let imported: Vec<(usize, String)> = engine
            .tree(&summary.kb_id)
            .iter()
            .map(|e| (e.depth, e.item.name.clone()))
            .collect();
        assert_eq!(imported, original);

        let setup = engine
            .tree(&summary.kb_id)
            .into_iter()
            .find(|e| e.item.name == "Setup Environment")
            .unwrap();
        assert_eq!(setup.item.content, engine.get("doc-eng-1").unwrap().content);
    }

    #[test]
    fn test_import_skips_hidden_and_foreign_files() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git/HEAD.md"), "ref").unwrap();
        fs::write(root.join("image.png"), [0u8, 1, 2]).unwrap();
        fs::write(root.join("b.md"), "# B").unwrap();
        fs::write(root.join("a.md"), "# A").unwrap();

        let mut engine = seeded();
        let summary = import_into(&mut engine, root, "Loose").unwrap();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.skipped, 1);

        let names: Vec<&str> = engine
            .children_of(&summary.kb_id, None)
            .into_iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_import_skips_blank_directory_names() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("a.md"), "# A").unwrap();
        fs::create_dir_all(root.join("\u{3000}")).unwrap();
        fs::write(root.join("\u{3000}").join("b.md"), "# B").unwrap();

        let mut engine = seeded();
        let summary = import_into(&mut engine, root, "Blank Dirs").unwrap();
        assert_eq!(summary.folders, 0);
        assert_eq!(summary.files, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(engine.tree(&summary.kb_id).len(), 1);
    }

    #[test]
    fn test_failed_import_leaves_engine_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.md"), "# A").unwrap();

        let mut engine = seeded();
        let before = engine.snapshot();
        assert!(import_into(&mut engine, tmp.path(), "   ").is_err());
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_import_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mut engine = seeded();
        let before = engine.knowledge_bases().len();
        assert!(import_into(&mut engine, &tmp.path().join("nope"), "X").is_err());
        assert_eq!(engine.knowledge_bases().len(), before);
    }
}
