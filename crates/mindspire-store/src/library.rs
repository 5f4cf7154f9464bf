// ── Library Session ──
//
// Pairs the engine with a persistence port. Every structural mutation that
// changes state hands the full snapshot to the port. With auto-save off,
// content edits only mark the session dirty until `flush`.

use std::path::Path;

use anyhow::{Context, Result};
use mindspire_core::{
    seed, AiAction, Engine, Item, ItemId, ItemType, KnowledgeBase, Language, MoveOutcome,
    MovePosition, PersistencePort,
};

use crate::markdown::{self, ImportSummary};
use crate::settings::Settings;

// ── Types ──

pub struct Library<P: PersistencePort> {
    engine: Engine,
    port: P,
    auto_save: bool,
    dirty: bool,
}

// ── Public API ──

impl<P: PersistencePort> Library<P> {
    /// Load from the port, or seed default content when it has nothing.
    pub fn open(port: P, settings: &Settings) -> Result<Self> {
        let loaded = port.load().context("loading library snapshot")?;
        let (engine, seeded) = match loaded {
            Some(snapshot) => (Engine::from_snapshot(snapshot, settings.engine_config()), false),
            None => {
                log::info!("no stored library, seeding default content");
                (Engine::from_snapshot(seed::default_snapshot(), settings.engine_config()), true)
            }
        };

        let mut library = Self {
            engine,
            port,
            auto_save: settings.auto_save,
            dirty: false,
        };
        if seeded {
            library.persist()?;
        }
        Ok(library)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Content edits not yet handed to the port.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.dirty {
            self.persist()?;
        }
        Ok(())
    }

    pub fn create_knowledge_base(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<KnowledgeBase> {
        let kb = self.engine.create_knowledge_base(name, description)?;
        self.persist()?;
        Ok(kb)
    }

    pub fn create_item(
        &mut self,
        kb_id: &str,
        parent_id: Option<&str>,
        item_type: ItemType,
        name: &str,
    ) -> Result<Item> {
        let item = self.engine.create_item(kb_id, parent_id, item_type, name)?;
        self.persist()?;
        Ok(item)
    }

    pub fn rename_item(&mut self, id: &str, new_name: &str) -> Result<bool> {
        let renamed = self.engine.rename_item(id, new_name)?;
        if renamed {
            self.persist()?;
        }
        Ok(renamed)
    }

    pub fn edit_content(&mut self, id: &str, content: impl Into<String>) -> Result<bool> {
        let edited = self.engine.edit_content(id, content);
        if edited {
            self.content_changed()?;
        }
        Ok(edited)
    }

    pub fn apply_generated(
        &mut self,
        id: &str,
        action: AiAction,
        generated: &str,
        language: Language,
    ) -> Result<bool> {
        let applied = self.engine.apply_generated(id, action, generated, language);
        if applied {
            self.content_changed()?;
        }
        Ok(applied)
    }

    pub fn delete_item(&mut self, id: &str) -> Result<Vec<ItemId>> {
        let removed = self.engine.delete_item(id);
        if !removed.is_empty() {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn move_item(
        &mut self,
        dragged_id: &str,
        target_id: Option<&str>,
        position: MovePosition,
    ) -> Result<MoveOutcome> {
        let outcome = self.engine.move_item(dragged_id, target_id, position);
        if outcome.is_moved() {
            self.persist()?;
        }
        Ok(outcome)
    }

    /// Import a markdown directory as a new knowledge base, saving once at the end.
    pub fn import_markdown(&mut self, dir: &Path, kb_name: &str) -> Result<ImportSummary> {
        let summary = markdown::import_into(&mut self.engine, dir, kb_name)?;
        self.persist()?;
        Ok(summary)
    }

    // ── Helpers ──

    fn content_changed(&mut self) -> Result<()> {
        if self.auto_save {
            self.persist()
        } else {
            self.dirty = true;
            Ok(())
        }
    }

    /// Hand the full snapshot to the port. On failure the in-memory state is
    /// kept and the session stays dirty.
    fn persist(&mut self) -> Result<()> {
        self.dirty = true;
        self.port
            .save(&self.engine.snapshot())
            .context("saving library snapshot")?;
        self.dirty = false;
        Ok(())
    }
}
