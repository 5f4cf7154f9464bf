// ── Library Settings ──
//
// `mindspire.yaml` at the library root. Every field has a default so a
// missing or partial file still loads.

use anyhow::{bail, Context, Result};
use mindspire_core::{CrossKbPolicy, EngineConfig, Language};
use serde::{Deserialize, Serialize};

// ── Types ──

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub theme: Theme,
    /// Persist content edits immediately. Structural changes are always saved.
    #[serde(default = "default_true")]
    pub auto_save: bool,
    #[serde(default)]
    pub cross_kb_moves: CrossKbPolicy,
}

// ── Helpers ──

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: Language::default(),
            theme: Theme::default(),
            auto_save: true,
            cross_kb_moves: CrossKbPolicy::default(),
        }
    }
}

// ── Public API ──

impl Settings {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            cross_kb_moves: self.cross_kb_moves,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("serializing settings")
    }

    /// Update one setting from its textual key and value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "language" => self.language = value.parse().map_err(anyhow::Error::msg)?,
            "theme" => {
                self.theme = match value {
                    "light" => Theme::Light,
                    "dark" => Theme::Dark,
                    "system" => Theme::System,
                    other => bail!("unknown theme: {other}"),
                }
            }
            "auto_save" => {
                self.auto_save = match value {
                    "true" | "on" | "yes" => true,
                    "false" | "off" | "no" => false,
                    other => bail!("expected true or false, got {other}"),
                }
            }
            "cross_kb_moves" => {
                self.cross_kb_moves = match value {
                    "reject" => CrossKbPolicy::Reject,
                    "adopt" => CrossKbPolicy::Adopt,
                    other => bail!("expected reject or adopt, got {other}"),
                }
            }
            other => bail!("unknown setting: {other}"),
        }
        Ok(())
    }
}
