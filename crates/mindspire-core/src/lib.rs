pub mod assist;
pub mod engine;
pub mod error;
pub mod guard;
pub mod query;
pub mod seed;
pub mod snapshot;
pub mod store;
pub mod types;

pub use assist::{AiAction, Language, Prompt};
pub use engine::{CrossKbPolicy, Engine, EngineConfig, MoveOutcome, MoveRejection, MovedItem};
pub use error::{MindspireError, Result};
pub use query::TreeEntry;
pub use snapshot::{MemoryPort, PersistencePort, Snapshot};
pub use store::ItemStore;
pub use types::{Breadcrumb, Item, ItemId, ItemType, KnowledgeBase, MovePosition};
