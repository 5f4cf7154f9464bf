use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use mindspire_core::assist::build_prompt;
use mindspire_core::{AiAction, ItemType, Language, MindspireError, MoveOutcome, MovePosition};
use mindspire_store::{Library, LibraryStore};
use rmcp::model::*;
use rmcp::schemars::JsonSchema;
use rmcp::serde::{Deserialize, Serialize};
use rmcp::{tool, ServerHandler, ServiceExt};

// ── Types ──

/// Input for the list_tree tool.
#[derive(Debug, Deserialize, JsonSchema)]
struct ListTreeInput {
    /// Knowledge base id (see list_knowledge_bases)
    kb_id: String,
}

/// Input for tools addressing a single item.
#[derive(Debug, Deserialize, JsonSchema)]
struct ItemInput {
    /// Item id
    id: String,
}

/// Input for the create_item tool.
#[derive(Debug, Deserialize, JsonSchema)]
struct CreateItemInput {
    /// Knowledge base id
    kb_id: String,
    /// Parent folder id; omit to create at the root
    parent_id: Option<String>,
    /// "folder" or "file"
    item_type: String,
    /// Display name
    name: String,
}

/// Input for the rename_item tool.
#[derive(Debug, Deserialize, JsonSchema)]
struct RenameItemInput {
    id: String,
    /// New name, must not be blank
    name: String,
}

/// Input for the edit_content tool.
#[derive(Debug, Deserialize, JsonSchema)]
struct EditContentInput {
    /// File id
    id: String,
    /// Full markdown content replacing the current body
    content: String,
}

/// Input for the move_item tool.
#[derive(Debug, Deserialize, JsonSchema)]
struct MoveItemInput {
    /// Item being moved
    id: String,
    /// Drop target; ignored for "root"
    target_id: Option<String>,
    /// "into", "before", "after" or "root"
    position: String,
}

/// Input for the ai_prompt tool.
#[derive(Debug, Deserialize, JsonSchema)]
struct AiPromptInput {
    /// File id
    id: String,
    /// "summarize", "improve", "continue" or "fix_grammar"
    action: String,
    /// Extra instructions appended to the prompt
    context: Option<String>,
    /// "en" or "zh"; defaults to the library setting
    language: Option<String>,
}

/// Input for the apply_ai_result tool.
#[derive(Debug, Deserialize, JsonSchema)]
struct ApplyAiResultInput {
    /// File id
    id: String,
    /// The action the text was generated for
    action: String,
    /// Generated markdown
    generated: String,
    /// "en" or "zh"; defaults to the library setting
    language: Option<String>,
}

/// One row of the list_tree output.
#[derive(Debug, Serialize)]
struct TreeRow {
    depth: usize,
    id: String,
    #[serde(rename = "type")]
    item_type: String,
    name: String,
    order: i64,
}

/// The MindSpire MCP server.
#[derive(Clone)]
pub struct MindspireServer {
    library: Arc<Mutex<Library<LibraryStore>>>,
    language: Language,
}

// ── Helpers ──

fn internal(msg: impl Into<String>) -> rmcp::Error {
    rmcp::Error::internal_error(msg.into(), None)
}

fn json_result(value: serde_json::Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(value.to_string())])
}

fn parse<T>(value: &str) -> Result<T, rmcp::Error>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse().map_err(|e: String| internal(e))
}

// ── Public API ──

#[tool(tool_box)]
impl MindspireServer {
    pub fn new(library: Library<LibraryStore>, language: Language) -> Self {
        Self {
            library: Arc::new(Mutex::new(library)),
            language,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Library<LibraryStore>>, rmcp::Error> {
        self.library.lock().map_err(|_| internal("library lock poisoned"))
    }

    fn language_or_default(&self, language: Option<&str>) -> Result<Language, rmcp::Error> {
        language.map(parse::<Language>).transpose().map(|l| l.unwrap_or(self.language))
    }

    #[tool(
        name = "list_knowledge_bases",
        description = "List all knowledge bases with their ids, names and item counts"
    )]
    fn list_knowledge_bases(&self) -> Result<CallToolResult, rmcp::Error> {
        let library = self.lock()?;
        let engine = library.engine();
        let kbs: Vec<serde_json::Value> = engine
            .knowledge_bases()
            .iter()
            .map(|kb| {
                serde_json::json!({
                    "id": kb.id,
                    "name": kb.name,
                    "description": kb.description,
                    "item_count": engine.tree(&kb.id).len(),
                })
            })
            .collect();
        Ok(json_result(serde_json::json!({ "knowledge_bases": kbs })))
    }

    #[tool(
        name = "list_tree",
        description = "List every folder and file of a knowledge base in display order with depth"
    )]
    fn list_tree(&self, #[tool(aggr)] input: ListTreeInput) -> Result<CallToolResult, rmcp::Error> {
        let library = self.lock()?;
        let engine = library.engine();
        if !engine.knowledge_bases().iter().any(|kb| kb.id == input.kb_id) {
            return Err(internal(format!("unknown knowledge base: {}", input.kb_id)));
        }
        let rows: Vec<TreeRow> = engine
            .tree(&input.kb_id)
            .into_iter()
            .map(|entry| TreeRow {
                depth: entry.depth,
                id: entry.item.id.clone(),
                item_type: entry.item.item_type.to_string(),
                name: entry.item.name.clone(),
                order: entry.item.order,
            })
            .collect();
        Ok(json_result(serde_json::json!({ "kb_id": input.kb_id, "items": rows })))
    }

    #[tool(
        name = "read_item",
        description = "Read an item with its content and breadcrumb path"
    )]
    fn read_item(&self, #[tool(aggr)] input: ItemInput) -> Result<CallToolResult, rmcp::Error> {
        let library = self.lock()?;
        let engine = library.engine();
        let item = engine
            .get(&input.id)
            .ok_or_else(|| internal(MindspireError::ItemNotFound(input.id.clone()).to_string()))?;
        Ok(json_result(serde_json::json!({
            "item": item,
            "breadcrumbs": engine.breadcrumbs(&input.id),
        })))
    }

    #[tool(
        name = "create_item",
        description = "Create a folder or markdown file at the end of its sibling list"
    )]
    fn create_item(
        &self,
        #[tool(aggr)] input: CreateItemInput,
    ) -> Result<CallToolResult, rmcp::Error> {
        let item_type: ItemType = parse(&input.item_type)?;
        let mut library = self.lock()?;
        let item = library
            .create_item(&input.kb_id, input.parent_id.as_deref(), item_type, &input.name)
            .map_err(|e| internal(format!("create failed: {e:#}")))?;
        log::info!("created {} {}", item.item_type, item.id);
        Ok(json_result(serde_json::json!({ "item": item })))
    }

    #[tool(name = "rename_item", description = "Rename a folder or file")]
    fn rename_item(
        &self,
        #[tool(aggr)] input: RenameItemInput,
    ) -> Result<CallToolResult, rmcp::Error> {
        let mut library = self.lock()?;
        let renamed = library
            .rename_item(&input.id, &input.name)
            .map_err(|e| internal(format!("rename failed: {e:#}")))?;
        Ok(json_result(serde_json::json!({ "renamed": renamed })))
    }

    #[tool(
        name = "delete_item",
        description = "Delete an item and, for folders, everything inside it"
    )]
    fn delete_item(&self, #[tool(aggr)] input: ItemInput) -> Result<CallToolResult, rmcp::Error> {
        let mut library = self.lock()?;
        let removed = library
            .delete_item(&input.id)
            .map_err(|e| internal(format!("delete failed: {e:#}")))?;
        Ok(json_result(serde_json::json!({ "removed": removed })))
    }

    #[tool(name = "edit_content", description = "Replace the markdown content of a file")]
    fn edit_content(
        &self,
        #[tool(aggr)] input: EditContentInput,
    ) -> Result<CallToolResult, rmcp::Error> {
        let mut library = self.lock()?;
        let updated = library
            .edit_content(&input.id, input.content)
            .map_err(|e| internal(format!("edit failed: {e:#}")))?;
        library
            .flush()
            .map_err(|e| internal(format!("save failed: {e:#}")))?;
        Ok(json_result(serde_json::json!({ "updated": updated })))
    }

    #[tool(
        name = "move_item",
        description = "Move an item into a folder, beside a sibling, or to the root. \
                       Invalid moves are reported, not applied"
    )]
    fn move_item(&self, #[tool(aggr)] input: MoveItemInput) -> Result<CallToolResult, rmcp::Error> {
        let position: MovePosition = parse(&input.position)?;
        let mut library = self.lock()?;
        let outcome = library
            .move_item(&input.id, input.target_id.as_deref(), position)
            .map_err(|e| internal(format!("move failed: {e:#}")))?;
        let result = match outcome {
            MoveOutcome::Moved(moved) => serde_json::json!({
                "moved": true,
                "id": moved.id,
                "kb_id": moved.kb_id,
                "parent_id": moved.parent_id,
                "order": moved.order,
            }),
            MoveOutcome::Rejected(reason) => serde_json::json!({
                "moved": false,
                "reason": reason.to_string(),
            }),
        };
        Ok(json_result(result))
    }

    #[tool(
        name = "ai_prompt",
        description = "Build the system instruction and prompt for an AI writing action on a file"
    )]
    fn ai_prompt(&self, #[tool(aggr)] input: AiPromptInput) -> Result<CallToolResult, rmcp::Error> {
        let action: AiAction = parse(&input.action)?;
        let language = self.language_or_default(input.language.as_deref())?;
        let library = self.lock()?;
        let item = library
            .engine()
            .get(&input.id)
            .filter(|i| i.is_file())
            .ok_or_else(|| internal(format!("file not found: {}", input.id)))?;
        let prompt = build_prompt(
            item.content.as_deref().unwrap_or_default(),
            action,
            language,
            input.context.as_deref(),
        );
        Ok(json_result(serde_json::json!({
            "system_instruction": prompt.system_instruction,
            "prompt": prompt.prompt,
        })))
    }

    #[tool(
        name = "apply_ai_result",
        description = "Fold generated text into a file: continue appends, summarize appends a \
                       quoted summary, improve and fix_grammar replace"
    )]
    fn apply_ai_result(
        &self,
        #[tool(aggr)] input: ApplyAiResultInput,
    ) -> Result<CallToolResult, rmcp::Error> {
        let action: AiAction = parse(&input.action)?;
        let language = self.language_or_default(input.language.as_deref())?;
        let mut library = self.lock()?;
        let applied = library
            .apply_generated(&input.id, action, &input.generated, language)
            .map_err(|e| internal(format!("apply failed: {e:#}")))?;
        library
            .flush()
            .map_err(|e| internal(format!("save failed: {e:#}")))?;
        let content = library.engine().get(&input.id).and_then(|i| i.content.clone());
        Ok(json_result(serde_json::json!({ "applied": applied, "content": content })))
    }
}

#[tool(tool_box)]
impl ServerHandler for MindspireServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "MindSpire knowledge base editor. Use list_knowledge_bases and list_tree to \
                 browse, read_item to read a file. create_item, rename_item, delete_item, \
                 edit_content and move_item change the library. ai_prompt builds a writing \
                 prompt for a file and apply_ai_result folds the generated text back in."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

/// Start the MindSpire MCP server on stdio transport.
pub async fn run_mcp_server(store: LibraryStore) -> Result<()> {
    eprintln!("mindspire-mcp: serving library at {}", store.root.display());
    let settings = store.read_settings()?;
    let language = settings.language;
    let library = Library::open(store, &settings)?;
    let server = MindspireServer::new(library, language);
    let service = server
        .serve(rmcp::transport::io::stdio())
        .await
        .map_err(|e| anyhow::anyhow!("failed to start MCP server: {e}"))?;

    service.waiting().await?;

    Ok(())
}
