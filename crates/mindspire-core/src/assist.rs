// ── AI Assist ──
//
// Prompt construction for the content generator and the rules for folding its
// answer back into a file. The generator itself lives outside the core; its
// text is applied verbatim.

use serde::{Deserialize, Serialize};

// ── Types ──

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AiAction {
    Summarize,
    Improve,
    Continue,
    FixGrammar,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Zh,
}

/// What to send to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system_instruction: String,
    pub prompt: String,
}

// ── Public API ──

pub fn build_prompt(
    content: &str,
    action: AiAction,
    language: Language,
    context: Option<&str>,
) -> Prompt {
    let zh = language == Language::Zh;

    let system_instruction = if zh {
        "你是一位专业的技术文档写作和编辑助手。仅输出请求的 Markdown 内容，不要包含对话填充语。"
    } else {
        "You are an expert technical writer and editor assistant. \
         Output only the requested markdown content without conversational filler."
    };

    let lead = match (action, zh) {
        (AiAction::Summarize, false) => {
            "Please summarize the following markdown content into a concise paragraph:"
        }
        (AiAction::Summarize, true) => "请将以下 Markdown 内容总结为一个简洁的段落：",
        (AiAction::Improve, false) => {
            "Rewrite the following markdown content to improve clarity, flow, \
             and professional tone. Keep the same meaning:"
        }
        (AiAction::Improve, true) => "重写以下 Markdown 内容以提高清晰度、流畅度和专业语气。保持原意不变：",
        (AiAction::FixGrammar, false) => {
            "Fix any grammar, spelling, or punctuation errors in the following markdown content:"
        }
        (AiAction::FixGrammar, true) => "修复以下 Markdown 内容中的任何语法、拼写或标点错误：",
        (AiAction::Continue, false) => {
            "Continue writing this markdown article based on the context and style. \
             Provide the next 2-3 paragraphs:"
        }
        (AiAction::Continue, true) => "根据上下文和风格继续编写此 Markdown 文章。提供接下来的 2-3 个段落：",
    };

    let mut prompt = format!("{lead}\n\n{content}");
    if let Some(context) = context {
        if zh {
            prompt.push_str(&format!("\n\n额外背景/指令：{context}"));
        } else {
            prompt.push_str(&format!("\n\nAdditional Context/Instruction: {context}"));
        }
    }

    Prompt {
        system_instruction: system_instruction.to_string(),
        prompt,
    }
}

pub fn summary_prefix(language: Language) -> &'static str {
    match language {
        Language::En => "Summary",
        Language::Zh => "总结",
    }
}

/// Fold generated text into the current content.
///
/// Continue appends after a blank line, Improve and FixGrammar replace, and
/// Summarize appends a quoted annotation.
pub fn apply_generated(
    content: &str,
    action: AiAction,
    generated: &str,
    language: Language,
) -> String {
    match action {
        AiAction::Continue => format!("{content}\n\n{generated}"),
        AiAction::Improve | AiAction::FixGrammar => generated.to_string(),
        AiAction::Summarize => {
            format!("{content}\n\n> **{}**: {generated}", summary_prefix(language))
        }
    }
}

impl std::fmt::Display for AiAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiAction::Summarize => write!(f, "summarize"),
            AiAction::Improve => write!(f, "improve"),
            AiAction::Continue => write!(f, "continue"),
            AiAction::FixGrammar => write!(f, "fix_grammar"),
        }
    }
}

impl std::str::FromStr for AiAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "summarize" => Ok(AiAction::Summarize),
            "improve" => Ok(AiAction::Improve),
            "continue" => Ok(AiAction::Continue),
            "fix_grammar" => Ok(AiAction::FixGrammar),
            other => Err(format!("unknown AI action: {other}")),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::En => write!(f, "en"),
            Language::Zh => write!(f, "zh"),
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "zh" => Ok(Language::Zh),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}
