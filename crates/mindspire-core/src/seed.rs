// ── Seed Content ──
//
// Built-in knowledge bases used when persistence has nothing to offer.

use crate::snapshot::Snapshot;
use crate::types::{now, Item, ItemType, KnowledgeBase};

struct SeedItem {
    id: &'static str,
    kb_id: &'static str,
    parent_id: Option<&'static str>,
    name: &'static str,
    content: Option<&'static str>,
    order: i64,
}

const SEED_KNOWLEDGE_BASES: &[(&str, &str, &str)] = &[
    ("kb-eng", "Engineering Guide", "Technical documentation and standards"),
    ("kb-product", "Product Roadmap", "Future plans and feature specs"),
    ("kb-notes", "Meeting Notes", "Internal meeting records"),
];

const SEED_ITEMS: &[SeedItem] = &[
    SeedItem {
        id: "f-eng-1",
        kb_id: "kb-eng",
        parent_id: None,
        name: "Onboarding",
        content: None,
        order: 0,
    },
    SeedItem {
        id: "doc-eng-1",
        kb_id: "kb-eng",
        parent_id: Some("f-eng-1"),
        name: "Setup Environment",
        content: Some(concat!(
            "# Environment Setup\n\n## Prerequisites\n\n",
            "- Node.js v18+\n- Docker\n- VS Code\n\n## Installation\n\n",
            "```bash\nnpm install\nnpm start\n```",
        )),
        order: 0,
    },
    SeedItem {
        id: "doc-eng-2",
        kb_id: "kb-eng",
        parent_id: Some("f-eng-1"),
        name: "Key Contacts",
        content: Some(concat!(
            "# Key Contacts\n\n",
            "| Role | Name | Email |\n|------|------|-------|\n",
            "| CTO | Sarah | sarah@example.com |\n| Lead | Mike | mike@example.com |",
        )),
        order: 1,
    },
    SeedItem {
        id: "f-eng-2",
        kb_id: "kb-eng",
        parent_id: None,
        name: "Best Practices",
        content: None,
        order: 1,
    },
    SeedItem {
        id: "doc-eng-3",
        kb_id: "kb-eng",
        parent_id: Some("f-eng-2"),
        name: "React Patterns",
        content: Some(concat!(
            "# React Patterns\n\nWe prefer functional components and hooks.\n\n",
            "## Custom Hooks\n\nAlways prefix with `use`.\n\n",
            "```typescript\nconst useUser = () => { ... }\n```",
        )),
        order: 0,
    },
    SeedItem {
        id: "f-prod-1",
        kb_id: "kb-product",
        parent_id: None,
        name: "2024 Q1",
        content: None,
        order: 0,
    },
    SeedItem {
        id: "doc-prod-1",
        kb_id: "kb-product",
        parent_id: Some("f-prod-1"),
        name: "Features List",
        content: Some(concat!(
            "# Q1 Features\n\n",
            "1. **Dark Mode**: Support system preference.\n",
            "2. **Mobile App**: Beta release.\n3. **API v2**: GraphQL support.",
        )),
        order: 0,
    },
    SeedItem {
        id: "f-prod-2",
        kb_id: "kb-product",
        parent_id: None,
        name: "Ideas",
        content: None,
        order: 1,
    },
    SeedItem {
        id: "doc-prod-2",
        kb_id: "kb-product",
        parent_id: Some("f-prod-2"),
        name: "Backlog",
        content: Some("# Backlog\n\n- [ ] User avatars\n- [ ] Social login\n- [ ] Export to PDF"),
        order: 0,
    },
    SeedItem {
        id: "f-meet-1",
        kb_id: "kb-notes",
        parent_id: None,
        name: "Weekly Sync",
        content: None,
        order: 0,
    },
    SeedItem {
        id: "doc-meet-1",
        kb_id: "kb-notes",
        parent_id: Some("f-meet-1"),
        name: "2023-10-01",
        content: Some(concat!(
            "# Sync 2023-10-01\n\n## Attendees\n\n- All team\n\n## Updates\n\n",
            "- Project X is 80% complete.\n- Need more design resources.",
        )),
        order: 0,
    },
    SeedItem {
        id: "doc-meet-2",
        kb_id: "kb-notes",
        parent_id: None,
        name: "All Hands",
        content: Some(concat!(
            "# All Hands Meeting\n\n**Date**: Monthly\n\n## Agenda\n\n",
            "1. Company Metrics\n2. Team Shoutouts\n3. Q&A",
        )),
        order: 1,
    },
];

/// Default library content, timestamped now.
pub fn default_snapshot() -> Snapshot {
    let ts = now();

    let knowledge_bases = SEED_KNOWLEDGE_BASES
        .iter()
        .map(|(id, name, description)| KnowledgeBase {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: ts,
        })
        .collect();

    let items = SEED_ITEMS
        .iter()
        .map(|seed| Item {
            id: seed.id.to_string(),
            kb_id: seed.kb_id.to_string(),
            parent_id: seed.parent_id.map(String::from),
            item_type: if seed.content.is_some() { ItemType::File } else { ItemType::Folder },
            name: seed.name.to_string(),
            content: seed.content.map(String::from),
            order: seed.order,
            created_at: ts,
            updated_at: ts,
        })
        .collect();

    Snapshot { knowledge_bases, items }
}
