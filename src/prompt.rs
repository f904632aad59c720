// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Prompt assembly for the completion call.
//!
//! [`assemble`] deterministically combines system instructions, uploaded
//! document context, retrieved knowledge context, prior conversation history,
//! and the new user message into one ordered message list.
//!
//! The concatenation order is an invariant: document context before retrieved
//! knowledge context before history. The player's own sheet anchors the
//! model's attention ahead of generic world lore, and both precede the
//! transcript so instructions are never buried by long histories. Reordering
//! changes model behavior.

use serde::{Deserialize, Serialize};

use crate::retrieval::{ContextBlock, DocumentBlock};

/// Default system prompt for the Sága dungeon master.
pub const SAGA_SYSTEM_PROMPT: &str = r#"You are Sága, an AI Dungeon Master. Be cinematic, fair, and immersive.
Use D&D 5e logic. For any spoken narration or dialogue, include [Voice: CharacterName] before the sentence and wrap the sentence in quotes.
Example:
[Voice: Saga] "The torchlight flickers across the ruins."
[Voice: Nyra] "Halt! Who goes there?"
Keep paragraphs concise. Do not include code blocks."#;

/// Message role on the completion wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in the ordered prompt list, OpenAI-compatible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A prior history entry supplied by the caller. Only user and assistant
/// roles are accepted on the turn request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: HistoryRole,
    pub content: String,
}

/// Roles permitted in caller-supplied history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

impl From<HistoryRole> for Role {
    fn from(role: HistoryRole) -> Self {
        match role {
            HistoryRole::User => Role::User,
            HistoryRole::Assistant => Role::Assistant,
        }
    }
}

/// Build the ordered message list for one turn.
///
/// Order: system instructions, system-injected document context (if any),
/// system-injected retrieved context (if any), the full prior history in its
/// original order, and the new user message last. Pure and deterministic.
pub fn assemble(
    system_prompt: &str,
    documents: &[DocumentBlock],
    knowledge: &[ContextBlock],
    history: &[HistoryMessage],
    user_message: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 4);

    messages.push(ChatMessage::system(system_prompt));

    if !documents.is_empty() {
        let mut block = String::from("Player Sheets:\n");
        for doc in documents {
            block.push_str(&format!("--- {} ---\n{}\n", doc.label, doc.content));
        }
        messages.push(ChatMessage::system(block));
    }

    if !knowledge.is_empty() {
        let joined = knowledge
            .iter()
            .map(|block| block.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        messages.push(ChatMessage::system(format!("Reference Context:\n{joined}")));
    }

    for entry in history {
        messages.push(ChatMessage {
            role: entry.role.into(),
            content: entry.content.clone(),
        });
    }

    messages.push(ChatMessage::user(user_message));
    messages
}
