//! Augmented prompt construction.

use std::fmt::Write;

use crate::config::AssistantConfig;
use crate::model::PromptContext;
use crate::tools::{ToolSet, ToolSpec};

/// Build the prompt context for one turn: persona, the catalog of enabled
/// tools with the call syntax, the static user context, then the user text.
pub fn build_prompt(config: &AssistantConfig, tools: &ToolSet, user: &str) -> PromptContext {
    let mut system = config.persona.trim().to_string();

    if !tools.is_empty() {
        let syntax = &config.syntax;
        push_block(&mut system, "# Tools");
        let _ = write!(
            system,
            "\nTo use a tool, reply with exactly:\n{}{{\"name\": \"<tool name>\", \"parameters\": {{...}}}}{}\n\
             You may call several tools in one reply. Available tools:",
            syntax.open_marker, syntax.close_marker,
        );
        for spec in tools.specs() {
            system.push('\n');
            describe_tool(&mut system, spec);
        }
    }

    let user_context = config.user_context.trim();
    if !user_context.is_empty() {
        push_block(&mut system, user_context);
    }

    PromptContext {
        system,
        prompt: user.trim().to_string(),
        stop: config.syntax.control_tokens.clone(),
    }
}

fn push_block(system: &mut String, block: &str) {
    if !system.is_empty() {
        system.push_str("\n\n");
    }
    system.push_str(block);
}

fn describe_tool(out: &mut String, spec: &ToolSpec) {
    let _ = write!(out, "- {}: {}", spec.name, spec.description);
    for param in &spec.parameters {
        let need = if param.required { "required" } else { "optional" };
        let _ = write!(
            out,
            "\n  - {} ({}, {}): {}",
            param.name,
            param.kind.as_str(),
            need,
            param.description
        );
        if let Some(allowed) = &param.allowed {
            let _ = write!(out, " One of: {}.", allowed.join(", "));
        }
    }
}
