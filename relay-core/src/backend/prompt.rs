//! Prompt assembly shared by both backends.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::traits::Attachment;

const BASE_SYSTEM_PROMPT: &str = "You are an expert Senior Web Developer. \
The user is working in a multi-file web IDE. \
Always return complete file replacements in markdown fenced blocks where the fence label is the filename.";

/// Build the system prompt: base instructions, optional user additions, and
/// the current project files serialized as JSON (path order is
/// deterministic).
pub fn build_system_prompt(vfs: &BTreeMap<String, String>, custom: Option<&str>) -> String {
    let mut prompt = BASE_SYSTEM_PROMPT.to_string();
    if let Some(custom) = custom.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\n\nUser system prompt:\n");
        prompt.push_str(custom);
    }
    let files = serde_json::to_string_pretty(vfs).unwrap_or_else(|_| "{}".to_string());
    format!("{prompt}\n\nCurrent project files:\n{files}")
}

/// User message content for a chat-completions body: plain text, or a
/// multi-part list of text plus one image reference per image attachment.
pub fn build_user_content(message: &str, attachments: &[Attachment]) -> Value {
    if attachments.is_empty() {
        return Value::String(message.to_string());
    }

    let mut parts = vec![json!({"type": "text", "text": message})];
    for attachment in attachments.iter().filter(|a| a.is_image()) {
        parts.push(json!({
            "type": "image_url",
            "image_url": {
                "url": format!("data:{};base64,{}", attachment.mime_type, attachment.data_base64),
            },
        }));
    }
    Value::Array(parts)
}

/// Prompt composed for the CLI backend, which cannot receive binary
/// payloads: attachments are reduced to a listing of their names.
pub fn compose_cli_prompt(system_prompt: &str, message: &str, attachments: &[Attachment]) -> String {
    let mut user_prompt = message.trim().to_string();
    if !attachments.is_empty() {
        let names: Vec<&str> = attachments.iter().map(|a| a.name.as_str()).collect();
        user_prompt.push_str("\n\nAttached files: ");
        user_prompt.push_str(&names.join(", "));
    }
    format!("System instructions:\n{system_prompt}\n\nUser request:\n{user_prompt}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str, mime: &str) -> Attachment {
        Attachment {
            name: name.to_string(),
            mime_type: mime.to_string(),
            data_base64: "aGVsbG8=".to_string(),
        }
    }

    #[test]
    fn system_prompt_includes_project_files() {
        let mut vfs = BTreeMap::new();
        vfs.insert("index.html".to_string(), "<html></html>".to_string());

        let prompt = build_system_prompt(&vfs, None);
        assert!(prompt.starts_with("You are an expert Senior Web Developer."));
        assert!(prompt.contains("Current project files:"));
        assert!(prompt.contains("index.html"));
    }

    #[test]
    fn system_prompt_appends_custom_instructions() {
        let vfs = BTreeMap::new();
        let prompt = build_system_prompt(&vfs, Some("  prefer Tailwind  "));
        assert!(prompt.contains("User system prompt:\nprefer Tailwind"));

        let blank = build_system_prompt(&vfs, Some("   "));
        assert!(!blank.contains("User system prompt:"));
    }

    #[test]
    fn user_content_is_plain_text_without_attachments() {
        let content = build_user_content("hi there", &[]);
        assert_eq!(content, Value::String("hi there".to_string()));
    }

    #[test]
    fn user_content_inlines_only_image_attachments() {
        let attachments = vec![
            attachment("shot.png", "image/png"),
            attachment("notes.txt", "text/plain"),
        ];
        let content = build_user_content("look", &attachments);

        let parts = content.as_array().expect("multi-part content");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[0]["text"], "look");
        assert_eq!(parts[1]["type"], "image_url");
        let url = parts[1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn cli_prompt_lists_attachment_names() {
        let attachments = vec![
            attachment("a.png", "image/png"),
            attachment("b.txt", "text/plain"),
        ];
        let prompt = compose_cli_prompt("system stuff", "  do the thing  ", &attachments);
        assert!(prompt.starts_with("System instructions:\nsystem stuff"));
        assert!(prompt.contains("User request:\ndo the thing"));
        assert!(prompt.ends_with("Attached files: a.png, b.txt"));
    }

    #[test]
    fn cli_prompt_without_attachments_has_no_listing() {
        let prompt = compose_cli_prompt("sys", "msg", &[]);
        assert!(!prompt.contains("Attached files:"));
    }
}
