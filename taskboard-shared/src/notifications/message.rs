/// Structured notification bodies
///
/// Notifications are stored as plain text. Rich bodies are written as a
/// list of blocks and rendered to a small markdown subset:
///
/// ```text
/// # Heading 1
/// ## Heading 2
/// ### Heading 3
/// - bullet item
/// 1. numbered item
/// any other non-empty line is a paragraph
/// ```
///
/// Blank lines separate blocks and are otherwise ignored. A paragraph that
/// would read as another block kind is written with a leading `\`.
///
/// `parse(&render(blocks)) == blocks` holds for every block list accepted
/// by [`validate`].

use crate::error::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};

const ESCAPE: char = '\\';

/// One block of a notification body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum MessageBlock {
    H1(String),
    H2(String),
    H3(String),
    Paragraph(String),
    Bullets(Vec<String>),
    Numbered(Vec<String>),
}

/// Checks that blocks survive a render and parse cycle
///
/// Every text must be a single non-blank line without surrounding
/// whitespace, and lists must hold at least one item.
pub fn validate(blocks: &[MessageBlock]) -> ServiceResult<()> {
    for block in blocks {
        match block {
            MessageBlock::H1(text)
            | MessageBlock::H2(text)
            | MessageBlock::H3(text)
            | MessageBlock::Paragraph(text) => validate_text(text)?,
            MessageBlock::Bullets(items) | MessageBlock::Numbered(items) => {
                if items.is_empty() {
                    return Err(ServiceError::validation("List blocks need at least one item"));
                }
                for item in items {
                    validate_text(item)?;
                }
            }
        }
    }
    Ok(())
}

fn validate_text(text: &str) -> ServiceResult<()> {
    if text.trim().is_empty() {
        return Err(ServiceError::validation("Block text must not be blank"));
    }
    if text.contains(['\n', '\r']) {
        return Err(ServiceError::validation("Block text must be a single line"));
    }
    if text.trim() != text {
        return Err(ServiceError::validation(
            "Block text must not start or end with whitespace",
        ));
    }
    Ok(())
}

/// Renders blocks to text, one blank line between blocks
pub fn render(blocks: &[MessageBlock]) -> String {
    let rendered: Vec<String> = blocks
        .iter()
        .map(|block| match block {
            MessageBlock::H1(text) => format!("# {}", text),
            MessageBlock::H2(text) => format!("## {}", text),
            MessageBlock::H3(text) => format!("### {}", text),
            MessageBlock::Paragraph(text) => render_paragraph(text),
            MessageBlock::Bullets(items) => items
                .iter()
                .map(|item| format!("- {}", item))
                .collect::<Vec<_>>()
                .join("\n"),
            MessageBlock::Numbered(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| format!("{}. {}", i + 1, item))
                .collect::<Vec<_>>()
                .join("\n"),
        })
        .collect();

    rendered.join("\n\n")
}

fn render_paragraph(text: &str) -> String {
    let needs_escape =
        text.starts_with(ESCAPE) || !matches!(parse_line(text), MessageBlock::Paragraph(_));
    if needs_escape {
        format!("{}{}", ESCAPE, text)
    } else {
        text.to_string()
    }
}

/// Parses rendered text back into blocks
///
/// Consecutive list lines of the same kind merge into one list block.
pub fn parse(text: &str) -> Vec<MessageBlock> {
    let mut blocks: Vec<MessageBlock> = Vec::new();
    // Set on blank lines so two lists separated by a blank line stay apart
    let mut break_list = false;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            break_list = true;
            continue;
        }

        let block = parse_line(line);
        let merged = match (blocks.last_mut(), &block) {
            (Some(MessageBlock::Bullets(items)), MessageBlock::Bullets(new)) if !break_list => {
                items.extend(new.iter().cloned());
                true
            }
            (Some(MessageBlock::Numbered(items)), MessageBlock::Numbered(new)) if !break_list => {
                items.extend(new.iter().cloned());
                true
            }
            _ => false,
        };

        if !merged {
            blocks.push(block);
        }
        break_list = false;
    }

    blocks
}

fn parse_line(line: &str) -> MessageBlock {
    if let Some(rest) = line.strip_prefix(ESCAPE) {
        return MessageBlock::Paragraph(rest.to_string());
    }
    if let Some(rest) = line.strip_prefix("### ") {
        return MessageBlock::H3(rest.trim().to_string());
    }
    if let Some(rest) = line.strip_prefix("## ") {
        return MessageBlock::H2(rest.trim().to_string());
    }
    if let Some(rest) = line.strip_prefix("# ") {
        return MessageBlock::H1(rest.trim().to_string());
    }
    if let Some(rest) = line.strip_prefix("- ") {
        return MessageBlock::Bullets(vec![rest.trim().to_string()]);
    }
    if let Some(rest) = numbered_item(line) {
        return MessageBlock::Numbered(vec![rest.to_string()]);
    }
    MessageBlock::Paragraph(line.to_string())
}

/// Text after an `N. ` prefix
fn numbered_item(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix(". ").map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let blocks = vec![
            MessageBlock::H2("Profile updated".to_string()),
            MessageBlock::Paragraph("Your details changed:".to_string()),
            MessageBlock::Bullets(vec!["name".to_string(), "email".to_string()]),
        ];

        assert_eq!(
            render(&blocks),
            "## Profile updated\n\nYour details changed:\n\n- name\n- email"
        );
    }

    #[test]
    fn test_parse_merges_list_lines() {
        let blocks = parse("# Tasks\n1. Write docs\n2. Review PR\n- a\n- b\nDone.");
        assert_eq!(
            blocks,
            vec![
                MessageBlock::H1("Tasks".to_string()),
                MessageBlock::Numbered(vec!["Write docs".to_string(), "Review PR".to_string()]),
                MessageBlock::Bullets(vec!["a".to_string(), "b".to_string()]),
                MessageBlock::Paragraph("Done.".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_inverts_render() {
        let blocks = vec![
            MessageBlock::H1("Welcome".to_string()),
            MessageBlock::H3("Next steps".to_string()),
            MessageBlock::Numbered(vec!["Open a task".to_string(), "Assign a reviewer".to_string()]),
            MessageBlock::Paragraph("Thanks".to_string()),
        ];
        assert_eq!(parse(&render(&blocks)), blocks);
    }

    #[test]
    fn test_blank_line_splits_lists() {
        let blocks = parse("- a\n\n- b");
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_plain_text_is_paragraph() {
        assert_eq!(parse("3 tasks left"), vec![MessageBlock::Paragraph("3 tasks left".to_string())]);
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_marker_like_paragraphs_survive() {
        let blocks = vec![
            MessageBlock::Paragraph("- not a bullet".to_string()),
            MessageBlock::Paragraph("# not a heading".to_string()),
            MessageBlock::Paragraph("1. not a list".to_string()),
            MessageBlock::Paragraph("### not a heading either".to_string()),
            MessageBlock::Paragraph("\\already escaped".to_string()),
            MessageBlock::H1("## nested marker".to_string()),
            MessageBlock::Bullets(vec!["- dash".to_string(), "\\slash".to_string()]),
        ];
        assert!(validate(&blocks).is_ok());

        let text = render(&blocks);
        assert!(text.starts_with("\\- not a bullet\n\n\\# not a heading"));
        assert_eq!(parse(&text), blocks);
    }

    #[test]
    fn test_plain_paragraph_is_not_escaped() {
        let blocks = vec![MessageBlock::Paragraph("#hashtag and 3 tasks".to_string())];
        assert_eq!(render(&blocks), "#hashtag and 3 tasks");
    }

    #[test]
    fn test_validate_rejects_unparseable_blocks() {
        let invalid = [
            MessageBlock::Paragraph("first\nsecond".to_string()),
            MessageBlock::H2("line\r".to_string()),
            MessageBlock::Paragraph("   ".to_string()),
            MessageBlock::H3(" padded".to_string()),
            MessageBlock::Bullets(Vec::new()),
            MessageBlock::Numbered(vec!["ok".to_string(), "".to_string()]),
        ];

        for block in invalid {
            let err = validate(std::slice::from_ref(&block)).unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "{:?}", block);
        }
    }

    #[test]
    fn test_block_serde_shape() {
        let json = serde_json::to_value(MessageBlock::Bullets(vec!["x".to_string()])).unwrap();
        assert_eq!(json, serde_json::json!({"type": "bullets", "content": ["x"]}));
    }
}
