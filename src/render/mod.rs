//! Terminal rendering of conversation messages.
//!
//! Text parts are parsed as Markdown; fenced code blocks become [`CodeBlock`]s
//! that can be copied and, for HTML, previewed. Inline images are shown as a
//! placeholder line since a terminal cannot display them.

mod code_block;
mod markdown;

use std::borrow::Cow;
use std::fmt;

use colored::Colorize;

pub use code_block::{CodeBlock, HtmlPreview, ViewMode};

use crate::{
    attachment::data_url,
    conversation::Message,
    models::{Part, Role},
};

const ASSISTANT_NAME: &str = "Multimodal Main";

/// Replaces control characters other than newline and tab with U+FFFD, so
/// text from the model cannot emit terminal escape sequences.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    fn is_unsafe(c: char) -> bool {
        c.is_control() && c != '\n' && c != '\t'
    }

    if !text.chars().any(is_unsafe) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| if is_unsafe(c) { '\u{FFFD}' } else { c })
            .collect(),
    )
}

/// A displayable piece of a message.
#[derive(Debug)]
pub enum Block {
    /// Styled prose.
    Markdown(String),
    /// A fenced code block.
    Code(CodeBlock),
    /// An inline image.
    Image {
        /// The MIME type of the image.
        mime_type: String,
        /// Approximate decoded size in bytes.
        size: usize,
        /// A `data:` URL embedding the image.
        data_url: String,
    },
}

/// A message prepared for display.
#[derive(Debug)]
pub struct RenderedMessage {
    role: Role,
    blocks: Vec<Block>,
    first_code_number: usize,
}

impl RenderedMessage {
    /// The author of the message.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The blocks in display order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The code blocks in display order.
    pub fn code_blocks(&self) -> impl Iterator<Item = &CodeBlock> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Code(code) => Some(code),
            _ => None,
        })
    }

    fn code_blocks_mut(&mut self) -> impl Iterator<Item = &mut CodeBlock> {
        self.blocks.iter_mut().filter_map(|block| match block {
            Block::Code(code) => Some(code),
            _ => None,
        })
    }
}

/// Renders one message.
pub fn render_message(message: &Message) -> RenderedMessage {
    let blocks = message
        .parts()
        .iter()
        .flat_map(|part| match part {
            Part::Text { text, .. } => markdown::render_markdown(text),
            Part::InlineData { inline_data } => vec![Block::Image {
                mime_type: inline_data.mime_type.clone(),
                size: inline_data.data.len() / 4 * 3,
                data_url: data_url(&inline_data.mime_type, &inline_data.data),
            }],
        })
        .collect();

    RenderedMessage {
        role: message.role(),
        blocks,
        first_code_number: 1,
    }
}

impl fmt::Display for RenderedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Role::User => writeln!(f, "{}", "👤 You:".blue().bold())?,
            Role::Model => writeln!(f, "{}", format!("🤖 {ASSISTANT_NAME}:").green().bold())?,
        }

        let mut number = self.first_code_number;
        for block in &self.blocks {
            match block {
                Block::Markdown(text) => writeln!(f, "{text}")?,
                Block::Image {
                    mime_type, size, ..
                } => writeln!(
                    f,
                    "{}",
                    format!("🖼  [{} image, ~{size} bytes]", sanitize(mime_type)).bright_black()
                )?,
                Block::Code(code) => {
                    write_code_block(f, number, code)?;
                    number += 1;
                }
            }
        }
        Ok(())
    }
}

fn write_code_block(f: &mut fmt::Formatter<'_>, number: usize, code: &CodeBlock) -> fmt::Result {
    let mut actions = format!("/copy {number}");
    if code.is_html() {
        match code.view_mode() {
            ViewMode::Source => actions.push_str(&format!(" · /preview {number}")),
            ViewMode::Preview => actions.push_str(&format!(" · /source {number}")),
        }
    }
    writeln!(
        f,
        "{} {} {}",
        format!("┌─ [{number}]").bright_black(),
        sanitize(code.language()).cyan(),
        format!("─ {actions}").bright_black()
    )?;

    match code.preview() {
        Some(preview) => writeln!(
            f,
            "{} {}",
            "│ preview:".bright_black(),
            preview.url().underline()
        )?,
        None => {
            for line in code.code().lines() {
                writeln!(f, "{} {}", "│".bright_black(), sanitize(line).white())?;
            }
        }
    }
    if code.is_copied() {
        writeln!(f, "{}", "└─ Copied!".green())
    } else {
        writeln!(f, "{}", "└─".bright_black())
    }
}

/// Every rendered message of a session, with code blocks numbered across
/// the whole transcript.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<RenderedMessage>,
    code_blocks: usize,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders and stores `message`.
    pub fn push(&mut self, message: &Message) -> &RenderedMessage {
        let mut rendered = render_message(message);
        rendered.first_code_number = self.code_blocks + 1;
        self.code_blocks += rendered.code_blocks().count();
        self.messages.push(rendered);
        &self.messages[self.messages.len() - 1]
    }

    /// The rendered messages so far.
    pub fn messages(&self) -> &[RenderedMessage] {
        &self.messages
    }

    /// Number of code blocks across all messages.
    pub fn code_block_count(&self) -> usize {
        self.code_blocks
    }

    /// The code block with 1-based `number`.
    pub fn code_block(&self, number: usize) -> Option<&CodeBlock> {
        let index = number.checked_sub(1)?;
        self.messages
            .iter()
            .flat_map(RenderedMessage::code_blocks)
            .nth(index)
    }

    /// The code block with 1-based `number`, mutably.
    pub fn code_block_mut(&mut self, number: usize) -> Option<&mut CodeBlock> {
        let index = number.checked_sub(1)?;
        self.messages
            .iter_mut()
            .flat_map(RenderedMessage::code_blocks_mut)
            .nth(index)
    }

    /// The message containing code block `number`.
    pub fn message_with_code_block(&self, number: usize) -> Option<&RenderedMessage> {
        self.messages.iter().find(|message| {
            let count = message.code_blocks().count();
            count > 0
                && (message.first_code_number..message.first_code_number + count).contains(&number)
        })
    }
}
