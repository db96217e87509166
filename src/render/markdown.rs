//! Markdown to styled terminal text, with fenced code split out into
//! [`CodeBlock`]s.

use colored::{ColoredString, Colorize};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use super::{sanitize, Block, CodeBlock};

const RULE_WIDTH: usize = 40;

/// Splits Markdown into styled prose and code blocks, in document order.
pub(crate) fn render_markdown(text: &str) -> Vec<Block> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut renderer = Renderer::default();
    for event in Parser::new_ext(text, options) {
        renderer.event(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct Renderer {
    blocks: Vec<Block>,
    out: String,
    code: Option<(String, String)>,
    lists: Vec<Option<u64>>,
    links: Vec<String>,
    strong: usize,
    emphasis: usize,
    strikethrough: usize,
    quote: usize,
    heading: bool,
    cell: usize,
}

impl Renderer {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => match &mut self.code {
                Some((_, code)) => code.push_str(&text),
                None => self.push_styled(&sanitize(&text)),
            },
            Event::Code(code) => {
                let styled = sanitize(&code).bright_yellow().to_string();
                self.push_raw(&styled);
            }
            Event::Html(html) | Event::InlineHtml(html) => self.push_raw(&sanitize(&html)),
            Event::SoftBreak => self.out.push(' '),
            Event::HardBreak => self.out.push('\n'),
            Event::Rule => {
                let rule = "─".repeat(RULE_WIDTH).bright_black().to_string();
                self.push_raw(&rule);
                self.out.push_str("\n\n");
            }
            Event::TaskListMarker(done) => self.push_raw(if done { "[x] " } else { "[ ] " }),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { .. } => self.heading = true,
            Tag::BlockQuote(_) => self.quote += 1,
            Tag::CodeBlock(kind) => {
                self.flush();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or_default().to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                self.code = Some((language, String::new()));
            }
            Tag::List(start) => {
                if !self.lists.is_empty() && !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
                self.lists.push(start);
            }
            Tag::Item => {
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{number}. ");
                        *number += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.out.push_str(&indent);
                self.out.push_str(&marker);
            }
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            Tag::Strikethrough => self.strikethrough += 1,
            Tag::Link { dest_url, .. } => self.links.push(sanitize(&dest_url).into_owned()),
            Tag::Image { dest_url, .. } => {
                let image = format!("[image: {}]", sanitize(&dest_url))
                    .bright_black()
                    .to_string();
                self.push_raw(&image);
            }
            Tag::TableHead | Tag::TableRow => self.cell = 0,
            Tag::TableCell => {
                if self.cell > 0 {
                    self.out.push_str(" │ ");
                }
                self.cell += 1;
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.out.push('\n');
                if self.lists.is_empty() {
                    self.out.push('\n');
                }
            }
            TagEnd::Heading(_) => {
                self.heading = false;
                self.out.push_str("\n\n");
            }
            TagEnd::BlockQuote(_) => self.quote = self.quote.saturating_sub(1),
            TagEnd::CodeBlock => {
                if let Some((language, code)) = self.code.take() {
                    self.blocks.push(Block::Code(CodeBlock::new(language, code)));
                }
            }
            TagEnd::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.out.push('\n');
                }
            }
            TagEnd::Item => {
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
            }
            TagEnd::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            TagEnd::Strong => self.strong = self.strong.saturating_sub(1),
            TagEnd::Strikethrough => self.strikethrough = self.strikethrough.saturating_sub(1),
            TagEnd::Link => {
                if let Some(url) = self.links.pop() {
                    let target = format!(" ({url})").bright_black().to_string();
                    self.push_raw(&target);
                }
            }
            TagEnd::TableHead | TagEnd::TableRow => self.out.push('\n'),
            TagEnd::Table => self.out.push('\n'),
            _ => {}
        }
    }

    fn push_styled(&mut self, text: &str) {
        let mut styled: ColoredString = text.normal();
        if self.heading {
            styled = styled.bold().underline();
        }
        if self.strong > 0 {
            styled = styled.bold();
        }
        if self.emphasis > 0 {
            styled = styled.italic();
        }
        if self.strikethrough > 0 {
            styled = styled.strikethrough();
        }
        if !self.links.is_empty() {
            styled = styled.blue().underline();
        }
        self.push_raw(&styled.to_string());
    }

    fn push_raw(&mut self, text: &str) {
        if self.quote > 0 && (self.out.is_empty() || self.out.ends_with('\n')) {
            let bar = "│ ".repeat(self.quote).bright_black().to_string();
            self.out.push_str(&bar);
        }
        self.out.push_str(text);
    }

    fn flush(&mut self) {
        let prose = self.out.trim_end();
        if !prose.trim().is_empty() {
            self.blocks.push(Block::Markdown(prose.to_string()));
        }
        self.out.clear();
    }

    fn finish(mut self) -> Vec<Block> {
        // A fence left open at the end still counts as code.
        if let Some((language, code)) = self.code.take() {
            self.blocks.push(Block::Code(CodeBlock::new(language, code)));
        }
        self.flush();
        self.blocks
    }
}
