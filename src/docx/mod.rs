//! Builds the structured document model consumed by the binary package
//! writer. Unlike the weaver, this path never renders HTML: it re-parses the
//! combined placeholder string at the markdown-token level and translates the
//! resulting block tree into kinded paragraphs of styled runs, with math
//! regions embedded as native Office math objects.

pub mod package;

use crate::math::omml::omml_plain_text;
use crate::token::Token;
use crate::weave::combined_source;
use pulldown_cmark::{Event, Options, Parser, Tag};

/// A contiguous span sharing one styling state, or a math object, or a hard
/// line break.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Run {
    Text { text: String, bold: bool, italic: bool },
    Math { omml: String },
    Break,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParagraphKind {
    Heading(u8),
    Body,
    ListItem {
        ordered: bool,
        index: Option<u64>,
        level: usize,
    },
    ThematicBreak,
    Preformatted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paragraph {
    pub kind: ParagraphKind,
    pub runs: Vec<Run>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct RunStyle {
    bold: bool,
    italic: bool,
}

/// Block-level markdown tree, collected from the event stream.
#[derive(Clone, Debug)]
enum Block {
    Heading { level: u8, inner: Vec<Inline> },
    Paragraph(Vec<Inline>),
    Plain(Vec<Inline>),
    BlockQuote(Vec<Block>),
    CodeBlock(String),
    List(Option<u64>, Vec<Block>),
    ListItem(Vec<Block>),
    Rule,
}

/// Inline-level markdown nodes.
#[derive(Clone, Debug)]
pub enum Inline {
    Text(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Code(String),
    SoftBreak,
    HardBreak,
    Link { title: String, inner: Vec<Inline> },
    Html(String),
}

/// Re-lexes a span of already-parsed text as inline markdown. Returns `None`
/// when the span does not reduce to a single paragraph of inlines; the caller
/// then treats it as one plain-text node.
pub type InlineLexFn = fn(&str) -> Option<Vec<Inline>>;

/// Capability check for the inline re-lex step. The production lexer is
/// always available; the degraded path (treating the span as plain text) is
/// reachable by passing the fallback through directly.
pub fn inline_lexer() -> Option<InlineLexFn> {
    Some(relex_inline)
}

fn relex_inline(text: &str) -> Option<Vec<Inline>> {
    let mut blocks = collect_blocks(Parser::new_ext(text, Options::empty()));
    if blocks.len() != 1 {
        return None;
    }
    match blocks.remove(0) {
        Block::Paragraph(inner) | Block::Plain(inner) => Some(inner),
        _ => None,
    }
}

/// Translates the token sequence into ordered paragraphs of styled runs.
pub fn build_document(tokens: &[Token]) -> Vec<Paragraph> {
    let source = combined_source(tokens, false);
    let blocks = collect_blocks(Parser::new_ext(&source, Options::empty()));

    let builder = DocBuilder { tokens };
    let mut paragraphs = Vec::new();
    builder.blocks_to_paragraphs(&blocks, &mut paragraphs);
    paragraphs
}

struct DocBuilder<'a> {
    tokens: &'a [Token],
}

impl<'a> DocBuilder<'a> {
    fn blocks_to_paragraphs(&self, blocks: &[Block], out: &mut Vec<Paragraph>) {
        for block in blocks {
            match block {
                Block::Heading { level, inner } => {
                    out.push(Paragraph {
                        kind: ParagraphKind::Heading((*level).min(6)),
                        runs: self.expand_runs(inner),
                    });
                }
                Block::Paragraph(inner) | Block::Plain(inner) => {
                    out.push(Paragraph {
                        kind: ParagraphKind::Body,
                        runs: self.expand_runs(inner),
                    });
                }
                // Word's minimal style set has no quote nesting; quoted
                // content flattens to body paragraphs.
                Block::BlockQuote(inner) => self.blocks_to_paragraphs(inner, out),
                Block::CodeBlock(source) => {
                    for line in source.lines() {
                        out.push(Paragraph {
                            kind: ParagraphKind::Preformatted,
                            runs: vec![Run::Text {
                                text: self.restore_math_source(line),
                                bold: false,
                                italic: false,
                            }],
                        });
                    }
                }
                Block::List(start, items) => self.list_to_paragraphs(*start, items, 0, out),
                Block::ListItem(inner) => self.blocks_to_paragraphs(inner, out),
                Block::Rule => out.push(Paragraph {
                    kind: ParagraphKind::ThematicBreak,
                    runs: Vec::new(),
                }),
            }
        }
    }

    fn list_to_paragraphs(
        &self,
        start: Option<u64>,
        items: &[Block],
        level: usize,
        out: &mut Vec<Paragraph>,
    ) {
        let ordered = start.is_some();
        let mut ordinal = start;

        for item in items {
            let Block::ListItem(children) = item else {
                // A list may only contain items; anything else is translated
                // at the enclosing level.
                self.blocks_to_paragraphs(std::slice::from_ref(item), out);
                continue;
            };

            let mut item_inlines: Vec<Inline> = Vec::new();
            let mut nested: Vec<&Block> = Vec::new();
            let mut other: Vec<&Block> = Vec::new();
            for child in children {
                match child {
                    Block::Paragraph(inner) | Block::Plain(inner) => {
                        item_inlines.extend(inner.iter().cloned());
                    }
                    list @ Block::List(..) => nested.push(list),
                    block => other.push(block),
                }
            }

            out.push(Paragraph {
                kind: ParagraphKind::ListItem {
                    ordered,
                    index: ordinal,
                    level,
                },
                runs: self.expand_runs(&item_inlines),
            });
            if let Some(n) = ordinal.as_mut() {
                *n += 1;
            }

            for block in other {
                self.blocks_to_paragraphs(std::slice::from_ref(block), out);
            }
            for list in nested {
                if let Block::List(nested_start, nested_items) = list {
                    self.list_to_paragraphs(*nested_start, nested_items, level + 1, out);
                }
            }
        }
    }

    fn expand_runs(&self, inlines: &[Inline]) -> Vec<Run> {
        let mut runs = Vec::new();
        self.expand_inlines(inlines, RunStyle::default(), &mut runs);
        runs
    }

    /// Inline-run expansion with inherited bold/italic state. Literal
    /// `**`/`*` toggles encountered inside plain text flip the state for the
    /// remainder of the inline list.
    fn expand_inlines(&self, inlines: &[Inline], base: RunStyle, out: &mut Vec<Run>) {
        let mut cur = base;

        for inline in inlines {
            match inline {
                Inline::Text(text) => {
                    // The re-lex runs a block-level parse, which trims edge
                    // whitespace; the plain path therefore splits the
                    // original text, and the structured path restores the
                    // trimmed edges around the recursion.
                    let structured = inline_lexer()
                        .and_then(|lex| lex(text))
                        .filter(|nodes| !matches!(nodes.as_slice(), [Inline::Text(_)]));
                    match structured {
                        Some(nodes) => {
                            let leading = &text[..text.len() - text.trim_start().len()];
                            let trailing = &text[text.trim_end().len()..];
                            if !leading.is_empty() {
                                out.push(Run::Text {
                                    text: leading.to_string(),
                                    bold: cur.bold,
                                    italic: cur.italic,
                                });
                            }
                            self.expand_inlines(&nodes, cur, out);
                            if !trailing.is_empty() {
                                out.push(Run::Text {
                                    text: trailing.to_string(),
                                    bold: cur.bold,
                                    italic: cur.italic,
                                });
                            }
                        }
                        None => self.split_text(text, &mut cur, out),
                    }
                }
                Inline::Strong(inner) => {
                    self.expand_inlines(inner, RunStyle { bold: true, ..cur }, out);
                }
                Inline::Emphasis(inner) => {
                    self.expand_inlines(inner, RunStyle { italic: true, ..cur }, out);
                }
                Inline::Code(code) => out.push(Run::Text {
                    text: code.clone(),
                    bold: cur.bold,
                    italic: cur.italic,
                }),
                Inline::SoftBreak => out.push(Run::Text {
                    text: " ".to_string(),
                    bold: cur.bold,
                    italic: cur.italic,
                }),
                Inline::HardBreak => out.push(Run::Break),
                Inline::Link { title, inner } => {
                    // The link target is dropped; only the visible text
                    // carries over.
                    if inner.is_empty() {
                        if !title.is_empty() {
                            self.split_text(title, &mut cur, out);
                        }
                    } else {
                        self.expand_inlines(inner, cur, out);
                    }
                }
                Inline::Html(_) => {}
            }
        }
    }

    /// Splits plain text at placeholder occurrences, resolving each to its
    /// math token, and at emphasis toggles between them.
    fn split_text(&self, text: &str, cur: &mut RunStyle, out: &mut Vec<Run>) {
        let mut rest = text;

        while let Some((pos, token)) = self.find_first_placeholder(rest) {
            let placeholder = token.placeholder();
            self.emit_with_toggles(&rest[..pos], cur, out);
            if let Token::Math { omml, .. } = token {
                match omml_plain_text(omml) {
                    // Trivial formula: inline text, current style applies.
                    Some(plain) if !plain.is_empty() => out.push(Run::Text {
                        text: plain,
                        bold: cur.bold,
                        italic: cur.italic,
                    }),
                    Some(_) => {}
                    None => out.push(Run::Math { omml: omml.clone() }),
                }
            }
            rest = &rest[pos + placeholder.len()..];
        }

        self.emit_with_toggles(rest, cur, out);
    }

    /// Code content receives no math substitution; a span the segmenter
    /// lifted out of what turned out to be a code block is put back in its
    /// delimited source form.
    fn restore_math_source(&self, line: &str) -> String {
        let mut out = line.to_string();
        for token in self.tokens {
            if let Token::Math {
                source_latex,
                display_mode,
                ..
            } = token
            {
                let literal = if *display_mode {
                    format!("$${source_latex}$$")
                } else {
                    format!("${source_latex}$")
                };
                out = out.replace(&token.placeholder(), &literal);
            }
        }
        out
    }

    fn find_first_placeholder(&self, text: &str) -> Option<(usize, &Token)> {
        self.tokens
            .iter()
            .filter(|t| t.is_math())
            .filter_map(|t| text.find(&t.placeholder()).map(|pos| (pos, t)))
            .min_by_key(|(pos, _)| *pos)
    }

    fn emit_with_toggles(&self, text: &str, cur: &mut RunStyle, out: &mut Vec<Run>) {
        let mut buf = String::new();
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch == '*' {
                flush_text(&mut buf, *cur, out);
                if chars.peek() == Some(&'*') {
                    chars.next();
                    cur.bold = !cur.bold;
                } else {
                    cur.italic = !cur.italic;
                }
            } else {
                buf.push(ch);
            }
        }
        flush_text(&mut buf, *cur, out);
    }
}

fn flush_text(buf: &mut String, style: RunStyle, out: &mut Vec<Run>) {
    if buf.is_empty() {
        return;
    }
    out.push(Run::Text {
        text: std::mem::take(buf),
        bold: style.bold,
        italic: style.italic,
    });
}

/// Collects a pulldown-cmark event stream into a block tree, keeping inline
/// children nested under their parents.
fn collect_blocks(parser: Parser) -> Vec<Block> {
    enum InnerContent {
        Blocks(Vec<Block>),
        Inlines(Vec<Inline>),
    }

    impl InnerContent {
        fn into_blocks(self) -> Vec<Block> {
            match self {
                InnerContent::Blocks(b) => b,
                InnerContent::Inlines(i) => {
                    if i.is_empty() {
                        Vec::new()
                    } else {
                        vec![Block::Plain(i)]
                    }
                }
            }
        }

        fn into_inlines(self) -> Vec<Inline> {
            match self {
                InnerContent::Inlines(i) => i,
                InnerContent::Blocks(_) => Vec::new(),
            }
        }

        fn push_inline(&mut self, inline: Inline) {
            let list = match self {
                InnerContent::Inlines(i) => i,
                InnerContent::Blocks(blocks) => {
                    if let Some(Block::Plain(i)) = blocks.last_mut() {
                        i
                    } else {
                        blocks.push(Block::Plain(Vec::new()));
                        match blocks.last_mut() {
                            Some(Block::Plain(i)) => i,
                            _ => unreachable!(),
                        }
                    }
                }
            };
            // Adjacent text events are one logical span; pulldown may split
            // them at arbitrary points.
            if let (Some(Inline::Text(prev)), Inline::Text(new)) = (list.last_mut(), &inline) {
                prev.push_str(new);
            } else {
                list.push(inline);
            }
        }

        fn push_inlines(&mut self, inlines: Vec<Inline>) {
            for inline in inlines {
                self.push_inline(inline);
            }
        }
    }

    let mut stack = vec![InnerContent::Blocks(Vec::new())];

    for event in parser {
        match event {
            Event::Start(tag) => match tag {
                Tag::List(_) | Tag::Item | Tag::BlockQuote | Tag::FootnoteDefinition(_) => {
                    stack.push(InnerContent::Blocks(Vec::new()))
                }
                _ => stack.push(InnerContent::Inlines(Vec::new())),
            },
            Event::End(tag) => {
                let inner = stack.pop().expect("matching start tag");
                let last = stack.last_mut().expect("container below closed tag");
                match tag {
                    Tag::Paragraph => {
                        if let InnerContent::Blocks(blocks) = last {
                            blocks.push(Block::Paragraph(inner.into_inlines()));
                        }
                    }
                    Tag::Heading(level, _, _) => {
                        if let InnerContent::Blocks(blocks) = last {
                            blocks.push(Block::Heading {
                                level: level as u8,
                                inner: inner.into_inlines(),
                            });
                        }
                    }
                    Tag::BlockQuote => {
                        if let InnerContent::Blocks(blocks) = last {
                            blocks.push(Block::BlockQuote(inner.into_blocks()));
                        }
                    }
                    Tag::CodeBlock(_) => {
                        let source: String = inner
                            .into_inlines()
                            .iter()
                            .map(|i| match i {
                                Inline::Text(s) => s.as_str(),
                                _ => "",
                            })
                            .collect();
                        if let InnerContent::Blocks(blocks) = last {
                            blocks.push(Block::CodeBlock(source));
                        }
                    }
                    Tag::List(start) => {
                        if let InnerContent::Blocks(blocks) = last {
                            blocks.push(Block::List(start, inner.into_blocks()));
                        }
                    }
                    Tag::Item => {
                        if let InnerContent::Blocks(blocks) = last {
                            blocks.push(Block::ListItem(inner.into_blocks()));
                        }
                    }
                    Tag::Emphasis => last.push_inline(Inline::Emphasis(inner.into_inlines())),
                    Tag::Strong => last.push_inline(Inline::Strong(inner.into_inlines())),
                    Tag::Link(_, _, title) => last.push_inline(Inline::Link {
                        title: title.to_string(),
                        inner: inner.into_inlines(),
                    }),
                    // No dedicated representation; the children carry the
                    // visible text.
                    _ => last.push_inlines(inner.into_inlines()),
                }
            }
            Event::Text(s) => {
                if let Some(top) = stack.last_mut() {
                    top.push_inline(Inline::Text(s.into_string()));
                }
            }
            Event::Code(s) => {
                if let Some(top) = stack.last_mut() {
                    top.push_inline(Inline::Code(s.into_string()));
                }
            }
            Event::Html(s) => {
                if let Some(top) = stack.last_mut() {
                    top.push_inline(Inline::Html(s.into_string()));
                }
            }
            Event::SoftBreak => {
                if let Some(top) = stack.last_mut() {
                    top.push_inline(Inline::SoftBreak);
                }
            }
            Event::HardBreak => {
                if let Some(top) = stack.last_mut() {
                    top.push_inline(Inline::HardBreak);
                }
            }
            Event::Rule => {
                if let Some(InnerContent::Blocks(blocks)) = stack.last_mut() {
                    blocks.push(Block::Rule);
                }
            }
            Event::FootnoteReference(_) | Event::TaskListMarker(_) => {}
        }
    }

    stack.remove(0).into_blocks()
}
