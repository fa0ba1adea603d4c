//! Placeholder discovery and rendering for one XML document part.
//!
//! A part (a slide, a notes page, a Word body) is scanned for text nodes
//! (`<a:t>`, `<w:t>`) and paragraphs (`<a:p>`, `<w:p>`). Placeholders are
//! found in the concatenated text of all text nodes, so a placeholder that an
//! editor split across several runs still counts as one; such placeholders
//! are first collapsed into the run where they start.
//!
//! The part is then compiled into a small render tree of raw XML chunks,
//! value placeholders and sections. Loop tags decide how much XML a section
//! repeats:
//!
//! - both tags in the same paragraph: exactly the XML between the tags;
//! - each tag alone in its own paragraph (with paragraph loops enabled): the
//!   paragraphs between them, dropping the two tag paragraphs;
//! - tags in different cells of the same table row: the enclosing row, tags
//!   removed;
//! - otherwise: the enclosing paragraphs, tags removed.

use std::borrow::Cow;

use memchr::memchr;
use tracing::debug;

use super::config::TemplaterOptions;
use super::expr::{self, Expression, Scope};
use super::value::Value;
use crate::common::xml::{escape_xml, unescape_xml};
use crate::common::{Error, Result};

const TEXT_ELEMENTS: [&str; 2] = ["a:t", "w:t"];
const PARAGRAPH_ELEMENTS: [&str; 2] = ["a:p", "w:p"];
const ROW_ELEMENTS: [&str; 2] = ["a:tr", "w:tr"];
const CELL_ELEMENTS: [&str; 2] = ["a:tc", "w:tc"];

/// Content range of a text element.
#[derive(Debug, Clone, Copy)]
struct TextNode {
    start: usize,
    end: usize,
}

/// Full range of an element, start tag to end tag inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

#[derive(Debug, Default)]
struct Layout {
    texts: Vec<TextNode>,
    paragraphs: Vec<Span>,
    rows: Vec<Span>,
    cells: Vec<Span>,
}

/// Innermost span containing `pos`.
fn innermost(spans: &[Span], pos: usize) -> Option<Span> {
    spans
        .iter()
        .filter(|s| s.start <= pos && pos < s.end)
        .max_by_key(|s| s.start)
        .copied()
}

impl Layout {
    fn paragraph_at(&self, pos: usize) -> Option<Span> {
        innermost(&self.paragraphs, pos)
    }

    fn row_at(&self, pos: usize) -> Option<Span> {
        innermost(&self.rows, pos)
    }

    fn cell_at(&self, pos: usize) -> Option<Span> {
        innermost(&self.cells, pos)
    }
}

/// Tracks open elements of one kind while scanning.
fn track(
    spans: &mut Vec<Span>,
    open: &mut Vec<usize>,
    closing: bool,
    self_closing: bool,
    lt: usize,
    gt: usize,
) {
    if closing {
        if let Some(start) = open.pop() {
            spans.push(Span { start, end: gt + 1 });
        }
    } else if !self_closing {
        open.push(lt);
    }
}

fn scan(xml: &str) -> Result<Layout> {
    let bytes = xml.as_bytes();
    let mut layout = Layout::default();
    let mut open_text: Option<usize> = None;
    let mut open_paragraphs: Vec<usize> = Vec::new();
    let mut open_rows: Vec<usize> = Vec::new();
    let mut open_cells: Vec<usize> = Vec::new();
    let mut pos = 0;

    while let Some(rel) = memchr(b'<', &bytes[pos..]) {
        let lt = pos + rel;
        let rest = &xml[lt..];

        if rest.starts_with("<!--") {
            pos = skip_past(xml, lt, "-->")?;
            continue;
        }
        if rest.starts_with("<![CDATA[") {
            pos = skip_past(xml, lt, "]]>")?;
            continue;
        }
        if rest.starts_with("<?") || rest.starts_with("<!") {
            pos = skip_past(xml, lt, ">")?;
            continue;
        }

        let gt = find_tag_end(bytes, lt)?;
        let closing = bytes.get(lt + 1) == Some(&b'/');
        let self_closing = !closing && bytes[gt - 1] == b'/';
        let name_start = lt + 1 + usize::from(closing);
        let name_len = bytes[name_start..gt]
            .iter()
            .position(|b| b.is_ascii_whitespace() || *b == b'/' || *b == b'>')
            .unwrap_or(gt - name_start);
        let name = &xml[name_start..name_start + name_len];

        if TEXT_ELEMENTS.contains(&name) {
            if closing {
                if let Some(start) = open_text.take() {
                    layout.texts.push(TextNode { start, end: lt });
                }
            } else if !self_closing {
                open_text = Some(gt + 1);
            }
        } else if PARAGRAPH_ELEMENTS.contains(&name) {
            track(&mut layout.paragraphs, &mut open_paragraphs, closing, self_closing, lt, gt);
        } else if ROW_ELEMENTS.contains(&name) {
            track(&mut layout.rows, &mut open_rows, closing, self_closing, lt, gt);
        } else if CELL_ELEMENTS.contains(&name) {
            track(&mut layout.cells, &mut open_cells, closing, self_closing, lt, gt);
        }

        pos = gt + 1;
    }

    layout.paragraphs.sort_by_key(|p| p.start);
    layout.rows.sort_by_key(|r| r.start);
    layout.cells.sort_by_key(|c| c.start);
    Ok(layout)
}

fn skip_past(xml: &str, from: usize, terminator: &str) -> Result<usize> {
    xml[from..]
        .find(terminator)
        .map(|i| from + i + terminator.len())
        .ok_or_else(|| Error::Xml(format!("unterminated markup at byte {from}")))
}

/// Position of the `>` closing the tag opened at `lt`, skipping quoted
/// attribute values.
fn find_tag_end(bytes: &[u8], lt: usize) -> Result<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(lt + 1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {},
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Ok(i),
            None => {},
        }
    }
    Err(Error::Xml(format!("unterminated tag at byte {lt}")))
}

/// Tag boundaries in concatenated text, as `(start, end)` including the
/// delimiters.
fn find_tags(text: &str, start_delim: &str, end_delim: &str) -> Result<Vec<(usize, usize)>> {
    let mut tags = Vec::new();
    let mut pos = 0;

    loop {
        let next_start = text[pos..].find(start_delim).map(|i| pos + i);
        let next_end = text[pos..].find(end_delim).map(|i| pos + i);

        let open = match (next_start, next_end) {
            (None, None) => break,
            (Some(open), Some(close)) if open < close => open,
            (Some(open), None) => {
                return Err(Error::template_expression(snippet(&text[open..]), "unclosed tag"));
            },
            (_, Some(close)) => {
                return Err(Error::template_expression(
                    snippet(&text[pos..close + end_delim.len()]),
                    "closing delimiter without an opening delimiter",
                ));
            },
        };

        let inner_start = open + start_delim.len();
        let close = text[inner_start..]
            .find(end_delim)
            .map(|i| inner_start + i)
            .ok_or_else(|| Error::template_expression(snippet(&text[open..]), "unclosed tag"))?;
        if text[inner_start..close].contains(start_delim) {
            return Err(Error::template_expression(
                snippet(&text[open..close + end_delim.len()]),
                "unclosed tag",
            ));
        }

        let end = close + end_delim.len();
        tags.push((open, end));
        pos = end;
    }

    Ok(tags)
}

fn snippet(text: &str) -> String {
    const MAX_CHARS: usize = 48;
    match text.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// Move every placeholder whose characters span several text nodes into the
/// node where it starts. Nodes a placeholder does not cross are untouched.
fn collapse_split_tags<'x>(
    xml: &'x str,
    layout: &Layout,
    options: &TemplaterOptions,
) -> Result<Cow<'x, str>> {
    let decoded: Vec<String> = layout
        .texts
        .iter()
        .map(|t| unescape_xml(&xml[t.start..t.end]))
        .collect();

    let mut offsets = Vec::with_capacity(decoded.len());
    let mut full = String::new();
    for text in &decoded {
        offsets.push(full.len());
        full.push_str(text);
    }

    let tags = find_tags(&full, &options.start_delimiter, &options.end_delimiter)?;
    let node_of = |g: usize| offsets.partition_point(|&o| o <= g).saturating_sub(1);

    let mut touched = vec![false; decoded.len()];
    let mut any = false;
    for &(start, end) in &tags {
        let (first, last) = (node_of(start), node_of(end - 1));
        if first != last {
            touched[first..=last].fill(true);
            any = true;
        }
    }
    if !any {
        return Ok(Cow::Borrowed(xml));
    }

    let mut out = String::with_capacity(xml.len());
    let mut cursor = 0;
    for (k, node) in layout.texts.iter().enumerate() {
        if !touched[k] {
            continue;
        }
        out.push_str(&xml[cursor..node.start]);

        let node_start = offsets[k];
        let node_end = node_start + decoded[k].len();
        let mut content = String::new();
        let mut pos = node_start;
        for &(start, end) in tags.iter().filter(|(s, e)| *e > node_start && *s < node_end) {
            if start > pos {
                content.push_str(&full[pos..start]);
            }
            if start >= node_start {
                content.push_str(&full[start..end]);
            }
            pos = end.min(node_end);
        }
        if pos < node_end {
            content.push_str(&full[pos..node_end]);
        }

        out.push_str(&escape_xml(&content));
        cursor = node.end;
    }
    out.push_str(&xml[cursor..]);

    Ok(Cow::Owned(out))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Value,
    Open { inverted: bool },
    Close,
}

#[derive(Debug)]
struct Tag {
    start: usize,
    end: usize,
    kind: TagKind,
    /// Expression text (section markers stripped), or the closing name.
    text: String,
    /// Placeholder as written, delimiters excluded.
    raw: String,
}

fn classify(inner: &str) -> (TagKind, String) {
    let trimmed = inner.trim();
    if let Some(rest) = trimmed.strip_prefix('#') {
        (TagKind::Open { inverted: false }, rest.trim().to_string())
    } else if let Some(rest) = trimmed.strip_prefix('^') {
        (TagKind::Open { inverted: true }, rest.trim().to_string())
    } else if let Some(rest) = trimmed.strip_prefix('/') {
        (TagKind::Close, rest.trim().to_string())
    } else {
        (TagKind::Value, trimmed.to_string())
    }
}

fn collect_tags(xml: &str, layout: &Layout, options: &TemplaterOptions) -> Result<Vec<Tag>> {
    let start_raw = escape_xml(&options.start_delimiter);
    let end_raw = escape_xml(&options.end_delimiter);
    let mut tags = Vec::new();

    for node in &layout.texts {
        let content = &xml[node.start..node.end];
        let mut pos = 0;
        while let Some(i) = content[pos..].find(start_raw.as_str()) {
            let open = pos + i;
            let inner_start = open + start_raw.len();
            let close = content[inner_start..]
                .find(end_raw.as_str())
                .map(|j| inner_start + j)
                .ok_or_else(|| Error::template_expression(snippet(&content[open..]), "unclosed tag"))?;

            let raw = unescape_xml(&content[inner_start..close]);
            let (kind, text) = classify(&raw);
            let end = close + end_raw.len();
            tags.push(Tag {
                start: node.start + open,
                end: node.start + end,
                kind,
                text,
                raw,
            });
            pos = end;
        }
    }

    Ok(tags)
}

/// How much XML a section repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopLayout {
    Inline,
    ParagraphDrop(Span, Span),
    /// Repeat everything from the start of the first span to the end of
    /// the last one, tags removed.
    Expand(Span, Span),
}

#[derive(Debug)]
struct Loop {
    open: usize,
    close: usize,
    layout: LoopLayout,
}

fn match_loops(tags: &[Tag]) -> Result<Vec<(usize, usize)>> {
    let mut stack: Vec<usize> = Vec::new();
    let mut pairs = Vec::new();

    for (i, tag) in tags.iter().enumerate() {
        match tag.kind {
            TagKind::Open { .. } => stack.push(i),
            TagKind::Close => {
                let open = stack.pop().ok_or_else(|| {
                    Error::template_expression(&tag.raw, "closing tag without a matching opening tag")
                })?;
                if !tag.text.is_empty() && tag.text != tags[open].text {
                    return Err(Error::template_expression(
                        &tag.raw,
                        format!("closing tag does not match opening tag `{}`", tags[open].raw),
                    ));
                }
                pairs.push((open, i));
            },
            TagKind::Value => {},
        }
    }

    if let Some(&open) = stack.last() {
        return Err(Error::template_expression(&tags[open].raw, "section is never closed"));
    }

    pairs.sort_unstable();
    Ok(pairs)
}

/// The tag is the only non-whitespace text of the paragraph.
fn alone_in_paragraph(xml: &str, layout: &Layout, paragraph: Span, tag: &Tag) -> bool {
    layout
        .texts
        .iter()
        .filter(|t| t.start >= paragraph.start && t.end <= paragraph.end)
        .all(|t| {
            let raw: Cow<'_, str> = if tag.start >= t.start && tag.end <= t.end {
                Cow::Owned(format!("{}{}", &xml[t.start..tag.start], &xml[tag.end..t.end]))
            } else {
                Cow::Borrowed(&xml[t.start..t.end])
            };
            unescape_xml(&raw).trim().is_empty()
        })
}

fn loop_layout(xml: &str, layout: &Layout, open: &Tag, close: &Tag, paragraph_loop: bool) -> LoopLayout {
    let (Some(first), Some(last)) = (layout.paragraph_at(open.start), layout.paragraph_at(close.start))
    else {
        return LoopLayout::Inline;
    };
    if first == last {
        return LoopLayout::Inline;
    }
    if let (Some(row), Some(close_row)) = (layout.row_at(open.start), layout.row_at(close.start))
        && row == close_row
        && layout.cell_at(open.start) != layout.cell_at(close.start)
    {
        return LoopLayout::Expand(row, row);
    }
    if paragraph_loop
        && alone_in_paragraph(xml, layout, first, open)
        && alone_in_paragraph(xml, layout, last, close)
    {
        return LoopLayout::ParagraphDrop(first, last);
    }
    LoopLayout::Expand(first, last)
}

/// A node of the compiled render tree.
#[derive(Debug, Clone)]
enum Node {
    Xml(String),
    Value(Expression),
    Section {
        expr: Expression,
        inverted: bool,
        body: Vec<Node>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Close(usize),
    Value(usize),
    Skip,
    Open(usize),
}

#[derive(Debug)]
struct Event {
    pos: usize,
    skip_to: usize,
    /// Tag reported when the event is out of order.
    tag: usize,
    action: Action,
}

impl Event {
    /// Ends before starts at the same position; inner sections close first
    /// and outer sections open first.
    fn sort_key(&self) -> (usize, u8, isize) {
        match self.action {
            Action::Close(l) => (self.pos, 0, -(l as isize)),
            Action::Value(_) | Action::Skip => (self.pos, 1, 0),
            Action::Open(l) => (self.pos, 2, l as isize),
        }
    }
}

struct Frame {
    section: Option<usize>,
    nodes: Vec<Node>,
}

fn push_xml(nodes: &mut Vec<Node>, xml: &str) {
    if xml.is_empty() {
        return;
    }
    if let Some(Node::Xml(last)) = nodes.last_mut() {
        last.push_str(xml);
    } else {
        nodes.push(Node::Xml(xml.to_string()));
    }
}

fn compile_expression(tag: &Tag) -> Result<Expression> {
    expr::compile(&tag.text).map_err(|err| Error::template_expression(&tag.raw, err))
}

/// A compiled document part.
#[derive(Debug, Clone)]
pub struct PartTemplate {
    nodes: Vec<Node>,
    tag_count: usize,
}

impl PartTemplate {
    /// Compile a part. Returns `None` when the part holds no placeholders, in
    /// which case it must be left byte-for-byte as it is.
    pub fn compile(xml: &str, options: &TemplaterOptions) -> Result<Option<Self>> {
        if !xml.contains(options.start_delimiter.as_str())
            && !xml.contains(escape_xml(&options.start_delimiter).as_str())
        {
            return Ok(None);
        }

        let layout = scan(xml)?;
        let normalized = collapse_split_tags(xml, &layout, options)?;
        let layout = match normalized {
            Cow::Borrowed(_) => layout,
            Cow::Owned(ref owned) => scan(owned)?,
        };
        let xml = normalized.as_ref();

        let tags = collect_tags(xml, &layout, options)?;
        if tags.is_empty() {
            return Ok(None);
        }

        let loops: Vec<Loop> = match_loops(&tags)?
            .into_iter()
            .map(|(open, close)| Loop {
                open,
                close,
                layout: loop_layout(xml, &layout, &tags[open], &tags[close], options.paragraph_loop),
            })
            .collect();

        let mut events = Vec::with_capacity(tags.len() + loops.len());
        for (i, tag) in tags.iter().enumerate() {
            if tag.kind == TagKind::Value {
                events.push(Event {
                    pos: tag.start,
                    skip_to: tag.end,
                    tag: i,
                    action: Action::Value(i),
                });
            }
        }
        for (l, lp) in loops.iter().enumerate() {
            let (open, close) = (&tags[lp.open], &tags[lp.close]);
            let (open_at, open_to, close_at, close_to) = match lp.layout {
                LoopLayout::Inline => (open.start, open.end, close.start, close.end),
                LoopLayout::ParagraphDrop(first, last) => (first.start, first.end, last.start, last.end),
                LoopLayout::Expand(first, last) => {
                    events.push(Event {
                        pos: open.start,
                        skip_to: open.end,
                        tag: lp.open,
                        action: Action::Skip,
                    });
                    events.push(Event {
                        pos: close.start,
                        skip_to: close.end,
                        tag: lp.close,
                        action: Action::Skip,
                    });
                    (first.start, first.start, last.end, last.end)
                },
            };
            events.push(Event {
                pos: open_at,
                skip_to: open_to,
                tag: lp.open,
                action: Action::Open(l),
            });
            events.push(Event {
                pos: close_at,
                skip_to: close_to,
                tag: lp.close,
                action: Action::Close(l),
            });
        }
        events.sort_by_key(Event::sort_key);

        let mut stack = vec![Frame {
            section: None,
            nodes: Vec::new(),
        }];
        let mut cursor = 0;

        for event in &events {
            if event.pos < cursor {
                return Err(Error::template_expression(
                    &tags[event.tag].raw,
                    "loop tags overlap other loop tags",
                ));
            }
            let top = stack.len() - 1;
            push_xml(&mut stack[top].nodes, &xml[cursor..event.pos]);
            cursor = event.skip_to;

            match event.action {
                Action::Value(i) => {
                    let expression = compile_expression(&tags[i])?;
                    stack[top].nodes.push(Node::Value(expression));
                },
                Action::Skip => {},
                Action::Open(l) => stack.push(Frame {
                    section: Some(l),
                    nodes: Vec::new(),
                }),
                Action::Close(l) => {
                    let frame = match stack.pop() {
                        Some(frame) if frame.section == Some(l) && !stack.is_empty() => frame,
                        _ => {
                            return Err(Error::template_expression(
                                &tags[loops[l].close].raw,
                                "loop tags are not properly nested",
                            ));
                        },
                    };
                    let open = &tags[loops[l].open];
                    let inverted = matches!(open.kind, TagKind::Open { inverted: true });
                    let expr = compile_expression(open)?;
                    let parent = stack.len() - 1;
                    stack[parent].nodes.push(Node::Section {
                        expr,
                        inverted,
                        body: frame.nodes,
                    });
                },
            }
        }

        let mut root = match stack.pop() {
            Some(frame) if stack.is_empty() => frame,
            _ => return Err(Error::template_expression(&tags[0].raw, "section is never closed")),
        };
        push_xml(&mut root.nodes, &xml[cursor..]);

        debug!(tags = tags.len(), sections = loops.len(), "compiled document part");
        Ok(Some(Self {
            nodes: root.nodes,
            tag_count: tags.len(),
        }))
    }

    /// Number of placeholders found in the part, loop tags included.
    pub fn tag_count(&self) -> usize {
        self.tag_count
    }

    /// Render the part against `scope`.
    pub fn render(&self, scope: &Scope<'_>) -> Result<String> {
        let mut out = String::new();
        render_nodes(&self.nodes, scope, &mut out)?;
        Ok(out)
    }
}

fn render_nodes(nodes: &[Node], scope: &Scope<'_>, out: &mut String) -> Result<()> {
    for node in nodes {
        match node {
            Node::Xml(xml) => out.push_str(xml),
            Node::Value(expr) => {
                let value = expr.evaluate(scope)?;
                out.push_str(&escape_xml(&value.render_text()));
            },
            Node::Section {
                expr,
                inverted,
                body,
            } => {
                let value = expr.evaluate(scope)?;
                if *inverted {
                    let empty = match &value {
                        Value::Array(items) => items.is_empty(),
                        other => !other.is_truthy(),
                    };
                    if empty {
                        render_nodes(body, scope, out)?;
                    }
                    continue;
                }

                match &value {
                    Value::Array(items) => {
                        for item in items {
                            render_nodes(body, &scope.push(item), out)?;
                        }
                    },
                    other if !other.is_truthy() => {},
                    Value::Object(_) => render_nodes(body, &scope.push(&value), out)?,
                    _ => render_nodes(body, scope, out)?,
                }
            },
        }
    }
    Ok(())
}
