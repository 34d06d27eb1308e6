//! Structural template parser.
//!
//! Walks the fragment list as one stream of characters interleaved with gap
//! markers, building the static node tree and recording a [`Slot`] for every
//! gap in document order.
//!
//! Gap classification:
//!
//! ```text
//! <p>${x}</p>            node slot (two markers in the static tree)
//! <p class="a ${x} b">   attribute slot (interpolated)
//! <input .value=${x}>    property slot
//! <input ?checked=${x}>  boolean attribute slot
//! <button @click=${x}>   event slot
//! <!-- ${x} -->          inactive slot
//! <${x}>                 compile error
//! ```

use std::rc::Rc;

use super::descriptor::{Slot, SlotKind, StaticNode};
use crate::CompileError;
use crate::types::Strings;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Char(char),
    Gap(usize),
}

/// Attribute value as it appears in the source: static text around gaps.
struct RawValue {
    strings: Vec<String>,
    gaps: Vec<usize>,
}

/// Parse a fragment list into its static structure and slots.
pub(crate) fn parse(strings: &Strings) -> Result<(Vec<StaticNode>, Vec<Slot>), CompileError> {
    let mut pieces = Vec::new();
    let mut offsets = Vec::new();
    let mut bytes = 0;
    for (i, fragment) in strings.iter().enumerate() {
        if i > 0 {
            pieces.push(Piece::Gap(i - 1));
            offsets.push(bytes);
        }
        for (at, c) in fragment.char_indices() {
            pieces.push(Piece::Char(c));
            offsets.push(bytes + at);
        }
        bytes += fragment.len();
    }
    offsets.push(bytes);

    let mut parser = Parser {
        pieces,
        offsets,
        pos: 0,
        slots: Vec::new(),
    };
    let nodes = parser.parse_children(&[], None)?;
    debug_assert_eq!(parser.slots.len(), strings.len().saturating_sub(1));
    Ok((nodes, parser.slots))
}

struct Parser {
    pieces: Vec<Piece>,
    /// Byte offset of each piece in the joined fragments, plus the end.
    offsets: Vec<usize>,
    pos: usize,
    slots: Vec<Slot>,
}

impl Parser {
    // =========================================================================
    // Cursor
    // =========================================================================

    fn peek(&self) -> Option<Piece> {
        self.pieces.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<Piece> {
        self.pieces.get(self.pos + offset).copied()
    }

    fn peek_char(&self) -> Option<char> {
        match self.peek() {
            Some(Piece::Char(c)) => Some(c),
            _ => None,
        }
    }

    /// True if the next pieces spell `s` with no gap in between.
    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(Piece::Char(c)))
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Byte offset of the cursor in the joined fragments. Gaps take no bytes.
    fn byte_offset(&self) -> usize {
        self.offsets
            .get(self.pos)
            .or_else(|| self.offsets.last())
            .copied()
            .unwrap_or(0)
    }

    fn malformed(&self, reason: &'static str) -> CompileError {
        CompileError::Malformed {
            offset: self.byte_offset(),
            reason,
        }
    }

    fn push_slot(&mut self, gap: usize, kind: SlotKind, path: Vec<usize>) {
        debug_assert_eq!(gap, self.slots.len(), "slots are recorded in gap order");
        self.slots.push(Slot { kind, path });
    }

    // =========================================================================
    // Content
    // =========================================================================

    fn parse_children(
        &mut self,
        path: &[usize],
        parent: Option<&str>,
    ) -> Result<Vec<StaticNode>, CompileError> {
        let mut children = Vec::new();
        let mut text = String::new();

        loop {
            match self.peek() {
                None => {
                    flush_text(&mut children, &mut text);
                    return match parent {
                        Some(tag) => Err(CompileError::Unclosed {
                            tag: tag.to_string(),
                        }),
                        None => Ok(children),
                    };
                }
                Some(Piece::Gap(gap)) => {
                    self.pos += 1;
                    flush_text(&mut children, &mut text);
                    let slot_path = child_path(path, children.len());
                    self.push_slot(gap, SlotKind::Node, slot_path);
                    children.push(StaticNode::Marker);
                    children.push(StaticNode::Marker);
                }
                Some(Piece::Char('<')) => {
                    if self.starts_with("<!--") {
                        flush_text(&mut children, &mut text);
                        children.push(self.parse_comment()?);
                    } else if self.starts_with("</") {
                        flush_text(&mut children, &mut text);
                        let offset = self.byte_offset();
                        let found = self.parse_close_tag()?;
                        return match parent {
                            Some(tag) if tag.eq_ignore_ascii_case(&found) => Ok(children),
                            Some(tag) => Err(CompileError::MismatchedClose {
                                expected: tag.to_string(),
                                found,
                                offset,
                            }),
                            None => Err(CompileError::StrayClose { found, offset }),
                        };
                    } else {
                        match self.peek_at(1) {
                            Some(Piece::Char(c)) if c.is_ascii_alphabetic() => {
                                flush_text(&mut children, &mut text);
                                let element_path = child_path(path, children.len());
                                children.push(self.parse_element(element_path)?);
                            }
                            Some(Piece::Gap(gap)) => {
                                return Err(CompileError::SlotInTagName { slot: gap });
                            }
                            _ => {
                                text.push('<');
                                self.pos += 1;
                            }
                        }
                    }
                }
                Some(Piece::Char(c)) => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_comment(&mut self) -> Result<StaticNode, CompileError> {
        self.pos += 4;
        let mut body = String::new();
        loop {
            if self.starts_with("-->") {
                self.pos += 3;
                return Ok(StaticNode::Comment(body));
            }
            match self.peek() {
                None => return Err(self.malformed("unterminated comment")),
                Some(Piece::Gap(gap)) => {
                    self.pos += 1;
                    self.push_slot(gap, SlotKind::Inactive, Vec::new());
                }
                Some(Piece::Char(c)) => {
                    body.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_close_tag(&mut self) -> Result<String, CompileError> {
        self.pos += 2;
        let mut name = String::new();
        loop {
            match self.peek() {
                None => return Err(self.malformed("unterminated closing tag")),
                Some(Piece::Gap(gap)) => return Err(CompileError::SlotInClosingTag { slot: gap }),
                Some(Piece::Char('>')) => {
                    self.pos += 1;
                    return Ok(name);
                }
                Some(Piece::Char(c)) => {
                    if !c.is_whitespace() {
                        name.push(c);
                    }
                    self.pos += 1;
                }
            }
        }
    }

    // =========================================================================
    // Elements
    // =========================================================================

    fn parse_element(&mut self, path: Vec<usize>) -> Result<StaticNode, CompileError> {
        self.pos += 1;
        let tag = self.read_name();
        if let Some(Piece::Gap(gap)) = self.peek() {
            return Err(CompileError::SlotInTagName { slot: gap });
        }

        let mut attributes = Vec::new();
        let self_closing = loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.malformed("unterminated tag")),
                Some(Piece::Gap(gap)) => return Err(CompileError::SlotInAttributeName { slot: gap }),
                Some(Piece::Char('>')) => {
                    self.pos += 1;
                    break false;
                }
                Some(Piece::Char('/')) if self.starts_with("/>") => {
                    self.pos += 2;
                    break true;
                }
                Some(Piece::Char(_)) => self.parse_attribute(&path, &mut attributes)?,
            }
        };

        let is_void = VOID_ELEMENTS
            .iter()
            .any(|void| void.eq_ignore_ascii_case(&tag));
        let children = if self_closing || is_void {
            Vec::new()
        } else {
            self.parse_children(&path, Some(&tag))?
        };

        Ok(StaticNode::Element {
            tag,
            attributes,
            children,
        })
    }

    /// Tag names: letters, digits, `-`, `_`, `:`.
    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':') {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        name
    }

    fn parse_attribute(
        &mut self,
        path: &[usize],
        attributes: &mut Vec<(String, String)>,
    ) -> Result<(), CompileError> {
        let mut name = String::new();
        loop {
            match self.peek() {
                Some(Piece::Gap(gap)) => return Err(CompileError::SlotInAttributeName { slot: gap }),
                Some(Piece::Char(c)) if c.is_whitespace() || c == '=' || c == '>' => break,
                Some(Piece::Char('/')) if self.starts_with("/>") => break,
                Some(Piece::Char(c)) => {
                    name.push(c);
                    self.pos += 1;
                }
                None => break,
            }
        }
        if name.is_empty() {
            return Err(self.malformed("expected attribute name"));
        }

        self.skip_whitespace();
        let value = if self.peek_char() == Some('=') {
            self.pos += 1;
            self.skip_whitespace();
            self.parse_attribute_value()?
        } else {
            RawValue {
                strings: vec![String::new()],
                gaps: Vec::new(),
            }
        };

        if value.gaps.is_empty() {
            let text = value.strings.into_iter().next().unwrap_or_default();
            attributes.push((name, text));
            return Ok(());
        }

        self.classify_binding(name, value, path)
    }

    fn parse_attribute_value(&mut self) -> Result<RawValue, CompileError> {
        let mut strings = vec![String::new()];
        let mut gaps = Vec::new();

        let quote = match self.peek_char() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                Some(q)
            }
            _ => None,
        };

        loop {
            match self.peek() {
                None if quote.is_some() => return Err(self.malformed("unterminated attribute value")),
                None => break,
                Some(Piece::Gap(gap)) => {
                    self.pos += 1;
                    gaps.push(gap);
                    strings.push(String::new());
                }
                Some(Piece::Char(c)) => {
                    match quote {
                        Some(q) if c == q => {
                            self.pos += 1;
                            break;
                        }
                        None if c.is_whitespace() || c == '>' => break,
                        None if self.starts_with("/>") => break,
                        _ => {}
                    }
                    if let Some(last) = strings.last_mut() {
                        last.push(c);
                    }
                    self.pos += 1;
                }
            }
        }

        Ok(RawValue { strings, gaps })
    }

    /// Turn a dynamic attribute into slots according to its sigil.
    fn classify_binding(
        &mut self,
        name: String,
        value: RawValue,
        path: &[usize],
    ) -> Result<(), CompileError> {
        let mut chars = name.chars();
        let sigil = chars.next();
        let bare: String = chars.collect();

        let single_and_pure =
            value.gaps.len() == 1 && value.strings.iter().all(String::is_empty);

        match sigil {
            Some('@') | Some('?') => {
                if !single_and_pure {
                    return Err(CompileError::InvalidBinding {
                        name,
                        slot: value.gaps[0],
                    });
                }
                let kind = if sigil == Some('@') {
                    SlotKind::Event { name: bare }
                } else {
                    SlotKind::BooleanAttribute { name: bare }
                };
                self.push_slot(value.gaps[0], kind, path.to_vec());
            }
            Some('.') => {
                let strings: Rc<[String]> = Rc::from(value.strings);
                for (index, gap) in value.gaps.into_iter().enumerate() {
                    let kind = SlotKind::Property {
                        name: bare.clone(),
                        strings: strings.clone(),
                        index,
                    };
                    self.push_slot(gap, kind, path.to_vec());
                }
            }
            _ => {
                let strings: Rc<[String]> = Rc::from(value.strings);
                for (index, gap) in value.gaps.into_iter().enumerate() {
                    let kind = SlotKind::Attribute {
                        name: name.clone(),
                        strings: strings.clone(),
                        index,
                    };
                    self.push_slot(gap, kind, path.to_vec());
                }
            }
        }
        Ok(())
    }
}

fn flush_text(children: &mut Vec<StaticNode>, text: &mut String) {
    if !text.is_empty() {
        children.push(StaticNode::Text(std::mem::take(text)));
    }
}

fn child_path(parent: &[usize], index: usize) -> Vec<usize> {
    let mut path = Vec::with_capacity(parent.len() + 1);
    path.extend_from_slice(parent);
    path.push(index);
    path
}

// =============================================================================
// Tests
// =============================================================================
