//! Lenient HTML fragment parser.
//!
//! Covers what server-rendered partials contain: nested elements, void and
//! self-closing tags, quoted, unquoted and bare attributes, comments, a
//! doctype, raw-text elements and the common character references. Stray end
//! tags are ignored and unclosed elements are closed at the end of input.

use thiserror::Error;

use super::{Document, NodeId};

/// Malformed markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("Unterminated tag starting at byte {0}")]
    UnterminatedTag(usize),
    #[error("Unterminated attribute value starting at byte {0}")]
    UnterminatedAttribute(usize),
    #[error("Unterminated comment starting at byte {0}")]
    UnterminatedComment(usize),
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Parse `markup` and append the resulting nodes under `parent`.
///
/// Returns the nodes appended directly to `parent`.
pub(super) fn parse_into(
    doc: &mut Document,
    parent: NodeId,
    markup: &str,
) -> Result<Vec<NodeId>, MarkupError> {
    let mut parser = Parser {
        src: markup,
        pos: 0,
        stack: vec![(parent, String::new())],
        top_level: Vec::new(),
    };
    parser.run(doc)?;
    Ok(parser.top_level)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    // Open elements with their tag names; the bottom entry is the fragment parent
    stack: Vec<(NodeId, String)>,
    top_level: Vec<NodeId>,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        let src = self.src;
        src.get(self.pos..).unwrap_or_default()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn current_parent(&self) -> Option<NodeId> {
        self.stack.last().map(|(node, _)| *node)
    }

    fn attach(&mut self, doc: &mut Document, node: NodeId) {
        if let Some(parent) = self.current_parent() {
            doc.append_child(parent, node);
        }
        if self.stack.len() == 1 {
            self.top_level.push(node);
        }
    }

    fn run(&mut self, doc: &mut Document) -> Result<(), MarkupError> {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.comment()?;
            } else if rest.starts_with("</") {
                self.end_tag()?;
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_declaration()?;
            } else if rest.starts_with('<')
                && rest
                    .chars()
                    .nth(1)
                    .is_some_and(|c| c.is_ascii_alphabetic())
            {
                self.start_tag(doc)?;
            } else {
                self.text(doc);
            }
        }
        Ok(())
    }

    fn comment(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        let body = self.rest().get(4..).unwrap_or_default();
        let end = body.find("-->").ok_or(MarkupError::UnterminatedComment(start))?;
        self.pos += 4 + end + 3;
        Ok(())
    }

    fn skip_declaration(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        let end = self.rest().find('>').ok_or(MarkupError::UnterminatedTag(start))?;
        self.pos += end + 1;
        Ok(())
    }

    fn end_tag(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        let end = self.rest().find('>').ok_or(MarkupError::UnterminatedTag(start))?;
        let name = self
            .rest()
            .get(2..end)
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.pos += end + 1;
        self.close(&name);
        Ok(())
    }

    fn close(&mut self, name: &str) {
        // Index 0 is the fragment parent and is never closed
        let open = self
            .stack
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find(|(_, (_, tag))| tag == name)
            .map(|(index, _)| index);
        if let Some(index) = open {
            self.stack.truncate(index);
        }
    }

    fn start_tag(&mut self, doc: &mut Document) -> Result<(), MarkupError> {
        let start = self.pos;
        self.bump(); // '<'

        let name = self.take_while(|c| !c.is_whitespace() && c != '/' && c != '>');
        let tag = name.to_ascii_lowercase();
        let element = doc.create_element(&tag);

        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(MarkupError::UnterminatedTag(start)),
                Some('>') => {
                    self.bump();
                    break;
                }
                Some('/') => {
                    self.bump();
                    if self.peek() == Some('>') {
                        self.bump();
                        self_closing = true;
                        break;
                    }
                }
                Some(_) => {
                    let (key, value) = self.attribute()?;
                    if !key.is_empty() && doc.attr(element, &key).is_none() {
                        doc.set_attr(element, &key, &value);
                    }
                }
            }
        }

        self.attach(doc, element);

        if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
            return Ok(());
        }

        if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
            let closing = format!("</{tag}");
            let rest_lower = self.rest().to_ascii_lowercase();
            let end = rest_lower.find(&closing).unwrap_or(self.rest().len());
            let raw = self.rest().get(..end).unwrap_or_default().to_string();
            self.pos += end;
            if !raw.is_empty() {
                let text = if tag == "textarea" || tag == "title" {
                    decode_entities(&raw)
                } else {
                    raw
                };
                let text_node = doc.create_text(&text);
                doc.append_child(element, text_node);
            }
            if self.pos < self.src.len() {
                let tag_start = self.pos;
                let close = self
                    .rest()
                    .find('>')
                    .ok_or(MarkupError::UnterminatedTag(tag_start))?;
                self.pos += close + 1;
            }
            return Ok(());
        }

        self.stack.push((element, tag));
        Ok(())
    }

    fn attribute(&mut self) -> Result<(String, String), MarkupError> {
        let key = self
            .take_while(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/')
            .to_ascii_lowercase();
        if key.is_empty() {
            // Lone quote or similar junk: skip one character
            self.bump();
            return Ok((String::new(), String::new()));
        }

        self.skip_whitespace();
        if self.peek() != Some('=') {
            return Ok((key, String::new()));
        }
        self.bump();
        self.skip_whitespace();

        let value_start = self.pos;
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let end = self
                    .rest()
                    .find(quote)
                    .ok_or(MarkupError::UnterminatedAttribute(value_start))?;
                let raw = self.rest().get(..end).unwrap_or_default().to_string();
                self.pos += end + 1;
                raw
            }
            _ => self
                .take_while(|c| !c.is_whitespace() && c != '>')
                .to_string(),
        };

        Ok((key, decode_entities(&value)))
    }

    fn text(&mut self, doc: &mut Document) {
        // A '<' that does not open markup is literal text
        let skip = usize::from(self.rest().starts_with('<'));
        let end = self
            .rest()
            .get(skip..)
            .and_then(|r| r.find('<'))
            .map_or(self.rest().len(), |i| i + skip);
        let raw = self.rest().get(..end).unwrap_or_default().to_string();
        self.pos += end;

        if raw.trim().is_empty() {
            return;
        }
        let text_node = doc.create_text(&decode_entities(&raw));
        self.attach(doc, text_node);
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.bump();
        }
        let src = self.src;
        src.get(start..self.pos).unwrap_or_default()
    }
}

/// Decode the character references partials actually use.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(rest.get(..amp).unwrap_or_default());
        let after = rest.get(amp..).unwrap_or_default();
        let decoded = after.find(';').and_then(|semi| {
            let name = after.get(1..semi)?;
            decode_reference(name).map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = after.get(consumed..).unwrap_or_default();
            }
            None => {
                out.push('&');
                rest = after.get(1..).unwrap_or_default();
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let numeric = name.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::super::Selector;
    use super::*;

    fn parse(markup: &str) -> Document {
        Document::from_html(markup).unwrap()
    }

    #[test]
    fn test_nested_elements_and_attributes() {
        let doc = parse(
            r#"<div class="product-card" data-product-id="7"><button class='add-to-cart-btn' data-variant-id=42 disabled>Add</button></div>"#,
        );
        let button = doc
            .query_selector(&Selector::parse(".product-card .add-to-cart-btn").unwrap())
            .unwrap();
        assert_eq!(doc.data(button, "variant-id"), Some("42"));
        assert!(doc.is_disabled(button));
        assert_eq!(doc.text_content(button), "Add");
    }

    #[test]
    fn test_void_and_self_closing_elements() {
        let doc = parse(r#"<form><input class="qty-input" value="1"><img src="/a.jpg"/><span>x</span></form>"#);
        let form = doc.children(doc.body())[0];
        assert_eq!(doc.children(form).len(), 3);
    }

    #[test]
    fn test_entities_decoded() {
        let doc = parse(r#"<p title="Tom &amp; Jerry">5 &lt; 6 &#8364; &#x41;</p>"#);
        let p = doc.children(doc.body())[0];
        assert_eq!(doc.attr(p, "title"), Some("Tom & Jerry"));
        assert_eq!(doc.text_content(p), "5 < 6 € A");
    }

    #[test]
    fn test_unknown_entity_kept_literally() {
        let doc = parse("<p>fish &chips; & more</p>");
        let p = doc.children(doc.body())[0];
        assert_eq!(doc.text_content(p), "fish &chips; & more");
    }

    #[test]
    fn test_comments_doctype_and_stray_end_tags() {
        let doc = parse("<!DOCTYPE html><!-- header --><div>a</span>b</div></section>");
        let top = doc.children(doc.body());
        assert_eq!(top.len(), 1);
        assert_eq!(doc.text_content(top[0]), "ab");
    }

    #[test]
    fn test_unclosed_elements_closed_at_end() {
        let doc = parse("<div><p>open");
        let div = doc.children(doc.body())[0];
        assert_eq!(doc.text_content(div), "open");
    }

    #[test]
    fn test_raw_text_is_not_parsed() {
        let doc = parse("<script>if (a < b) { x = '<div>'; }</script><p>after</p>");
        let top = doc.children(doc.body());
        assert_eq!(top.len(), 2);
        assert_eq!(doc.text_content(top[0]), "if (a < b) { x = '<div>'; }");
    }

    #[test]
    fn test_literal_angle_bracket_in_text() {
        let doc = parse("<p>1 < 2</p>");
        let p = doc.children(doc.body())[0];
        assert_eq!(doc.text_content(p), "1 < 2");
    }

    #[test]
    fn test_unterminated_markup_is_an_error() {
        assert_eq!(
            Document::from_html("<div class=\"a").unwrap_err(),
            MarkupError::UnterminatedAttribute(11)
        );
        assert!(matches!(
            Document::from_html("<div"),
            Err(MarkupError::UnterminatedTag(0))
        ));
        assert!(matches!(
            Document::from_html("<!-- open"),
            Err(MarkupError::UnterminatedComment(0))
        ));
    }
}
