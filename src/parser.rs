//! Tokenizer and tree builder.
//!
//! The tokenizer scans the markup byte-by-byte (slice endpoints always stay
//! on UTF-8 char boundaries) and produces a stream of text spans, open tags
//! and close tags. The tree builder instantiates component nodes from that
//! stream, applying the type system and each component's schema as
//! attributes are set, and routing subtag-encoded attributes (`<Else>`,
//! `<p:case>`) into their owner's attribute container instead of its child
//! list.

use crate::component::{ComponentKind, ComponentNode};
use crate::error::{TelaError, TelaResult};

/// A transient record describing one tag while it is being scanned.
///
/// `attr_name` buffers the attribute currently being read so that a name
/// with a dangling `=` and no right-hand side is never committed.
/// `is_content_set` records whether the tag has a body, disambiguating
/// self-closing tags from empty-bodied ones.
#[derive(Debug, Default)]
pub struct Tag {
    pub name: String,
    pub attr_name: String,
    pub attr_sep: Option<char>,
    pub is_content_set: bool,
    pub is_first_value: bool,
}

#[derive(Debug)]
enum Token {
    Text(String),
    Open {
        tag: Tag,
        attributes: Vec<(String, Option<String>)>,
        position: usize,
    },
    Close {
        name: String,
        position: usize,
    },
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

/// A short slice of the source around `pos`, for error messages.
fn fragment_at(src: &str, pos: usize) -> String {
    let end = (pos + 30).min(src.len());
    let mut start = pos.min(src.len());
    while !src.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = end;
    while !src.is_char_boundary(end) {
        end += 1;
    }
    src[start..end].to_string()
}

fn tokenize(src: &str) -> TelaResult<Vec<Token>> {
    let bytes = src.as_bytes();
    let len = bytes.len();
    let mut out = Vec::new();
    let mut i = 0;

    while i < len {
        if bytes[i] != b'<' {
            let start = i;
            while i < len && bytes[i] != b'<' {
                i += 1;
            }
            out.push(Token::Text(src[start..i].to_string()));
            continue;
        }

        // Comment: skipped entirely.
        if src[i..].starts_with("<!--") {
            match src[i + 4..].find("-->") {
                Some(end) => {
                    i += 4 + end + 3;
                    continue;
                }
                None => {
                    return Err(TelaError::Parse {
                        position: i,
                        fragment: fragment_at(src, i),
                        message: "unterminated comment".to_string(),
                    })
                }
            }
        }

        // Close tag.
        if i + 1 < len && bytes[i + 1] == b'/' {
            let position = i;
            let start = i + 2;
            let mut j = start;
            while j < len && is_name_byte(bytes[j]) {
                j += 1;
            }
            let name = src[start..j].to_string();
            while j < len && bytes[j] != b'>' {
                j += 1;
            }
            if j >= len {
                return Err(TelaError::Parse {
                    position,
                    fragment: fragment_at(src, position),
                    message: "unterminated closing tag".to_string(),
                });
            }
            out.push(Token::Close { name, position });
            i = j + 1;
            continue;
        }

        // Open tag? A '<' not followed by a name is literal text.
        if i + 1 >= len || !is_name_byte(bytes[i + 1]) {
            out.push(Token::Text("<".to_string()));
            i += 1;
            continue;
        }

        let position = i;
        let start = i + 1;
        let mut j = start;
        while j < len && is_name_byte(bytes[j]) {
            j += 1;
        }
        let mut tag = Tag {
            name: src[start..j].to_string(),
            ..Tag::default()
        };
        let mut attributes: Vec<(String, Option<String>)> = Vec::new();
        let mut k = j;
        let mut closed = false;

        while k < len {
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k >= len {
                break;
            }
            if bytes[k] == b'>' {
                tag.is_content_set = true;
                k += 1;
                closed = true;
                break;
            }
            if bytes[k] == b'/' && k + 1 < len && bytes[k + 1] == b'>' {
                k += 2;
                closed = true;
                break;
            }

            // Attribute name, buffered until a value (or bare form) commits it.
            let name_start = k;
            while k < len && is_name_byte(bytes[k]) {
                k += 1;
            }
            if name_start == k {
                return Err(TelaError::Parse {
                    position: k,
                    fragment: fragment_at(src, position),
                    message: format!("unexpected character in tag '{}'", tag.name),
                });
            }
            tag.attr_name = src[name_start..k].to_string();
            tag.is_first_value = true;

            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < len && bytes[k] == b'=' {
                k += 1;
                while k < len && bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                    let quote = bytes[k];
                    tag.attr_sep = Some(quote as char);
                    k += 1;
                    let value_start = k;
                    while k < len && bytes[k] != quote {
                        k += 1;
                    }
                    if k >= len {
                        return Err(TelaError::Parse {
                            position,
                            fragment: fragment_at(src, position),
                            message: format!(
                                "unterminated attribute value in tag '{}'",
                                tag.name
                            ),
                        });
                    }
                    let value = src[value_start..k].to_string();
                    k += 1;
                    attributes.push((std::mem::take(&mut tag.attr_name), Some(value)));
                    tag.attr_sep = None;
                    tag.is_first_value = false;
                } else {
                    // Unquoted value; an empty one means a dangling '=' and
                    // the buffered name is dropped silently.
                    let value_start = k;
                    while k < len
                        && !bytes[k].is_ascii_whitespace()
                        && bytes[k] != b'>'
                        && !(bytes[k] == b'/' && k + 1 < len && bytes[k + 1] == b'>')
                    {
                        k += 1;
                    }
                    if k > value_start {
                        let value = src[value_start..k].to_string();
                        attributes.push((std::mem::take(&mut tag.attr_name), Some(value)));
                        tag.is_first_value = false;
                    } else {
                        log::debug!(
                            "dropping valueless attribute '{}' in tag '{}'",
                            tag.attr_name,
                            tag.name
                        );
                        tag.attr_name.clear();
                    }
                }
            } else {
                // Bare attribute.
                attributes.push((std::mem::take(&mut tag.attr_name), None));
                tag.is_first_value = false;
            }
        }

        if !closed {
            return Err(TelaError::Parse {
                position,
                fragment: fragment_at(src, position),
                message: format!("unterminated tag '{}'", tag.name),
            });
        }

        out.push(Token::Open {
            tag,
            attributes,
            position,
        });
        i = k;
    }

    Ok(out)
}

/// Maps a child tag name onto its owner's attribute name when the tag uses
/// the subtag encoding: a `p:` prefix (`<p:case>` → `case`) or a capitalized
/// name (`<Else>` → `else`). Lowercase names are literal markup.
fn subtag_attr_name(tag_name: &str) -> Option<String> {
    if let Some(stripped) = tag_name.strip_prefix("p:") {
        return Some(stripped.to_string());
    }
    let mut chars = tag_name.chars();
    let first = chars.next()?;
    if first.is_ascii_uppercase() {
        let mut name = first.to_ascii_lowercase().to_string();
        name.push_str(chars.as_str());
        return Some(name);
    }
    None
}

struct Frame {
    node: ComponentNode,
    open_name: String,
    /// The owner attribute this node binds to, when subtag-encoded.
    subtag_of: Option<String>,
    position: usize,
}

/// Parses markup into a component tree rooted at a synthetic fragment node.
pub fn parse(src: &str) -> TelaResult<ComponentNode> {
    let tokens = tokenize(src)?;
    let mut stack: Vec<Frame> = vec![Frame {
        node: ComponentNode::fragment(),
        open_name: String::new(),
        subtag_of: None,
        position: 0,
    }];

    for token in tokens {
        match token {
            Token::Text(text) => {
                // The stack always holds at least the fragment root.
                let top = &mut stack.last_mut().unwrap().node;
                if !top.allows_children() {
                    if text.trim().is_empty() {
                        continue;
                    }
                    return Err(TelaError::Config {
                        component: top.tag_name().to_string(),
                        message: "this component does not allow content".to_string(),
                    });
                }
                top.add_child(ComponentNode::text(&text));
            }

            Token::Open {
                tag,
                attributes,
                position,
            } => {
                let parent = &stack.last().unwrap().node;

                let mut subtag_of = None;
                let mut node = match subtag_attr_name(&tag.name) {
                    Some(attr) if parent.attrs().is_subtag_attr(&attr) => {
                        // is_subtag_attr implies the type is declared.
                        let ty = parent.attrs().attr_type(&attr).unwrap();
                        subtag_of = Some(attr.clone());
                        ComponentNode::parameter(&attr, ty)
                    }
                    _ => instantiate(&tag.name, position, src)?,
                };

                for (name, value) in &attributes {
                    let applied = match value {
                        Some(v) => node.attrs_mut().set_raw(name, v),
                        None => node.attrs_mut().set_bare(name),
                    };
                    applied.map_err(|e| locate(e, position, src))?;
                }
                node.set_has_body(tag.is_content_set);

                if tag.is_content_set {
                    stack.push(Frame {
                        node,
                        open_name: tag.name,
                        subtag_of,
                        position,
                    });
                } else {
                    close_into_parent(&mut stack, node, subtag_of, position, src)?;
                }
            }

            Token::Close { name, position } => {
                if stack.len() == 1 {
                    return Err(TelaError::Parse {
                        position,
                        fragment: fragment_at(src, position),
                        message: format!("unexpected closing tag '</{}>'", name),
                    });
                }
                let frame = stack.pop().unwrap();
                if frame.open_name != name {
                    return Err(TelaError::Parse {
                        position,
                        fragment: fragment_at(src, position),
                        message: format!(
                            "mismatched closing tag: expected '</{}>', found '</{}>'",
                            frame.open_name, name
                        ),
                    });
                }
                close_into_parent(&mut stack, frame.node, frame.subtag_of, position, src)?;
            }
        }
    }

    if stack.len() > 1 {
        let frame = stack.pop().unwrap();
        return Err(TelaError::Parse {
            position: frame.position,
            fragment: fragment_at(src, frame.position),
            message: format!("unclosed tag '<{}>'", frame.open_name),
        });
    }
    let root = stack.pop().unwrap();
    Ok(root.node)
}

fn instantiate(name: &str, position: usize, src: &str) -> TelaResult<ComponentNode> {
    match name {
        "If" => Ok(ComponentNode::structural(ComponentKind::If, name)),
        "Content" => Ok(ComponentNode::structural(ComponentKind::Content, name)),
        "Include" => Ok(ComponentNode::structural(ComponentKind::Include, name)),
        _ => {
            if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                Err(locate(
                    TelaError::UnknownComponent {
                        name: name.to_string(),
                    },
                    position,
                    src,
                ))
            } else {
                Ok(ComponentNode::html(name))
            }
        }
    }
}

fn close_into_parent(
    stack: &mut Vec<Frame>,
    node: ComponentNode,
    subtag_of: Option<String>,
    position: usize,
    src: &str,
) -> TelaResult<()> {
    node.attrs()
        .check_required()
        .map_err(|e| locate(e, position, src))?;
    let parent = &mut stack.last_mut().unwrap().node;
    match subtag_of {
        Some(attr) => parent
            .attrs_mut()
            .set_subtag(&attr, node)
            .map_err(|e| locate(e, position, src)),
        None => {
            if !parent.allows_children() {
                return Err(TelaError::Config {
                    component: parent.tag_name().to_string(),
                    message: "this component does not allow content".to_string(),
                });
            }
            parent.add_child(node);
            Ok(())
        }
    }
}

/// Attribute errors raised during assembly keep their own kind; parse
/// position context goes to the log instead of wrapping the error.
fn locate(e: TelaError, position: usize, src: &str) -> TelaError {
    log::debug!(
        "error at offset {} near '{}': {}",
        position,
        fragment_at(src, position),
        e
    );
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn parses_text_and_elements() {
        let root = parse("hello <b>world</b>").unwrap();
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.children()[0].text_content(), "hello ");
        assert_eq!(root.children()[1].tag_name(), "b");
    }

    #[test]
    fn quoted_and_bare_attributes() {
        let root = parse(r#"<input name="q" disabled/>"#).unwrap();
        let input = &root.children()[0];
        assert_eq!(input.attrs().get_text("name"), Some("q"));
        assert_eq!(*input.attrs().get("disabled"), Value::Bool(true));
        assert!(!input.has_body());
    }

    #[test]
    fn single_quoted_values() {
        let root = parse("<a href='x.html'>go</a>").unwrap();
        assert_eq!(root.children()[0].attrs().get_text("href"), Some("x.html"));
    }

    #[test]
    fn dangling_equals_drops_the_attribute_silently() {
        let root = parse("<div a= ><span b=></span></div>").unwrap();
        let div = &root.children()[0];
        assert!(div.attrs().get("a").is_null());
        let span = &div.children()[0];
        assert!(span.attrs().get("b").is_null());
    }

    #[test]
    fn mismatched_close_is_a_parse_error() {
        let err = parse("<div><span></div>").unwrap_err();
        assert!(matches!(err, TelaError::Parse { .. }));
    }

    #[test]
    fn unclosed_tag_is_a_parse_error() {
        let err = parse("<div>").unwrap_err();
        assert!(matches!(err, TelaError::Parse { .. }));
    }

    #[test]
    fn stray_close_is_a_parse_error() {
        let err = parse("</div>").unwrap_err();
        assert!(matches!(err, TelaError::Parse { .. }));
    }

    #[test]
    fn comments_are_skipped() {
        let root = parse("a<!-- ignored <b> -->z").unwrap();
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.children()[0].text_content(), "a");
        assert_eq!(root.children()[1].text_content(), "z");
    }

    #[test]
    fn unknown_capitalized_component_is_rejected() {
        let err = parse("<Bogus/>").unwrap_err();
        assert!(matches!(err, TelaError::UnknownComponent { .. }));
    }

    #[test]
    fn else_subtag_binds_to_the_owner_attribute() {
        let root = parse("<If the=\"x\"><p>a</p><Else><p>b</p></Else></If>").unwrap();
        let if_node = &root.children()[0];
        // The Else body lives in the attribute container, not the child list.
        assert_eq!(if_node.children().len(), 1);
        assert!(matches!(
            if_node.attrs().get("else"),
            Value::Component(_)
        ));
    }

    #[test]
    fn case_subtags_accumulate_in_order() {
        let root = parse(
            "<If the=\"x\">\
             <p:case is=\"a\">A</p:case>\
             <p:case is=\"b\">B</p:case>\
             </If>",
        )
        .unwrap();
        let if_node = &root.children()[0];
        let cases = if_node.attrs().get_components("case").unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].attrs().get_text("is"), Some("a"));
        assert_eq!(cases[1].attrs().get_text("is"), Some("b"));
    }

    #[test]
    fn unknown_attribute_on_structural_component_fails() {
        let err = parse("<If bogus=\"1\"/>").unwrap_err();
        assert!(matches!(err, TelaError::UnknownAttribute { .. }));
    }

    #[test]
    fn utf8_text_survives_tokenization() {
        let root = parse("café <b>naïve</b> 😊").unwrap();
        assert_eq!(root.children()[0].text_content(), "café ");
        assert_eq!(root.children()[2].text_content(), " 😊");
    }
}
