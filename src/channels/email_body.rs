//! Plain-text body extraction from MIME trees.
//!
//! A parsed message is reduced to a [`MimePart`] tree: leaves carry a
//! content type and a decoded payload, composites carry their children in
//! document order. Extraction is a depth-first search for the first
//! `text/plain` leaf.

use mail_parser::{MessageParser, MimeHeaders, PartType};

use crate::error::BodyError;

/// Content type assumed for parts that declare none (RFC 2045 §5.2).
const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Decoded payload of a leaf part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Transfer encoding and charset already decoded.
    Text(String),
    /// Transfer-decoded bytes with no known text representation.
    Binary(Vec<u8>),
}

/// One node of a MIME tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimePart {
    Leaf {
        content_type: String,
        payload: Payload,
    },
    Composite {
        content_type: String,
        parts: Vec<MimePart>,
    },
}

/// A raw message after parsing: its subject and its content tree.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    pub subject: Option<String>,
    pub root: MimePart,
}

impl ParsedMessage {
    /// Parse an RFC 5322 message. Returns `None` if the bytes are not a message at all.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let message = MessageParser::default().parse(raw)?;
        Some(Self {
            subject: message.subject().map(str::to_string),
            root: MimePart::from_message(&message),
        })
    }
}

impl MimePart {
    /// Convenience constructor for a text leaf.
    pub fn text(content_type: &str, text: impl Into<String>) -> Self {
        Self::Leaf {
            content_type: content_type.to_ascii_lowercase(),
            payload: Payload::Text(text.into()),
        }
    }

    /// Convenience constructor for a composite node.
    pub fn composite(content_type: &str, parts: Vec<MimePart>) -> Self {
        Self::Composite {
            content_type: content_type.to_ascii_lowercase(),
            parts,
        }
    }

    pub fn content_type(&self) -> &str {
        match self {
            Self::Leaf { content_type, .. } | Self::Composite { content_type, .. } => content_type,
        }
    }

    fn is_plain_text_leaf(&self) -> bool {
        matches!(self, Self::Leaf { content_type, .. } if content_type == "text/plain")
    }

    /// Build the tree for a parsed message, starting at its root part.
    pub fn from_message(message: &mail_parser::Message<'_>) -> Self {
        match message.parts.first() {
            Some(root) => Self::from_part(message, root),
            None => Self::text(DEFAULT_CONTENT_TYPE, ""),
        }
    }

    fn from_part(message: &mail_parser::Message<'_>, part: &mail_parser::MessagePart<'_>) -> Self {
        let content_type = content_type_of(part);
        match &part.body {
            PartType::Text(text) | PartType::Html(text) => Self::Leaf {
                content_type,
                payload: Payload::Text(text.to_string()),
            },
            PartType::Binary(bytes) | PartType::InlineBinary(bytes) => Self::Leaf {
                content_type,
                payload: Payload::Binary(bytes.to_vec()),
            },
            // An attached message is walked like any other container.
            PartType::Message(inner) => Self::Composite {
                content_type,
                parts: vec![Self::from_message(inner)],
            },
            PartType::Multipart(ids) => Self::Composite {
                content_type,
                parts: ids
                    .iter()
                    .filter_map(|id| message.parts.get(usize::try_from(*id).ok()?))
                    .map(|child| Self::from_part(message, child))
                    .collect(),
            },
        }
    }
}

fn content_type_of(part: &mail_parser::MessagePart<'_>) -> String {
    match MimeHeaders::content_type(part) {
        Some(ct) => match ct.subtype() {
            Some(sub) => format!("{}/{}", ct.ctype(), sub).to_ascii_lowercase(),
            None => ct.ctype().to_ascii_lowercase(),
        },
        None => DEFAULT_CONTENT_TYPE.to_string(),
    }
}

/// Produce the single best plain-text rendering of a message.
///
/// - A lone leaf yields its own payload, whatever its content type.
/// - A composite yields the first `text/plain` leaf in document order,
///   searching nested composites, or `""` if there is none.
///
/// A chosen payload that is not valid UTF-8 is a decode error; no
/// fallback is attempted.
pub fn extract_body(root: &MimePart) -> Result<String, BodyError> {
    match root {
        MimePart::Leaf { .. } => leaf_text(root),
        MimePart::Composite { parts, .. } => match first_plain_text(parts) {
            Some(leaf) => leaf_text(leaf),
            None => Ok(String::new()),
        },
    }
}

fn first_plain_text(parts: &[MimePart]) -> Option<&MimePart> {
    parts.iter().find_map(|part| match part {
        MimePart::Composite { parts, .. } => first_plain_text(parts),
        leaf if leaf.is_plain_text_leaf() => Some(leaf),
        MimePart::Leaf { .. } => None,
    })
}

fn leaf_text(part: &MimePart) -> Result<String, BodyError> {
    match part {
        MimePart::Leaf {
            payload: Payload::Text(text),
            ..
        } => Ok(text.clone()),
        MimePart::Leaf {
            content_type,
            payload: Payload::Binary(bytes),
        } => String::from_utf8(bytes.clone()).map_err(|e| BodyError::Decode {
            content_type: content_type.clone(),
            reason: e.to_string(),
        }),
        MimePart::Composite { .. } => Ok(String::new()),
    }
}
