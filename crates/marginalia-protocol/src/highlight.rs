//! NIP-84 highlight events.
//!
//! A highlight is a kind-9802 event whose content is the excerpt itself.
//! The source is described by tags. Books have no canonical URL or
//! Nostr address, so the title and author are carried as plain `title`
//! and `author` tags alongside a NIP-31 `alt` summary.

use marginalia_crypto::signing::PublicKey;
use marginalia_types::{Kind, MarginaliaError, Result};
use serde::{Deserialize, Serialize};

use crate::event::{tag, Tag, UnsignedEvent};

/// Bibliographic data for the document a highlight was taken from.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BookMetadata {
    /// Document title.
    pub title: String,
    /// Author / creator as shown by the reader.
    pub creator: String,
}

impl BookMetadata {
    /// Creates metadata from a title and creator.
    pub fn new(title: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            creator: creator.into(),
        }
    }
}

/// Builds the tag list for a highlight.
///
/// Tag order: `context`, `comment`, `title`, `author`, `alt`. Empty
/// context and comment values are omitted; `title` and `author` are
/// always present, possibly empty, and `alt` falls back to a shorter
/// summary when they are blank.
pub fn highlight_tags(book: &BookMetadata, context: &str, comment: Option<&str>) -> Vec<Tag> {
    let mut tags = Vec::new();

    let context = context.trim();
    if !context.is_empty() {
        tags.push(tag("context", context));
    }

    if let Some(comment) = comment.map(str::trim).filter(|c| !c.is_empty()) {
        tags.push(tag("comment", comment));
    }

    let title = book.title.trim();
    let creator = book.creator.trim();
    tags.push(tag("title", title));
    tags.push(tag("author", creator));

    tags.push(tag("alt", &alt_text(title, creator)));
    tags
}

fn alt_text(title: &str, creator: &str) -> String {
    match (title.is_empty(), creator.is_empty()) {
        (false, false) => format!("Highlight from {title} by {creator}"),
        (false, true) => format!("Highlight from {title}"),
        (true, false) => format!("Highlight from a work by {creator}"),
        (true, true) => "Highlight".to_string(),
    }
}

/// Builds an unsigned highlight event authored by `pubkey`.
///
/// # Errors
///
/// Returns [`MarginaliaError::InvalidInput`] if the highlighted text is
/// empty after trimming.
pub fn build_highlight(
    pubkey: PublicKey,
    text: &str,
    book: &BookMetadata,
    context: &str,
    comment: Option<&str>,
) -> Result<UnsignedEvent> {
    let text = text.trim();
    if text.is_empty() {
        return Err(MarginaliaError::InvalidInput {
            reason: "highlight text is empty".into(),
        });
    }

    Ok(UnsignedEvent::new(
        pubkey,
        Kind::HIGHLIGHT,
        text,
        highlight_tags(book, context, comment),
    ))
}
