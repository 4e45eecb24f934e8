//! Highlight commands: context preview and posting.
//!
//! Selections are character offsets into a UTF-8 text file, standing in
//! for a reader's text selection.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use marginalia_highlight::{extract_context_with, HighlightPoster, SelectionRange};
use marginalia_protocol::highlight::BookMetadata;

use super::open_session;
use crate::output;
use crate::GlobalOpts;

#[derive(Args)]
pub struct ContextArgs {
    #[command(flatten)]
    selection: SelectionArgs,
}

#[derive(Args)]
pub struct HighlightArgs {
    #[command(flatten)]
    selection: SelectionArgs,
    /// Book title.
    #[arg(long)]
    title: String,
    /// Book author.
    #[arg(long)]
    author: String,
    /// Optional comment on the highlight.
    #[arg(long)]
    comment: Option<String>,
}

#[derive(Args)]
struct SelectionArgs {
    /// Text file containing the passage.
    #[arg(long)]
    file: PathBuf,
    /// Character offset where the selection starts.
    #[arg(long)]
    start: usize,
    /// Character offset where the selection ends (exclusive).
    #[arg(long)]
    end: usize,
}

impl SelectionArgs {
    fn load(&self) -> Result<SelectionRange, String> {
        if self.start > self.end {
            return Err(format!(
                "selection start ({}) is after end ({})",
                self.start, self.end
            ));
        }
        let text = std::fs::read_to_string(&self.file)
            .map_err(|e| format!("failed to read {}: {e}", self.file.display()))?;
        let len = text.chars().count();
        if self.end > len {
            return Err(format!("selection end ({}) is past the text length ({len})", self.end));
        }
        Ok(SelectionRange::from_text(&text, self.start, self.end))
    }
}

pub fn context(args: ContextArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let range = args.selection.load()?;
    let app = &opts.config.app;
    let context = extract_context_with(&range, app.context_sentences_before, app.context_sentences_after);
    output::print_kv("context", &context, opts.json);
    Ok(())
}

pub async fn highlight(args: HighlightArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let range = args.selection.load()?;
    let selected = range.selected_text();
    let text = selected.trim();
    if text.is_empty() {
        return Err("selection is empty".into());
    }

    let auth = open_session(opts)?;
    let poster = HighlightPoster::new(Arc::new(auth)).with_config(&opts.config.app);
    let book = BookMetadata::new(args.title, args.author);
    let id = poster
        .post_highlight(text, &range, &book, args.comment.as_deref())
        .await
        .map_err(|e| e.to_string())?;

    if opts.json {
        output::print_record(
            &[("status", "ok".into()), ("id", id.to_hex().into())],
            true,
        );
    } else {
        output::print_success(&format!("highlight posted: {id}"), false);
    }
    Ok(())
}
