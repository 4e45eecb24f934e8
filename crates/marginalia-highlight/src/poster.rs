//! Posting a reader selection as a highlight.
//!
//! [`HighlightPoster`] is the per-view state behind a "post to Nostr"
//! button: whether a post is in flight, the last error, and optional
//! success / error callbacks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use marginalia_protocol::highlight::BookMetadata;
use marginalia_session::NostrAuth;
use marginalia_types::config::AppConfig;
use marginalia_types::{EventId, MarginaliaError, Result};

use crate::context::{extract_context_with, SelectionRange, DEFAULT_SENTENCES};

type SuccessCallback = Box<dyn Fn(&EventId) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&MarginaliaError) + Send + Sync>;

/// Posts highlights through a [`NostrAuth`] session.
pub struct HighlightPoster {
    auth: Arc<NostrAuth>,
    sentences_before: usize,
    sentences_after: usize,
    posting: AtomicBool,
    last_error: Mutex<Option<String>>,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl HighlightPoster {
    pub fn new(auth: Arc<NostrAuth>) -> Self {
        Self {
            auth,
            sentences_before: DEFAULT_SENTENCES,
            sentences_after: DEFAULT_SENTENCES,
            posting: AtomicBool::new(false),
            last_error: Mutex::new(None),
            on_success: None,
            on_error: None,
        }
    }

    /// Uses the context sentence counts from `config`.
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.sentences_before = config.context_sentences_before;
        self.sentences_after = config.context_sentences_after;
        self
    }

    pub fn on_success(mut self, f: impl Fn(&EventId) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&MarginaliaError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Whether a post is in flight.
    pub fn is_posting(&self) -> bool {
        self.posting.load(Ordering::SeqCst)
    }

    /// Message of the last failed post, cleared when a new post starts.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|e| e.clone())
    }

    pub fn is_logged_in(&self) -> bool {
        self.auth.is_logged_in()
    }

    /// Extracts the selection's context and publishes `text` as a
    /// highlight of `book`.
    ///
    /// # Errors
    ///
    /// - [`MarginaliaError::NotLoggedIn`] without a session.
    /// - Any signing or relay error from the session.
    pub async fn post_highlight(
        &self,
        text: &str,
        range: &SelectionRange,
        book: &BookMetadata,
        comment: Option<&str>,
    ) -> Result<EventId> {
        if !self.auth.is_logged_in() {
            tracing::info!("highlight not posted: not logged in");
            return Err(self.fail(MarginaliaError::NotLoggedIn));
        }

        self.posting.store(true, Ordering::SeqCst);
        let posting = PostingGuard(&self.posting);
        self.set_error(None);

        let context = extract_context_with(range, self.sentences_before, self.sentences_after);
        tracing::debug!(title = %book.title, context_len = context.len(), "posting highlight");

        let result = self
            .auth
            .try_publish_highlight(text, book, &context, comment)
            .await;
        drop(posting);

        match result {
            Ok(id) => {
                tracing::info!(%id, title = %book.title, "highlight posted");
                if let Some(cb) = &self.on_success {
                    cb(&id);
                }
                Ok(id)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to post highlight");
                Err(self.fail(e))
            }
        }
    }

    fn fail(&self, error: MarginaliaError) -> MarginaliaError {
        self.set_error(Some(error.to_string()));
        if let Some(cb) = &self.on_error {
            cb(&error);
        }
        error
    }

    fn set_error(&self, message: Option<String>) {
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = message;
        }
    }
}

/// Clears the in-flight flag when dropped, including when the posting
/// future is cancelled.
struct PostingGuard<'a>(&'a AtomicBool);

impl Drop for PostingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
