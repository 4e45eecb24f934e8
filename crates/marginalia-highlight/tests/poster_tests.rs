//! Integration tests for highlight posting.
//!
//! A session is logged in with a fixed key and publishes to an
//! in-memory relay.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use marginalia_crypto::nip19::encode_nsec;
use marginalia_crypto::signing::Keys;
use marginalia_highlight::{HighlightPoster, SelectionRange};
use marginalia_protocol::event::Event;
use marginalia_protocol::highlight::BookMetadata;
use marginalia_relay::{Filter, PublishAck, RelayClient, RelayPool};
use marginalia_session::{MemorySessionStore, NostrAuth};
use marginalia_types::config::AppConfig;
use marginalia_types::{Kind, MarginaliaError, Result};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PASSAGE: &str = "The spice must flow. He said it twice. Fear is the mind-killer. \
                       It is the little death. It brings total obliteration. I will face it.";

struct MemoryRelay {
    accept: bool,
    delay: Option<Duration>,
    stored: Mutex<Vec<Event>>,
}

#[async_trait]
impl RelayClient for MemoryRelay {
    fn url(&self) -> &str {
        "wss://memory"
    }

    async fn publish(&self, event: &Event) -> Result<PublishAck> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.accept {
            if let Ok(mut stored) = self.stored.lock() {
                stored.push(event.clone());
            }
        }
        Ok(PublishAck {
            relay: self.url().to_string(),
            event_id: event.id,
            accepted: self.accept,
            message: if self.accept { String::new() } else { "blocked: nope".into() },
        })
    }

    async fn query(&self, _filter: Filter) -> Result<Vec<Event>> {
        Ok(Vec::new())
    }
}

fn relay(accept: bool) -> Arc<MemoryRelay> {
    Arc::new(MemoryRelay {
        accept,
        delay: None,
        stored: Mutex::new(Vec::new()),
    })
}

async fn logged_in_auth(relay: &Arc<MemoryRelay>) -> Arc<NostrAuth> {
    let client: Arc<dyn RelayClient> = relay.clone();
    let auth = NostrAuth::new(Arc::new(MemorySessionStore::new()), RelayPool::new(vec![client]));
    let keys = Keys::from_secret_bytes(&[0x42u8; 32]).unwrap_or_else(|_| Keys::generate());
    let nsec = encode_nsec(&keys).unwrap_or_default();
    assert!(auth.login_with_nsec(&nsec).await);
    Arc::new(auth)
}

fn selection(needle: &str) -> SelectionRange {
    let byte = PASSAGE.find(needle).unwrap_or(0);
    let start = PASSAGE[..byte].chars().count();
    SelectionRange::from_text(PASSAGE, start, start + needle.chars().count())
}

fn dune() -> BookMetadata {
    BookMetadata::new("Dune", "Frank Herbert")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn posts_highlight_with_context() -> Result<()> {
    let relay = relay(true);
    let succeeded = Arc::new(AtomicUsize::new(0));
    let counter = succeeded.clone();
    let poster = HighlightPoster::new(logged_in_auth(&relay).await).on_success(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let text = "Fear is the mind-killer.";
    let id = poster
        .post_highlight(text, &selection(text), &dune(), Some("a classic"))
        .await?;

    let stored = relay.stored.lock().map(|s| s.clone()).unwrap_or_default();
    assert_eq!(stored.len(), 1);
    let ev = &stored[0];
    assert_eq!(ev.id, id);
    assert_eq!(ev.kind, Kind::HIGHLIGHT);
    assert_eq!(
        ev.tag_value("context"),
        Some(
            "The spice must flow. He said it twice. [Fear is the mind-killer.] \
             It is the little death. It brings total obliteration."
        )
    );
    assert_eq!(ev.tag_value("comment"), Some("a classic"));
    assert_eq!(succeeded.load(Ordering::SeqCst), 1);
    assert!(!poster.is_posting());
    assert_eq!(poster.last_error(), None);
    Ok(())
}

#[tokio::test]
async fn config_controls_sentence_window() -> Result<()> {
    let relay = relay(true);
    let config = AppConfig {
        context_sentences_before: 1,
        context_sentences_after: 0,
        ..AppConfig::default()
    };
    let poster = HighlightPoster::new(logged_in_auth(&relay).await).with_config(&config);

    let text = "Fear is the mind-killer.";
    poster.post_highlight(text, &selection(text), &dune(), None).await?;

    let stored = relay.stored.lock().map(|s| s.clone()).unwrap_or_default();
    assert_eq!(
        stored[0].tag_value("context"),
        Some("He said it twice. [Fear is the mind-killer.]")
    );
    Ok(())
}

#[tokio::test]
async fn not_logged_in_reports_error() {
    let errors = Arc::new(AtomicUsize::new(0));
    let counter = errors.clone();
    let auth = Arc::new(NostrAuth::new(Arc::new(MemorySessionStore::new()), RelayPool::empty()));
    let poster = HighlightPoster::new(auth).on_error(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(!poster.is_logged_in());
    let result = poster
        .post_highlight("x", &selection("Fear"), &dune(), None)
        .await;
    assert!(matches!(result, Err(MarginaliaError::NotLoggedIn)));
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(poster.last_error().as_deref(), Some("not logged in to Nostr"));
}

#[tokio::test]
async fn relay_rejection_sets_last_error() {
    let relay = relay(false);
    let poster = HighlightPoster::new(logged_in_auth(&relay).await);

    let text = "Fear is the mind-killer.";
    let result = poster.post_highlight(text, &selection(text), &dune(), None).await;
    assert!(matches!(result, Err(MarginaliaError::RelayError { .. })));
    assert!(!poster.is_posting());
    assert!(poster.last_error().is_some());
}

#[tokio::test]
async fn cancelled_post_clears_posting_flag() {
    let relay = Arc::new(MemoryRelay {
        accept: true,
        delay: Some(Duration::from_secs(5)),
        stored: Mutex::new(Vec::new()),
    });
    let poster = HighlightPoster::new(logged_in_auth(&relay).await);

    let text = "Fear is the mind-killer.";
    let sel = selection(text);
    let book = dune();
    let post = poster.post_highlight(text, &sel, &book, None);
    let result = tokio::time::timeout(Duration::from_millis(50), post).await;

    assert!(result.is_err());
    assert!(!poster.is_posting());
}
