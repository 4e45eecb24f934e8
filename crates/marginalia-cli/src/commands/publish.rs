//! Publishing arbitrary events.

use clap::Args;
use marginalia_protocol::event::{tag, Tag};
use marginalia_types::Kind;

use super::open_session;
use crate::output;
use crate::GlobalOpts;

#[derive(Args)]
pub struct PublishArgs {
    /// Event kind.
    #[arg(long, default_value_t = 1)]
    kind: u16,
    /// Tag as `name=value` (repeatable).
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Event content.
    content: String,
}

pub async fn run(args: PublishArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let tags = args
        .tags
        .iter()
        .map(|t| parse_tag(t))
        .collect::<Result<Vec<_>, _>>()?;

    let auth = open_session(opts)?;
    let id = auth
        .try_publish_event(Kind::new(args.kind), &args.content, tags)
        .await
        .map_err(|e| e.to_string())?;

    if opts.json {
        output::print_record(
            &[("status", "ok".into()), ("id", id.to_hex().into())],
            true,
        );
    } else {
        output::print_success(&format!("published event {id}"), false);
    }
    Ok(())
}

/// Parses `name=value` into a two-element tag.
fn parse_tag(s: &str) -> Result<Tag, String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok(tag(name.trim(), value)),
        _ => Err(format!("tag must be name=value, got '{s}'")),
    }
}
