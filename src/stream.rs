//! Streaming display: emit a reply piece by piece.
//!
//! Hosted providers return the complete reply in one response; this replays
//! it word by word for the terminal front-end.
//!
//! Each item is one word together with the whitespace that follows it, so
//! concatenating the stream reproduces the reply exactly.

use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::Stream;

/// A boxed stream of reply fragments.
pub type ReplyStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Split `text` into word-plus-trailing-whitespace fragments.
pub fn split_words(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut in_space = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            in_space = true;
        } else if in_space {
            pieces.push(std::mem::take(&mut current));
            in_space = false;
        }
        current.push(ch);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Stream `text` word by word, pausing `delay` before each fragment after the first.
pub fn reply_stream(text: &str, delay: Duration) -> ReplyStream {
    let pieces = split_words(text);
    let s = stream::iter(pieces.into_iter().enumerate()).then(move |(i, piece)| async move {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        piece
    });
    Box::pin(s)
}
