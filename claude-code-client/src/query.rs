//! Simple query interface for one-shot interactions
//!
//! This module provides the [`query`] function for stateless, fire-and-forget
//! interactions with the Claude Code CLI.

use crate::{
    client::ClaudeSDKClient,
    errors::Result,
    types::{ClaudeCodeOptions, Message},
};
use futures::stream::{Stream, StreamExt};

/// Query Claude Code once and stream the response
///
/// Launches the CLI in one-shot mode (`--print`), streams every message of
/// the turn, and tears the process down when the stream is dropped or
/// exhausted. For interactive conversations with follow-ups, interrupts, or
/// permission callbacks, use [`ClaudeSDKClient`] instead.
///
/// # Example
///
/// ```rust,no_run
/// use claude_code_client::{query, Result};
/// use futures::{pin_mut, StreamExt};
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let messages = query("What is 2 + 2?", None).await?;
///     pin_mut!(messages);
///
///     while let Some(msg) = messages.next().await {
///         println!("{:?}", msg?);
///     }
///
///     Ok(())
/// }
/// ```
pub async fn query(
    prompt: impl Into<String>,
    options: Option<ClaudeCodeOptions>,
) -> Result<impl Stream<Item = Result<Message>> + Send> {
    let options = options.unwrap_or_default();

    let mut client = ClaudeSDKClient::new(options);
    client.connect_with_prompt(prompt).await?;

    Ok(async_stream::stream! {
        let mut messages = client.receive_messages();
        while let Some(item) = messages.next().await {
            yield item;
        }
        drop(messages);
        // One-shot sessions end with the stream; a non-zero exit already
        // surfaced through the message channel.
        let _ = client.disconnect().await;
    })
}
