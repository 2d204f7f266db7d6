// UI layer: collects the watch parameters through sequential prompts using
// `dialoguer`, then hands off to the poll loop. The functions are small and
// synchronous to make the flow easy to follow.

use crate::api::{CommentClient, SearchClient};
use crate::watcher::{self, WatchParams};
use anyhow::{Context, Result};
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::thread;
use std::time::Duration;

/// Prompt for the watch parameters and run the loop until a comment is
/// posted or the search budget runs out. Blocks for the whole run.
pub fn run(search: SearchClient) -> Result<()> {
    let channel_id: String = Input::new()
        .with_prompt("ID of the channel you want to target")
        .interact_text()?;
    let query: String = Input::new()
        .with_prompt("Search term (usually the name of the channel)")
        .interact_text()?;
    let comment_text: String = Input::new()
        .with_prompt("Text you wish to comment")
        .interact_text()?;
    let searches = prompt_positive("Number of searches to make (the API allows 100 in a day)")?;
    let interval_secs = prompt_positive("Interval to wait between searches (in seconds)")? as u64;

    let params = WatchParams {
        channel_id,
        query,
        comment_text,
        searches,
        interval_secs,
    };

    // The authorized comment client is built inside the loop, only once a
    // new upload has been confirmed.
    let outcome = watcher::watch(&params, &search, CommentClient::authorize, wait_with_spinner)?;
    if outcome.is_none() {
        println!("No new upload appeared within the search budget.");
    }
    Ok(())
}

/// Prompt for an integer and fail the run if it is not a positive number.
fn prompt_positive(prompt: &str) -> Result<u32> {
    let raw: String = Input::new().with_prompt(prompt).interact_text()?;
    parse_positive(&raw)
}

/// Parse a prompt answer into a positive integer. Non-numeric or zero input
/// is a fatal startup error, not a re-prompt.
fn parse_positive(raw: &str) -> Result<u32> {
    let value: u32 = raw
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a number", raw.trim()))?;
    if value == 0 {
        anyhow::bail!("Expected a number greater than zero, got '{}'", raw.trim());
    }
    Ok(value)
}

/// Blocking wait between poll iterations. indicatif's spinner keeps the
/// terminal from looking hung during the sleep.
fn wait_with_spinner(duration: Duration) {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
    spinner.set_message("Waiting before the next search...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    thread::sleep(duration);
    spinner.finish_and_clear();
}
