// Entrypoint for the CLI application.
// - Keeps `main` small: create the search client and hand it to the UI flow.
// - Returns `anyhow::Result` so any fatal error prints one diagnostic and
//   exits non-zero.

use first_comment_cli::{api::SearchClient, ui};

fn main() -> anyhow::Result<()> {
    // The developer API key and endpoint come from the environment; see
    // `api::SearchClient::from_env`. The authorized comment client is built
    // later, only once a new upload has been spotted.
    let search = SearchClient::from_env()?;

    // Start the prompt-then-poll flow. This call blocks until the run ends.
    ui::run(search)?;
    Ok(())
}
