// Library root
// -----------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) uses these modules to implement the prompt-then-poll flow.
//
// Module responsibilities:
// - `api`: the two YouTube Data API clients (unauthenticated search,
//   authorized comment insert), their request/response shapes, and the
//   trait seams the watch loop calls through.
// - `watcher`: the bounded poll-and-comment loop with its seen-id registry.
// - `ui`: terminal prompts, the wait spinner, and end-of-run reporting.
//
// Keeping the loop behind trait seams makes its timing and call-count
// behavior testable without network access or real sleeps.
pub mod api;
pub mod ui;
pub mod watcher;
