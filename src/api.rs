// API layer: two small blocking HTTP clients for the YouTube Data API v3.
// `SearchClient` performs unauthenticated, API-key searches; `CommentClient`
// performs the authorized comment insert. They are distinct handles built at
// their respective points of need and never shared or reassigned.

use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resource kind string the API uses for plain videos. Search results of any
/// other kind (playlists, channels) carry no usable video id.
pub const VIDEO_KIND: &str = "youtube#video";

/// OAuth scope a comment-write credential must carry.
pub const COMMENT_SCOPE: &str = "https://www.googleapis.com/auth/youtube.force-ssl";

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Single result of a search call: the resource kind plus the video id when
/// the kind denotes a video.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub kind: String,
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

impl SearchHit {
    pub fn is_video(&self) -> bool {
        self.kind == VIDEO_KIND
    }
}

/// Top-level comment to be posted on a freshly discovered video. Built once
/// per discovery, sent once, discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRequest {
    pub channel_id: String,
    pub video_id: String,
    pub text: String,
}

/// What the server reports back about a created comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedComment {
    pub author: String,
    pub text: String,
}

/// Search side of the API, as seen by the watch loop.
pub trait VideoSearch {
    /// The single newest upload on the channel matching the query, if any.
    fn latest_upload(&self, channel_id: &str, query: &str) -> Result<Option<SearchHit>>;
}

/// Comment-insert side of the API, as seen by the watch loop.
pub trait CommentPoster {
    fn insert_comment(&self, req: &CommentRequest) -> Result<PostedComment>;
}

/// Unauthenticated client for the search endpoint. Holds the developer API
/// key and the base URL of the API.
pub struct SearchClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SearchClient {
    /// Build a search client from the environment. `YT_API_KEY` must hold a
    /// developer API key; `YT_API_BASE_URL` overrides the production
    /// endpoint (useful against a local API mock).
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("YT_API_KEY")
            .context("YT_API_KEY is not set; searches need a developer API key")?;
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(SearchClient {
            client,
            base_url: base_url_from_env(),
            api_key,
        })
    }
}

impl VideoSearch for SearchClient {
    /// Ask for the single newest upload on the channel matching the query.
    /// Only the id fields are requested; ordering, result type and result
    /// count are fixed.
    fn latest_upload(&self, channel_id: &str, query: &str) -> Result<Option<SearchHit>> {
        let url = format!("{}/search", &self.base_url);
        let res = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("channelId", channel_id),
                ("q", query),
                ("part", "id"),
                ("fields", "items(id/kind,id/videoId)"),
                ("maxResults", "1"),
                ("order", "date"),
                ("type", "video"),
            ])
            .send()
            .context("Failed to send search request")?;
        let res = successful(res, "Search")?;
        let parsed: SearchListResponse = res.json().context("Parsing search response json")?;
        Ok(parsed.items.into_iter().next().map(|item| item.id))
    }
}

/// Authorized client for the comment-insert endpoint. Holds a bearer token
/// scoped for comment writes.
pub struct CommentClient {
    client: Client,
    base_url: String,
    token: String,
}

impl CommentClient {
    /// Build an authorized client from a previously issued bearer token:
    /// `YT_ACCESS_TOKEN` first, then the home-dir token file. Called only
    /// once a new video has been confirmed, never at startup.
    pub fn authorize() -> Result<Self> {
        let token = load_token()?;
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(CommentClient {
            client,
            base_url: base_url_from_env(),
            token,
        })
    }

    /// Build the Authorization header map from the stored bearer token.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let val = format!("Bearer {}", self.token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&val).context("Bearer token is not a valid header value")?,
        );
        Ok(headers)
    }
}

impl CommentPoster for CommentClient {
    /// Create a top-level comment thread on the target video and return what
    /// the server says about the created comment.
    fn insert_comment(&self, req: &CommentRequest) -> Result<PostedComment> {
        let url = format!("{}/commentThreads", &self.base_url);
        let body = CommentThreadBody {
            snippet: ThreadSnippet {
                channel_id: &req.channel_id,
                video_id: &req.video_id,
                top_level_comment: TopLevelComment {
                    snippet: CommentText {
                        text_original: &req.text,
                    },
                },
            },
        };
        let res = self
            .client
            .post(&url)
            .query(&[("part", "snippet")])
            .headers(self.auth_headers()?)
            .json(&body)
            .send()
            .context("Failed to send comment insert request")?;
        let res = successful(res, "Comment insert")?;
        let parsed: CommentThreadResponse =
            res.json().context("Parsing comment insert response json")?;
        let snippet = parsed.snippet.top_level_comment.snippet;
        Ok(PostedComment {
            author: snippet.author_display_name,
            text: snippet.text_display,
        })
    }
}

fn base_url_from_env() -> String {
    std::env::var("YT_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into())
}

/// Where the bearer token lives when it is not supplied via the environment.
fn token_file() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(".first_comment_token")
}

/// Read the comment-write bearer token, preferring the environment over the
/// token file. Tokens are never compiled in.
fn load_token() -> Result<String> {
    if let Ok(token) = std::env::var("YT_ACCESS_TOKEN") {
        return Ok(token.trim().to_string());
    }
    let path = token_file();
    let data = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "No comment-write credential: set YT_ACCESS_TOKEN or put a bearer token authorized for {} in {}",
            COMMENT_SCOPE,
            path.display()
        )
    })?;
    Ok(data.trim().to_string())
}

/// Pass a successful response through; turn anything else into a diagnostic,
/// preferring the structured error body the API returns over the raw text.
fn successful(res: Response, what: &str) -> Result<Response> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status();
    let txt = res.text().unwrap_or_else(|_| "".into());
    match decode_api_error(&txt) {
        Some(err) => anyhow::bail!("There was a service error: {} : {}", err.code, err.message),
        None => anyhow::bail!("{} failed: {} - {}", what, status, txt),
    }
}

// Response shape of the search call, narrowed to the requested field mask.

#[derive(Deserialize, Debug)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchListItem>,
}

#[derive(Deserialize, Debug)]
struct SearchListItem {
    id: SearchHit,
}

// Request body of commentThreads.insert: a comment thread snippet carrying
// the channel, the target video and the top-level comment text.

#[derive(Serialize, Debug)]
struct CommentThreadBody<'a> {
    snippet: ThreadSnippet<'a>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet<'a> {
    channel_id: &'a str,
    video_id: &'a str,
    top_level_comment: TopLevelComment<'a>,
}

#[derive(Serialize, Debug)]
struct TopLevelComment<'a> {
    snippet: CommentText<'a>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CommentText<'a> {
    text_original: &'a str,
}

// Response shape of commentThreads.insert, narrowed to the confirmation
// fields we print.

#[derive(Deserialize, Debug)]
struct CommentThreadResponse {
    snippet: ResponseSnippet,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ResponseSnippet {
    top_level_comment: ResponseComment,
}

#[derive(Deserialize, Debug)]
struct ResponseComment {
    snippet: ResponseCommentSnippet,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ResponseCommentSnippet {
    author_display_name: String,
    text_display: String,
}

// Structured error body Google APIs return alongside non-success statuses.

#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    code: i64,
    message: String,
}

fn decode_api_error(body: &str) -> Option<ApiError> {
    serde_json::from_str::<ApiErrorBody>(body).ok().map(|b| b.error)
}
