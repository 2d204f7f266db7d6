// Poll-and-comment loop. The loop is generic over the API seams so its
// timing and call-count behavior can be tested with scripted stand-ins
// instead of network calls and real sleeps.

use anyhow::Result;
use std::collections::HashSet;
use std::time::Duration;

use crate::api::{CommentPoster, CommentRequest, PostedComment, SearchHit, VideoSearch};

/// Everything the loop needs, collected once up front and immutable after.
#[derive(Debug, Clone)]
pub struct WatchParams {
    pub channel_id: String,
    pub query: String,
    pub comment_text: String,
    /// Number of poll iterations to spend waiting for a new upload.
    pub searches: u32,
    /// Fixed wait between poll iterations, in seconds.
    pub interval_secs: u64,
}

/// Watch a channel for the next upload and post one comment on it.
///
/// A baseline search seeds the seen-id registry so the newest existing
/// upload does not count as new. Each poll iteration spends exactly one unit
/// of the search budget, waits the fixed interval, and re-runs the identical
/// search. The first result whose kind denotes a video and whose id has not
/// been seen this run triggers a single comment, posted through a client
/// that `authorize` builds on the spot. The run ends after that comment or
/// when the budget runs out, whichever comes first.
///
/// Any search or insert error aborts the run; nothing is retried.
pub fn watch<S, P, F, W>(
    params: &WatchParams,
    search: &S,
    mut authorize: F,
    mut wait: W,
) -> Result<Option<PostedComment>>
where
    S: VideoSearch,
    P: CommentPoster,
    F: FnMut() -> Result<P>,
    W: FnMut(Duration),
{
    let mut seen: HashSet<String> = HashSet::new();

    match search.latest_upload(&params.channel_id, &params.query)? {
        Some(hit) => {
            if let Some(id) = qualifying_id(&hit) {
                seen.insert(id.to_string());
            }
        }
        None => println!("There aren't any results for your query."),
    }

    let mut remaining = params.searches;
    let mut new_video: Option<String> = None;

    while new_video.is_none() && remaining > 0 {
        remaining -= 1;
        println!("Searching for new videos, {} left", remaining);
        wait(Duration::from_secs(params.interval_secs));

        match search.latest_upload(&params.channel_id, &params.query)? {
            Some(hit) => {
                if let Some(id) = qualifying_id(&hit) {
                    if seen.insert(id.to_string()) {
                        new_video = Some(id.to_string());
                    }
                }
            }
            None => println!("There aren't any results for your query."),
        }
    }

    let video_id = match new_video {
        Some(id) => id,
        None => return Ok(None),
    };

    println!("\n-------------------------------------------------------------\n");
    println!(" Video Id {}", video_id);
    println!("\n-------------------------------------------------------------\n");

    // Authorization happens here, not at startup: the credential is only
    // needed once a new upload is confirmed.
    let poster = authorize()?;
    let request = CommentRequest {
        channel_id: params.channel_id.clone(),
        video_id,
        text: params.comment_text.clone(),
    };
    let posted = poster.insert_comment(&request)?;
    println!("{}", confirmation_banner(&posted));
    Ok(Some(posted))
}

/// Id of a hit, but only when the resource kind actually denotes a video.
/// Results of any other kind are skipped silently and never registered.
fn qualifying_id(hit: &SearchHit) -> Option<&str> {
    if hit.is_video() {
        hit.video_id.as_deref()
    } else {
        None
    }
}

/// Confirmation block echoing what the server reports about the created
/// comment.
pub fn confirmation_banner(posted: &PostedComment) -> String {
    format!(
        "\n================== Created Video Comment ==================\n\n  - Author: {}\n  - Comment: {}\n\n-------------------------------------------------------------\n",
        posted.author, posted.text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct ScriptedSearch {
        responses: RefCell<Vec<Result<Option<SearchHit>>>>,
        calls: RefCell<u32>,
    }

    impl ScriptedSearch {
        fn new(mut responses: Vec<Result<Option<SearchHit>>>) -> Self {
            responses.reverse();
            ScriptedSearch {
                responses: RefCell::new(responses),
                calls: RefCell::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.borrow()
        }
    }

    impl VideoSearch for ScriptedSearch {
        fn latest_upload(&self, _channel_id: &str, _query: &str) -> Result<Option<SearchHit>> {
            *self.calls.borrow_mut() += 1;
            self.responses
                .borrow_mut()
                .pop()
                .expect("search called more often than scripted")
        }
    }

    #[derive(Clone)]
    struct CountingPoster {
        requests: Rc<RefCell<Vec<CommentRequest>>>,
        reply: PostedComment,
    }

    impl CommentPoster for CountingPoster {
        fn insert_comment(&self, req: &CommentRequest) -> Result<PostedComment> {
            self.requests.borrow_mut().push(req.clone());
            Ok(self.reply.clone())
        }
    }

    fn video(id: &str) -> Option<SearchHit> {
        Some(SearchHit {
            kind: "youtube#video".to_string(),
            video_id: Some(id.to_string()),
        })
    }

    fn params(searches: u32, interval_secs: u64) -> WatchParams {
        WatchParams {
            channel_id: "UC123".to_string(),
            query: "somechannel".to_string(),
            comment_text: "first!".to_string(),
            searches,
            interval_secs,
        }
    }

    fn ada() -> PostedComment {
        PostedComment {
            author: "Ada".to_string(),
            text: "Congrats!".to_string(),
        }
    }

    #[test]
    fn test_comments_once_when_upload_appears_on_second_poll() {
        let search = ScriptedSearch::new(vec![
            Ok(video("baseline")),
            Ok(video("baseline")),
            Ok(video("fresh")),
        ]);
        let requests = Rc::new(RefCell::new(Vec::new()));
        let poster = CountingPoster {
            requests: requests.clone(),
            reply: ada(),
        };
        let mut sleeps = Vec::new();

        let outcome = watch(&params(3, 1), &search, || Ok(poster.clone()), |d| {
            sleeps.push(d)
        })
        .unwrap();

        // Budget of 3, hit on the 2nd poll: two sleeps, two post-baseline
        // searches, one insert, then the run ends.
        assert_eq!(sleeps.len(), 2);
        assert_eq!(search.calls(), 3);
        let requests = requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].video_id, "fresh");
        assert_eq!(requests[0].channel_id, "UC123");
        assert_eq!(requests[0].text, "first!");
        assert_eq!(outcome, Some(ada()));
    }

    #[test]
    fn test_budget_exhausted_without_new_video() {
        let search = ScriptedSearch::new(vec![Ok(video("baseline")), Ok(video("baseline"))]);
        let requests = Rc::new(RefCell::new(Vec::new()));
        let poster = CountingPoster {
            requests: requests.clone(),
            reply: ada(),
        };
        let mut sleeps = Vec::new();
        let mut authorizations = 0;

        let outcome = watch(
            &params(1, 5),
            &search,
            || {
                authorizations += 1;
                Ok(poster.clone())
            },
            |d| sleeps.push(d),
        )
        .unwrap();

        assert_eq!(outcome, None);
        assert_eq!(sleeps, vec![Duration::from_secs(5)]);
        assert_eq!(search.calls(), 2);
        assert!(requests.borrow().is_empty());
        assert_eq!(authorizations, 0);
    }

    #[test]
    fn test_empty_baseline_keeps_polling() {
        let search = ScriptedSearch::new(vec![Ok(None), Ok(video("fresh"))]);
        let requests = Rc::new(RefCell::new(Vec::new()));
        let poster = CountingPoster {
            requests: requests.clone(),
            reply: ada(),
        };
        let mut sleeps = Vec::new();

        let outcome = watch(&params(2, 1), &search, || Ok(poster.clone()), |d| {
            sleeps.push(d)
        })
        .unwrap();

        assert_eq!(outcome, Some(ada()));
        assert_eq!(sleeps.len(), 1);
        assert_eq!(requests.borrow()[0].video_id, "fresh");
    }

    #[test]
    fn test_empty_poll_result_spends_budget_and_keeps_polling() {
        let search = ScriptedSearch::new(vec![Ok(video("baseline")), Ok(None), Ok(video("fresh"))]);
        let requests = Rc::new(RefCell::new(Vec::new()));
        let poster = CountingPoster {
            requests: requests.clone(),
            reply: ada(),
        };
        let mut sleeps = Vec::new();

        let outcome = watch(&params(3, 1), &search, || Ok(poster.clone()), |d| {
            sleeps.push(d)
        })
        .unwrap();

        assert_eq!(outcome, Some(ada()));
        assert_eq!(sleeps.len(), 2);
        assert_eq!(requests.borrow()[0].video_id, "fresh");
    }

    #[test]
    fn test_non_video_kind_is_skipped_and_not_registered() {
        // A playlist result carrying an id must neither count as new nor
        // block that id from counting as new once it shows up as a video.
        let odd = SearchHit {
            kind: "youtube#playlist".to_string(),
            video_id: Some("x".to_string()),
        };
        let search = ScriptedSearch::new(vec![Ok(video("baseline")), Ok(Some(odd)), Ok(video("x"))]);
        let requests = Rc::new(RefCell::new(Vec::new()));
        let poster = CountingPoster {
            requests: requests.clone(),
            reply: ada(),
        };
        let mut sleeps = Vec::new();

        watch(&params(3, 1), &search, || Ok(poster.clone()), |d| {
            sleeps.push(d)
        })
        .unwrap();

        assert_eq!(sleeps.len(), 2);
        let requests = requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].video_id, "x");
    }

    #[test]
    fn test_seen_id_never_triggers_again() {
        let search = ScriptedSearch::new(vec![
            Ok(video("v1")),
            Ok(video("v1")),
            Ok(video("v1")),
            Ok(video("v1")),
        ]);
        let requests = Rc::new(RefCell::new(Vec::new()));
        let poster = CountingPoster {
            requests: requests.clone(),
            reply: ada(),
        };
        let mut sleeps = Vec::new();

        let outcome = watch(&params(3, 1), &search, || Ok(poster.clone()), |d| {
            sleeps.push(d)
        })
        .unwrap();

        // Every iteration spends exactly one search: three sleeps, three
        // post-baseline searches, no comment.
        assert_eq!(outcome, None);
        assert_eq!(sleeps.len(), 3);
        assert_eq!(search.calls(), 4);
        assert!(requests.borrow().is_empty());
    }

    #[test]
    fn test_search_error_aborts_run() {
        let search = ScriptedSearch::new(vec![
            Ok(video("baseline")),
            Err(anyhow::anyhow!("There was a service error: 403 : quotaExceeded")),
        ]);
        let requests = Rc::new(RefCell::new(Vec::new()));
        let poster = CountingPoster {
            requests: requests.clone(),
            reply: ada(),
        };
        let mut sleeps = Vec::new();

        let result = watch(&params(2, 1), &search, || Ok(poster.clone()), |d| {
            sleeps.push(d)
        });

        assert!(result.is_err());
        assert_eq!(sleeps.len(), 1);
        assert!(requests.borrow().is_empty());
    }

    #[test]
    fn test_confirmation_banner_contains_author_and_text() {
        let banner = confirmation_banner(&ada());
        assert!(banner.contains("Created Video Comment"));
        assert!(banner.contains("Ada"));
        assert!(banner.contains("Congrats!"));
    }
}
