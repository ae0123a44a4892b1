//! Reddit API source
//!
//! Authenticates with the OAuth password grant used by script apps and
//! reads listings from `oauth.reddit.com`.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::forest::CommentForest;
use super::wire::{AboutThing, LinkThing, Listing, MoreChildrenResponse, RawMore, Thing};
use super::{CommentSnapshot, SubmissionSnapshot, SubredditAbout, ThreadSource};
use crate::config::RedditConfig;
use crate::error::{check_response, Error, Result};
use crate::fullname::{self, Kind};

/// `/api/morechildren` accepts at most 100 ids per call
const MORE_CHILDREN_BATCH: usize = 100;

/// Page size of the `/new` listing
const PAGE_SIZE: usize = 100;

pub struct RedditSource {
    http: Client,
    config: RedditConfig,
    token: Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl RedditSource {
    pub fn new(config: RedditConfig) -> Self {
        Self {
            http: Client::new(),
            config,
            token: Mutex::new(None),
        }
    }

    fn cached_token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|guard| guard.clone())
    }

    fn store_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.lock() {
            *guard = token;
        }
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        debug!(username = %self.config.username, "requesting Reddit access token");

        let response = self
            .http
            .post(&self.config.auth_url)
            .header(USER_AGENT, &self.config.user_agent)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await?;

        let token: TokenResponse = check_response(response).await?.json().await?;
        self.store_token(Some(token.access_token.clone()));
        Ok(token.access_token)
    }

    fn headers(&self, token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::Config(format!("invalid access token: {}", e)))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.config.user_agent)
                .map_err(|e| Error::Config(format!("invalid user agent: {}", e)))?,
        );
        Ok(headers)
    }

    /// GET an API path, re-authenticating once if the token expired
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.config.api_base.trim_end_matches('/'), path);

        for attempt in 0..2 {
            let token = self.access_token().await?;
            let response = self
                .http
                .get(&url)
                .headers(self.headers(&token)?)
                .query(query)
                .query(&[("raw_json", "1")])
                .send()
                .await?;

            if response.status() == StatusCode::UNAUTHORIZED && attempt == 0 {
                warn!("Reddit access token rejected, re-authenticating");
                self.store_token(None);
                continue;
            }

            return Ok(check_response(response).await?.json().await?);
        }

        Err(Error::Upstream {
            status: StatusCode::UNAUTHORIZED.as_u16(),
            body: "access token rejected twice".to_string(),
        })
    }

    async fn expand_more(&self, submission_id: &str, more: RawMore, forest: &mut CommentForest) -> Result<()> {
        if more.children.is_empty() {
            // "continue this thread": load the parent's subtree directly
            let parent = fullname::strip(&more.parent_id).to_string();
            if parent.is_empty() || more.parent_id == fullname::prefix(submission_id, Kind::Submission) {
                return Ok(());
            }
            debug!(submission = %submission_id, parent = %parent, "loading deep thread");
            let (_, comments): (Listing<LinkThing>, Listing<Thing>) = self
                .get(&format!("/comments/{}", submission_id), &[("comment", parent)])
                .await?;
            forest.extend(comments.data.children);
            return Ok(());
        }

        debug!(
            submission = %submission_id,
            placeholder = %more.id,
            count = more.count,
            "expanding more comments"
        );
        let link_id = fullname::prefix(submission_id, Kind::Submission);
        for batch in more.children.chunks(MORE_CHILDREN_BATCH) {
            let response: MoreChildrenResponse = self
                .get(
                    "/api/morechildren",
                    &[
                        ("api_type", "json".to_string()),
                        ("link_id", link_id.clone()),
                        ("children", batch.join(",")),
                    ],
                )
                .await?;
            if let Some(data) = response.json.data {
                forest.extend(data.things);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ThreadSource for RedditSource {
    async fn newest_submissions(&self, subreddit: &str) -> Result<Vec<SubmissionSnapshot>> {
        let mut submissions = Vec::new();
        let mut after: Option<String> = None;
        let path = format!("/r/{}/new", subreddit);

        while submissions.len() < self.config.listing_limit {
            let remaining = self.config.listing_limit - submissions.len();
            let mut query = vec![("limit", remaining.min(PAGE_SIZE).to_string())];
            if let Some(ref cursor) = after {
                query.push(("after", cursor.clone()));
            }

            let listing: Listing<LinkThing> = self.get(&path, &query).await?;
            let page_len = listing.data.children.len();
            submissions.extend(listing.data.children.into_iter().map(|t| t.data.into()));

            after = listing.data.after;
            if after.is_none() || page_len == 0 {
                break;
            }
        }

        info!(subreddit = %subreddit, count = submissions.len(), "fetched newest submissions");
        Ok(submissions)
    }

    async fn expand_comments(&self, submission_id: &str) -> Result<Vec<CommentSnapshot>> {
        let (_, comments): (Listing<LinkThing>, Listing<Thing>) = self
            .get(&format!("/comments/{}", submission_id), &[("limit", "500".to_string())])
            .await?;

        let mut forest = CommentForest::new(submission_id);
        forest.extend(comments.data.children);

        while let Some(more) = forest.next_pending() {
            self.expand_more(submission_id, more, &mut forest).await?;
        }

        debug!(submission = %submission_id, comments = forest.len(), "expanded comment tree");
        Ok(forest.into_list())
    }

    async fn subreddit_about(&self, subreddit: &str) -> Result<SubredditAbout> {
        let about: AboutThing = self.get(&format!("/r/{}/about", subreddit), &[]).await?;
        Ok(about.data.into())
    }
}
