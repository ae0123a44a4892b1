#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use threadsift::classify::{LanguageModel, ResponseSchema};
use threadsift::source::{
    AuthorRef, CommentSnapshot, SubmissionSnapshot, SubredditAbout, ThreadSource,
};
use threadsift::{Error, Result};

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
}

pub fn submission(id: &str, title: &str) -> SubmissionSnapshot {
    SubmissionSnapshot {
        id: id.to_string(),
        author: Some(AuthorRef::new("op")),
        title: title.to_string(),
        selftext: format!("Body of {}", id),
        url: format!("https://www.reddit.com/r/test/comments/{}/", id),
        created_utc: at(1, 0),
        edited_utc: None,
        score: 10,
        upvote_ratio: 0.95,
        num_comments: 0,
        over_18: false,
        spoiler: false,
        stickied: false,
        distinguished: None,
        locked: false,
        saved: false,
        is_original_content: false,
        is_self: true,
        permalink: format!("/r/test/comments/{}/", id),
        author_flair_text: None,
        link_flair_text: None,
        link_flair_template_id: None,
    }
}

pub fn comment(id: &str, parent: &str, author: &str, body: &str, hour: u32) -> CommentSnapshot {
    CommentSnapshot {
        id: id.to_string(),
        parent_id: parent.to_string(),
        author: Some(AuthorRef::new(author)),
        body: body.to_string(),
        body_html: format!("<p>{}</p>", body),
        created_utc: at(1, hour),
        edited_utc: None,
        score: 1,
        distinguished: None,
        stickied: false,
        saved: false,
        is_submitter: false,
        permalink: String::new(),
    }
}

/// In-memory thread source with scripted rate limits
#[derive(Default)]
pub struct FakeSource {
    listings: Mutex<HashMap<String, Vec<SubmissionSnapshot>>>,
    comments: Mutex<HashMap<String, Vec<CommentSnapshot>>>,
    rate_limits: Mutex<HashMap<String, u32>>,
    pub expand_calls: AtomicUsize,
}

impl FakeSource {
    pub fn set_listing(&self, subreddit: &str, submissions: Vec<SubmissionSnapshot>) {
        self.listings
            .lock()
            .unwrap()
            .insert(subreddit.to_string(), submissions);
    }

    pub fn set_comments(&self, submission_id: &str, comments: Vec<CommentSnapshot>) {
        self.comments
            .lock()
            .unwrap()
            .insert(submission_id.to_string(), comments);
    }

    /// The next `times` calls for `key` (a subreddit name or a submission
    /// id) fail with `RateLimited`
    pub fn rate_limit(&self, key: &str, times: u32) {
        self.rate_limits
            .lock()
            .unwrap()
            .insert(key.to_string(), times);
    }

    pub fn expand_calls(&self) -> usize {
        self.expand_calls.load(Ordering::SeqCst)
    }

    fn take_rate_limit(&self, key: &str) -> Result<()> {
        let mut limits = self.rate_limits.lock().unwrap();
        match limits.get_mut(key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(Error::RateLimited {
                    retry_after_secs: None,
                })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ThreadSource for FakeSource {
    async fn newest_submissions(&self, subreddit: &str) -> Result<Vec<SubmissionSnapshot>> {
        self.take_rate_limit(subreddit)?;
        Ok(self
            .listings
            .lock()
            .unwrap()
            .get(subreddit)
            .cloned()
            .unwrap_or_default())
    }

    async fn expand_comments(&self, submission_id: &str) -> Result<Vec<CommentSnapshot>> {
        self.expand_calls.fetch_add(1, Ordering::SeqCst);
        self.take_rate_limit(submission_id)?;
        Ok(self
            .comments
            .lock()
            .unwrap()
            .get(submission_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn subreddit_about(&self, subreddit: &str) -> Result<SubredditAbout> {
        Ok(SubredditAbout {
            display_name: subreddit.to_string(),
            public_description: format!("All about {}", subreddit),
            subscribers: 1234,
            spoilers_enabled: true,
            ..Default::default()
        })
    }
}

type Answer = Box<dyn Fn(&str, &str) -> Result<Value> + Send + Sync>;

/// Language model answering through a closure over (instruction, transcript)
pub struct FakeModel {
    answer: Answer,
    pub inputs: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn new(answer: impl Fn(&str, &str) -> Result<Value> + Send + Sync + 'static) -> Self {
        Self {
            answer: Box::new(answer),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    fn name(&self) -> &str {
        "fake-model"
    }

    async fn structured(
        &self,
        instruction: &str,
        input: &str,
        _schema: &ResponseSchema,
    ) -> Result<Value> {
        self.inputs.lock().unwrap().push(input.to_string());
        (self.answer)(instruction, input)
    }
}
