//! SQLite schema definition
//!
//! Comments form a forest per submission through the self-referencing
//! `parent_id` column; the tree is walked on demand, no nested-set index.

pub const SCHEMA: &str = r#"
-- ============================================
-- REDDITORS & SUBREDDITS
-- ============================================

-- Authors, keyed strictly on username and never updated after creation
CREATE TABLE IF NOT EXISTS redditors (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    created_utc DATETIME
);

-- Subreddits to collect; descriptive fields refreshed from /about
CREATE TABLE IF NOT EXISTS subreddits (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,             -- fetch key passed to the API
    display_name TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    description_html TEXT NOT NULL DEFAULT '',
    public_description TEXT NOT NULL DEFAULT '',
    created_utc DATETIME,
    over_18 BOOLEAN NOT NULL DEFAULT FALSE,
    subscribers INTEGER NOT NULL DEFAULT 0,
    can_assign_link_flair BOOLEAN NOT NULL DEFAULT FALSE,
    can_assign_user_flair BOOLEAN NOT NULL DEFAULT FALSE,
    spoilers_enabled BOOLEAN NOT NULL DEFAULT TRUE,
    modified_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

-- ============================================
-- THREADS
-- ============================================

CREATE TABLE IF NOT EXISTS submissions (
    id INTEGER PRIMARY KEY,
    reddit_id TEXT NOT NULL UNIQUE,        -- bare id, no t3_ prefix
    subreddit_id INTEGER NOT NULL,
    author_id INTEGER,                     -- NULL for deleted authors
    title TEXT NOT NULL,
    selftext TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL DEFAULT '',
    created_utc DATETIME NOT NULL,
    score INTEGER NOT NULL DEFAULT 0,
    upvote_ratio REAL NOT NULL DEFAULT 1.0,
    num_comments INTEGER NOT NULL DEFAULT 0,
    over_18 BOOLEAN NOT NULL DEFAULT FALSE,
    spoiler BOOLEAN NOT NULL DEFAULT FALSE,
    stickied BOOLEAN NOT NULL DEFAULT FALSE,
    distinguished TEXT,                    -- opaque label, e.g. 'moderator'
    edited_utc DATETIME,                   -- NULL = never edited
    locked BOOLEAN NOT NULL DEFAULT FALSE,
    saved BOOLEAN NOT NULL DEFAULT FALSE,
    is_original_content BOOLEAN NOT NULL DEFAULT FALSE,
    is_self BOOLEAN NOT NULL DEFAULT FALSE,
    permalink TEXT NOT NULL DEFAULT '',
    author_flair_text TEXT,
    link_flair_text TEXT,
    link_flair_template_id TEXT,
    modified_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY(subreddit_id) REFERENCES subreddits(id) ON DELETE CASCADE,
    FOREIGN KEY(author_id) REFERENCES redditors(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY,
    reddit_id TEXT NOT NULL UNIQUE,        -- bare id, no t1_ prefix
    submission_id INTEGER NOT NULL,
    author_id INTEGER,
    parent_id INTEGER,                     -- NULL for root comments
    body TEXT NOT NULL DEFAULT '',
    body_html TEXT NOT NULL DEFAULT '',
    created_utc DATETIME NOT NULL,
    score INTEGER NOT NULL DEFAULT 0,
    distinguished TEXT,
    edited_utc DATETIME,
    stickied BOOLEAN NOT NULL DEFAULT FALSE,
    saved BOOLEAN NOT NULL DEFAULT FALSE,
    is_submitter BOOLEAN NOT NULL DEFAULT FALSE,
    permalink TEXT NOT NULL DEFAULT '',
    modified_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY(submission_id) REFERENCES submissions(id) ON DELETE CASCADE,
    FOREIGN KEY(author_id) REFERENCES redditors(id) ON DELETE SET NULL,
    FOREIGN KEY(parent_id) REFERENCES comments(id) ON DELETE CASCADE
);

-- ============================================
-- DETECTION SPECS
-- ============================================

-- Named structured-output contracts
CREATE TABLE IF NOT EXISTS response_formats (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    modified_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS response_format_fields (
    id INTEGER PRIMARY KEY,
    format_id INTEGER NOT NULL,
    position INTEGER NOT NULL,             -- field order within the format
    name TEXT NOT NULL,
    data_type TEXT NOT NULL CHECK (data_type IN
        ('str', 'int', 'float', 'bool', 'dict', 'list', 'tuple', 'set', 'none')),
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    modified_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(format_id, name),
    FOREIGN KEY(format_id) REFERENCES response_formats(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS information_to_detect (
    id INTEGER PRIMARY KEY,
    instruction TEXT NOT NULL,             -- steering prompt for the model
    response_format_id INTEGER NOT NULL,
    FOREIGN KEY(response_format_id) REFERENCES response_formats(id) ON DELETE CASCADE
);

-- One verdict per (submission, spec); re-runs overwrite
CREATE TABLE IF NOT EXISTS detected_information (
    id INTEGER PRIMARY KEY,
    submission_id INTEGER NOT NULL,
    information_id INTEGER NOT NULL,
    verdict TEXT NOT NULL,                 -- JSON object matching the format
    model TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    modified_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(submission_id, information_id),
    FOREIGN KEY(submission_id) REFERENCES submissions(id) ON DELETE CASCADE,
    FOREIGN KEY(information_id) REFERENCES information_to_detect(id) ON DELETE CASCADE
);

-- ============================================
-- TASK RUNS
-- ============================================

CREATE TABLE IF NOT EXISTS task_runs (
    id TEXT PRIMARY KEY,                   -- UUID
    kind TEXT NOT NULL,                    -- 'sync', 'classify'
    status TEXT NOT NULL DEFAULT 'started', -- 'started', 'finished'
    result TEXT NOT NULL DEFAULT 'pending', -- 'pending', 'success', 'error'
    summary TEXT,
    error_message TEXT,
    started_at DATETIME NOT NULL,
    stopped_at DATETIME
);

-- ============================================
-- INDEXES
-- ============================================

CREATE INDEX IF NOT EXISTS idx_submissions_subreddit ON submissions(subreddit_id);
CREATE INDEX IF NOT EXISTS idx_submissions_created ON submissions(created_utc DESC);
CREATE INDEX IF NOT EXISTS idx_comments_submission ON comments(submission_id);
CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_id);
CREATE INDEX IF NOT EXISTS idx_fields_format ON response_format_fields(format_id, position);
CREATE INDEX IF NOT EXISTS idx_detected_information ON detected_information(information_id);
CREATE INDEX IF NOT EXISTS idx_task_runs_started ON task_runs(started_at DESC);
"#;
