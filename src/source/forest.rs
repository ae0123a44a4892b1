//! Comment forest assembly
//!
//! The comments endpoint returns a nested tree that may contain "more"
//! placeholders. The forest collects loaded comments by parent, queues the
//! placeholders for expansion, and finally flattens breadth-first so that
//! every parent precedes its children.

use std::collections::{HashMap, HashSet, VecDeque};

use super::wire::{RawMore, Thing};
use super::CommentSnapshot;
use crate::fullname::{self, Kind};

#[derive(Debug)]
pub struct CommentForest {
    submission_fullname: String,
    comments: Vec<CommentSnapshot>,
    /// Parent fullname -> indexes into `comments`, in arrival order
    children: HashMap<String, Vec<usize>>,
    seen: HashSet<String>,
    pending: VecDeque<RawMore>,
    /// Placeholders already queued, so a re-sent one is not expanded twice
    queued: HashSet<String>,
}

impl CommentForest {
    pub fn new(submission_id: &str) -> Self {
        Self {
            submission_fullname: fullname::prefix(submission_id, Kind::Submission),
            comments: vec![],
            children: HashMap::new(),
            seen: HashSet::new(),
            pending: VecDeque::new(),
            queued: HashSet::new(),
        }
    }

    pub(crate) fn extend(&mut self, things: Vec<Thing>) {
        for thing in things {
            self.add(thing);
        }
    }

    pub(crate) fn add(&mut self, thing: Thing) {
        match thing {
            Thing::Comment(raw) => {
                let (snapshot, replies) = raw.into_parts();
                if self.seen.insert(snapshot.id.clone()) {
                    let index = self.comments.len();
                    self.children
                        .entry(snapshot.parent_id.clone())
                        .or_default()
                        .push(index);
                    self.comments.push(snapshot);
                }
                self.extend(replies);
            }
            Thing::More(more) => {
                let key = format!("{}:{}", more.parent_id, more.children.join(","));
                if self.queued.insert(key) {
                    self.pending.push_back(more);
                }
            }
        }
    }

    /// Next placeholder waiting to be expanded
    pub(crate) fn next_pending(&mut self) -> Option<RawMore> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    /// Flatten breadth-first starting from the submission's direct replies.
    ///
    /// Comments whose parent never showed up are appended at the end in
    /// arrival order so the caller can detect the broken link.
    pub fn into_list(mut self) -> Vec<CommentSnapshot> {
        let mut order = Vec::with_capacity(self.comments.len());
        let mut placed = vec![false; self.comments.len()];
        let mut queue: VecDeque<usize> = self
            .children
            .remove(&self.submission_fullname)
            .unwrap_or_default()
            .into();

        while let Some(index) = queue.pop_front() {
            if placed[index] {
                continue;
            }
            placed[index] = true;
            order.push(index);

            let key = fullname::prefix(&self.comments[index].id, Kind::Comment);
            if let Some(kids) = self.children.remove(&key) {
                queue.extend(kids);
            }
        }

        order.extend((0..self.comments.len()).filter(|i| !placed[*i]));

        let mut slots: Vec<Option<CommentSnapshot>> =
            self.comments.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect()
    }
}
