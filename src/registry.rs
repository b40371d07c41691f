//! Tracks the refresh jobs that are in flight
//!
//! There is at most one pending job per calendar. A newer refresh always cancels and replaces the older one, so that results of two generations of the same query never interleave.

use std::collections::HashMap;

use crate::refresh::{JobId, JobKey, RefreshJob};

#[derive(Default)]
pub struct JobRegistry {
    jobs: HashMap<JobKey, RefreshJob>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `job`. A job previously tracked for the same calendar is canceled, and returned.
    ///
    /// Jobs without a calendar cannot be tracked, and are dropped
    pub fn submit(&mut self, job: RefreshJob) -> Option<RefreshJob> {
        let key = match job.key() {
            Some(key) => key,
            None => {
                log::debug!("Not tracking a refresh job that has no calendar");
                return None;
            }
        };

        let mut previous = self.jobs.insert(key, job);
        if let Some(previous) = previous.as_mut() {
            previous.cancel();
        }
        previous
    }

    /// Cancel and forget the job tracked for `key`. Returns whether there was one
    pub fn cancel(&mut self, key: &JobKey) -> bool {
        match self.jobs.remove(key) {
            None => false,
            Some(mut job) => {
                job.cancel();
                true
            },
        }
    }

    /// Forget a job that has completed.
    ///
    /// Nothing happens in case the registry now tracks another job for this key: the completed job has already been superseded
    pub fn remove(&mut self, key: &JobKey, id: JobId) -> Option<RefreshJob> {
        if self.is_current(key, id) == false {
            return None;
        }
        self.jobs.remove(key)
    }

    /// Cancel and forget every job. Returns how many were tracked
    pub fn cancel_all(&mut self) -> usize {
        let count = self.jobs.len();
        for (_, mut job) in self.jobs.drain() {
            job.cancel();
        }
        count
    }

    /// Whether `id` is the job currently tracked for `key`
    pub fn is_current(&self, key: &JobKey, id: JobId) -> bool {
        self.jobs.get(key).map(|job| job.id() == id).unwrap_or(false)
    }

    pub fn contains(&self, key: &JobKey) -> bool {
        self.jobs.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &JobKey> {
        self.jobs.keys()
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.jobs.keys()).finish()
    }
}
