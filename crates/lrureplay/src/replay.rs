//! Replays parsed scripts against an LRU cache

use std::fmt;

use lrucache::{Capacity, LruCache, StatsSnapshot};
use serde::Serialize;
use tracing::{debug, warn};

use crate::script::{Expect, Op, Script};

/// What an operation did to the cache
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    /// A put; `evicted` is the entry it pushed out, if any
    Stored { evicted: Option<(i64, i64)> },
    /// A get or peek; `value` is `None` on a miss
    Found { value: Option<i64> },
    /// A remove; `value` is what was removed
    Removed { value: Option<i64> },
    /// A len query
    Len { len: usize },
    /// A clear
    Cleared,
}

/// Result of one script line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// Script line number
    pub line: usize,
    /// Rendered operation, e.g. `get(1)`
    pub op: String,
    /// What happened
    pub effect: Effect,
    /// Set when the line carried an expectation that did not hold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.effect {
            Effect::Stored { evicted: Some((key, _)) } => write!(f, "{} evicted {}", self.op, key)?,
            Effect::Stored { evicted: None } | Effect::Cleared => write!(f, "{}", self.op)?,
            Effect::Found { value } | Effect::Removed { value } => match value {
                Some(v) => write!(f, "{}: {}", self.op, v)?,
                None => write!(f, "{}: absent", self.op)?,
            },
            Effect::Len { len } => write!(f, "{}: {}", self.op, len)?,
        }
        if let Some(failure) = &self.failure {
            write!(f, "  FAILED: {}", failure)?;
        }
        Ok(())
    }
}

/// Full result of a replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Capacity the cache was built with
    pub capacity: usize,
    /// One outcome per operation, in order
    pub outcomes: Vec<Outcome>,
    /// Cache statistics after the last operation
    pub stats: StatsSnapshot,
}

impl Report {
    /// Number of expectations that did not hold
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.failure.is_some()).count()
    }
}

/// Drives an `LruCache<i64, i64>` from a script
pub struct Replayer {
    cache: LruCache<i64, i64>,
}

impl Replayer {
    /// Create a replayer over a fresh cache
    pub fn new(capacity: Capacity) -> Self {
        Self {
            cache: LruCache::with_capacity(capacity),
        }
    }

    /// Run every step of `script` in order
    pub fn run(&mut self, script: &Script) -> Report {
        let outcomes = script
            .steps
            .iter()
            .map(|step| {
                let (effect, failure) = self.apply(&step.op);
                if let Some(failure) = &failure {
                    warn!(line = step.line, op = %step.op, "{}", failure);
                }
                Outcome {
                    line: step.line,
                    op: step.op.to_string(),
                    effect,
                    failure,
                }
            })
            .collect();

        Report {
            capacity: self.cache.capacity(),
            outcomes,
            stats: self.cache.stats().snapshot(),
        }
    }

    fn apply(&mut self, op: &Op) -> (Effect, Option<String>) {
        match *op {
            Op::Put { key, value } => {
                let evicted = self.cache.push(key, value);
                if let Some((old_key, _)) = evicted {
                    debug!(key = old_key, "evicted");
                }
                (Effect::Stored { evicted }, None)
            }
            Op::Get { key, expect } => {
                let found = self.cache.get(&key).copied();
                (Effect::Found { value: found }, check(expect, found))
            }
            Op::Peek { key, expect } => {
                let found = self.cache.peek(&key).copied();
                (Effect::Found { value: found }, check(expect, found))
            }
            Op::Remove { key } => (
                Effect::Removed {
                    value: self.cache.remove(&key),
                },
                None,
            ),
            Op::Len { expect } => {
                let len = self.cache.len();
                let failure = expect
                    .filter(|&expected| expected != len)
                    .map(|expected| format!("expected {}, got {}", expected, len));
                (Effect::Len { len }, failure)
            }
            Op::Clear => {
                self.cache.clear();
                (Effect::Cleared, None)
            }
        }
    }
}

fn check(expect: Option<Expect>, found: Option<i64>) -> Option<String> {
    let expect = expect?;
    if expect.matches(found) {
        return None;
    }
    let got = match found {
        Some(v) => v.to_string(),
        None => "absent".to_string(),
    };
    Some(format!("expected {}, got {}", expect, got))
}
