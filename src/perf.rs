//! Development-only performance marks around init and compile.
//!
//! Marks are a side channel: nothing here is allowed to influence the result
//! or ordering of the operations being measured.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measure {
    pub name: String,
    pub duration: Duration,
}

#[derive(Default)]
struct PerfLog {
    marks: HashMap<String, Instant>,
    measures: Vec<Measure>,
}

thread_local! {
    static PERF: RefCell<PerfLog> = RefCell::new(PerfLog::default());
}

pub fn enabled() -> bool {
    config::get().perf_enabled()
}

pub fn mark(tag: &str) {
    PERF.with(|p| {
        p.borrow_mut().marks.insert(tag.to_string(), Instant::now());
    });
}

/// Record the time between two marks and clear them. Missing marks are ignored.
pub fn measure(name: &str, start_tag: &str, end_tag: &str) {
    PERF.with(|p| {
        let mut log = p.borrow_mut();
        let (Some(start), Some(end)) = (log.marks.remove(start_tag), log.marks.remove(end_tag))
        else {
            return;
        };
        let duration = end.saturating_duration_since(start);
        tracing::debug!(target: "zenith::perf", name = %name, ?duration, "measure");
        log.measures.push(Measure {
            name: name.to_string(),
            duration,
        });
    });
}

/// Drain the measures recorded on this thread.
pub fn take_measures() -> Vec<Measure> {
    PERF.with(|p| std::mem::take(&mut p.borrow_mut().measures))
}
