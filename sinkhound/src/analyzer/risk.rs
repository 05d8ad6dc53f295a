//! Per-function memoized risk state.

use crate::ir::FuncId;
use rustc_hash::FxHashSet;
use std::sync::{Arc, Condvar, Mutex};

/// A one-shot completion latch: closed at most once, observable by a
/// non-blocking poll or a blocking wait.
#[derive(Debug)]
pub struct Latch {
    state: Mutex<bool>,
    cvar: Condvar,
}

impl Latch {
    fn new(set: bool) -> Self {
        Self {
            state: Mutex::new(set),
            cvar: Condvar::new(),
        }
    }

    /// Closes the latch. Idempotent.
    pub fn set(&self) {
        let mut state = self.state.lock().unwrap();
        if !*state {
            *state = true;
            self.cvar.notify_all();
        }
    }

    /// Non-blocking poll.
    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.state.lock().unwrap()
    }

    /// Blocks until the latch is closed.
    pub fn wait(&self) {
        let mut state = self.state.lock().unwrap();
        while !*state {
            state = self.cvar.wait(state).unwrap();
        }
    }
}

#[derive(Debug, Default)]
struct RiskState {
    sources: Vec<Arc<RiskInfo>>,
    sinks: Vec<Arc<RiskInfo>>,
    entries: FxHashSet<FuncId>,
}

/// Memoized risk summary of one function, shared between filter workers.
///
/// Source and sink records are born finished; a plain record is finished by
/// whichever worker drives its traversal. Once the latch is closed, readers
/// in other workers treat the source/sink lists as frozen.
#[derive(Debug)]
pub struct RiskInfo {
    func: FuncId,
    is_source: bool,
    is_sink: bool,
    state: Mutex<RiskState>,
    done: Latch,
}

impl RiskInfo {
    /// A plain record; the latch starts open.
    #[must_use]
    pub fn new(func: FuncId) -> Self {
        Self {
            func,
            is_source: false,
            is_sink: false,
            state: Mutex::new(RiskState::default()),
            done: Latch::new(false),
        }
    }

    /// A record for a matched source; no descent needed, latch pre-closed.
    #[must_use]
    pub fn source(func: FuncId) -> Self {
        Self {
            is_source: true,
            done: Latch::new(true),
            ..Self::new(func)
        }
    }

    /// A record for a matched sink; no descent needed, latch pre-closed.
    #[must_use]
    pub fn sink(func: FuncId) -> Self {
        Self {
            is_sink: true,
            done: Latch::new(true),
            ..Self::new(func)
        }
    }

    /// The function this record summarizes.
    #[must_use]
    pub fn func(&self) -> FuncId {
        self.func
    }

    /// Whether the function itself is a source.
    #[must_use]
    pub fn is_source(&self) -> bool {
        self.is_source
    }

    /// Whether the function itself is a sink.
    #[must_use]
    pub fn is_sink(&self) -> bool {
        self.is_sink
    }

    /// Whether any source was found below this function.
    #[must_use]
    pub fn has_source(&self) -> bool {
        !self.state.lock().unwrap().sources.is_empty()
    }

    /// Whether any sink was found below this function.
    #[must_use]
    pub fn has_sink(&self) -> bool {
        !self.state.lock().unwrap().sinks.is_empty()
    }

    /// Whether both a source and a sink were found below this function.
    #[must_use]
    pub fn risky(&self) -> bool {
        let state = self.state.lock().unwrap();
        !state.sources.is_empty() && !state.sinks.is_empty()
    }

    /// Records a source found below this function. Duplicates are kept
    /// until [`RiskInfo::uniq`].
    pub fn add_source(&self, risk: Arc<RiskInfo>) {
        self.state.lock().unwrap().sources.push(risk);
    }

    /// Records a sink found below this function.
    pub fn add_sink(&self, risk: Arc<RiskInfo>) {
        self.state.lock().unwrap().sinks.push(risk);
    }

    /// Marks `entry` as having descended into this record. Returns whether
    /// the entry was new; a repeat visit must not descend again.
    pub fn record_entry(&self, entry: FuncId) -> bool {
        self.state.lock().unwrap().entries.insert(entry)
    }

    /// Functions recorded as sources below this one, in insertion order.
    #[must_use]
    pub fn source_funcs(&self) -> Vec<FuncId> {
        self.state
            .lock()
            .unwrap()
            .sources
            .iter()
            .map(|r| r.func)
            .collect()
    }

    /// Functions recorded as sinks below this one, in insertion order.
    #[must_use]
    pub fn sink_funcs(&self) -> Vec<FuncId> {
        self.state
            .lock()
            .unwrap()
            .sinks
            .iter()
            .map(|r| r.func)
            .collect()
    }

    /// De-duplicates the source and sink lists by function identity,
    /// keeping first occurrences in order.
    pub fn uniq(&self) {
        let mut state = self.state.lock().unwrap();
        dedup_by_func(&mut state.sources);
        dedup_by_func(&mut state.sinks);
    }

    /// Non-blocking poll of the completion latch.
    #[must_use]
    pub fn done(&self) -> bool {
        self.done.is_set()
    }

    /// Blocks until the record is finished.
    pub fn wait_done(&self) {
        self.done.wait();
    }

    /// Closes the completion latch. Idempotent.
    pub fn finish(&self) {
        self.done.set();
    }
}

fn dedup_by_func(list: &mut Vec<Arc<RiskInfo>>) {
    let mut seen = FxHashSet::default();
    list.retain(|r| seen.insert(r.func));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn plain_record_starts_open() {
        let r = RiskInfo::new(FuncId(0));
        assert!(!r.done());
        assert!(!r.risky());
        r.finish();
        r.finish(); // idempotent
        assert!(r.done());
    }

    #[test]
    fn source_and_sink_records_are_born_finished() {
        assert!(RiskInfo::source(FuncId(1)).done());
        assert!(RiskInfo::sink(FuncId(2)).done());
        assert!(RiskInfo::source(FuncId(1)).is_source());
        assert!(RiskInfo::sink(FuncId(2)).is_sink());
    }

    #[test]
    fn risky_needs_both_lists_nonempty() {
        let r = RiskInfo::new(FuncId(0));
        r.add_source(Arc::new(RiskInfo::source(FuncId(1))));
        assert!(r.has_source());
        assert!(!r.risky());
        r.add_sink(Arc::new(RiskInfo::sink(FuncId(2))));
        assert!(r.risky());
    }

    #[test]
    fn uniq_dedups_by_function() {
        let r = RiskInfo::new(FuncId(0));
        let s = Arc::new(RiskInfo::source(FuncId(1)));
        r.add_source(Arc::clone(&s));
        r.add_source(s);
        r.add_source(Arc::new(RiskInfo::source(FuncId(3))));
        r.uniq();
        assert_eq!(r.source_funcs(), vec![FuncId(1), FuncId(3)]);
    }

    #[test]
    fn record_entry_is_once_per_entry() {
        let r = RiskInfo::new(FuncId(0));
        assert!(r.record_entry(FuncId(7)));
        assert!(!r.record_entry(FuncId(7)));
        assert!(r.record_entry(FuncId(8)));
    }

    #[test]
    fn wait_unblocks_on_finish() {
        let r = Arc::new(RiskInfo::new(FuncId(0)));
        let waiter = {
            let r = Arc::clone(&r);
            thread::spawn(move || r.wait_done())
        };
        r.finish();
        waiter.join().unwrap();
        assert!(r.done());
    }
}
