//! Role-bucketed function registry.

use super::risk::RiskInfo;
use crate::ir::FuncId;
use crate::rules::Role;
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Status flags of a bucketed function. `active` means reached from an
/// entry; `risky` means the handler transitively reaches both a source and
/// a sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuncStatus {
    /// Reached from an entry through the static call graph.
    pub active: bool,
    /// Reaches both a source and a sink (handlers only).
    pub risky: bool,
}

/// Five role buckets plus the shared risk map.
///
/// The buckets are written only during the single-threaded discovery
/// phases (the `&mut self` methods enforce that); `risk_map` is touched
/// concurrently by the filter workers.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    init_funcs: FxHashMap<FuncId, FuncStatus>,
    main_funcs: FxHashMap<FuncId, FuncStatus>,
    handler_funcs: FxHashMap<FuncId, FuncStatus>,
    source_funcs: FxHashMap<FuncId, FuncStatus>,
    sink_funcs: FxHashMap<FuncId, FuncStatus>,

    risk_map: DashMap<FuncId, Arc<RiskInfo>>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `fns` in `role`'s bucket with default (inactive) status,
    /// keeping existing flags.
    pub fn record(&mut self, role: Role, fns: &[FuncId]) {
        let bucket = self.bucket_mut(role);
        for &f in fns {
            bucket.entry(f).or_default();
        }
    }

    /// Upserts `fns` into `role`'s bucket with `active` set.
    pub fn mark_active(&mut self, role: Role, fns: &[FuncId]) {
        let bucket = self.bucket_mut(role);
        for &f in fns {
            bucket.entry(f).or_default().active = true;
        }
    }

    /// Upserts `fns` into the handler bucket with both flags set.
    pub fn mark_risky(&mut self, fns: &[FuncId]) {
        for &f in fns {
            let status = self.handler_funcs.entry(f).or_default();
            status.active = true;
            status.risky = true;
        }
    }

    /// Status of `f` in `role`'s bucket, if recorded.
    #[must_use]
    pub fn status(&self, role: Role, f: FuncId) -> Option<FuncStatus> {
        self.bucket(role).get(&f).copied()
    }

    /// The whole bucket for a role, for listings.
    #[must_use]
    pub fn bucket(&self, role: Role) -> &FxHashMap<FuncId, FuncStatus> {
        match role {
            Role::Init => &self.init_funcs,
            Role::Main => &self.main_funcs,
            Role::Handler => &self.handler_funcs,
            Role::Source => &self.source_funcs,
            Role::Sink => &self.sink_funcs,
        }
    }

    /// Shared read of the risk record for `f`.
    #[must_use]
    pub fn get_risk(&self, f: FuncId) -> Option<Arc<RiskInfo>> {
        self.risk_map.get(&f).map(|r| Arc::clone(&r))
    }

    /// Inserts `risk` iff no record exists for its function yet. Returns
    /// the record that ended up in the map and whether this call inserted
    /// it; the inserter is responsible for driving the record to finish.
    pub fn add_risk(&self, risk: Arc<RiskInfo>) -> (Arc<RiskInfo>, bool) {
        match self.risk_map.entry(risk.func()) {
            dashmap::Entry::Occupied(existing) => (Arc::clone(existing.get()), false),
            dashmap::Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&risk));
                (risk, true)
            }
        }
    }

    /// Number of risk records created so far.
    #[must_use]
    pub fn risk_count(&self) -> usize {
        self.risk_map.len()
    }

    fn bucket_mut(&mut self, role: Role) -> &mut FxHashMap<FuncId, FuncStatus> {
        match role {
            Role::Init => &mut self.init_funcs,
            Role::Main => &mut self.main_funcs,
            Role::Handler => &mut self.handler_funcs,
            Role::Source => &mut self.source_funcs,
            Role::Sink => &mut self.sink_funcs,
        }
    }
}
