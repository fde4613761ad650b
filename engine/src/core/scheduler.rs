//! Action scheduler: pending queue, per-tick admission, step driving.
//!
//! One scheduler serves one tree instance. Action ids are resolved against
//! the tree passed to [`ActionScheduler::execute`], so flags are read at
//! admission time rather than when the action was scheduled.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::core::behavior::{ActionStep, Step};
use crate::core::error::ActionFault;
use crate::core::evaluator;
use crate::core::types::{Guid, NodeId, RunningState};
use crate::tree::Tree;

/// Default lifetime of a pending packet, in clock seconds.
pub const DEFAULT_PENDING_TTL: f64 = 2.0;

/// Source of scheduler time, in seconds.
pub trait Clock: Send {
    fn now(&self) -> f64;
}

/// Clock advanced explicitly by the host. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    /// Pending packets strictly older than this are dropped.
    pub pending_ttl: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pending_ttl: DEFAULT_PENDING_TTL,
        }
    }
}

/// A request to run an action, stamped with its arrival time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionPacket {
    action: NodeId,
    created: f64,
}

impl ActionPacket {
    pub fn action(&self) -> NodeId {
        self.action
    }

    pub fn created(&self) -> f64 {
        self.created
    }
}

/// Passed to finish observers once an action's sequence is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedAction {
    pub action: NodeId,
    pub guid: Guid,
    pub title: String,
}

/// What happened during one [`ActionScheduler::execute`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Pending packets dropped for exceeding the TTL.
    pub expired: Vec<NodeId>,
    /// Pending packets discarded because a later interruptor won.
    pub superseded: Vec<NodeId>,
    pub admitted: Vec<NodeId>,
    pub interrupted: Vec<NodeId>,
    pub finished: Vec<NodeId>,
    pub faulted: Vec<ActionFault>,
}

impl TickReport {
    /// True when the tick changed nothing observable.
    pub fn is_quiet(&self) -> bool {
        self.expired.is_empty()
            && self.superseded.is_empty()
            && self.admitted.is_empty()
            && self.interrupted.is_empty()
            && self.finished.is_empty()
            && self.faulted.is_empty()
    }
}

struct Running {
    action: NodeId,
    step: Box<dyn ActionStep>,
}

type FinishObserver = Box<dyn FnMut(&FinishedAction) + Send>;
type FaultObserver = Box<dyn FnMut(&ActionFault) + Send>;

pub struct ActionScheduler {
    config: SchedulerConfig,
    clock: Box<dyn Clock>,
    pending: VecDeque<ActionPacket>,
    active: Vec<NodeId>,
    running: Vec<Running>,
    wait: bool,
    accept_sync: bool,
    executing: bool,
    faults: Vec<ActionFault>,
    finish_observers: Vec<FinishObserver>,
    fault_observers: Vec<FaultObserver>,
}

impl ActionScheduler {
    pub fn new(config: SchedulerConfig, clock: impl Clock + 'static) -> Self {
        Self {
            config,
            clock: Box::new(clock),
            pending: VecDeque::new(),
            active: Vec::new(),
            running: Vec::new(),
            wait: false,
            accept_sync: false,
            executing: false,
            faults: Vec::new(),
            finish_observers: Vec::new(),
            fault_observers: Vec::new(),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Queue `action` for admission. Returns whether a packet was added.
    ///
    /// `None` and actions already pending are ignored.
    pub fn schedule_action(&mut self, action: Option<NodeId>) -> bool {
        let Some(action) = action else {
            return false;
        };
        if self.pending.iter().any(|packet| packet.action == action) {
            return false;
        }
        let created = self.clock.now();
        debug!(%action, created, "action scheduled");
        self.pending.push_back(ActionPacket { action, created });
        true
    }

    /// Run one scheduling tick against `tree`.
    pub fn execute(&mut self, tree: &mut Tree) -> TickReport {
        let mut report = TickReport::default();
        self.expire(tree, &mut report);

        if self.wait {
            debug!(active = self.active.len(), "waiting on non-interruptable action");
        } else if self.admit(tree, &mut report) {
            self.relaunch(tree, &mut report);
        }

        self.resume(tree, &mut report);
        report
    }

    /// Whether any admitted action is still in flight.
    pub fn executing_actions(&self) -> bool {
        self.executing
    }

    pub fn is_waiting(&self) -> bool {
        self.wait
    }

    pub fn pending(&self) -> impl Iterator<Item = &ActionPacket> {
        self.pending.iter()
    }

    pub fn active(&self) -> &[NodeId] {
        &self.active
    }

    pub fn running(&self) -> Vec<NodeId> {
        self.running.iter().map(|running| running.action).collect()
    }

    pub fn on_finish<F>(&mut self, observer: F)
    where
        F: FnMut(&FinishedAction) + Send + 'static,
    {
        self.finish_observers.push(Box::new(observer));
    }

    pub fn on_fault<F>(&mut self, observer: F)
    where
        F: FnMut(&ActionFault) + Send + 'static,
    {
        self.fault_observers.push(Box::new(observer));
    }

    /// Drain the faults recorded since the last call.
    pub fn take_faults(&mut self) -> Vec<ActionFault> {
        std::mem::take(&mut self.faults)
    }

    /// Drop every pending packet and interrupt everything in flight.
    ///
    /// Returns the interrupted actions. No finish observers fire.
    pub fn cancel_all(&mut self, tree: &mut Tree) -> Vec<NodeId> {
        self.pending.clear();
        let interrupted: Vec<NodeId> = self.running.drain(..).map(|r| r.action).collect();
        for action in &interrupted {
            tree.set_state(*action, RunningState::Interrupted);
        }
        self.active.clear();
        self.reset_latches();
        if !interrupted.is_empty() {
            debug!(count = interrupted.len(), "actions cancelled");
        }
        interrupted
    }

    fn expire(&mut self, tree: &Tree, report: &mut TickReport) {
        let now = self.clock.now();
        let ttl = self.config.pending_ttl;
        self.pending.retain(|packet| {
            if let Err(err) = tree.flags(packet.action) {
                warn!(action = %packet.action, err = %err, "dropping packet for non-action node");
                return false;
            }
            if now - packet.created > ttl {
                warn!(action = %packet.action, age = now - packet.created, "pending action expired");
                report.expired.push(packet.action);
                return false;
            }
            true
        });
    }

    /// Admission under the interrupt and sync rules. Returns whether the
    /// active set changed.
    fn admit(&mut self, tree: &Tree, report: &mut TickReport) -> bool {
        let flags_of = |packet: &ActionPacket| tree.flags(packet.action).unwrap_or_default();
        let mut changed = false;

        if let Some(index) = self
            .pending
            .iter()
            .position(|packet| flags_of(packet).is_interruptor())
        {
            for packet in self.pending.drain(..index) {
                debug!(action = %packet.action, "pending action superseded by interruptor");
                report.superseded.push(packet.action);
            }
            if let Some(packet) = self.pending.pop_front() {
                let flags = flags_of(&packet);
                debug!(action = %packet.action, "interruptor admitted");
                self.active.clear();
                self.active.push(packet.action);
                report.admitted.push(packet.action);
                self.accept_sync = flags.is_sync();
                self.wait = !flags.is_interruptable();
                changed = true;
            }
        }

        while let Some(packet) = self.pending.front().copied() {
            let flags = flags_of(&packet);
            if self.active.is_empty() {
                self.accept_sync = flags.is_sync();
            } else if !(flags.is_sync() && self.accept_sync) {
                break;
            }
            self.pending.pop_front();
            if self.active.contains(&packet.action) {
                debug!(action = %packet.action, "action already active");
                continue;
            }
            debug!(action = %packet.action, sync = flags.is_sync(), "action admitted");
            self.active.push(packet.action);
            report.admitted.push(packet.action);
            self.wait = !flags.is_interruptable();
            changed = true;
        }
        changed
    }

    /// Abandon in-flight sequences and start one for every active action.
    fn relaunch(&mut self, tree: &mut Tree, report: &mut TickReport) {
        for running in self.running.drain(..) {
            if !self.active.contains(&running.action) {
                tree.set_state(running.action, RunningState::Interrupted);
                report.interrupted.push(running.action);
            }
        }
        for action in self.active.clone() {
            self.executing = true;
            tree.set_state(action, RunningState::Running);
            match evaluator::start_action(tree, action) {
                Ok(step) => self.running.push(Running { action, step }),
                Err(err) => self.fault(tree, action, &err, report),
            }
        }
        debug!(active = ?self.active, "actions launched");
    }

    /// Resume every running sequence once.
    fn resume(&mut self, tree: &mut Tree, report: &mut TickReport) {
        let mut index = 0;
        while index < self.running.len() {
            match self.running[index].step.step() {
                Ok(Step::Continue) => index += 1,
                Ok(Step::Done) => {
                    let action = self.running.remove(index).action;
                    self.finish(tree, action, report);
                }
                Err(err) => {
                    let action = self.running.remove(index).action;
                    self.fault(tree, action, &err, report);
                }
            }
        }
    }

    fn finish(&mut self, tree: &mut Tree, action: NodeId, report: &mut TickReport) {
        tree.set_state(action, RunningState::Finished);
        self.complete(action);
        report.finished.push(action);
        let finished = FinishedAction {
            action,
            guid: guid_of(tree, action),
            title: tree.title(action).unwrap_or_default(),
        };
        debug!(action = %finished.guid, title = %finished.title, "action finished");
        for observer in &mut self.finish_observers {
            observer(&finished);
        }
    }

    fn fault(&mut self, tree: &mut Tree, action: NodeId, err: &anyhow::Error, report: &mut TickReport) {
        tree.set_state(action, RunningState::Finished);
        self.complete(action);
        let fault = ActionFault {
            action,
            guid: guid_of(tree, action),
            title: tree.title(action).unwrap_or_default(),
            message: format!("{err:#}"),
        };
        warn!(action = %fault.guid, title = %fault.title, err = %fault.message, "action faulted");
        for observer in &mut self.fault_observers {
            observer(&fault);
        }
        self.faults.push(fault.clone());
        report.faulted.push(fault);
    }

    /// Completion bookkeeping shared by finish and fault.
    fn complete(&mut self, action: NodeId) {
        self.active.retain(|id| *id != action);
        self.running.retain(|running| running.action != action);
        if self.active.is_empty() {
            self.reset_latches();
        }
    }

    fn reset_latches(&mut self) {
        self.wait = false;
        self.accept_sync = false;
        self.executing = false;
    }
}

impl fmt::Debug for ActionScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionScheduler")
            .field("config", &self.config)
            .field("pending", &self.pending)
            .field("active", &self.active)
            .field("running", &self.running())
            .field("wait", &self.wait)
            .field("executing", &self.executing)
            .finish()
    }
}

fn guid_of(tree: &Tree, action: NodeId) -> Guid {
    tree.guid(action)
        .cloned()
        .unwrap_or_else(|_| Guid::new(action.to_string()))
}
