//! Agent host: one tree instance driven by one scheduler.
//!
//! Each tick runs the tree to select an action, schedules it and executes the
//! scheduler once. The template tree is cloned so several agents can share
//! one definition.

use tracing::{debug, warn};

use crate::blackboard::Blackboard;
use crate::core::error::{ActionFault, TreeError};
use crate::core::scheduler::{ActionScheduler, Clock, FinishedAction, SchedulerConfig};
use crate::core::types::NodeId;
use crate::tree::Tree;

/// Result of one [`Agent::think`] tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ThinkOutcome {
    pub selected: NodeId,
    pub scheduled: bool,
    pub admitted: Vec<NodeId>,
    pub interrupted: Vec<NodeId>,
    pub finished: Vec<NodeId>,
    pub faults: Vec<ActionFault>,
}

pub struct Agent {
    tree: Tree,
    scheduler: ActionScheduler,
    blackboard: Blackboard,
    ticks: u64,
}

impl Agent {
    /// Clone `template` as `name` and initialise it with `blackboard`.
    pub fn new(
        template: &Tree,
        name: &str,
        blackboard: Blackboard,
        config: SchedulerConfig,
        clock: impl Clock + 'static,
    ) -> Result<Self, TreeError> {
        let mut tree = template.clone_tree(Some(name))?;
        tree.initialise(&blackboard)?;
        debug!(agent = name, template = %template.name(), "agent created");
        Ok(Self {
            tree,
            scheduler: ActionScheduler::new(config, clock),
            blackboard,
            ticks: 0,
        })
    }

    pub fn name(&self) -> &str {
        self.tree.name()
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable access for observers and display edits.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn scheduler(&self) -> &ActionScheduler {
        &self.scheduler
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn on_finish<F>(&mut self, observer: F)
    where
        F: FnMut(&FinishedAction) + Send + 'static,
    {
        self.scheduler.on_finish(observer);
    }

    /// Run, schedule and execute once.
    ///
    /// An evaluation error is returned before anything is scheduled, so the
    /// scheduler is left untouched for that tick.
    pub fn think(&mut self) -> Result<ThinkOutcome, TreeError> {
        self.ticks += 1;
        let selected = self.tree.run().inspect_err(|err| {
            warn!(agent = %self.tree.name(), tick = self.ticks, err = %err, "evaluation failed");
        })?;
        let scheduled = self.scheduler.schedule_action(Some(selected));
        let report = self.scheduler.execute(&mut self.tree);
        let faults = self.scheduler.take_faults();
        Ok(ThinkOutcome {
            selected,
            scheduled,
            admitted: report.admitted,
            interrupted: report.interrupted,
            finished: report.finished,
            faults,
        })
    }

    /// Cancel everything in flight. Returns the interrupted actions.
    pub fn shutdown(&mut self) -> Vec<NodeId> {
        self.scheduler.cancel_all(&mut self.tree)
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::core::registry::NodeRegistry;
    use crate::core::scheduler::ManualClock;
    use crate::core::types::{Guid, RunningState, Value};
    use crate::core::wire::build_tree;
    use crate::test_support::sample_graph;

    fn forager(board: &Blackboard) -> Agent {
        let template = build_tree(&sample_graph(), &NodeRegistry::with_builtins()).expect("build");
        Agent::new(
            &template,
            "forager-1",
            board.clone(),
            SchedulerConfig::default(),
            ManualClock::new(),
        )
        .expect("agent")
    }

    #[test]
    fn agent_runs_an_initialised_clone() {
        let board = Blackboard::new();
        let agent = forager(&board);
        assert_eq!(agent.name(), "forager-1");
        assert!(agent.tree().find(&Guid::new("eat")).is_none());
        assert!(agent.tree().is_initialised());
    }

    #[test]
    fn hungry_agent_eats_then_wanders() {
        let board: Blackboard = [("hungry", Value::Bool(true))].into_iter().collect();
        let mut agent = forager(&board);
        let finished = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&finished);
        agent.on_finish(move |done| sink.lock().expect("lock").push(done.title.clone()));

        let first = agent.think().expect("think");
        assert_eq!(agent.tree().title(first.selected).expect("title"), "Eat");
        assert_eq!(board.get("hungry"), Some(Value::Bool(false)));

        let second = agent.think().expect("think");
        assert_eq!(agent.tree().title(second.selected).expect("title"), "Wander");
        assert_eq!(*finished.lock().expect("lock"), vec!["Eat".to_string()]);
        assert_eq!(agent.ticks(), 2);
    }

    #[test]
    fn threat_interrupts_wandering() {
        let board = Blackboard::new();
        let mut agent = forager(&board);
        let wander = agent.think().expect("think").selected;
        assert_eq!(agent.tree().state(wander).expect("state"), RunningState::Running);

        board.set("threat", Value::Bool(true));
        let outcome = agent.think().expect("think");
        assert_eq!(agent.tree().title(outcome.selected).expect("title"), "Flee");
        assert_eq!(outcome.interrupted, vec![wander]);
        assert_eq!(outcome.finished, vec![outcome.selected]);
    }

    #[test]
    fn shutdown_interrupts_running_action() {
        let board = Blackboard::new();
        let mut agent = forager(&board);
        let wander = agent.think().expect("think").selected;
        assert_eq!(agent.shutdown(), vec![wander]);
        assert_eq!(agent.tree().state(wander).expect("state"), RunningState::Interrupted);
        assert!(!agent.scheduler().executing_actions());
    }

    #[test]
    fn malformed_tree_schedules_nothing() {
        let board = Blackboard::new();
        let mut agent = forager(&board);
        let decide = agent
            .tree()
            .ids()
            .find(|node| agent.tree().title(*node).expect("title") == "Hungry?")
            .expect("decide");
        agent.tree_mut().disconnect(decide, "Condition").expect("disconnect");

        assert!(matches!(
            agent.think(),
            Err(TreeError::MalformedTree { .. })
        ));
        assert_eq!(agent.scheduler().pending().count(), 0);
    }
}
