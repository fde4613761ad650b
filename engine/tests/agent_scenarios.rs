//! End-to-end think-loop scenarios through the public `Agent` API.

use engine::agent::Agent;
use engine::blackboard::Blackboard;
use engine::core::registry::NodeRegistry;
use engine::core::scheduler::{ManualClock, SchedulerConfig};
use engine::core::types::{ActionFlags, NodeId, RunningState, Value};
use engine::core::wire::build_tree;
use engine::nodes::decision::CONDITION;
use engine::test_support::{
    ActionLog, Switch, condition_decision, failing_action, sample_graph, scripted_action,
    switch_condition,
};
use engine::tree::{Node, Port, Tree};

/// Root -> decision(switch) with `on_true` / `on_false` as the two leaves.
fn switched_tree(switch: &Switch, on_true: Node, on_false: Node) -> Tree {
    let mut tree = Tree::new("switched");
    let decision = tree.insert(condition_decision()).expect("decision");
    let condition = tree.insert(switch_condition(switch)).expect("condition");
    let yes = tree.insert(on_true).expect("true leaf");
    let no = tree.insert(on_false).expect("false leaf");
    tree.attach(tree.root(), Port::Child, decision).expect("attach root");
    tree.attach(decision, Port::True, yes).expect("attach true");
    tree.attach(decision, Port::False, no).expect("attach false");
    tree.connect(decision, CONDITION, condition).expect("connect");
    tree
}

fn agent(template: &Tree, name: &str, board: &Blackboard) -> Agent {
    Agent::new(
        template,
        name,
        board.clone(),
        SchedulerConfig::default(),
        ManualClock::new(),
    )
    .expect("agent")
}

fn by_title(agent: &Agent, title: &str) -> NodeId {
    agent
        .tree()
        .ids()
        .find(|id| agent.tree().title(*id).expect("title") == title)
        .expect("node with title")
}

fn entries(log: &ActionLog) -> Vec<String> {
    log.lock().expect("lock").clone()
}

#[test]
fn agents_cloned_from_one_template_are_independent() {
    let template = build_tree(&sample_graph(), &NodeRegistry::with_builtins()).expect("build");
    let hungry: Blackboard = [("hungry", Value::Bool(true))].into_iter().collect();
    let sated = Blackboard::new();
    let mut first = agent(&template, "forager-1", &hungry);
    let mut second = agent(&template, "forager-2", &sated);

    let eat = first.think().expect("think").selected;
    let wander = second.think().expect("think").selected;
    assert_eq!(first.tree().title(eat).expect("title"), "Eat");
    assert_eq!(second.tree().title(wander).expect("title"), "Wander");
    assert_eq!(second.tree().state(wander).expect("state"), RunningState::Running);
    assert_eq!(
        first.tree().state(by_title(&first, "Wander")).expect("state"),
        RunningState::Idle
    );
    assert!(!template.is_initialised());
    assert_eq!(sated.get("hungry"), None);
}

#[test]
fn faulting_action_does_not_stop_the_agent() {
    let switch = Switch::new(true);
    let (idle, idle_log) = scripted_action("idle", 1);
    let template = switched_tree(&switch, failing_action("explode"), idle);
    let mut agent = agent(&template, "robot", &Blackboard::new());
    let faults = std::sync::Arc::new(std::sync::Mutex::new(0));
    let counter = std::sync::Arc::clone(&faults);
    agent.on_finish(move |_| *counter.lock().expect("lock") += 1);

    let outcome = agent.think().expect("think");
    assert_eq!(outcome.faults.len(), 1);
    assert_eq!(outcome.faults[0].title, "explode");
    assert_eq!(
        agent.tree().state(outcome.selected).expect("state"),
        RunningState::Finished
    );
    assert_eq!(*faults.lock().expect("lock"), 0);

    switch.set(false);
    let outcome = agent.think().expect("think");
    assert!(outcome.faults.is_empty());
    assert_eq!(entries(&idle_log), vec!["idle".to_string()]);
    assert_eq!(*faults.lock().expect("lock"), 1);
}

#[test]
fn sync_action_joins_running_sync_action() {
    let switch = Switch::new(true);
    let sync = ActionFlags::SYNC | ActionFlags::INTERRUPTABLE;
    let (a, a_log) = scripted_action("a", 3);
    let (b, b_log) = scripted_action("b", 3);
    let template = switched_tree(&switch, a.with_flags(sync), b.with_flags(sync));
    let mut agent = agent(&template, "syncer", &Blackboard::new());

    let first = agent.think().expect("think").selected;
    switch.set(false);
    let outcome = agent.think().expect("think");

    assert!(outcome.interrupted.is_empty());
    let running = agent.scheduler().running();
    assert!(running.contains(&first));
    assert!(running.contains(&outcome.selected));
    assert_eq!(entries(&b_log), vec!["b".to_string()]);
    assert!(entries(&a_log).len() >= 2);
}

#[test]
fn plain_action_is_interrupted_by_interruptor() {
    let switch = Switch::new(false);
    let (alarm, alarm_log) = scripted_action("alarm", 1);
    let (patrol, _) = scripted_action("patrol", 5);
    let template = switched_tree(
        &switch,
        alarm.with_flags(ActionFlags::INTERRUPTOR),
        patrol.with_flags(ActionFlags::INTERRUPTABLE),
    );
    let mut agent = agent(&template, "guard", &Blackboard::new());

    let patrol = agent.think().expect("think").selected;
    switch.set(true);
    let outcome = agent.think().expect("think");

    assert_eq!(outcome.interrupted, vec![patrol]);
    assert_eq!(outcome.finished, vec![outcome.selected]);
    assert_eq!(
        agent.tree().state(patrol).expect("state"),
        RunningState::Interrupted
    );
    assert_eq!(entries(&alarm_log), vec!["alarm".to_string()]);
}
