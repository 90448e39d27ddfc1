//! End-to-end evaluation against an in-memory store.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tasktree_model::{
    Condition, MemoryStore, Node, NodeFacet, NoteFacet, Rule, RuleData, RuleWriter,
    SmartFolderFacet, Tag, TaskFacet, TaskStatus, TemplateFacet, UserId,
};
use tasktree_rules::{
    validate_json, EngineConfig, FixedClock, Page, RuleSource, RulesEngine,
};
use uuid::Uuid;

// ============================================================================
// Fixtures
// ============================================================================

fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

fn engine_at(store: &MemoryStore, now: DateTime<Utc>) -> RulesEngine<'_, MemoryStore> {
    RulesEngine::new(store).with_clock(Arc::new(FixedClock(now)))
}

struct Workspace {
    store: MemoryStore,
    owner: UserId,
}

impl Workspace {
    fn new() -> Self {
        Workspace {
            store: MemoryStore::new(),
            owner: Uuid::new_v4(),
        }
    }

    fn add(&self, title: &str, facet: NodeFacet, parent: Option<Uuid>) -> Uuid {
        let mut node = Node::new(Uuid::new_v4(), self.owner, title, facet);
        node.parent_id = parent;
        let id = node.id;
        self.store.insert_node(node).unwrap();
        id
    }

    fn task(&self, title: &str, facet: TaskFacet) -> Uuid {
        self.add(title, NodeFacet::Task(facet), None)
    }

    fn note(&self, title: &str) -> Uuid {
        self.add(title, NodeFacet::Note(NoteFacet::default()), None)
    }

    fn rule(&self, data: RuleData) -> Uuid {
        let rule = Rule::new(Uuid::new_v4(), self.owner, "rule", data);
        self.store.insert_rule(rule).unwrap().id
    }

    fn run(&self, data: &RuleData, now: DateTime<Utc>) -> Vec<Uuid> {
        let mut ids = engine_at(&self.store, now)
            .evaluate(RuleSource::Inline(data), self.owner, Page::all())
            .unwrap()
            .ids();
        ids.sort();
        ids
    }
}

fn sorted(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    ids.sort();
    ids
}

fn noon() -> DateTime<Utc> {
    at(2024, 6, 15, 12, 0, 0)
}

// ============================================================================
// Rule semantics
// ============================================================================

#[test]
fn empty_conditions_match_nothing_for_either_logic() {
    let ws = Workspace::new();
    ws.task("a", TaskFacet::default());
    ws.note("b");

    assert!(ws.run(&RuleData::all(vec![]), noon()).is_empty());
    assert!(ws.run(&RuleData::any(vec![]), noon()).is_empty());
}

#[test]
fn or_with_a_false_condition_equals_the_true_one() {
    let ws = Workspace::new();
    ws.task("Pay rent", TaskFacet::default());
    ws.task("Water plants", TaskFacet::default());
    ws.note("Rent notes");

    let truthy = Condition::new("title_contains", "contains", ["rent"]);
    let falsy = Condition::new("title_contains", "equals", ["no such title"]);

    let alone = ws.run(&RuleData::any(vec![truthy.clone()]), noon());
    let combined = ws.run(&RuleData::any(vec![falsy, truthy]), noon());
    assert_eq!(alone.len(), 2);
    assert_eq!(combined, alone);
}

#[test]
fn dropped_conditions_do_not_widen_and_rules() {
    let ws = Workspace::new();
    let todo = ws.task("a", TaskFacet::default());
    ws.task("b", TaskFacet::default().with_status(TaskStatus::Done));

    let data = RuleData::all(vec![
        Condition::new("task_status", "equals", ["todo"]),
        Condition::new("retired_type", "equals", ["x"]),
        Condition::new("task_status", "sounds_like", ["todo"]),
    ]);
    assert_eq!(ws.run(&data, noon()), vec![todo]);
}

#[test]
fn long_title_needle_still_narrows_and_rules() {
    let ws = Workspace::new();
    ws.note("unrelated");

    let data = RuleData::all(vec![
        Condition::new("node_type", "equals", ["note"]),
        Condition::new("title_contains", "contains", ["ÿ".repeat(60_000)]),
    ]);
    let result = engine_at(&ws.store, noon())
        .evaluate(RuleSource::Inline(&data), ws.owner, Page::all())
        .unwrap();
    assert_eq!(result.total, 0);
}

#[test]
fn parent_ancestor_reaches_every_depth() {
    let ws = Workspace::new();
    let root = ws.add("Root", NodeFacet::Folder, None);
    let a = ws.add("A", NodeFacet::Folder, Some(root));
    let b = ws.add("B", NodeFacet::Folder, Some(a));
    let c = ws.add("C", NodeFacet::Task(TaskFacet::default()), Some(b));
    let side = ws.add("Side", NodeFacet::Note(NoteFacet::default()), Some(root));
    ws.add("Elsewhere", NodeFacet::Folder, None);

    let data = RuleData::all(vec![Condition::new(
        "parent_ancestor",
        "equals",
        [root.to_string()],
    )]);
    let found = ws.run(&data, noon());
    assert_eq!(found, sorted(vec![a, b, c, side]));
    assert!(!found.contains(&root));
}

#[test]
fn parent_node_matches_direct_children_only() {
    let ws = Workspace::new();
    let root = ws.add("Root", NodeFacet::Folder, None);
    let child = ws.add("Child", NodeFacet::Folder, Some(root));
    ws.add("Grandchild", NodeFacet::Folder, Some(child));

    let data = RuleData::all(vec![Condition::new("parent_node", "equals", [root.to_string()])]);
    assert_eq!(ws.run(&data, noon()), vec![child]);
}

#[test]
fn tag_all_requires_every_tag() {
    let ws = Workspace::new();
    let (work, urgent) = (Uuid::new_v4(), Uuid::new_v4());
    ws.store.insert_tag(Tag::new(work, ws.owner, "work")).unwrap();
    ws.store.insert_tag(Tag::new(urgent, ws.owner, "urgent")).unwrap();

    let both = ws.task("both", TaskFacet::default());
    let only_work = ws.task("work", TaskFacet::default());
    ws.task("none", TaskFacet::default());
    ws.store.tag_node(both, work).unwrap();
    ws.store.tag_node(both, urgent).unwrap();
    ws.store.tag_node(only_work, work).unwrap();

    let values = [work.to_string(), urgent.to_string()];
    let all = RuleData::all(vec![Condition::new("tag_contains", "all", values.clone())]);
    assert_eq!(ws.run(&all, noon()), vec![both]);

    let any = RuleData::all(vec![Condition::new("tag_contains", "any", values)]);
    assert_eq!(ws.run(&any, noon()), sorted(vec![both, only_work]));
}

#[test]
fn has_children_splits_containers_from_leaves() {
    let ws = Workspace::new();
    let parent = ws.add("Parent", NodeFacet::Task(TaskFacet::default()), None);
    let leaf = ws.add("Leaf", NodeFacet::Task(TaskFacet::default()), Some(parent));

    let with = RuleData::all(vec![Condition::new("has_children", "equals", ["true"])]);
    let without = RuleData::all(vec![Condition::new("has_children", "equals", ["false"])]);
    assert_eq!(ws.run(&with, noon()), vec![parent]);
    assert_eq!(ws.run(&without, noon()), vec![leaf]);
}

// ============================================================================
// Dates
// ============================================================================

#[test]
fn is_today_holds_for_the_whole_utc_day() {
    let ws = Workspace::new();
    let late = ws.task("late", TaskFacet::default().with_due_at(at(2024, 6, 15, 23, 59, 59)));
    let data = RuleData::all(vec![Condition::bare("due_date", "is_today")]);

    for now in [
        at(2024, 6, 15, 0, 0, 0),
        at(2024, 6, 15, 12, 0, 0),
        at(2024, 6, 15, 23, 59, 59),
    ] {
        assert_eq!(ws.run(&data, now), vec![late], "now = {now}");
    }
    for now in [at(2024, 6, 14, 23, 59, 59), at(2024, 6, 16, 0, 0, 0)] {
        assert!(ws.run(&data, now).is_empty(), "now = {now}");
    }
}

#[test]
fn overdue_only_counts_due_dates_before_today() {
    let ws = Workspace::new();
    let overdue = ws.task("old", TaskFacet::default().with_due_at(at(2024, 6, 14, 23, 0, 0)));
    ws.task("today", TaskFacet::default().with_due_at(at(2024, 6, 15, 0, 0, 0)));
    ws.task("undated", TaskFacet::default());

    let data = RuleData::all(vec![Condition::bare("due_date", "is_overdue")]);
    assert_eq!(ws.run(&data, noon()), vec![overdue]);

    let on_start = RuleData::all(vec![Condition::bare("earliest_start", "is_overdue")]);
    assert!(ws.run(&on_start, noon()).is_empty());
}

#[test]
fn due_within_days_includes_today_and_the_last_day() {
    let ws = Workspace::new();
    let today = ws.task("today", TaskFacet::default().with_due_at(at(2024, 6, 15, 8, 0, 0)));
    let edge = ws.task("edge", TaskFacet::default().with_due_at(at(2024, 6, 18, 23, 0, 0)));
    ws.task("past", TaskFacet::default().with_due_at(at(2024, 6, 19, 0, 0, 0)));

    let data = RuleData::all(vec![Condition::new("due_date", "due_within_days", ["3"])]);
    assert_eq!(ws.run(&data, noon()), sorted(vec![today, edge]));
}

#[test]
fn is_null_finds_undated_tasks_only() {
    let ws = Workspace::new();
    let undated = ws.task("undated", TaskFacet::default());
    ws.task("dated", TaskFacet::default().with_due_at(noon()));
    ws.note("note");

    let data = RuleData::all(vec![Condition::bare("due_date", "is_null")]);
    assert_eq!(ws.run(&data, noon()), vec![undated]);
}

// ============================================================================
// Saved filters
// ============================================================================

#[test]
fn saved_filter_to_deleted_rule_matches_nothing() {
    let ws = Workspace::new();
    ws.task("a", TaskFacet::default());
    let rule = ws.rule(RuleData::all(vec![Condition::new("task_status", "equals", ["todo"])]));
    let data = RuleData::all(vec![Condition::new("saved_filter", "equals", [rule.to_string()])]);
    assert_eq!(ws.run(&data, noon()).len(), 1);

    ws.store.remove_rule(rule).unwrap();
    assert!(ws.run(&data, noon()).is_empty());
}

#[test]
fn saved_filter_to_someone_elses_private_rule_matches_nothing() {
    let ws = Workspace::new();
    ws.task("a", TaskFacet::default());
    let other = Rule::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        "theirs",
        RuleData::all(vec![Condition::new("node_type", "equals", ["task"])]),
    );
    let other = ws.store.insert_rule(other).unwrap().id;
    let data = RuleData::all(vec![Condition::new("saved_filter", "equals", [other.to_string()])]);
    assert!(ws.run(&data, noon()).is_empty());
}

#[test]
fn mutually_recursive_rules_terminate_empty() {
    let ws = Workspace::new();
    ws.task("a", TaskFacet::default());
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let refer = |id: Uuid| RuleData::all(vec![Condition::new("saved_filter", "equals", [id.to_string()])]);
    ws.store.insert_rule(Rule::new(a, ws.owner, "a", refer(b))).unwrap();
    ws.store.insert_rule(Rule::new(b, ws.owner, "b", refer(a))).unwrap();

    let result = engine_at(&ws.store, noon())
        .evaluate(RuleSource::Stored(a), ws.owner, Page::all())
        .unwrap();
    assert!(result.is_empty());
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn validated_rule_survives_a_store_reload() {
    let ws = Workspace::new();
    ws.task("Draft report", TaskFacet::default().with_due_at(noon()));
    ws.task("Send report", TaskFacet::default().with_status(TaskStatus::Done));
    ws.note("Report notes");

    let body = serde_json::json!({
        "conditions": [
            { "type": "title_contains", "operator": "contains", "values": ["report"] },
            { "type": "task_status", "operator": "in", "values": ["todo", "in_progress"] }
        ],
        "logic": "AND"
    });
    assert!(validate_json(&body).is_empty());
    let data: RuleData = serde_json::from_value(body).unwrap();
    let in_memory = ws.run(&data, noon());
    let rule_id = ws.rule(data);

    let json = serde_json::to_string(&ws.store.snapshot().unwrap()).unwrap();
    let reloaded = MemoryStore::from_json_str(&json).unwrap();
    let mut stored = engine_at(&reloaded, noon())
        .evaluate(RuleSource::Stored(rule_id), ws.owner, Page::all())
        .unwrap()
        .ids();
    stored.sort();

    assert_eq!(in_memory.len(), 1);
    assert_eq!(stored, in_memory);
}

#[test]
fn legacy_folder_with_an_untyped_condition_evaluates() {
    let owner = Uuid::new_v4();
    let note = Uuid::new_v4();
    let folder = Uuid::new_v4();
    let doc = serde_json::json!({
        "nodes": [
            { "id": note, "owner_id": owner, "title": "Note", "node_type": "note" },
            { "id": Uuid::new_v4(), "owner_id": owner, "title": "Task", "node_type": "task" },
            { "id": folder, "owner_id": owner, "title": "Notes", "node_type": "smart_folder",
              "rules": { "conditions": [
                  { "type": "node_type", "operator": "equals", "values": ["note"] },
                  { "operator": "equals", "values": ["x"] },
                  { "type": "task_status", "operator": null, "values": ["done"] }
              ], "logic": "AND" } }
        ]
    });
    let store = MemoryStore::from_json_str(&doc.to_string()).unwrap();

    let ids = engine_at(&store, noon())
        .evaluate_smart_folder(folder, owner, Page::all())
        .unwrap()
        .ids();
    assert_eq!(ids, vec![note]);
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn tasks_due_today() {
    let ws = Workspace::new();
    let t1 = ws.task("T1", TaskFacet::default().with_due_at(at(2024, 6, 15, 17, 0, 0)));
    ws.task("T2", TaskFacet::default().with_due_at(at(2024, 6, 16, 9, 0, 0)));
    ws.note("N1");

    let data = RuleData::all(vec![
        Condition::new("node_type", "in", ["task"]),
        Condition::bare("due_date", "is_today"),
    ]);
    assert_eq!(ws.run(&data, noon()), vec![t1]);
}

#[test]
fn open_tasks() {
    let ws = Workspace::new();
    let todo = ws.task("a", TaskFacet::default().with_status(TaskStatus::Todo));
    let doing = ws.task("b", TaskFacet::default().with_status(TaskStatus::InProgress));
    ws.task("c", TaskFacet::default().with_status(TaskStatus::Done));
    ws.task("d", TaskFacet::default().with_status(TaskStatus::Dropped));

    let data = RuleData::all(vec![Condition::new("task_status", "in", ["todo", "in_progress"])]);
    assert_eq!(ws.run(&data, noon()), sorted(vec![todo, doing]));
}

#[test]
fn smart_folder_never_lists_itself_or_templates() {
    let ws = Workspace::new();
    let note = ws.note("Note");
    ws.add("Template", NodeFacet::Template(TemplateFacet::default()), None);
    let folder = ws.add(
        "Everything",
        NodeFacet::SmartFolder(SmartFolderFacet::with_legacy_rules(RuleData::all(vec![
            Condition::new("node_type", "not_in", ["task"]),
        ]))),
        None,
    );
    let other_folder = ws.add("Other", NodeFacet::SmartFolder(SmartFolderFacet::default()), None);

    let mut ids = engine_at(&ws.store, noon())
        .evaluate_smart_folder(folder, ws.owner, Page::all())
        .unwrap()
        .ids();
    ids.sort();
    assert_eq!(ids, sorted(vec![note, other_folder]));
}

#[test]
fn total_ignores_the_page() {
    let ws = Workspace::new();
    for i in 0..7 {
        ws.task(&format!("task {i}"), TaskFacet::default());
    }
    let data = RuleData::all(vec![Condition::new("node_type", "equals", ["task"])]);
    let engine = engine_at(&ws.store, noon());

    let page = engine
        .evaluate(RuleSource::Inline(&data), ws.owner, Page::new(5, Some(5)))
        .unwrap();
    assert_eq!(page.total, 7);
    assert_eq!(page.nodes.len(), 2);

    let preview = engine.preview(&data, ws.owner, Some(3)).unwrap();
    assert_eq!(preview.total, 7);
    assert_eq!(preview.nodes.len(), 3);
}

#[test]
fn configured_order_is_applied() {
    let ws = Workspace::new();
    ws.task("banana", TaskFacet::default());
    ws.task("apple", TaskFacet::default());
    ws.task("cherry", TaskFacet::default());

    let config = EngineConfig::from_yaml_str("default_order:\n  - field: title\n    dir: desc\n").unwrap();
    let data = RuleData::all(vec![Condition::new("node_type", "equals", ["task"])]);
    let result = engine_at(&ws.store, noon())
        .with_config(config)
        .evaluate(RuleSource::Inline(&data), ws.owner, Page::all())
        .unwrap();
    let titles: Vec<&str> = result.nodes.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["cherry", "banana", "apple"]);
}
