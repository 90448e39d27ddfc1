//! Tasktree rules - smart folder rule evaluation.
//!
//! A smart folder is a saved query over a user's nodes. Its query is a rule:
//! a flat list of typed conditions joined by `AND` or `OR`. This crate
//! validates rules, compiles them into node predicates and runs them against
//! any store implementing the [`tasktree_model`] contracts.
//!
//! - [`RulesEngine`] evaluates inline rules, stored rules and smart folders
//! - [`RuleLibrary`] creates, edits, duplicates and migrates rules
//! - [`validate_json`] and [`validate`] check a rule body's shape
//!
//! # Quick Start
//!
//! ```rust
//! use tasktree_model::{Condition, MemoryStore, Node, NodeFacet, RuleData, TaskFacet, TaskStatus};
//! use tasktree_rules::{Page, RuleSource, RulesEngine};
//! use uuid::Uuid;
//!
//! let owner = Uuid::new_v4();
//! let store = MemoryStore::new();
//! let todo = TaskFacet::default().with_status(TaskStatus::Todo);
//! store.insert_node(Node::new(Uuid::new_v4(), owner, "Write docs", NodeFacet::Task(todo))).unwrap();
//! store.insert_node(Node::new(Uuid::new_v4(), owner, "Ideas", NodeFacet::Folder)).unwrap();
//!
//! let rule = RuleData::all(vec![Condition::new("task_status", "equals", ["todo"])]);
//! let result = RulesEngine::new(&store)
//!     .evaluate(RuleSource::Inline(&rule), owner, Page::all())
//!     .unwrap();
//!
//! assert_eq!(result.total, 1);
//! assert_eq!(result.nodes[0].title, "Write docs");
//! ```
//!
//! # Rule Semantics
//!
//! ```text
//! AND: every contributing condition holds
//! OR:  at least one contributing condition holds
//! no contributing condition: nothing matches
//! ```
//!
//! A condition contributes unless it is dropped: unknown type, unknown
//! operator, missing values, or an operator its type does not understand.
//! Dropping is lenient (rules written by older clients still load) but the
//! result is fail-closed.
//!
//! # Dates
//!
//! All date operators are computed in UTC from one clock reading per
//! evaluation. Days are half-open `[00:00, next 00:00)` and weeks start on
//! Monday. See [`Calendar`].

mod clock;
mod compile;
mod condition;
mod config;
mod dates;
mod engine;
mod error;
mod evaluators;
mod filter;
mod library;
mod op;
mod ordering;
mod validate;

// Re-export public API
pub use clock::{Clock, FixedClock, SystemClock};
pub use compile::Compiler;
pub use condition::ConditionType;
pub use config::EngineConfig;
pub use dates::{parse_date_value, start_of, Calendar, DateField, DateTest, DateValue, Window};
pub use engine::{Evaluation, Page, RuleSource, RulesEngine};
pub use error::{EngineError, InvalidOrder, Result, UnknownConditionType, UnknownOperator};
pub use filter::{Filter, Predicate};
pub use library::RuleLibrary;
pub use op::{is_no_value_operator, Operator};
pub use ordering::{compare_by_orderings, default_order, Dir, OrderBy, SortField};
pub use validate::{validate, validate_json, validate_name, ValidationError, MAX_NAME_LEN};
