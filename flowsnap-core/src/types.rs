use crate::value::VariableValue;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

// ─── Scalar aliases ───────────────────────────────────────────

/// Epoch milliseconds (UTC).
pub type Timestamp = i64;

// ─── Lifecycle state codes ────────────────────────────────────

/// Instance created but not yet started.
pub const STATE_PENDING: i32 = 0;
/// Instance is executing (or suspended mid-execution; the envelope does
/// not distinguish — a snapshot of an active instance resumes active).
pub const STATE_ACTIVE: i32 = 1;
pub const STATE_COMPLETED: i32 = 2;
pub const STATE_ABORTED: i32 = 3;
pub const STATE_SUSPENDED: i32 = 4;

/// The closed set of lifecycle codes a snapshot may carry.
pub const STATE_CODES: [i32; 5] = [
    STATE_PENDING,
    STATE_ACTIVE,
    STATE_COMPLETED,
    STATE_ABORTED,
    STATE_SUSPENDED,
];

// ─── SLA compliance codes ─────────────────────────────────────

pub const SLA_NA: i32 = 0;
pub const SLA_PENDING: i32 = 1;
pub const SLA_MET: i32 = 2;
pub const SLA_VIOLATED: i32 = 3;
pub const SLA_ABORTED: i32 = 4;

/// Due-date/compliance/timer metadata attached to an instance or node
/// instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlaBlock {
    pub compliance: i32,
    pub due_at: Option<Timestamp>,
    pub timer_id: Option<String>,
}

// ─── Process instance ─────────────────────────────────────────

/// One suspended (or suspendable) process-instance execution — the unit
/// the envelope codec writes and reads.
///
/// Immutable from the codec's point of view: `write` borrows it, `read`
/// constructs a fresh one and never mutates engine objects in place.
#[derive(Debug, Default)]
pub struct ProcessInstance {
    /// Engine-assigned instance id. Must be non-empty.
    pub id: String,
    /// Process definition id this instance executes.
    pub process_id: String,
    /// Version of the process definition.
    pub process_version: String,
    /// One of [`STATE_CODES`].
    pub state: i32,
    pub start_at: Timestamp,
    pub description: Option<String>,
    pub deployment_id: Option<String>,
    /// Correlation/business key, if the instance was started with one.
    pub business_key: Option<String>,
    /// Topmost instance id when this instance runs inside another.
    pub root_instance_id: Option<String>,
    /// Direct parent instance id (sub-process linkage).
    pub parent_instance_id: Option<String>,
    /// Definition-node ids completed so far, in completion order.
    /// Append-only during execution, immutable at snapshot time.
    pub completed_node_ids: Vec<String>,
    pub sla: SlaBlock,
    /// Swimlane name → actor id bindings.
    pub swimlanes: BTreeMap<String, String>,
    /// The root scope. Nested scopes hang off composite-style node
    /// instances inside it.
    pub root: WorkflowContext,
}

impl ProcessInstance {
    /// Fresh active instance with a newly minted UUIDv7 id.
    pub fn new(process_id: impl Into<String>, process_version: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            process_id: process_id.into(),
            process_version: process_version.into(),
            state: STATE_ACTIVE,
            ..Self::default()
        }
    }
}

// ─── Workflow context (scope) ─────────────────────────────────

/// One scope: its live node instances, exclusive-choice groups,
/// variable bindings, and per-scope iteration depth counters.
///
/// Contexts form a tree, not a DAG — no node instance appears under two
/// parents. A context nests inside composite, dynamic, for-each, and
/// event-sub-process node instances.
#[derive(Debug, Default)]
pub struct WorkflowContext {
    pub node_instances: Vec<NodeInstance>,
    pub exclusive_groups: Vec<ExclusiveGroup>,
    pub variables: Vec<Variable>,
    /// Scope id → repetition depth, used by nested loops and for-each.
    pub iteration_levels: BTreeMap<String, u32>,
}

impl WorkflowContext {
    /// Resolve a node instance by id anywhere in this scope's subtree.
    pub fn find_node_instance(&self, id: &str) -> Option<&NodeInstance> {
        for ni in &self.node_instances {
            if ni.id == id {
                return Some(ni);
            }
            if let Some(nested) = ni.variant.nested_context() {
                if let Some(found) = nested.find_node_instance(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Look up a variable binding by name in this scope only.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

// ─── Node instances ───────────────────────────────────────────

/// A runtime occurrence of one step/activity in the process graph:
/// common envelope fields plus exactly one variant payload.
#[derive(Debug)]
pub struct NodeInstance {
    /// Engine-assigned instance id, unique within the whole instance.
    pub id: String,
    /// Id of the definition node this instance was created from.
    pub node_id: String,
    /// Nesting level within repeating scopes.
    pub level: u32,
    /// When a deferred trigger is scheduled to fire, if any.
    pub trigger_at: Option<Timestamp>,
    pub sla: SlaBlock,
    pub variant: NodeVariant,
}

/// The closed set of node-instance kinds.
///
/// Adding a kind is a compile-time exhaustiveness failure at every
/// encode and decode site, which is the point: unrecoverable execution
/// state must never be dropped by an unhandled case.
#[derive(Debug)]
pub enum NodeVariant {
    /// Waiting on a scheduled timer.
    Timer { timer_id: String },
    /// AND-join barrier: upstream branch id → arrival count.
    Join { triggers: BTreeMap<String, u32> },
    /// Waiting on an external event; carries no extra state.
    Event,
    /// Running a linked child process instance.
    SubProcess { child_instance_id: String },
    /// Multi-instance iteration scope.
    ForEach { context: WorkflowContext },
    /// Ad-hoc scope whose children are added at runtime.
    Dynamic { context: WorkflowContext },
    /// Embedded sub-scope of the process definition.
    Composite { context: WorkflowContext },
    /// External work item handed to a task handler.
    WorkItem {
        work_item_id: String,
        /// Boundary timers armed on this work item.
        timer_ids: Vec<String>,
    },
    /// Human task: a work item with the full task subtree.
    HumanTask { work_item: WorkItemPayload },
    Milestone { timer_ids: Vec<String> },
    State { timer_ids: Vec<String> },
    RuleSet {
        rule_flow_group: String,
        timer_ids: Vec<String>,
    },
    /// Event delivery deferred to a background job.
    AsyncEvent { job_id: String },
    /// Event-triggered sub-process scope.
    EventSubProcess { context: WorkflowContext },
}

impl NodeVariant {
    /// The nested scope, for the four kinds that own one.
    pub fn nested_context(&self) -> Option<&WorkflowContext> {
        match self {
            NodeVariant::ForEach { context }
            | NodeVariant::Dynamic { context }
            | NodeVariant::Composite { context }
            | NodeVariant::EventSubProcess { context } => Some(context),
            _ => None,
        }
    }
}

/// Mutually exclusive members of one choice: at most one of these node
/// instances may ultimately proceed. Order is significant.
///
/// Every id must resolve to a node instance in the same context; decode
/// enforces this.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExclusiveGroup {
    pub node_instance_ids: Vec<String>,
}

// ─── Variables ────────────────────────────────────────────────

/// A named variable binding. `value` is `None` for a present-but-null
/// binding, which is distinct from the binding being absent from the
/// scope altogether.
#[derive(Debug)]
pub struct Variable {
    pub name: String,
    pub value: Option<VariableValue>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: VariableValue) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
        }
    }

    /// A present-but-null binding.
    pub fn null(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Downcast the value, if present and of type `T`.
    pub fn value_as<T: 'static>(&self) -> Option<&T> {
        self.value.as_ref().and_then(|v| v.downcast_ref())
    }
}

// ─── Human-task work item ─────────────────────────────────────

/// Extended payload of a human-task node instance: task metadata, actor
/// sets, data, comments, attachments, and not-yet-fired deadlines.
/// Exclusively owned by its node instance.
#[derive(Debug, Default)]
pub struct WorkItemPayload {
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub reference_name: Option<String>,
    pub actual_owner: Option<String>,
    pub potential_users: BTreeSet<String>,
    pub potential_groups: BTreeSet<String>,
    pub admin_users: BTreeSet<String>,
    pub admin_groups: BTreeSet<String>,
    pub excluded_users: BTreeSet<String>,
    pub excluded_groups: BTreeSet<String>,
    pub started_at: Timestamp,
    /// Absent while the task is still open; never a sentinel.
    pub completed_at: Option<Timestamp>,
    pub parameters: Vec<Variable>,
    pub results: Vec<Variable>,
    pub comments: Vec<Comment>,
    pub attachments: Vec<Attachment>,
    /// Deadline name → not-yet-fired start deadline.
    pub start_deadlines: BTreeMap<String, Deadline>,
    /// Deadline name → not-yet-fired completion deadline.
    pub completion_deadlines: BTreeMap<String, Deadline>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub content: String,
    pub updated_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub id: String,
    pub author: String,
    /// Content URI; the codec never dereferences it.
    pub content: String,
    pub updated_at: Timestamp,
}

/// A pending escalation deadline plus the reassignment it would apply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deadline {
    /// Flattened notification content (subject, body, ...).
    pub content: BTreeMap<String, String>,
    pub reassignment: Reassignment,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reassignment {
    pub users: BTreeSet<String>,
    pub groups: BTreeSet<String>,
}
