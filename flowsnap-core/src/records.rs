//! Wire-facing record mirror of the live model.
//!
//! Records are plain serde data: variable values are already reduced to
//! tagged byte payloads, variant payloads carry their stable tag, and
//! everything is in the deterministic order the context builder produced.
//! The JSON mode serializes these directly; the binary mode walks them
//! with the hand-written wire layer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One full snapshot: cheaply inspectable header plus the root scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeRecord {
    pub header: HeaderRecord,
    pub root: ContextRecord,
}

/// Identity, lifecycle, and linkage — everything administrative tooling
/// needs without decoding the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderRecord {
    pub id: String,
    pub process_id: String,
    pub process_version: String,
    pub state: i32,
    pub start_at: i64,
    pub description: Option<String>,
    pub deployment_id: Option<String>,
    pub business_key: Option<String>,
    pub root_instance_id: Option<String>,
    pub parent_instance_id: Option<String>,
    pub completed_node_ids: Vec<String>,
    pub sla: SlaRecord,
    pub swimlanes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlaRecord {
    pub compliance: i32,
    pub due_at: Option<i64>,
    pub timer_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub node_instances: Vec<NodeInstanceRecord>,
    pub exclusive_groups: Vec<GroupRecord>,
    pub variables: Vec<VariableRecord>,
    pub iteration_levels: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInstanceRecord {
    pub id: String,
    pub node_id: String,
    pub level: u32,
    pub trigger_at: Option<i64>,
    pub sla: SlaRecord,
    #[serde(flatten)]
    pub variant: VariantRecord,
}

/// Variant payloads, tagged with the stable wire tags. The tag is always
/// interpreted before any payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum VariantRecord {
    #[serde(rename = "timer")]
    Timer { timer_id: String },
    #[serde(rename = "join")]
    Join { triggers: BTreeMap<String, u32> },
    #[serde(rename = "event")]
    Event,
    #[serde(rename = "sub-process")]
    SubProcess { child_instance_id: String },
    #[serde(rename = "for-each")]
    ForEach { context: ContextRecord },
    #[serde(rename = "dynamic")]
    Dynamic { context: ContextRecord },
    #[serde(rename = "composite")]
    Composite { context: ContextRecord },
    #[serde(rename = "work-item")]
    WorkItem {
        work_item_id: String,
        timer_ids: Vec<String>,
    },
    #[serde(rename = "human-task")]
    HumanTask { work_item: WorkItemRecord },
    #[serde(rename = "milestone")]
    Milestone { timer_ids: Vec<String> },
    #[serde(rename = "state")]
    State { timer_ids: Vec<String> },
    #[serde(rename = "rule-set")]
    RuleSet {
        rule_flow_group: String,
        timer_ids: Vec<String>,
    },
    #[serde(rename = "async-event")]
    AsyncEvent { job_id: String },
    #[serde(rename = "event-sub-process")]
    EventSubProcess { context: ContextRecord },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub node_instance_ids: Vec<String>,
}

/// One encoded variable: strategy tag plus opaque payload. `value_type`
/// is the writer-side runtime type name, carried for diagnostics only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub name: String,
    pub tag: String,
    pub value: Vec<u8>,
    pub value_type: Option<String>,
}

/// Human-task subtree. Deadline content and reassignments travel as two
/// identically-keyed maps per family and are re-paired on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkItemRecord {
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
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub parameters: Vec<VariableRecord>,
    pub results: Vec<VariableRecord>,
    pub comments: Vec<CommentRecord>,
    pub attachments: Vec<AttachmentRecord>,
    pub start_deadlines: BTreeMap<String, BTreeMap<String, String>>,
    pub start_reassignments: BTreeMap<String, ReassignmentRecord>,
    pub completion_deadlines: BTreeMap<String, BTreeMap<String, String>>,
    pub completion_reassignments: BTreeMap<String, ReassignmentRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub author: String,
    pub content: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub id: String,
    pub author: String,
    pub content: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReassignmentRecord {
    pub users: BTreeSet<String>,
    pub groups: BTreeSet<String>,
}
