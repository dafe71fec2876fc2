//! Node-instance variant dispatch.
//!
//! The variant set is closed: dispatch on write is an exhaustive match on
//! the live enum, dispatch on read is keyed by the stable tag stored in
//! the payload. A tag outside [`KNOWN_TAGS`] is a hard decode error —
//! forward compatibility comes from the envelope version, never from
//! skipping state we cannot interpret.

use crate::context;
use crate::error::Result;
use crate::records::VariantRecord;
use crate::types::NodeVariant;
use crate::value::StrategyRegistry;
use crate::workitem;

pub const TAG_TIMER: &str = "timer";
pub const TAG_JOIN: &str = "join";
pub const TAG_EVENT: &str = "event";
pub const TAG_SUB_PROCESS: &str = "sub-process";
pub const TAG_FOR_EACH: &str = "for-each";
pub const TAG_DYNAMIC: &str = "dynamic";
pub const TAG_COMPOSITE: &str = "composite";
pub const TAG_WORK_ITEM: &str = "work-item";
pub const TAG_HUMAN_TASK: &str = "human-task";
pub const TAG_MILESTONE: &str = "milestone";
pub const TAG_STATE: &str = "state";
pub const TAG_RULE_SET: &str = "rule-set";
pub const TAG_ASYNC_EVENT: &str = "async-event";
pub const TAG_EVENT_SUB_PROCESS: &str = "event-sub-process";

/// Every tag the current format version can decode.
pub const KNOWN_TAGS: [&str; 14] = [
    TAG_TIMER,
    TAG_JOIN,
    TAG_EVENT,
    TAG_SUB_PROCESS,
    TAG_FOR_EACH,
    TAG_DYNAMIC,
    TAG_COMPOSITE,
    TAG_WORK_ITEM,
    TAG_HUMAN_TASK,
    TAG_MILESTONE,
    TAG_STATE,
    TAG_RULE_SET,
    TAG_ASYNC_EVENT,
    TAG_EVENT_SUB_PROCESS,
];

impl NodeVariant {
    /// The stable wire tag for this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeVariant::Timer { .. } => TAG_TIMER,
            NodeVariant::Join { .. } => TAG_JOIN,
            NodeVariant::Event => TAG_EVENT,
            NodeVariant::SubProcess { .. } => TAG_SUB_PROCESS,
            NodeVariant::ForEach { .. } => TAG_FOR_EACH,
            NodeVariant::Dynamic { .. } => TAG_DYNAMIC,
            NodeVariant::Composite { .. } => TAG_COMPOSITE,
            NodeVariant::WorkItem { .. } => TAG_WORK_ITEM,
            NodeVariant::HumanTask { .. } => TAG_HUMAN_TASK,
            NodeVariant::Milestone { .. } => TAG_MILESTONE,
            NodeVariant::State { .. } => TAG_STATE,
            NodeVariant::RuleSet { .. } => TAG_RULE_SET,
            NodeVariant::AsyncEvent { .. } => TAG_ASYNC_EVENT,
            NodeVariant::EventSubProcess { .. } => TAG_EVENT_SUB_PROCESS,
        }
    }
}

impl VariantRecord {
    pub fn tag(&self) -> &'static str {
        match self {
            VariantRecord::Timer { .. } => TAG_TIMER,
            VariantRecord::Join { .. } => TAG_JOIN,
            VariantRecord::Event => TAG_EVENT,
            VariantRecord::SubProcess { .. } => TAG_SUB_PROCESS,
            VariantRecord::ForEach { .. } => TAG_FOR_EACH,
            VariantRecord::Dynamic { .. } => TAG_DYNAMIC,
            VariantRecord::Composite { .. } => TAG_COMPOSITE,
            VariantRecord::WorkItem { .. } => TAG_WORK_ITEM,
            VariantRecord::HumanTask { .. } => TAG_HUMAN_TASK,
            VariantRecord::Milestone { .. } => TAG_MILESTONE,
            VariantRecord::State { .. } => TAG_STATE,
            VariantRecord::RuleSet { .. } => TAG_RULE_SET,
            VariantRecord::AsyncEvent { .. } => TAG_ASYNC_EVENT,
            VariantRecord::EventSubProcess { .. } => TAG_EVENT_SUB_PROCESS,
        }
    }
}

/// Reduce a live variant payload to its record. The four context-bearing
/// kinds recurse through the composite context builder.
pub(crate) fn write_variant(
    variant: &NodeVariant,
    strategies: &StrategyRegistry,
) -> Result<VariantRecord> {
    Ok(match variant {
        NodeVariant::Timer { timer_id } => VariantRecord::Timer {
            timer_id: timer_id.clone(),
        },
        NodeVariant::Join { triggers } => VariantRecord::Join {
            triggers: triggers.clone(),
        },
        NodeVariant::Event => VariantRecord::Event,
        NodeVariant::SubProcess { child_instance_id } => VariantRecord::SubProcess {
            child_instance_id: child_instance_id.clone(),
        },
        NodeVariant::ForEach { context: ctx } => VariantRecord::ForEach {
            context: context::write_context(ctx, strategies)?,
        },
        NodeVariant::Dynamic { context: ctx } => VariantRecord::Dynamic {
            context: context::write_context(ctx, strategies)?,
        },
        NodeVariant::Composite { context: ctx } => VariantRecord::Composite {
            context: context::write_context(ctx, strategies)?,
        },
        NodeVariant::WorkItem {
            work_item_id,
            timer_ids,
        } => VariantRecord::WorkItem {
            work_item_id: work_item_id.clone(),
            timer_ids: timer_ids.clone(),
        },
        NodeVariant::HumanTask { work_item } => VariantRecord::HumanTask {
            work_item: workitem::write_work_item(work_item, strategies)?,
        },
        NodeVariant::Milestone { timer_ids } => VariantRecord::Milestone {
            timer_ids: timer_ids.clone(),
        },
        NodeVariant::State { timer_ids } => VariantRecord::State {
            timer_ids: timer_ids.clone(),
        },
        NodeVariant::RuleSet {
            rule_flow_group,
            timer_ids,
        } => VariantRecord::RuleSet {
            rule_flow_group: rule_flow_group.clone(),
            timer_ids: timer_ids.clone(),
        },
        NodeVariant::AsyncEvent { job_id } => VariantRecord::AsyncEvent {
            job_id: job_id.clone(),
        },
        NodeVariant::EventSubProcess { context: ctx } => VariantRecord::EventSubProcess {
            context: context::write_context(ctx, strategies)?,
        },
    })
}

/// Rebuild a live variant from its record.
pub(crate) fn read_variant(
    record: VariantRecord,
    strategies: &StrategyRegistry,
) -> Result<NodeVariant> {
    Ok(match record {
        VariantRecord::Timer { timer_id } => NodeVariant::Timer { timer_id },
        VariantRecord::Join { triggers } => NodeVariant::Join { triggers },
        VariantRecord::Event => NodeVariant::Event,
        VariantRecord::SubProcess { child_instance_id } => {
            NodeVariant::SubProcess { child_instance_id }
        }
        VariantRecord::ForEach { context: rec } => NodeVariant::ForEach {
            context: context::read_context(rec, strategies)?,
        },
        VariantRecord::Dynamic { context: rec } => NodeVariant::Dynamic {
            context: context::read_context(rec, strategies)?,
        },
        VariantRecord::Composite { context: rec } => NodeVariant::Composite {
            context: context::read_context(rec, strategies)?,
        },
        VariantRecord::WorkItem {
            work_item_id,
            timer_ids,
        } => NodeVariant::WorkItem {
            work_item_id,
            timer_ids,
        },
        VariantRecord::HumanTask { work_item } => NodeVariant::HumanTask {
            work_item: workitem::read_work_item(work_item, strategies)?,
        },
        VariantRecord::Milestone { timer_ids } => NodeVariant::Milestone { timer_ids },
        VariantRecord::State { timer_ids } => NodeVariant::State { timer_ids },
        VariantRecord::RuleSet {
            rule_flow_group,
            timer_ids,
        } => NodeVariant::RuleSet {
            rule_flow_group,
            timer_ids,
        },
        VariantRecord::AsyncEvent { job_id } => NodeVariant::AsyncEvent { job_id },
        VariantRecord::EventSubProcess { context: rec } => NodeVariant::EventSubProcess {
            context: context::read_context(rec, strategies)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkflowContext;
    use std::collections::BTreeMap;

    #[test]
    fn known_tags_are_distinct() {
        let mut tags = KNOWN_TAGS.to_vec();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), KNOWN_TAGS.len());
    }

    #[test]
    fn live_and_record_tags_agree() {
        let reg = StrategyRegistry::standard();
        let variants = vec![
            NodeVariant::Timer {
                timer_id: "t".into(),
            },
            NodeVariant::Join {
                triggers: BTreeMap::from([("b1".to_string(), 1u32)]),
            },
            NodeVariant::Event,
            NodeVariant::SubProcess {
                child_instance_id: "child".into(),
            },
            NodeVariant::ForEach {
                context: WorkflowContext::default(),
            },
            NodeVariant::Dynamic {
                context: WorkflowContext::default(),
            },
            NodeVariant::Composite {
                context: WorkflowContext::default(),
            },
            NodeVariant::WorkItem {
                work_item_id: "wi".into(),
                timer_ids: vec![],
            },
            NodeVariant::HumanTask {
                work_item: Default::default(),
            },
            NodeVariant::Milestone { timer_ids: vec![] },
            NodeVariant::State { timer_ids: vec![] },
            NodeVariant::RuleSet {
                rule_flow_group: "g".into(),
                timer_ids: vec![],
            },
            NodeVariant::AsyncEvent { job_id: "j".into() },
            NodeVariant::EventSubProcess {
                context: WorkflowContext::default(),
            },
        ];

        assert_eq!(variants.len(), KNOWN_TAGS.len());
        for variant in &variants {
            let record = write_variant(variant, &reg).unwrap();
            assert_eq!(variant.tag(), record.tag());
            assert!(KNOWN_TAGS.contains(&variant.tag()));

            let back = read_variant(record, &reg).unwrap();
            assert_eq!(back.tag(), variant.tag());
        }
    }
}
