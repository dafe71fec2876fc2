//! Recursive encode/decode of one workflow scope.
//!
//! Write sorts node instances by instance id and variables by name before
//! encoding so that identical state always produces identical records
//! (and, downstream, identical bytes — snapshots stay diffable and test
//! fixtures stable). Iteration levels live in a BTreeMap and are ordered
//! already.
//!
//! Read rebuilds children first and resolves exclusive-group membership
//! last, against the children just attached, so a group naming a missing
//! instance fails fast instead of materializing a dangling reference.

use crate::error::{CodecError, Result};
use crate::records::{ContextRecord, GroupRecord, NodeInstanceRecord, SlaRecord};
use crate::types::{ExclusiveGroup, NodeInstance, SlaBlock, Variable, WorkflowContext};
use crate::value::StrategyRegistry;
use crate::variant;

pub(crate) fn write_sla(sla: &SlaBlock) -> SlaRecord {
    SlaRecord {
        compliance: sla.compliance,
        due_at: sla.due_at,
        timer_id: sla.timer_id.clone(),
    }
}

pub(crate) fn read_sla(record: SlaRecord) -> SlaBlock {
    SlaBlock {
        compliance: record.compliance,
        due_at: record.due_at,
        timer_id: record.timer_id,
    }
}

pub(crate) fn write_node_instance(
    ni: &NodeInstance,
    strategies: &StrategyRegistry,
) -> Result<NodeInstanceRecord> {
    Ok(NodeInstanceRecord {
        id: ni.id.clone(),
        node_id: ni.node_id.clone(),
        level: ni.level,
        trigger_at: ni.trigger_at,
        sla: write_sla(&ni.sla),
        variant: variant::write_variant(&ni.variant, strategies)?,
    })
}

pub(crate) fn read_node_instance(
    record: NodeInstanceRecord,
    strategies: &StrategyRegistry,
) -> Result<NodeInstance> {
    if record.id.is_empty() {
        return Err(CodecError::MalformedEnvelope(
            "node instance with empty id".to_string(),
        ));
    }
    Ok(NodeInstance {
        id: record.id,
        node_id: record.node_id,
        level: record.level,
        trigger_at: record.trigger_at,
        sla: read_sla(record.sla),
        variant: variant::read_variant(record.variant, strategies)?,
    })
}

pub(crate) fn write_variables(
    variables: &[Variable],
    strategies: &StrategyRegistry,
) -> Result<Vec<crate::records::VariableRecord>> {
    let mut sorted: Vec<&Variable> = variables.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted
        .into_iter()
        .map(|v| strategies.encode_variable(v))
        .collect()
}

pub(crate) fn read_variables(
    records: &[crate::records::VariableRecord],
    strategies: &StrategyRegistry,
) -> Result<Vec<Variable>> {
    records
        .iter()
        .map(|r| strategies.decode_variable(r))
        .collect()
}

/// Encode one scope. Children are recursed into via the variant layer.
pub(crate) fn write_context(
    ctx: &WorkflowContext,
    strategies: &StrategyRegistry,
) -> Result<ContextRecord> {
    let mut children: Vec<&NodeInstance> = ctx.node_instances.iter().collect();
    children.sort_by(|a, b| a.id.cmp(&b.id));

    let node_instances = children
        .into_iter()
        .map(|ni| write_node_instance(ni, strategies))
        .collect::<Result<Vec<_>>>()?;

    let exclusive_groups = ctx
        .exclusive_groups
        .iter()
        .map(|g| GroupRecord {
            node_instance_ids: g.node_instance_ids.clone(),
        })
        .collect();

    Ok(ContextRecord {
        node_instances,
        exclusive_groups,
        variables: write_variables(&ctx.variables, strategies)?,
        iteration_levels: ctx.iteration_levels.clone(),
    })
}

/// Decode one scope: children first, then variables and counters, then
/// group resolution against the freshly attached children.
pub(crate) fn read_context(
    record: ContextRecord,
    strategies: &StrategyRegistry,
) -> Result<WorkflowContext> {
    let mut ctx = WorkflowContext::default();

    for nir in record.node_instances {
        let child = read_node_instance(nir, strategies)?;
        ctx.node_instances.push(child);
    }

    ctx.variables = read_variables(&record.variables, strategies)?;
    ctx.iteration_levels = record.iteration_levels;

    for group in record.exclusive_groups {
        for id in &group.node_instance_ids {
            if !ctx.node_instances.iter().any(|ni| ni.id == *id) {
                return Err(CodecError::DanglingGroupReference { id: id.clone() });
            }
        }
        ctx.exclusive_groups.push(ExclusiveGroup {
            node_instance_ids: group.node_instance_ids,
        });
    }

    Ok(ctx)
}
