//! Human-task work-item subtree codec.
//!
//! Optional scalars are presence-qualified end to end: an absent
//! priority, description, reference name, owner, or completion timestamp
//! is omitted, never written as a sentinel, and decodes back to absent.
//!
//! Each deadline family (start, completion) travels as two maps keyed by
//! deadline name — the flattened notification content and the
//! reassignment targets — and is re-paired by key on read. The two maps
//! are written from one paired structure, so a key present in only one
//! of them is corrupt input and fails the decode.
//!
//! Parameter and result sequences keep their live order; only scope
//! variables are sorted before encoding.

use crate::context::read_variables;
use crate::error::{CodecError, Result};
use crate::records::{
    AttachmentRecord, CommentRecord, ReassignmentRecord, VariableRecord, WorkItemRecord,
};
use crate::types::{Attachment, Comment, Deadline, Reassignment, Variable, WorkItemPayload};
use crate::value::StrategyRegistry;
use std::collections::BTreeMap;

type DeadlineMaps = (
    BTreeMap<String, BTreeMap<String, String>>,
    BTreeMap<String, ReassignmentRecord>,
);

fn split_deadlines(deadlines: &BTreeMap<String, Deadline>) -> DeadlineMaps {
    let mut contents = BTreeMap::new();
    let mut reassignments = BTreeMap::new();
    for (key, deadline) in deadlines {
        contents.insert(key.clone(), deadline.content.clone());
        reassignments.insert(
            key.clone(),
            ReassignmentRecord {
                users: deadline.reassignment.users.clone(),
                groups: deadline.reassignment.groups.clone(),
            },
        );
    }
    (contents, reassignments)
}

fn pair_deadlines(
    family: &str,
    contents: BTreeMap<String, BTreeMap<String, String>>,
    mut reassignments: BTreeMap<String, ReassignmentRecord>,
) -> Result<BTreeMap<String, Deadline>> {
    let mut deadlines = BTreeMap::new();
    for (key, content) in contents {
        let Some(r) = reassignments.remove(&key) else {
            return Err(CodecError::MalformedEnvelope(format!(
                "{family} deadline {key:?} has no matching reassignment"
            )));
        };
        deadlines.insert(key, Deadline {
            content,
            reassignment: Reassignment {
                users: r.users,
                groups: r.groups,
            },
        });
    }
    if let Some(orphan) = reassignments.keys().next() {
        return Err(CodecError::MalformedEnvelope(format!(
            "{family} reassignment {orphan:?} has no matching deadline"
        )));
    }
    Ok(deadlines)
}

/// Parameter and result sequences are positional; their live order is
/// the deterministic order, unlike scope variables.
fn encode_in_order(
    variables: &[Variable],
    strategies: &StrategyRegistry,
) -> Result<Vec<VariableRecord>> {
    variables
        .iter()
        .map(|v| strategies.encode_variable(v))
        .collect()
}

pub(crate) fn write_work_item(
    wi: &WorkItemPayload,
    strategies: &StrategyRegistry,
) -> Result<WorkItemRecord> {
    let (start_deadlines, start_reassignments) = split_deadlines(&wi.start_deadlines);
    let (completion_deadlines, completion_reassignments) =
        split_deadlines(&wi.completion_deadlines);

    Ok(WorkItemRecord {
        name: wi.name.clone(),
        description: wi.description.clone(),
        priority: wi.priority,
        reference_name: wi.reference_name.clone(),
        actual_owner: wi.actual_owner.clone(),
        potential_users: wi.potential_users.clone(),
        potential_groups: wi.potential_groups.clone(),
        admin_users: wi.admin_users.clone(),
        admin_groups: wi.admin_groups.clone(),
        excluded_users: wi.excluded_users.clone(),
        excluded_groups: wi.excluded_groups.clone(),
        started_at: wi.started_at,
        completed_at: wi.completed_at,
        parameters: encode_in_order(&wi.parameters, strategies)?,
        results: encode_in_order(&wi.results, strategies)?,
        comments: wi
            .comments
            .iter()
            .map(|c| CommentRecord {
                id: c.id.clone(),
                author: c.author.clone(),
                content: c.content.clone(),
                updated_at: c.updated_at,
            })
            .collect(),
        attachments: wi
            .attachments
            .iter()
            .map(|a| AttachmentRecord {
                id: a.id.clone(),
                author: a.author.clone(),
                content: a.content.clone(),
                updated_at: a.updated_at,
            })
            .collect(),
        start_deadlines,
        start_reassignments,
        completion_deadlines,
        completion_reassignments,
    })
}

pub(crate) fn read_work_item(
    record: WorkItemRecord,
    strategies: &StrategyRegistry,
) -> Result<WorkItemPayload> {
    Ok(WorkItemPayload {
        name: record.name,
        description: record.description,
        priority: record.priority,
        reference_name: record.reference_name,
        actual_owner: record.actual_owner,
        potential_users: record.potential_users,
        potential_groups: record.potential_groups,
        admin_users: record.admin_users,
        admin_groups: record.admin_groups,
        excluded_users: record.excluded_users,
        excluded_groups: record.excluded_groups,
        started_at: record.started_at,
        completed_at: record.completed_at,
        parameters: read_variables(&record.parameters, strategies)?,
        results: read_variables(&record.results, strategies)?,
        comments: record
            .comments
            .into_iter()
            .map(|c| Comment {
                id: c.id,
                author: c.author,
                content: c.content,
                updated_at: c.updated_at,
            })
            .collect(),
        attachments: record
            .attachments
            .into_iter()
            .map(|a| Attachment {
                id: a.id,
                author: a.author,
                content: a.content,
                updated_at: a.updated_at,
            })
            .collect(),
        start_deadlines: pair_deadlines(
            "start",
            record.start_deadlines,
            record.start_reassignments,
        )?,
        completion_deadlines: pair_deadlines(
            "completion",
            record.completion_deadlines,
            record.completion_reassignments,
        )?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Variable;
    use crate::value::VariableValue;
    use std::collections::BTreeSet;

    fn users(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn roundtrip(wi: &WorkItemPayload) -> WorkItemPayload {
        let reg = StrategyRegistry::standard();
        read_work_item(write_work_item(wi, &reg).unwrap(), &reg).unwrap()
    }

    #[test]
    fn open_task_keeps_completion_absent() {
        let wi = WorkItemPayload {
            name: "review-order".into(),
            started_at: 1_700_000_000_000,
            completed_at: None,
            ..Default::default()
        };
        let back = roundtrip(&wi);
        assert_eq!(back.completed_at, None);
        assert_eq!(back.started_at, 1_700_000_000_000);
    }

    #[test]
    fn optional_scalars_distinguish_absent_from_empty() {
        let absent = roundtrip(&WorkItemPayload {
            name: "t".into(),
            description: None,
            ..Default::default()
        });
        assert_eq!(absent.description, None);

        let empty = roundtrip(&WorkItemPayload {
            name: "t".into(),
            description: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(empty.description, Some(String::new()));
    }

    #[test]
    fn actor_sets_and_data_round_trip() {
        let wi = WorkItemPayload {
            name: "approve".into(),
            priority: Some(3),
            reference_name: Some("approve-form".into()),
            actual_owner: Some("alice".into()),
            potential_users: users(&["alice", "bob"]),
            excluded_users: users(&["mallory"]),
            admin_groups: users(&["supervisors"]),
            parameters: vec![Variable::new("amount", VariableValue::new(120i64))],
            results: vec![Variable::null("decision")],
            ..Default::default()
        };

        let back = roundtrip(&wi);
        assert_eq!(back.priority, Some(3));
        assert_eq!(back.actual_owner.as_deref(), Some("alice"));
        assert_eq!(back.potential_users, users(&["alice", "bob"]));
        assert_eq!(back.excluded_users, users(&["mallory"]));
        assert_eq!(back.admin_groups, users(&["supervisors"]));
        assert_eq!(back.parameters[0].value_as::<i64>(), Some(&120));
        assert!(back.results[0].value.is_none());
    }

    #[test]
    fn deadlines_re_pair_by_key() {
        let wi = WorkItemPayload {
            name: "t".into(),
            start_deadlines: BTreeMap::from([(
                "notify-manager".to_string(),
                Deadline {
                    content: BTreeMap::from([("subject".to_string(), "overdue".to_string())]),
                    reassignment: Reassignment {
                        users: users(&["bob"]),
                        groups: BTreeSet::new(),
                    },
                },
            )]),
            completion_deadlines: BTreeMap::from([(
                "escalate".to_string(),
                Deadline::default(),
            )]),
            ..Default::default()
        };

        let back = roundtrip(&wi);
        let dl = &back.start_deadlines["notify-manager"];
        assert_eq!(dl.content["subject"], "overdue");
        assert_eq!(dl.reassignment.users, users(&["bob"]));
        assert!(back.completion_deadlines.contains_key("escalate"));
    }

    #[test]
    fn parameters_and_results_keep_given_order() {
        let wi = WorkItemPayload {
            name: "t".into(),
            parameters: vec![
                Variable::new("zeta", VariableValue::new(1i64)),
                Variable::new("alpha", VariableValue::new(2i64)),
            ],
            results: vec![
                Variable::new("second", VariableValue::new("b".to_string())),
                Variable::new("first", VariableValue::new("a".to_string())),
            ],
            ..Default::default()
        };

        let back = roundtrip(&wi);
        let params: Vec<&str> = back.parameters.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(params, ["zeta", "alpha"]);
        let results: Vec<&str> = back.results.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(results, ["second", "first"]);
    }

    #[test]
    fn deadline_without_reassignment_is_malformed() {
        let wi = WorkItemPayload {
            name: "t".into(),
            start_deadlines: BTreeMap::from([(
                "notify-manager".to_string(),
                Deadline {
                    content: BTreeMap::new(),
                    reassignment: Reassignment {
                        users: users(&["bob"]),
                        groups: BTreeSet::new(),
                    },
                },
            )]),
            ..Default::default()
        };
        let mut record = write_work_item(&wi, &StrategyRegistry::standard()).unwrap();
        // Dropping one side of the pair is corruption, not an empty
        // reassignment: the targets must not vanish silently.
        record.start_reassignments.remove("notify-manager");

        assert!(matches!(
            read_work_item(record, &StrategyRegistry::standard()),
            Err(CodecError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn orphan_reassignment_is_malformed() {
        let mut record = write_work_item(
            &WorkItemPayload {
                name: "t".into(),
                ..Default::default()
            },
            &StrategyRegistry::standard(),
        )
        .unwrap();
        record.start_reassignments.insert(
            "ghost".into(),
            ReassignmentRecord {
                users: users(&["bob"]),
                groups: BTreeSet::new(),
            },
        );

        assert!(matches!(
            read_work_item(record, &StrategyRegistry::standard()),
            Err(CodecError::MalformedEnvelope(_))
        ));
    }
}
