//! End-to-end suspend/resume scenarios over the public API.

use flowsnap_core::{
    read, read_header, snapshot_digest, write, Attachment, CodecContext, Comment, Deadline,
    FormatMode, NodeInstance, NodeVariant, ProcessInstance, Reassignment, SlaBlock, Variable,
    VariableValue, WorkItemPayload, WorkflowContext,
};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn node(id: &str, variant: NodeVariant) -> NodeInstance {
    NodeInstance {
        id: id.to_string(),
        node_id: format!("def-{id}"),
        level: 1,
        trigger_at: None,
        sla: SlaBlock::default(),
        variant,
    }
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// One instance exercising every variant kind at once.
fn kitchen_sink() -> ProcessInstance {
    let mut pi = ProcessInstance::new("orders.approval", "7");
    pi.start_at = 1_700_000_000_000;
    pi.description = Some("approval for PO-1138".into());
    pi.business_key = Some("PO-1138".into());
    pi.parent_instance_id = Some("parent-1".into());
    pi.root_instance_id = Some("root-1".into());
    pi.completed_node_ids = vec!["start".into(), "validate".into(), "price".into()];
    pi.sla = SlaBlock {
        compliance: 1,
        due_at: Some(1_700_003_600_000),
        timer_id: Some("sla-1".into()),
    };
    pi.swimlanes.insert("approver".into(), "alice".into());
    pi.swimlanes.insert("auditor".into(), "carol".into());

    let inner = WorkflowContext {
        node_instances: vec![node(
            "inner-1",
            NodeVariant::Timer {
                timer_id: "t-inner".into(),
            },
        )],
        variables: vec![Variable::new("attempt", VariableValue::new(2i64))],
        iteration_levels: BTreeMap::from([("inner-loop".to_string(), 2u32)]),
        ..Default::default()
    };

    pi.root.node_instances = vec![
        node(
            "n01",
            NodeVariant::Timer {
                timer_id: "t1".into(),
            },
        ),
        node(
            "n02",
            NodeVariant::Join {
                triggers: BTreeMap::from([("branch-a".to_string(), 1u32), ("branch-b".into(), 2)]),
            },
        ),
        node("n03", NodeVariant::Event),
        node(
            "n04",
            NodeVariant::SubProcess {
                child_instance_id: "child-77".into(),
            },
        ),
        node(
            "n05",
            NodeVariant::Composite { context: inner },
        ),
        node(
            "n06",
            NodeVariant::WorkItem {
                work_item_id: "wi-5".into(),
                timer_ids: vec!["bt-1".into()],
            },
        ),
        node(
            "n07",
            NodeVariant::Milestone {
                timer_ids: vec!["m-1".into()],
            },
        ),
        node("n08", NodeVariant::State { timer_ids: vec![] }),
        node(
            "n09",
            NodeVariant::RuleSet {
                rule_flow_group: "pricing".into(),
                timer_ids: vec![],
            },
        ),
        node(
            "n10",
            NodeVariant::AsyncEvent {
                job_id: "job-9".into(),
            },
        ),
        node(
            "n11",
            NodeVariant::EventSubProcess {
                context: WorkflowContext::default(),
            },
        ),
        node(
            "n12",
            NodeVariant::ForEach {
                context: WorkflowContext::default(),
            },
        ),
        node(
            "n13",
            NodeVariant::Dynamic {
                context: WorkflowContext::default(),
            },
        ),
        node("n14", NodeVariant::HumanTask {
            work_item: review_task(),
        }),
    ];
    pi.root.exclusive_groups = vec![flowsnap_core::ExclusiveGroup {
        node_instance_ids: vec!["n03".into(), "n01".into()],
    }];
    pi.root.variables = vec![
        Variable::new("total", VariableValue::new(1250i64)),
        Variable::new("customer", VariableValue::new("ACME".to_string())),
        Variable::null("discount"),
    ];
    pi.root.iteration_levels.insert("retry".into(), 1);
    pi
}

fn review_task() -> WorkItemPayload {
    WorkItemPayload {
        name: "review-order".into(),
        description: Some("second-line review".into()),
        priority: Some(2),
        reference_name: Some("review-form".into()),
        actual_owner: Some("alice".into()),
        potential_users: set(&["alice", "bob"]),
        potential_groups: set(&["reviewers"]),
        admin_users: set(&["root"]),
        excluded_users: set(&["mallory"]),
        started_at: 1_700_000_060_000,
        completed_at: None,
        parameters: vec![Variable::new("order", VariableValue::new("PO-1138".to_string()))],
        comments: vec![
            Comment {
                id: "c1".into(),
                author: "alice".into(),
                content: "needs a second look".into(),
                updated_at: 1_700_000_100_000,
            },
            Comment {
                id: "c2".into(),
                author: "bob".into(),
                content: "checked the totals".into(),
                updated_at: 1_700_000_200_000,
            },
        ],
        attachments: vec![Attachment {
            id: "a1".into(),
            author: "alice".into(),
            content: "file:///doc.pdf".into(),
            updated_at: 1_700_000_150_000,
        }],
        start_deadlines: BTreeMap::from([(
            "notify-manager".to_string(),
            Deadline {
                content: BTreeMap::from([("subject".to_string(), "review overdue".to_string())]),
                reassignment: Reassignment {
                    users: set(&["bob"]),
                    groups: BTreeSet::new(),
                },
            },
        )]),
        ..Default::default()
    }
}

#[test]
fn every_variant_round_trips_through_binary() {
    let ctx = CodecContext::standard();
    let pi = kitchen_sink();

    let bytes = write(&ctx, &pi).unwrap();
    let back = read(&ctx, &bytes).unwrap();

    // Re-encoding the decoded instance reproduces the exact bytes:
    // round-trip identity under the deterministic encoding.
    assert_eq!(write(&ctx, &back).unwrap(), bytes);

    assert_eq!(back.root.node_instances.len(), 14);
    for ni in &back.root.node_instances {
        assert!(pi.root.find_node_instance(&ni.id).is_some());
    }
    assert_eq!(back.completed_node_ids, pi.completed_node_ids);
    assert_eq!(back.sla, pi.sla);
}

#[test]
fn every_variant_round_trips_through_json() {
    let ctx = CodecContext::standard().with_mode(FormatMode::Json);
    let pi = kitchen_sink();

    let bytes = write(&ctx, &pi).unwrap();
    let back = read(&ctx, &bytes).unwrap();
    assert_eq!(write(&ctx, &back).unwrap(), bytes);
}

#[test]
fn encoding_is_deterministic_and_insertion_order_free() {
    let ctx = CodecContext::standard();
    let pi = kitchen_sink();
    let first = write(&ctx, &pi).unwrap();
    let second = write(&ctx, &pi).unwrap();
    assert_eq!(first, second);
    assert_eq!(snapshot_digest(&first), snapshot_digest(&second));

    // Same state with children and variables in a different live order
    // produces the same bytes.
    let mut shuffled = kitchen_sink();
    shuffled.id = pi.id.clone();
    shuffled.root.node_instances.reverse();
    shuffled.root.variables.reverse();
    assert_eq!(write(&ctx, &shuffled).unwrap(), first);
}

#[test]
fn present_but_null_variable_stays_distinct_from_absent() {
    let ctx = CodecContext::standard();
    let mut pi = ProcessInstance::new("p", "1");
    pi.root.variables = vec![Variable::null("discount")];

    let back = read(&ctx, &write(&ctx, &pi).unwrap()).unwrap();
    let discount = back.root.variable("discount").unwrap();
    assert!(discount.value.is_none());
    assert!(back.root.variable("missing").is_none());
}

#[test]
fn five_levels_of_nesting_survive() {
    fn scoped(depth: u32, inner: WorkflowContext) -> WorkflowContext {
        // Wrap `inner` one level deeper; the caller picks the variant.
        let mut ctx = inner;
        ctx.variables
            .push(Variable::new("depth", VariableValue::new(i64::from(depth))));
        ctx.iteration_levels.insert(format!("scope-{depth}"), depth);
        ctx
    }

    // Innermost scope first, then wrap outwards so the node-kind chain
    // from the root reads composite → for-each → composite → dynamic →
    // composite.
    let wraps: [fn(WorkflowContext) -> NodeVariant; 5] = [
        |c| NodeVariant::Composite { context: c },
        |c| NodeVariant::Dynamic { context: c },
        |c| NodeVariant::Composite { context: c },
        |c| NodeVariant::ForEach { context: c },
        |c| NodeVariant::Composite { context: c },
    ];

    let mut tree = scoped(6, WorkflowContext::default());
    for (i, make) in wraps.into_iter().enumerate() {
        let depth = 5 - i as u32;
        tree = scoped(
            depth,
            WorkflowContext {
                node_instances: vec![node(&format!("nest-{depth}"), make(tree))],
                ..Default::default()
            },
        );
    }

    let mut pi = ProcessInstance::new("deep", "1");
    pi.root = tree;

    let codec = CodecContext::standard();
    let back = read(&codec, &write(&codec, &pi).unwrap()).unwrap();

    let expected_kinds = ["composite", "for-each", "composite", "dynamic", "composite"];
    let mut scope = &back.root;
    for depth in 1..=6u32 {
        assert_eq!(
            scope.variable("depth").unwrap().value_as::<i64>(),
            Some(&i64::from(depth)),
            "variables at depth {depth}"
        );
        assert_eq!(scope.iteration_levels[&format!("scope-{depth}")], depth);
        if depth < 6 {
            let child = &scope.node_instances[0];
            assert_eq!(child.variant.tag(), expected_kinds[depth as usize - 1]);
            scope = child.variant.nested_context().unwrap();
        }
    }
}

#[test]
fn human_task_scenario() {
    let ctx = CodecContext::standard();
    let mut pi = ProcessInstance::new("orders.approval", "7");
    pi.root.node_instances = vec![node(
        "task-1",
        NodeVariant::HumanTask {
            work_item: review_task(),
        },
    )];

    let back = read(&ctx, &write(&ctx, &pi).unwrap()).unwrap();
    let NodeVariant::HumanTask { work_item } = &back.root.node_instances[0].variant else {
        panic!("expected a human task");
    };

    let comment_ids: Vec<&str> = work_item.comments.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(comment_ids, ["c1", "c2"]);
    assert_eq!(work_item.attachments.len(), 1);
    assert_eq!(work_item.attachments[0].content, "file:///doc.pdf");

    let deadline = &work_item.start_deadlines["notify-manager"];
    assert_eq!(deadline.reassignment.users, set(&["bob"]));
    assert_eq!(work_item.completed_at, None, "open task stays open");
}

#[test]
fn header_is_inspectable_without_the_body() {
    let ctx = CodecContext::standard();
    let pi = kitchen_sink();
    let bytes = write(&ctx, &pi).unwrap();

    let head = read_header(&ctx, &bytes).unwrap();
    assert_eq!(head.id, pi.id);
    assert_eq!(head.process_id, "orders.approval");
    assert_eq!(head.business_key.as_deref(), Some("PO-1138"));
    assert_eq!(head.swimlanes["auditor"], "carol");
}

proptest! {
    #[test]
    fn primitive_variables_round_trip(n in any::<i64>(), f in any::<f64>(), s in ".*", b in any::<bool>()) {
        let ctx = CodecContext::standard();
        let mut pi = ProcessInstance::new("p", "1");
        pi.root.variables = vec![
            Variable::new("n", VariableValue::new(n)),
            Variable::new("f", VariableValue::new(f)),
            Variable::new("s", VariableValue::new(s.clone())),
            Variable::new("b", VariableValue::new(b)),
        ];

        let back = read(&ctx, &write(&ctx, &pi).unwrap()).unwrap();
        prop_assert_eq!(back.root.variable("n").unwrap().value_as::<i64>(), Some(&n));
        prop_assert_eq!(back.root.variable("s").unwrap().value_as::<String>(), Some(&s));
        prop_assert_eq!(back.root.variable("b").unwrap().value_as::<bool>(), Some(&b));
        let f_back = *back.root.variable("f").unwrap().value_as::<f64>().unwrap();
        prop_assert_eq!(f_back.to_bits(), f.to_bits());
    }
}
