//! Integration tests for context-sensitive control flow graph recovery.
//!
//! These tests drive the whole public surface — project, cache, builder,
//! graph queries, and persistence — over small scripted programs.

mod common;

use std::sync::Arc;

use binflow::{cfg::CfgBuilder, prelude::*};
use common::{addr, ScriptedLifter};

/// Two functions calling into a shared chain: entry points 0x1000 and
/// 0x2000 both call f (0x3000), which calls g (0x4000).
fn shared_chain() -> ScriptedLifter {
    let mut lifter = ScriptedLifter::new();
    lifter.block(0x1000, &[(0x3000, JumpKind::Call)]);
    lifter.block(0x2000, &[(0x3000, JumpKind::Call)]);
    lifter.block(0x3000, &[(0x4000, JumpKind::Call)]);
    lifter.exit(0x4000);
    lifter
}

fn recover(lifter: &ScriptedLifter, options: CfgOptions) -> CfgAnalysis {
    CfgAnalysis::new(lifter, options).expect("recovery failed")
}

/// Raising the context level only ever splits nodes, never merges them.
#[test]
fn test_node_count_grows_with_context_level() {
    let lifter = shared_chain();
    let counts: Vec<usize> = (0..=2)
        .map(|level| {
            recover(
                &lifter,
                CfgOptions::new()
                    .with_starts([addr(0x1000), addr(0x2000)])
                    .with_context_sensitivity(level),
            )
            .graph()
            .node_count()
        })
        .collect();

    assert_eq!(counts, vec![4, 5, 6]);
    assert!(counts.windows(2).all(|pair| pair[0] <= pair[1]));
}

/// At level 0 every call string is empty and addresses map to single nodes.
#[test]
fn test_level_zero_is_context_free() {
    let lifter = shared_chain();
    let analysis = recover(
        &lifter,
        CfgOptions::new()
            .with_starts([addr(0x1000), addr(0x2000)])
            .with_context_sensitivity(0),
    );
    let graph = analysis.graph();

    for (_, node) in graph.nodes() {
        assert!(node.call_string().is_empty());
        assert_eq!(graph.all_nodes(node.address()).len(), 1);
    }
}

/// At level 2 the innermost callee remembers both callers in order.
#[test]
fn test_deep_contexts_keep_caller_history() {
    let lifter = shared_chain();
    let analysis = recover(
        &lifter,
        CfgOptions::new()
            .with_starts([addr(0x1000), addr(0x2000)])
            .with_context_sensitivity(2),
    );
    let graph = analysis.graph();

    let variants = graph.all_nodes(addr(0x4000));
    assert_eq!(variants.len(), 2);

    let expected_a = CallString::from_callers([addr(0x1000), addr(0x3000)]);
    let expected_b = CallString::from_callers([addr(0x2000), addr(0x3000)]);
    assert!(graph.node_at(addr(0x4000), &expected_a).is_some());
    assert!(graph.node_at(addr(0x4000), &expected_b).is_some());
}

/// A call followed by a return lands back in the caller's context, reusing
/// the context-free node for the continuation.
#[test]
fn test_return_pops_back_to_caller_context() {
    let mut lifter = ScriptedLifter::new();
    lifter.block(0x1000, &[(0x2000, JumpKind::Call)]);
    lifter.block(0x2000, &[(0x1008, JumpKind::Return)]);
    lifter.block(0x1008, &[(0x2000, JumpKind::Call)]);

    let analysis = recover(&lifter, CfgOptions::new().with_start(addr(0x1000)));
    let graph = analysis.graph();

    // The continuation after the first return sits in the empty context.
    let continuation = graph
        .node_at(addr(0x1008), &CallString::empty())
        .expect("continuation missing");

    // Its second call produces a new helper variant under caller 0x1008.
    let second_call = CallString::from_callers([addr(0x1008)]);
    let helper_again = graph
        .node_at(addr(0x2000), &second_call)
        .expect("second helper variant missing");
    let succs: Vec<NodeId> = graph.successors(continuation).collect();
    assert_eq!(succs, vec![helper_again]);

    // Both helper variants exist, one per call site.
    assert_eq!(graph.all_nodes(addr(0x2000)).len(), 2);
}

/// A jump, a call, and a return over three blocks: the return reuses the
/// already-expanded context-free node instead of minting a duplicate.
#[test]
fn test_call_return_reuses_context_free_node() {
    let mut lifter = ScriptedLifter::new();
    lifter.block(0x1000, &[(0x2000, JumpKind::Jump)]);
    lifter.block(0x2000, &[(0x3000, JumpKind::Call)]);
    lifter.block(0x3000, &[(0x2000, JumpKind::Return)]);

    let analysis = recover(&lifter, CfgOptions::new().with_start(addr(0x1000)));
    let graph = analysis.graph();

    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 3);

    assert!(graph.node_at(addr(0x1000), &CallString::empty()).is_some());
    let merged = graph
        .node_at(addr(0x2000), &CallString::empty())
        .expect("context-free node missing");
    assert_eq!(graph.all_nodes(addr(0x2000)), &[merged]);
    assert!(graph
        .node_at(addr(0x3000), &CallString::from_callers([addr(0x2000)]))
        .is_some());

    // The return edge points back at the reused node.
    let callee = graph.any_node(addr(0x3000)).unwrap();
    let tagged: Vec<(NodeId, JumpKind)> = graph.successors_with_jumpkind(callee).collect();
    assert_eq!(tagged, vec![(merged, JumpKind::Return)]);
}

/// Nested calls past the depth bound become labeled leaves instead of
/// being explored.
#[test]
fn test_call_depth_cuts_with_labeled_leaf() {
    let mut lifter = ScriptedLifter::new();
    lifter.block(0x1000, &[(0x2000, JumpKind::Call)]);
    lifter.block(0x2000, &[(0x3000, JumpKind::Call)]);
    lifter.block(0x3000, &[(0x4000, JumpKind::Call)]);
    lifter.exit(0x4000);

    let analysis = recover(
        &lifter,
        CfgOptions::new().with_start(addr(0x1000)).with_call_depth(1),
    );
    let graph = analysis.graph();

    // B (depth 1) was explored, C (depth 2) was cut, D never appears.
    assert!(graph.any_node(addr(0x2000)).is_some());
    let c = graph.any_node(addr(0x3000)).expect("cut node missing");
    assert_eq!(graph.node(c).unwrap().leaf(), Some(LeafReason::CallDepth));
    assert!(graph.any_node(addr(0x4000)).is_none());

    // Depth cuts are bounds, not failures.
    assert!(!graph.node(c).unwrap().is_failure_leaf());
    assert!(analysis.error_log().is_empty());
}

/// Avoided addresses appear as terminal nodes but are never lifted, and
/// exploration continues on the other paths.
#[test]
fn test_avoid_list_prunes_without_errors() {
    let mut lifter = ScriptedLifter::new();
    lifter.block(
        0x1000,
        &[(0x2000, JumpKind::Jump), (0x3000, JumpKind::Jump)],
    );
    lifter.block(0x2000, &[(0x4000, JumpKind::Jump)]);
    lifter.exit(0x3000);
    // 0x4000 is unscripted; lifting it would fail, but it is avoided.

    let analysis = recover(
        &lifter,
        CfgOptions::new()
            .with_start(addr(0x1000))
            .with_avoid([addr(0x4000)]),
    );
    let graph = analysis.graph();

    let avoided = graph.any_node(addr(0x4000)).expect("avoided node missing");
    assert_eq!(graph.node(avoided).unwrap().leaf(), Some(LeafReason::Avoided));
    assert!(analysis.error_log().is_empty());

    let exit = graph.any_node(addr(0x3000)).unwrap();
    assert_eq!(graph.node(exit).unwrap().leaf(), Some(LeafReason::ProgramExit));
}

/// One bad block is recorded and explored around in resilient mode, but
/// aborts the whole recovery under fail-fast.
#[test]
fn test_resilient_and_fail_fast_modes() {
    let mut lifter = ScriptedLifter::new();
    lifter.block(
        0x1000,
        &[(0x2000, JumpKind::Jump), (0x3000, JumpKind::Jump)],
    );
    lifter.fail(0x2000);
    lifter.exit(0x3000);

    let resilient = recover(&lifter, CfgOptions::new().with_start(addr(0x1000)));
    assert_eq!(resilient.error_log().len(), 1);
    let record = resilient.error_log().named("0x2000").expect("record missing");
    assert_eq!(record.kind, "Lift");
    assert!(resilient.graph().any_node(addr(0x3000)).is_some());

    let failed = resilient.graph().any_node(addr(0x2000)).unwrap();
    assert!(resilient.graph().node(failed).unwrap().is_failure_leaf());

    let errors = ErrorLog::new();
    let result = CfgBuilder::new(
        &lifter,
        CfgOptions::new().with_start(addr(0x1000)).with_fail_fast(true),
    )
    .build(&errors);
    assert!(matches!(result, Err(Error::Lift { .. })));
}

/// A recovery serializes to JSON and reloads with every index rebuilt and
/// the failure journal intact.
#[test]
fn test_persistence_round_trip() {
    let mut lifter = shared_chain();
    lifter.fail(0x4000);

    let analysis = recover(
        &lifter,
        CfgOptions::new()
            .with_starts([addr(0x1000), addr(0x2000)])
            .with_context_sensitivity(2),
    );

    let json = analysis.to_json().expect("serialize failed");
    let reloaded = CfgAnalysis::from_json(&json).expect("deserialize failed");
    let graph = reloaded.graph();

    assert_eq!(graph.node_count(), analysis.graph().node_count());
    assert_eq!(graph.edge_count(), analysis.graph().edge_count());
    assert_eq!(graph.context_sensitivity(), 2);
    assert_eq!(reloaded.error_log().len(), analysis.error_log().len());

    // Adjacency works on the reloaded graph.
    let f = graph.all_nodes(addr(0x3000));
    assert_eq!(f.len(), 2);
    for &id in f {
        let succs: Vec<NodeId> = graph.successors(id).collect();
        assert_eq!(succs.len(), 1);
        assert_eq!(graph.node(succs[0]).unwrap().address(), addr(0x4000));
    }
}

/// Project access memoizes: one build per name, configs after the first
/// are ignored, and discarding forces a rebuild.
#[test]
fn test_project_cache_semantics() {
    let project =
        Project::new(Arc::new(shared_chain())).with_entry_points([addr(0x1000), addr(0x2000)]);

    let first = project.cfg().expect("first build failed");
    let second = project
        .cfg_with(CfgOptions::new().with_context_sensitivity(2))
        .expect("second access failed");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.graph().context_sensitivity(), 1);

    assert!(project.analyses().discard(CFG));
    let third = project
        .cfg_with(CfgOptions::new().with_context_sensitivity(2))
        .expect("rebuild failed");
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.graph().context_sensitivity(), 2);
}

/// A custom analysis registered at runtime is reachable by name through
/// any project.
#[test]
fn test_custom_analysis_registration() {
    use std::any::Any;

    #[derive(Debug)]
    struct BlockCount {
        blocks: usize,
        errors: ErrorLog,
    }

    impl Analysis for BlockCount {
        fn name(&self) -> &str {
            "BlockCount"
        }
        fn error_log(&self) -> &ErrorLog {
            &self.errors
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    AnalysisRegistry::global().register(
        "BlockCount",
        Arc::new(|project, _config| {
            let cfg = project.cfg()?;
            Ok(Arc::new(BlockCount {
                blocks: cfg.graph().node_count(),
                errors: ErrorLog::new(),
            }) as Arc<dyn Analysis>)
        }),
    );

    let project =
        Project::new(Arc::new(shared_chain())).with_entry_points([addr(0x1000), addr(0x2000)]);
    let analysis = project.analysis("BlockCount").expect("lookup failed");
    let counted = analysis
        .as_any_arc()
        .downcast::<BlockCount>()
        .expect("downcast failed");
    assert_eq!(counted.blocks, 5);

    // The constructor pulled the CFG through the same cache.
    assert!(project.analyses().contains(CFG));
}
