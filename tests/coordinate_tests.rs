//! End-to-end coordination runs against a recording collaborator.

mod fixtures;

use fixtures::{
    chunk_id, init_tracing, sorted_split, table_id, unsorted_split, Call, MockCallbacks,
    MockReader,
};
use qcoord_core::config::{CoordinatorConfig, DEFAULT_PEER_CELL_TAG};
use qcoord_core::error::Error;
use qcoord_core::id::ObjectId;
use qcoord_core::split::DataSplit;
use qcoord_exec::{CoordinateController, Coordination};
use qcoord_planner::{
    AggregateFunction, AggregateItem, BinaryOp, Expr, LogicalPlan, NamedExpr, Operator,
    PlanFragment,
};

fn predicate() -> Expr {
    Expr::binary(BinaryOp::Less, Expr::reference("v"), Expr::literal(100i64))
}

fn three_chunks() -> Vec<DataSplit> {
    vec![
        sorted_split(chunk_id(1), 1, 10),
        sorted_split(chunk_id(2), 10, 20),
        sorted_split(chunk_id(3), 20, 30),
    ]
}

/// Splits of the coordinator plan's scans, in post-order.
fn coordinator_scans<'a>(coordination: &'a Coordination<'_, MockCallbacks>) -> Vec<&'a DataSplit> {
    coordination.coordinator_fragment().scans()
}

async fn coordinate<'a>(
    callbacks: &'a MockCallbacks,
    plan: &LogicalPlan,
) -> Result<Coordination<'a, MockCallbacks>, Error> {
    init_tracing();
    CoordinateController::new(callbacks, PlanFragment::from_logical(plan))
        .run()
        .await
}

#[tokio::test]
async fn test_single_unsplittable_scan_stays_local() {
    let callbacks = MockCallbacks::new();
    let plan = LogicalPlan::scan(sorted_split(table_id(1), 0, 100));

    let coordination = coordinate(&callbacks, &plan).await.unwrap();

    assert!(coordination.peer_fragments().is_empty());
    assert_eq!(coordination.coordinator_fragment().to_logical(), plan);
    assert!(callbacks.calls().is_empty());
}

#[tokio::test]
async fn test_filtered_scan_fans_out_to_three_peers() {
    let callbacks = MockCallbacks::new().with_splits(table_id(1), three_chunks());
    let plan = LogicalPlan::scan(sorted_split(table_id(1), 0, 100)).filter(predicate());

    let coordination = coordinate(&callbacks, &plan).await.unwrap();

    let peers = coordination.peer_fragments();
    assert_eq!(peers.len(), 3);
    for (peer, chunk) in peers.iter().zip(three_chunks()) {
        assert_eq!(
            peer.to_logical(),
            LogicalPlan::scan(chunk).filter(predicate())
        );
    }

    let head = coordination.coordinator_fragment().head_operator();
    let Operator::Union(union) = head else {
        panic!("expected a facade union, got {}", head.kind());
    };
    assert_eq!(union.sources.len(), 3);
    let facades = coordinator_scans(&coordination);
    for (index, facade) in facades.iter().enumerate() {
        assert_eq!(facade.object_id, ObjectId::peer(index, DEFAULT_PEER_CELL_TAG));
        assert_eq!(facade.bounds(), three_chunks()[index].bounds());
    }
}

#[tokio::test]
async fn test_empty_subsplit_is_pruned_everywhere() {
    let chunks = vec![
        sorted_split(chunk_id(1), 1, 10),
        sorted_split(chunk_id(2), 10, 10),
        sorted_split(chunk_id(3), 10, 20),
    ];
    let callbacks = MockCallbacks::new().with_splits(table_id(1), chunks);
    let plan = LogicalPlan::scan(sorted_split(table_id(1), 0, 100)).filter(predicate());

    let coordination = coordinate(&callbacks, &plan).await.unwrap();

    assert_eq!(coordination.peer_fragments().len(), 2);
    for peer in coordination.peer_fragments() {
        assert!(peer.scans().iter().all(|s| s.object_id != chunk_id(2)));
    }
    assert!(coordinator_scans(&coordination)
        .iter()
        .all(|s| s.object_id != chunk_id(2)));
    assert_eq!(callbacks.delegate_calls(), 2);
}

#[tokio::test]
async fn test_empty_split_result_fails_the_run() {
    let callbacks = MockCallbacks::new().with_splits(table_id(1), vec![]);
    let plan = LogicalPlan::scan(sorted_split(table_id(1), 0, 100)).filter(predicate());

    let err = match coordinate(&callbacks, &plan).await {
        Ok(_) => panic!("coordination should fail"),
        Err(e) => e,
    };

    assert!(err.is_input_empty());
    assert!(matches!(err, Error::Coordinate { .. }));
    assert!(matches!(err.root(), Error::InputEmpty(id) if *id == table_id(1)));
    assert_eq!(callbacks.delegate_calls(), 0);
}

#[tokio::test]
async fn test_split_failure_is_reported_with_cause() {
    let callbacks = MockCallbacks::new()
        .with_splits(table_id(1), three_chunks())
        .failing_split();
    let plan = LogicalPlan::scan(sorted_split(table_id(1), 0, 100));
    let fragment = PlanFragment::from_logical(&plan);
    let fragment_id = fragment.id();

    let err = match CoordinateController::new(&callbacks, fragment).run().await {
        Ok(_) => panic!("coordination should fail"),
        Err(e) => e,
    };

    let Error::Coordinate { fragment, source } = &err else {
        panic!("expected a coordinate error, got {err}");
    };
    assert_eq!(*fragment, fragment_id);
    assert!(matches!(
        source.as_ref(),
        Error::Collaborator { call: "split_further", .. }
    ));
    assert!(err.to_string().contains(&fragment_id.to_string()));
}

#[tokio::test]
async fn test_delegate_failure_aborts_after_first_error() {
    let callbacks = MockCallbacks::new()
        .with_splits(table_id(1), three_chunks())
        .failing_delegate_at(1);
    let plan = LogicalPlan::scan(sorted_split(table_id(1), 0, 100));

    let err = match coordinate(&callbacks, &plan).await {
        Ok(_) => panic!("coordination should fail"),
        Err(e) => e,
    };

    assert!(matches!(
        err.root(),
        Error::Collaborator { call: "delegate", .. }
    ));
    assert_eq!(callbacks.delegate_calls(), 2);
}

#[tokio::test]
async fn test_collaborator_calls_happen_in_plan_order() {
    let callbacks = MockCallbacks::new()
        .with_splits(table_id(1), vec![sorted_split(chunk_id(1), 0, 5)])
        .with_splits(table_id(2), vec![sorted_split(chunk_id(2), 5, 9)]);
    let plan = LogicalPlan::union(vec![
        LogicalPlan::scan(sorted_split(table_id(1), 0, 5)),
        LogicalPlan::scan(sorted_split(table_id(2), 5, 9)),
    ]);

    let coordination = coordinate(&callbacks, &plan).await.unwrap();

    let peer_ids: Vec<_> = coordination
        .peer_fragments()
        .iter()
        .map(|p| p.id())
        .collect();
    assert_eq!(
        callbacks.calls(),
        vec![
            Call::SplitFurther(table_id(1)),
            Call::SplitFurther(table_id(2)),
            Call::Delegate(peer_ids[0]),
            Call::Delegate(peer_ids[1]),
        ]
    );
}

#[tokio::test]
async fn test_concurrent_calls_keep_peer_order() {
    let plan = LogicalPlan::union(vec![
        LogicalPlan::scan(sorted_split(table_id(1), 0, 30)),
        LogicalPlan::scan(sorted_split(table_id(2), 30, 60)),
    ])
    .filter(predicate());
    let callbacks = || {
        MockCallbacks::new()
            .with_splits(table_id(1), three_chunks())
            .with_splits(
                table_id(2),
                vec![
                    sorted_split(chunk_id(4), 30, 45),
                    sorted_split(chunk_id(5), 45, 60),
                ],
            )
    };

    let sequential_callbacks = callbacks();
    let sequential = coordinate(&sequential_callbacks, &plan).await.unwrap();

    let concurrent_callbacks = callbacks();
    let config = CoordinatorConfig {
        concurrent_split: true,
        concurrent_delegate: true,
        ..CoordinatorConfig::default()
    };
    let concurrent = CoordinateController::with_config(
        &concurrent_callbacks,
        PlanFragment::from_logical(&plan),
        config,
    )
    .run()
    .await
    .unwrap();

    let logical = |c: &Coordination<'_, MockCallbacks>| -> Vec<LogicalPlan> {
        c.peer_fragments().iter().map(|p| p.to_logical()).collect()
    };
    assert_eq!(logical(&sequential).len(), 5);
    for peer in logical(&sequential) {
        assert!(matches!(peer, LogicalPlan::Filter { .. }));
    }
    assert_eq!(logical(&sequential), logical(&concurrent));
    assert_eq!(
        sequential.coordinator_fragment().to_logical(),
        concurrent.coordinator_fragment().to_logical()
    );
}

#[tokio::test]
async fn test_full_pipeline_pushes_everything_below_the_fan_out() {
    let callbacks = MockCallbacks::new().with_splits(
        table_id(1),
        vec![
            sorted_split(chunk_id(1), 0, 50),
            sorted_split(chunk_id(2), 50, 100),
        ],
    );
    let projections = vec![NamedExpr::identity("k"), NamedExpr::identity("v")];
    let group_items = vec![NamedExpr::identity("k")];
    let aggregates = vec![AggregateItem::new(
        Expr::reference("v"),
        AggregateFunction::Sum,
        "total",
    )];
    let plan = LogicalPlan::scan(sorted_split(table_id(1), 0, 100))
        .filter(predicate())
        .project(projections.clone())
        .group(group_items.clone(), aggregates.clone());

    let coordination = coordinate(&callbacks, &plan).await.unwrap();

    let peers = coordination.peer_fragments();
    assert_eq!(peers.len(), 2);
    for (peer, lower) in peers.iter().zip([0i64, 50]) {
        let expected = LogicalPlan::scan(sorted_split(
            if lower == 0 { chunk_id(1) } else { chunk_id(2) },
            lower,
            lower + 50,
        ))
        .filter(predicate())
        .project(projections.clone())
        .group(group_items.clone(), aggregates.clone());
        assert_eq!(peer.to_logical(), expected);
    }

    let LogicalPlan::Group {
        input,
        group_items: final_items,
        aggregate_items: final_aggregates,
    } = coordination.coordinator_fragment().to_logical()
    else {
        panic!("expected the final group to stay on the coordinator");
    };
    assert_eq!(final_items, vec![NamedExpr::identity("k")]);
    assert_eq!(
        final_aggregates,
        vec![AggregateItem::new(
            Expr::reference("total"),
            AggregateFunction::Sum,
            "total"
        )]
    );
    let LogicalPlan::Union { inputs } = *input else {
        panic!("expected a facade union below the final group");
    };
    assert_eq!(inputs.len(), 2);
    for (index, facade) in inputs.iter().enumerate() {
        let LogicalPlan::Scan { split } = facade else {
            panic!("expected a facade scan");
        };
        assert_eq!(split.peer_index(), Some(index));
        assert_eq!(split.key_columns, vec!["k".to_string()]);
    }
}

#[tokio::test]
async fn test_branches_over_inner_peers_stay_on_coordinator() {
    let callbacks = MockCallbacks::new().with_splits(
        table_id(1),
        vec![
            sorted_split(chunk_id(1), 0, 10),
            sorted_split(chunk_id(2), 10, 20),
        ],
    );
    let grouped = LogicalPlan::scan(sorted_split(table_id(1), 0, 20)).group(
        vec![NamedExpr::identity("k")],
        vec![AggregateItem::new(
            Expr::reference("v"),
            AggregateFunction::Min,
            "lowest",
        )],
    );
    let plan = LogicalPlan::union(vec![
        grouped,
        LogicalPlan::scan(sorted_split(table_id(2), 20, 40)),
    ]);

    let coordination = coordinate(&callbacks, &plan).await.unwrap();

    // Two partial groups plus the plain scan.
    assert_eq!(coordination.peer_fragments().len(), 3);
    for peer in coordination.peer_fragments() {
        assert!(peer.scans().iter().all(|s| !s.object_id.is_peer_reference()));
    }

    let LogicalPlan::Union { inputs } = coordination.coordinator_fragment().to_logical() else {
        panic!("expected the outer union on the coordinator");
    };
    assert_eq!(inputs.len(), 2);
    assert!(matches!(inputs[0], LogicalPlan::Group { .. }));
    let LogicalPlan::Scan { split } = &inputs[1] else {
        panic!("expected a facade for the plain scan");
    };
    assert_eq!(split.peer_index(), Some(2));
}

#[tokio::test]
async fn test_get_reader_resolves_peers_and_local_splits() {
    let callbacks = MockCallbacks::new().with_splits(table_id(1), three_chunks());
    let plan = LogicalPlan::scan(sorted_split(table_id(1), 0, 100)).filter(predicate());

    let coordination = coordinate(&callbacks, &plan).await.unwrap();

    let peer_ids: Vec<_> = coordination
        .peer_fragments()
        .iter()
        .map(|p| p.id())
        .collect();
    for (index, facade) in coordinator_scans(&coordination).into_iter().enumerate() {
        assert_eq!(coordination.peer_index(facade), Some(index));
        assert_eq!(
            coordination.get_reader(facade),
            MockReader::Remote {
                fragment: peer_ids[index],
                hint: three_chunks()[index].clone(),
            }
        );
    }

    let local = unsorted_split(table_id(9));
    assert_eq!(coordination.peer_index(&local), None);
    assert_eq!(coordination.get_reader(&local), MockReader::Local(table_id(9)));
    assert!(callbacks.calls().contains(&Call::GetReader(table_id(9))));
}

#[tokio::test]
async fn test_delegate_hint_is_heaviest_split() {
    let light = unsorted_split(table_id(1)).with_data_weight(10);
    let heavy = unsorted_split(table_id(2)).with_data_weight(1_000);
    let callbacks = MockCallbacks::new();
    let plan = LogicalPlan::union(vec![LogicalPlan::scan(light), LogicalPlan::scan(heavy.clone())]);

    let coordination = coordinate(&callbacks, &plan).await.unwrap();

    let readers: Vec<&MockReader> = coordination.peers().iter().map(|p| p.reader()).collect();
    let MockReader::Remote { hint, .. } = readers[1] else {
        panic!("expected a remote reader");
    };
    assert_eq!(*hint, heavy);
}

#[tokio::test]
#[should_panic(expected = "out of range")]
async fn test_peer_index_out_of_range_panics() {
    let callbacks = MockCallbacks::new().with_splits(table_id(1), three_chunks());
    let plan = LogicalPlan::scan(sorted_split(table_id(1), 0, 100));

    let coordination = coordinate(&callbacks, &plan).await.unwrap();

    let bogus = DataSplit::new(ObjectId::peer(7, DEFAULT_PEER_CELL_TAG), Default::default());
    let _ = coordination.peer_index(&bogus);
}

#[tokio::test]
async fn test_custom_peer_cell_tag() {
    let callbacks = MockCallbacks::new().with_splits(table_id(1), three_chunks());
    let plan = LogicalPlan::scan(sorted_split(table_id(1), 0, 100));
    let config = CoordinatorConfig {
        peer_cell_tag: 0x0042,
        ..CoordinatorConfig::default()
    };

    let coordination =
        CoordinateController::with_config(&callbacks, PlanFragment::from_logical(&plan), config)
            .run()
            .await
            .unwrap();

    let scans = coordinator_scans(&coordination);
    assert_eq!(scans.len(), 3);
    assert!(scans.iter().all(|s| s.object_id.cell_tag() == 0x0042));
}

#[tokio::test]
async fn test_manifest_records_every_peer() {
    let callbacks = MockCallbacks::new().with_splits(table_id(1), three_chunks());
    let plan = LogicalPlan::scan(sorted_split(table_id(1), 0, 100)).filter(predicate());
    let fragment = PlanFragment::from_logical(&plan);
    let fragment_id = fragment.id();

    let coordination = CoordinateController::new(&callbacks, fragment)
        .run()
        .await
        .unwrap();

    let manifest = coordination.manifest();
    let coordinator = coordination.coordinator_fragment();
    assert_eq!(manifest.fragment, fragment_id);
    assert_eq!(coordinator.id(), fragment_id);
    assert_eq!(
        manifest.coordinator_fingerprint,
        coordinator.fingerprint().unwrap()
    );
    assert!(manifest.finished_ms >= manifest.started_ms);
    assert_eq!(manifest.peers.len(), 3);
    for (entry, peer) in manifest.peers.iter().zip(coordination.peer_fragments()) {
        assert_eq!(entry.fragment, peer.id());
        assert_eq!(entry.fingerprint, peer.fingerprint().unwrap());
        assert_eq!(entry.range, three_chunks()[entry.index].bounds());
    }

    let json = serde_json::to_string(manifest).unwrap();
    assert!(json.contains(&fragment_id.to_string()));
}

#[tokio::test]
async fn test_input_fragment_is_left_untouched() {
    let callbacks = MockCallbacks::new().with_splits(table_id(1), three_chunks());
    let plan = LogicalPlan::scan(sorted_split(table_id(1), 0, 100)).filter(predicate());
    let fragment = PlanFragment::from_logical(&plan);

    let controller = CoordinateController::new(&callbacks, fragment.clone());
    let _coordination = controller.run().await.unwrap();

    assert_eq!(fragment.to_logical(), plan);
}
