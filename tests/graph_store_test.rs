use samyama_graph_store::graph::{
    GraphSelection, GraphStore, GraphStoreError, InverseIndex, NodeLabel, OriginalNodeId,
    PropertyValue, PropertyValues, RelationshipType, ValueType,
};
use samyama_graph_store::StoreConfig;
use std::ops::ControlFlow;

fn knows() -> RelationshipType {
    RelationshipType::new("KNOWS")
}

/// Scenario store: nodes 1 and 2 labeled Person, KNOWS 1 -> 2 with `since` defaulting to 0
fn person_store() -> GraphStore {
    let store = GraphStore::new(StoreConfig::default());
    store.add_node(1, ["Person"]);
    store.add_node(2, ["Person"]);

    let mut builder = store.relationships_builder("KNOWS");
    builder
        .declare_property("since", ValueType::Long, PropertyValue::Long(0))
        .unwrap();
    let from = store.to_ordinal(&1.into()).unwrap();
    let to = store.to_ordinal(&2.into()).unwrap();
    builder.add(from, to).unwrap();
    store.add_relationship_type(builder.build().unwrap()).unwrap();
    store
}

#[test]
fn test_id_map_bijection() {
    let store = GraphStore::default();
    let ids: Vec<OriginalNodeId> = vec![
        42.into(),
        "alice".into(),
        (-7i64).into(),
        "bob".into(),
        i64::MAX.into(),
    ];
    for id in &ids {
        store.add_node(id.clone(), ["Thing"]);
    }

    assert_eq!(store.node_count(), ids.len());
    for (expected, id) in ids.iter().enumerate() {
        let ordinal = store.to_ordinal(id).unwrap();
        assert_eq!(ordinal, expected);
        assert_eq!(&store.to_original(ordinal).unwrap(), id);
    }
    for ordinal in 0..store.node_count() {
        let id = store.to_original(ordinal).unwrap();
        assert_eq!(store.to_ordinal(&id).unwrap(), ordinal);
    }
}

#[test]
fn test_unknown_id_is_not_found() {
    let store = person_store();
    let err = store.to_ordinal(&"nobody".into()).unwrap_err();
    assert_eq!(err, GraphStoreError::NodeNotFound("nobody".into()));
    assert!(matches!(
        store.to_original(99),
        Err(GraphStoreError::OrdinalOutOfBounds { ordinal: 99, node_count: 2 })
    ));
}

#[test]
fn test_composite_iterator_scenario() {
    let store = person_store();
    let iter = store
        .get_composite_relationship_iterator(&knows(), &["since"])
        .unwrap();
    let tuples: Vec<_> = iter.iter().collect();

    let one = store.to_ordinal(&1.into()).unwrap();
    let two = store.to_ordinal(&2.into()).unwrap();
    assert_eq!(tuples, vec![(one, two, vec![0.0])]);
}

#[test]
fn test_composite_iterator_errors() {
    let store = person_store();
    assert!(matches!(
        store.get_composite_relationship_iterator(&RelationshipType::new("LIKES"), &[]),
        Err(GraphStoreError::UnknownRelationshipType(_))
    ));
    assert!(matches!(
        store.get_composite_relationship_iterator(&knows(), &["since", "weight"]),
        Err(GraphStoreError::UndeclaredProperty { .. })
    ));
}

#[test]
fn test_duplicate_relationship_type_rejected() {
    let store = person_store();

    let mut again = store.relationships_builder("KNOWS");
    again.add(1, 0).unwrap();
    again.add(0, 0).unwrap();
    let err = store
        .add_relationship_type(again.build().unwrap())
        .unwrap_err();
    assert_eq!(err, GraphStoreError::DuplicateRelationshipType(knows()));

    // first installation intact
    assert_eq!(store.relationship_count_for_type(&knows()), 1);
    let graph = store.get_union();
    let pairs: Vec<_> = graph.stream_relationships(0, &knows()).collect();
    assert_eq!(pairs, vec![(0, 1)]);
    assert!(graph.has_relationship_property(&knows(), "since"));
}

#[test]
fn test_unknown_label_projection_is_empty() {
    let store = person_store();
    let graph = store.get_graph(NodeLabel::new("NoSuchLabel"));
    assert_eq!(graph.node_count(), 0);
    assert_eq!(graph.relationship_count(None), 0);

    let graph = store.get_graph(RelationshipType::new("NoSuchType"));
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.relationship_count(None), 0);
}

#[test]
fn test_property_default_law() {
    let store = GraphStore::default();
    for id in 0..100 {
        store.add_node(id, ["Item"]);
    }
    store
        .add_node_property(
            ["Item"],
            "score",
            PropertyValues::with_default(ValueType::Double, PropertyValue::Double(0.5)).unwrap(),
        )
        .unwrap();
    store
        .set_node_property_value(&17.into(), "score", PropertyValue::Double(9.0))
        .unwrap();

    for id in 0..100 {
        let value = store.node_property_value(&id.into(), "score").unwrap();
        let expected = if id == 17 { 9.0 } else { 0.5 };
        assert_eq!(value, PropertyValue::Double(expected));
    }

    // nodes added after the column was declared read the default too
    store.add_node(500, ["Item"]);
    assert_eq!(
        store.node_property_value(&500.into(), "score").unwrap(),
        PropertyValue::Double(0.5)
    );
}

#[test]
fn test_type_mismatch_on_write() {
    let store = person_store();
    store
        .add_node_property(["Person"], "name", PropertyValues::empty(ValueType::String))
        .unwrap();
    let err = store
        .set_node_property_value(&1.into(), "name", PropertyValue::Long(3))
        .unwrap_err();
    assert_eq!(
        err,
        GraphStoreError::TypeMismatch {
            key: "name".to_string(),
            expected: ValueType::String,
            actual: ValueType::Long,
        }
    );
    store
        .set_node_property_value(&1.into(), "name", "Alice".into())
        .unwrap();
    assert_eq!(
        store.node_property_value(&1.into(), "name").unwrap(),
        PropertyValue::String("Alice".to_string())
    );
    assert_eq!(
        store.node_property_value(&2.into(), "name").unwrap(),
        PropertyValue::String(String::new())
    );
}

#[test]
fn test_schema_redeclaration() {
    let store = person_store();
    let values = || PropertyValues::from_longs(vec![1, 2], 0);
    store.add_node_property(["Person"], "rank", values()).unwrap();
    // identical redeclaration is accepted
    store.add_node_property(["Person"], "rank", values()).unwrap();

    let err = store
        .add_node_property(["Person"], "rank", PropertyValues::from_longs(vec![], 1))
        .unwrap_err();
    assert!(matches!(err, GraphStoreError::SchemaConflict { .. }));
    assert_eq!(
        store.node_property_value(&2.into(), "rank").unwrap(),
        PropertyValue::Long(2)
    );
}

#[test]
fn test_shared_key_across_labels_keeps_other_labels_values() {
    let store = GraphStore::default();
    store.add_node(1, ["Person"]);
    store.add_node(2, ["Company"]);
    store
        .add_node_property(["Person"], "age", PropertyValues::from_longs(vec![30], 0))
        .unwrap();
    store
        .add_node_property(["Company"], "age", PropertyValues::from_longs(vec![0, 5], 0))
        .unwrap();
    assert_eq!(store.node_property_value(&1.into(), "age").unwrap(), PropertyValue::Long(30));
    assert_eq!(store.node_property_value(&2.into(), "age").unwrap(), PropertyValue::Long(5));

    // redeclaring on Person rewrites only Person nodes
    store
        .add_node_property(["Person"], "age", PropertyValues::from_longs(vec![31, 77], 0))
        .unwrap();
    assert_eq!(store.node_property_value(&1.into(), "age").unwrap(), PropertyValue::Long(31));
    assert_eq!(store.node_property_value(&2.into(), "age").unwrap(), PropertyValue::Long(5));

    let err = store
        .add_node_property(["Company"], "age", PropertyValues::from_longs(vec![0, 9], 1))
        .unwrap_err();
    assert!(matches!(err, GraphStoreError::SchemaConflict { .. }));
    assert_eq!(store.node_property_value(&1.into(), "age").unwrap(), PropertyValue::Long(31));
    assert_eq!(store.node_property_value(&2.into(), "age").unwrap(), PropertyValue::Long(5));
}

#[test]
fn test_single_writes_leave_held_projection_untouched() {
    let store = GraphStore::default();
    for id in 0..3_000i64 {
        store.add_node(id, ["Item"]);
    }
    store
        .add_node_property(["Item"], "score", PropertyValues::from_longs(vec![], 0))
        .unwrap();
    let graph = store.get_union();

    for id in 3_000..6_000i64 {
        store.add_node(id, ["Item"]);
    }
    for id in (0..6_000i64).step_by(3) {
        store
            .set_node_property_value(&id.into(), "score", PropertyValue::Long(id))
            .unwrap();
    }

    assert_eq!(graph.node_count(), 3_000);
    assert!(graph.to_mapped_by_original(&4_000.into()).is_err());
    let three = graph.to_mapped_by_original(&3.into()).unwrap();
    assert_eq!(graph.node_property_value(three, "score").unwrap(), PropertyValue::Long(0));

    assert_eq!(store.node_count(), 6_000);
    assert_eq!(store.node_property_value(&3.into(), "score").unwrap(), PropertyValue::Long(3));
    assert_eq!(
        store.node_property_value(&4_002.into(), "score").unwrap(),
        PropertyValue::Long(4_002)
    );
    assert_eq!(store.to_ordinal(&5_999.into()).unwrap(), 5_999);
}

#[test]
fn test_deletion_completeness() {
    let store = person_store();
    let mut likes = store.relationships_builder("LIKES");
    likes.add(0, 1).unwrap();
    likes.add(1, 0).unwrap();
    likes.add(1, 1).unwrap();
    store.add_relationship_type(likes.build().unwrap()).unwrap();
    store.add_inverse_index(&knows(), None).unwrap();

    let result = store.delete_relationships(&knows()).unwrap();
    assert_eq!(result.relationships_deleted, 1);
    assert!(result.had_inverse_index);
    assert_eq!(result.deleted_property_keys, vec!["since".to_string()]);

    assert_eq!(store.relationship_count_for_type(&knows()), 0);
    assert!(store.inverse_indexed_relationship_types().is_empty());
    let graph = store.get_graph(knows());
    assert_eq!(graph.relationship_count(None), 0);
    assert!(!graph.has_relationship_type(&knows()));

    let likes_graph = store.get_graph(RelationshipType::new("LIKES"));
    assert_eq!(likes_graph.relationship_count(None), 3);
    assert!(store.relationship_property_keys_for_type(&knows()).is_empty());

    // the type can be installed again after deletion
    let mut fresh = store.relationships_builder("KNOWS");
    fresh.add(1, 0).unwrap();
    store.add_relationship_type(fresh.build().unwrap()).unwrap();
    assert_eq!(store.relationship_count_for_type(&knows()), 1);
    assert!(!store.relationship_property_keys_for_type(&knows()).contains("since"));
}

#[test]
fn test_inverse_index_duality_with_multiplicity() {
    let store = GraphStore::default();
    for id in 0..5 {
        store.add_node(id, ["N"]);
    }
    let edges = [(0, 1), (0, 1), (1, 2), (2, 0), (3, 3), (4, 1), (0, 4), (1, 2)];
    let mut builder = store.relationships_builder("R");
    for (s, t) in edges {
        builder.add(s, t).unwrap();
    }
    store.add_relationship_type(builder.build().unwrap()).unwrap();
    let rel_type = RelationshipType::new("R");
    store.add_inverse_index(&rel_type, None).unwrap();
    assert!(store.has_parallel_relationships(&rel_type));

    let graph = store.get_union();
    for u in 0..5 {
        for v in 0..5 {
            let mut forward = 0;
            let flow = graph.for_each_relationship(u, &rel_type, |_, t| {
                if t == v {
                    forward += 1;
                }
                ControlFlow::Continue(())
            });
            assert!(flow.is_continue());
            let mut inverse = 0;
            let flow = graph
                .for_each_inverse_relationship(v, &rel_type, |_, s| {
                    if s == u {
                        inverse += 1;
                    }
                    ControlFlow::Continue(())
                })
                .unwrap();
            assert!(flow.is_continue());
            assert_eq!(forward, inverse, "multiplicity of {} -> {}", u, v);
        }
    }
    assert_eq!(graph.degree_inverse(1, &rel_type).unwrap(), 3);
}

#[test]
fn test_supplied_inverse_index() {
    let store = person_store();
    let inverse = InverseIndex::from_topology(
        samyama_graph_store::graph::Topology::from_edges(
            2,
            &[1],
            &[0],
            Default::default(),
        )
        .unwrap()
        .topology,
        None,
    );
    store.add_inverse_index(&knows(), Some(inverse)).unwrap();
    let graph = store.get_union();
    let mut sources = Vec::new();
    let flow = graph
        .for_each_inverse_relationship(1, &knows(), |_, s| {
            sources.push(s);
            ControlFlow::Continue(())
        })
        .unwrap();
    assert!(flow.is_continue());
    assert_eq!(sources, vec![0]);
}

#[test]
fn test_missing_inverse_index() {
    let store = person_store();
    let graph = store.get_union();
    let err = graph
        .for_each_inverse_relationship(1, &knows(), |_, _| ControlFlow::Continue(()))
        .unwrap_err();
    assert_eq!(err, GraphStoreError::MissingInverseIndex(knows()));
}

#[test]
fn test_combined_selection() {
    let store = GraphStore::default();
    store.add_node("a", ["Person"]);
    store.add_node("b", ["Person"]);
    store.add_node("acme", ["Company"]);

    let mut works = store.relationships_builder("WORKS_AT");
    works
        .declare_property("salary", ValueType::Double, PropertyValue::Double(0.0))
        .unwrap();
    works
        .add_with_properties(0, 2, &[("salary", PropertyValue::Double(10.0))])
        .unwrap();
    store.add_relationship_type(works.build().unwrap()).unwrap();

    let mut knows = store.relationships_builder("KNOWS");
    knows.add(0, 1).unwrap();
    store.add_relationship_type(knows.build().unwrap()).unwrap();

    let selection = GraphSelection::Combined {
        labels: Some(vec!["Person".into()]),
        rel_types: None,
        rel_property: None,
    };
    let graph = store.get_graph(selection);
    assert_eq!(graph.node_count(), 2);
    // WORKS_AT leaves the projection
    assert_eq!(graph.relationship_count(Some(&RelationshipType::new("WORKS_AT"))), 0);
    assert_eq!(graph.relationship_count(Some(&RelationshipType::new("KNOWS"))), 1);

    let selection = GraphSelection::Combined {
        labels: None,
        rel_types: Some(vec!["WORKS_AT".into(), "KNOWS".into()]),
        rel_property: Some("salary".to_string()),
    };
    let graph = store.get_graph(selection);
    let types: Vec<_> = graph.relationship_types().cloned().collect();
    assert_eq!(types, vec![RelationshipType::new("WORKS_AT")]);
}
