use super::*;
use crate::test_utils::{build_offline, chain_index};

fn ids(nodes: &[&Node]) -> Vec<String> {
    nodes.iter().map(|n| n.id.to_string()).collect()
}

#[test]
fn test_linear_upstream_and_depth_limit() {
    let graph = build_offline(&chain_index(&[("a", "b"), ("b", "c")]));
    let flow = FlowAnalyzer::new(&graph);

    let all = flow.get_upstream("table:c", &TraversalOptions::new());
    assert!(all.contains_node("table:a"));
    assert!(all.contains_node("table:b"));
    assert_eq!(all.depth, 2);

    let one = flow.get_upstream("table:c", &TraversalOptions::new().with_max_depth(1));
    assert_eq!(one.node_ids(), vec!["table:b"]);
    assert_eq!(one.depth, 1);
}

#[test]
fn test_full_lineage_both_directions() {
    let graph = build_offline(&chain_index(&[("a", "b"), ("b", "c")]));
    let flow = FlowAnalyzer::new(&graph);
    let options = TraversalOptions::new().with_filter_types(NodeType::RELATIONS);

    let full = flow.get_full_lineage("table:b", &options);
    assert_eq!(full.upstream.node_ids(), vec!["table:a"]);
    assert_eq!(full.downstream.node_ids(), vec!["table:c"]);
}

#[test]
fn test_unknown_node_is_empty() {
    let graph = build_offline(&chain_index(&[("a", "b")]));
    let flow = FlowAnalyzer::new(&graph);
    assert!(flow.get_upstream("table:nope", &TraversalOptions::new()).is_empty());
    assert!(flow.get_path_between("table:nope", "table:b").is_empty());
    assert!(flow.get_path_between("table:a", "table:a").is_empty());
}

#[test]
fn test_paths_in_diamond() {
    let graph = build_offline(&chain_index(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]));
    let flow = FlowAnalyzer::new(&graph);

    let paths = flow.get_path_between("table:a", "table:d");
    assert_eq!(paths.len(), 2);
    for path in &paths {
        assert_eq!(path.depth, 2);
        assert_eq!(path.nodes.first().unwrap(), "table:a");
        assert_eq!(path.nodes.last().unwrap(), "table:d");
        assert_eq!(path.edges.len(), 2);
    }
}

#[test]
fn test_path_cap() {
    let graph = build_offline(&chain_index(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]));
    let config = TraversalConfig {
        max_paths: 1,
        ..Default::default()
    };
    let flow = FlowAnalyzer::from_config(&graph, &config);
    assert_eq!(flow.get_path_between("table:a", "table:d").len(), 1);
}

#[test]
fn test_roots_and_terminals_ignore_columns() {
    // every table in chain_index owns an `id` column
    let graph = build_offline(&chain_index(&[("a", "b"), ("b", "c")]));
    let flow = FlowAnalyzer::new(&graph);

    assert_eq!(ids(&flow.find_root_sources()), vec!["table:a"]);
    assert_eq!(ids(&flow.find_terminal_nodes()), vec!["table:c"]);
    assert!(flow.detect_cycles().is_empty());
}

#[test]
fn test_roots_exclude_external() {
    let mut index = chain_index(&[("a", "b")]);
    let file = index.file_mut("load.sql");
    file.references.push(crate::test_utils::select_ref("raw_feed", 0));
    file.references.push(crate::test_utils::insert_ref("a", 0));
    let graph = build_offline(&index);
    let flow = FlowAnalyzer::new(&graph);

    // the external feed is never a root, and `a` now has an upstream
    assert!(graph.node("external:raw_feed").is_some());
    assert!(flow.find_root_sources().is_empty());
    assert_eq!(ids(&flow.find_terminal_nodes()), vec!["table:b"]);
}

#[test]
fn test_two_node_cycle() {
    let graph = build_offline(&chain_index(&[("a", "b"), ("b", "a")]));
    let flow = FlowAnalyzer::new(&graph);

    assert!(flow.has_cycles());
    let cycles = flow.detect_cycles();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0], vec!["table:a", "table:b", "table:a"]);

    // traversal terminates and never reports the start node
    let down = flow.get_downstream("table:a", &TraversalOptions::new());
    assert!(down.contains_node("table:b"));
    assert!(!down.contains_node("table:a"));
    assert!(flow.find_root_sources().is_empty());
    assert_eq!(flow.get_path_between("table:a", "table:b").len(), 1);
}

#[test]
fn test_default_options_follow_config() {
    let graph = LineageGraph::default();
    let config = TraversalConfig {
        default_max_depth: 3,
        ..Default::default()
    };
    let flow = FlowAnalyzer::from_config(&graph, &config);
    assert_eq!(flow.default_options().max_depth, Some(3));
    assert_eq!(FlowAnalyzer::new(&graph).default_options().max_depth, None);
}
