//! Graph filtering for focused views.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::model::{EdgeType, FlowGraph, GraphStats, RiskLevel};

/// Filter criteria; empty fields do not restrict.
#[derive(Debug, Clone, Default)]
pub struct GraphFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub edge_types: Vec<EdgeType>,
    pub risk_levels: Vec<RiskLevel>,
    /// Case-insensitive substring match on node labels.
    pub counterparty_query: String,
}

/// Restrict a graph to edges matching the filter; nodes not referenced by a
/// surviving edge are dropped.
pub fn filter_graph(graph: &FlowGraph, filter: &GraphFilter) -> FlowGraph {
    let query = filter.counterparty_query.to_lowercase();
    let mut used_node_ids: BTreeSet<&str> = BTreeSet::new();
    let mut edges = Vec::new();

    for edge in &graph.edges {
        if let (Some(from), Some(last)) = (filter.date_from, edge.last_date) {
            if last < from {
                continue;
            }
        }
        if let (Some(to), Some(first)) = (filter.date_to, edge.first_date) {
            if first > to {
                continue;
            }
        }
        if !filter.edge_types.is_empty() && !filter.edge_types.contains(&edge.edge_type) {
            continue;
        }

        let source = graph.node(&edge.source);
        let target = graph.node(&edge.target);

        if !filter.risk_levels.is_empty() {
            let hit = [&source, &target].iter().any(|n| {
                n.map(|n| filter.risk_levels.contains(&n.risk_level))
                    .unwrap_or(false)
            });
            if !hit {
                continue;
            }
        }

        if !query.is_empty() {
            let hit = [&source, &target].iter().any(|n| {
                n.map(|n| n.label.to_lowercase().contains(&query))
                    .unwrap_or(false)
            });
            if !hit {
                continue;
            }
        }

        used_node_ids.insert(edge.source.as_str());
        used_node_ids.insert(edge.target.as_str());
        edges.push(edge.clone());
    }

    let nodes: Vec<_> = graph
        .nodes
        .iter()
        .filter(|n| used_node_ids.contains(n.id.as_str()))
        .cloned()
        .collect();

    let mut clusters = std::collections::BTreeMap::new();
    for node in &nodes {
        *clusters.entry(node.cluster).or_insert(0) += 1;
    }

    let stats = GraphStats {
        total_nodes: nodes.len(),
        total_edges: edges.len(),
        total_transactions: graph.stats.total_transactions,
        clusters,
    };

    FlowGraph { nodes, edges, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_graph;
    use amlscan_core::{normalize_transactions, RawTransaction};
    use rust_decimal_macros::dec;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn graph() -> FlowGraph {
        let raw = vec![
            RawTransaction::new(d("2024-01-05"), dec!(-150.00))
                .with_counterparty("BIEDRONKA")
                .with_bank_category("TR.KART"),
            RawTransaction::new(d("2024-02-10"), dec!(5000.00))
                .with_counterparty("FIRMA XYZ")
                .with_bank_category("PRZELEW"),
        ];
        build_graph(&normalize_transactions(&raw, "s"), "Moje konto")
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let g = graph();
        let filtered = filter_graph(&g, &GraphFilter::default());
        assert_eq!(filtered.stats.total_edges, g.stats.total_edges);
    }

    #[test]
    fn test_edge_type_filter() {
        let filtered = filter_graph(
            &graph(),
            &GraphFilter {
                edge_types: vec![EdgeType::CardPayment],
                ..Default::default()
            },
        );
        assert_eq!(filtered.edges.len(), 1);
        assert_eq!(filtered.edges[0].edge_type, EdgeType::CardPayment);
        // Only the endpoints of the surviving edge remain.
        assert_eq!(filtered.nodes.len(), 2);
    }

    #[test]
    fn test_date_filter() {
        let filtered = filter_graph(
            &graph(),
            &GraphFilter {
                date_from: Some(d("2024-02-01")),
                ..Default::default()
            },
        );
        assert_eq!(filtered.edges.len(), 1);
        assert!(filtered.edges[0].source.starts_with("cp_firma"));
    }

    #[test]
    fn test_label_query() {
        let filtered = filter_graph(
            &graph(),
            &GraphFilter {
                counterparty_query: "biedronka".into(),
                ..Default::default()
            },
        );
        assert_eq!(filtered.edges.len(), 1);
    }
}
