//! Flow graph construction.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use amlscan_core::{Channel, Direction, NormalizedTransaction};

use crate::model::{
    Cluster, EdgeType, FlowEdge, FlowGraph, FlowNode, GraphStats, NodeMetadata, NodeType,
    RiskLevel, EDGE_TX_IDS_CAP,
};

/// Graph-local id of the statement owner's account node.
pub const ACCOUNT_NODE_ID: &str = "account_own";

/// Derive a node's type from the transaction channel.
fn node_type_for(channel: Channel) -> NodeType {
    match channel {
        Channel::Card | Channel::BlikMerchant => NodeType::Merchant,
        Channel::Cash => NodeType::CashNode,
        Channel::Fee => NodeType::PaymentProvider,
        _ => NodeType::Counterparty,
    }
}

/// Risk level a single transaction contributes to its counterparty node.
fn risk_level_for(tx: &NormalizedTransaction) -> RiskLevel {
    let high = ["crypto", "gambling", "BLACKLISTED"];
    let medium = ["risky", "loans"];
    if tx.risk_tags.iter().any(|t| high.contains(&t.as_str())) {
        RiskLevel::High
    } else if tx.risk_tags.iter().any(|t| medium.contains(&t.as_str())) {
        RiskLevel::Medium
    } else if tx.risk_score > 0 {
        RiskLevel::Low
    } else {
        RiskLevel::None
    }
}

/// Cluster derived from the first matching risk tag.
fn cluster_for(tx: &NormalizedTransaction) -> Cluster {
    for tag in &tx.risk_tags {
        let name = tag.strip_prefix("RISK:").unwrap_or(tag).to_lowercase();
        if name.starts_with("crypto") {
            return Cluster::Crypto;
        }
        if name.starts_with("gambling") {
            return Cluster::Gambling;
        }
        if name.starts_with("loans") {
            return Cluster::Loans;
        }
        if name.starts_with("risky") {
            return Cluster::Risky;
        }
    }
    Cluster::Normal
}

/// Build the directed money-flow graph for one statement's transactions.
///
/// Debits flow account→counterparty, credits counterparty→account. Node
/// merges escalate risk level and cluster and aggregate totals; edges are
/// deduplicated by `(source, target, type)`.
pub fn build_graph(transactions: &[NormalizedTransaction], account_label: &str) -> FlowGraph {
    let mut nodes: BTreeMap<String, FlowNode> = BTreeMap::new();
    let mut edges: BTreeMap<String, FlowEdge> = BTreeMap::new();

    nodes.insert(
        ACCOUNT_NODE_ID.to_string(),
        FlowNode {
            id: ACCOUNT_NODE_ID.to_string(),
            node_type: NodeType::Account,
            label: account_label.to_string(),
            risk_level: RiskLevel::None,
            cluster: Cluster::Account,
            entity_id: None,
            metadata: NodeMetadata::default(),
        },
    );

    for tx in transactions {
        let cp_label = if !tx.counterparty_raw.is_empty() {
            tx.counterparty_raw.clone()
        } else if !tx.title.is_empty() {
            tx.title.clone()
        } else {
            "Nieznany".to_string()
        };
        let cp_key: String = if tx.counterparty_clean.is_empty() {
            "unknown".to_string()
        } else {
            tx.counterparty_clean.to_lowercase().chars().take(80).collect()
        };
        let cp_node_id = format!("cp_{cp_key}");

        let risk_level = risk_level_for(tx);
        let cluster = cluster_for(tx);

        match nodes.entry(cp_node_id.clone()) {
            Entry::Vacant(slot) => {
                let metadata = NodeMetadata {
                    categories: tx.risk_tags.iter().cloned().collect(),
                    channel: Some(tx.channel),
                    total_amount: tx.abs_amount().round_dp(2),
                    tx_count: 1,
                };
                slot.insert(FlowNode {
                    id: cp_node_id.clone(),
                    node_type: node_type_for(tx.channel),
                    label: cp_label.chars().take(60).collect(),
                    risk_level,
                    cluster,
                    entity_id: tx.counterparty_id.clone(),
                    metadata,
                });
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if risk_level > existing.risk_level {
                    existing.risk_level = risk_level;
                }
                if cluster.priority() > existing.cluster.priority() {
                    existing.cluster = cluster;
                }
                existing.metadata.total_amount =
                    (existing.metadata.total_amount + tx.abs_amount()).round_dp(2);
                existing.metadata.tx_count += 1;
                existing
                    .metadata
                    .categories
                    .extend(tx.risk_tags.iter().cloned());
            }
        }

        let edge_type = EdgeType::from_channel(tx.channel);
        let (source, target) = match tx.direction {
            Direction::Debit => (ACCOUNT_NODE_ID.to_string(), cp_node_id.clone()),
            Direction::Credit => (cp_node_id.clone(), ACCOUNT_NODE_ID.to_string()),
        };
        let edge_key = format!("{source}->{target}|{}", edge_type.as_str());

        let edge = edges.entry(edge_key.clone()).or_insert_with(|| FlowEdge {
            id: edge_key,
            source,
            target,
            edge_type,
            tx_count: 0,
            total_amount: rust_decimal::Decimal::ZERO,
            first_date: None,
            last_date: None,
            tx_ids: Vec::new(),
        });
        edge.tx_count += 1;
        edge.total_amount = (edge.total_amount + tx.abs_amount()).round_dp(2);
        edge.first_date = Some(match edge.first_date {
            Some(d) if d <= tx.booking_date => d,
            _ => tx.booking_date,
        });
        edge.last_date = Some(match edge.last_date {
            Some(d) if d >= tx.booking_date => d,
            _ => tx.booking_date,
        });
        if edge.tx_ids.len() < EDGE_TX_IDS_CAP {
            edge.tx_ids.push(tx.id.clone());
        }
    }

    let mut clusters: BTreeMap<Cluster, usize> = BTreeMap::new();
    for node in nodes.values() {
        *clusters.entry(node.cluster).or_insert(0) += 1;
    }

    let stats = GraphStats {
        total_nodes: nodes.len(),
        total_edges: edges.len(),
        total_transactions: transactions.len(),
        clusters,
    };

    FlowGraph {
        nodes: nodes.into_values().collect(),
        edges: edges.into_values().collect(),
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amlscan_core::{normalize_transactions, RawTransaction};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn sample() -> Vec<NormalizedTransaction> {
        let raw = vec![
            RawTransaction::new(d("2024-01-05"), dec!(-150.00))
                .with_counterparty("BIEDRONKA WARSZAWA")
                .with_bank_category("TR.KART"),
            RawTransaction::new(d("2024-01-08"), dec!(-80.00))
                .with_counterparty("BIEDRONKA WARSZAWA")
                .with_bank_category("TR.KART"),
            RawTransaction::new(d("2024-01-10"), dec!(5000.00))
                .with_counterparty("FIRMA XYZ SP Z O O")
                .with_bank_category("PRZELEW"),
            RawTransaction::new(d("2024-01-22"), dec!(-3000.00))
                .with_counterparty("BANKOMAT WARSZAWA")
                .with_title("Wypłata gotówkowa"),
        ];
        normalize_transactions(&raw, "s")
    }

    #[test]
    fn test_account_node_always_present() {
        let graph = build_graph(&sample(), "Moje konto");
        let accounts: Vec<&FlowNode> = graph
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Account)
            .collect();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, ACCOUNT_NODE_ID);
        assert_eq!(accounts[0].cluster, Cluster::Account);
    }

    #[test]
    fn test_edge_aggregation() {
        let graph = build_graph(&sample(), "Moje konto");
        // Two card payments to the same merchant collapse into one edge.
        let card_edges: Vec<&FlowEdge> = graph
            .edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::CardPayment)
            .collect();
        assert_eq!(card_edges.len(), 1);
        assert_eq!(card_edges[0].tx_count, 2);
        assert_eq!(card_edges[0].total_amount, dec!(230.00));
        assert_eq!(card_edges[0].first_date, Some(d("2024-01-05")));
        assert_eq!(card_edges[0].last_date, Some(d("2024-01-08")));
    }

    #[test]
    fn test_direction_determines_endpoints() {
        let graph = build_graph(&sample(), "Moje konto");
        let credit_edge = graph
            .edges
            .iter()
            .find(|e| e.target == ACCOUNT_NODE_ID)
            .unwrap();
        assert!(credit_edge.source.starts_with("cp_firma xyz"));
    }

    #[test]
    fn test_node_types_from_channel() {
        let graph = build_graph(&sample(), "Moje konto");
        assert_eq!(
            graph.node("cp_biedronka warszawa").unwrap().node_type,
            NodeType::Merchant
        );
        assert_eq!(
            graph.node("cp_bankomat warszawa").unwrap().node_type,
            NodeType::CashNode
        );
    }

    #[test]
    fn test_risk_escalation_monotonic() {
        let mut txns = sample();
        // Same counterparty seen twice: first clean, then tagged crypto.
        txns[0].risk_tags.clear();
        txns[1].risk_tags = vec!["crypto".to_string()];
        let graph = build_graph(&txns, "Moje konto");
        let node = graph.node("cp_biedronka warszawa").unwrap();
        assert_eq!(node.risk_level, RiskLevel::High);
        assert_eq!(node.cluster, Cluster::Crypto);

        // Reversed order must converge to the same escalated state.
        txns.swap(0, 1);
        let graph2 = build_graph(&txns, "Moje konto");
        let node2 = graph2.node("cp_biedronka warszawa").unwrap();
        assert_eq!(node2.risk_level, RiskLevel::High);
        assert_eq!(node2.cluster, Cluster::Crypto);
    }

    #[test]
    fn test_graph_consistency() {
        let graph = build_graph(&sample(), "Moje konto");
        assert_eq!(graph.stats.total_nodes, graph.nodes.len());
        assert_eq!(graph.stats.total_edges, graph.edges.len());
        // Every edge endpoint is a known node.
        for edge in &graph.edges {
            assert!(graph.node(&edge.source).is_some());
            assert!(graph.node(&edge.target).is_some());
        }
        // Edge count never exceeds total aggregated transactions.
        let tx_total: usize = graph.edges.iter().map(|e| e.tx_count).sum();
        assert!(graph.stats.total_edges <= tx_total);
    }

    #[test]
    fn test_empty_counterparty_becomes_unknown() {
        let raw = vec![RawTransaction::new(d("2024-01-05"), dec!(-10.00))];
        let txns = normalize_transactions(&raw, "s");
        let graph = build_graph(&txns, "Moje konto");
        assert!(graph.node("cp_unknown").is_some());
    }

    #[test]
    fn test_tx_ids_capped() {
        let raw: Vec<RawTransaction> = (0..30)
            .map(|i| {
                RawTransaction::new(d("2024-01-01"), rust_decimal::Decimal::new(-100 - i, 2))
                    .with_counterparty("SKLEP")
                    .with_bank_category("TR.KART")
            })
            .collect();
        let txns = normalize_transactions(&raw, "s");
        let graph = build_graph(&txns, "Moje konto");
        let edge = &graph.edges[0];
        assert_eq!(edge.tx_count, 30);
        assert_eq!(edge.tx_ids.len(), EDGE_TX_IDS_CAP);
    }
}
