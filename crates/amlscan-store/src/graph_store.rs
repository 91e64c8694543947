//! Flow graph persistence.
//!
//! DB ids are prefixed with `case_id:` to keep per-case uniqueness while
//! the graph-local ids stay stable for clients. Replacing a case's graph
//! (delete + insert) is one transaction.

use std::str::FromStr;

use amlscan_graph::{
    Cluster, EdgeType, FlowEdge, FlowGraph, FlowNode, GraphStats, NodeMetadata, NodeType,
    RiskLevel,
};
use rusqlite::params;
use rust_decimal::Decimal;
use tracing::info;

use crate::db::Store;
use crate::error::{StoreError, StoreResult};

fn node_type_parse(s: &str) -> NodeType {
    match s {
        "ACCOUNT" => NodeType::Account,
        "MERCHANT" => NodeType::Merchant,
        "CASH_NODE" => NodeType::CashNode,
        "PAYMENT_PROVIDER" => NodeType::PaymentProvider,
        _ => NodeType::Counterparty,
    }
}

fn cluster_parse(s: &str) -> Cluster {
    match s {
        "LOANS" => Cluster::Loans,
        "RISKY" => Cluster::Risky,
        "GAMBLING" => Cluster::Gambling,
        "CRYPTO" => Cluster::Crypto,
        "ACCOUNT" => Cluster::Account,
        _ => Cluster::Normal,
    }
}

fn edge_type_parse(s: &str) -> EdgeType {
    match s {
        "CARD_PAYMENT" => EdgeType::CardPayment,
        "BLIK_P2P" => EdgeType::BlikP2p,
        "BLIK_MERCHANT" => EdgeType::BlikMerchant,
        "CASH" => EdgeType::Cash,
        "REFUND" => EdgeType::Refund,
        "FEE" => EdgeType::Fee,
        _ => EdgeType::Transfer,
    }
}

impl Store {
    /// Replace the persisted graph for a case.
    pub fn save_graph(&self, case_id: &str, graph: &FlowGraph) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM graph_edges WHERE case_id = ?1", [case_id])?;
        tx.execute("DELETE FROM graph_nodes WHERE case_id = ?1", [case_id])?;

        {
            let mut node_stmt = tx.prepare(
                "INSERT INTO graph_nodes
                   (id, case_id, node_type, label, entity_id, risk_level, cluster, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for node in &graph.nodes {
                node_stmt.execute(params![
                    format!("{case_id}:{}", node.id),
                    case_id,
                    node.node_type.as_str(),
                    node.label,
                    node.entity_id.as_deref().unwrap_or(""),
                    node.risk_level.as_str(),
                    node.cluster.as_str(),
                    serde_json::to_string(&node.metadata)?,
                ])?;
            }

            let mut edge_stmt = tx.prepare(
                "INSERT INTO graph_edges
                   (id, case_id, source_id, target_id, edge_type,
                    tx_count, total_amount, first_date, last_date, tx_ids)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for edge in &graph.edges {
                edge_stmt.execute(params![
                    format!("{case_id}:{}", edge.id),
                    case_id,
                    format!("{case_id}:{}", edge.source),
                    format!("{case_id}:{}", edge.target),
                    edge.edge_type.as_str(),
                    edge.tx_count as i64,
                    edge.total_amount.to_string(),
                    edge.first_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    edge.last_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    serde_json::to_string(&edge.tx_ids)?,
                ])?;
            }
        }

        tx.commit()?;
        info!(
            case_id,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "graph saved"
        );
        Ok(())
    }

    /// Load the persisted graph for a case, mapping DB ids back to the
    /// graph-local form.
    pub fn load_graph(&self, case_id: &str) -> StoreResult<FlowGraph> {
        let prefix = format!("{case_id}:");
        let strip = |id: String| -> String {
            id.strip_prefix(&prefix).map(str::to_string).unwrap_or(id)
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, node_type, label, entity_id, risk_level, cluster, metadata
             FROM graph_nodes WHERE case_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([case_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut nodes = Vec::new();
        for row in rows {
            let (id, node_type, label, entity_id, risk_level, cluster, metadata) = row?;
            let metadata: NodeMetadata = serde_json::from_str(&metadata)?;
            nodes.push(FlowNode {
                id: strip(id),
                node_type: node_type_parse(&node_type),
                label,
                risk_level: RiskLevel::parse(&risk_level),
                cluster: cluster_parse(&cluster),
                entity_id: if entity_id.is_empty() {
                    None
                } else {
                    Some(entity_id)
                },
                metadata,
            });
        }

        let mut stmt = conn.prepare(
            "SELECT id, source_id, target_id, edge_type, tx_count, total_amount,
                    first_date, last_date, tx_ids
             FROM graph_edges WHERE case_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([case_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut edges = Vec::new();
        for row in rows {
            let (id, source, target, edge_type, tx_count, total_amount, first, last, tx_ids) =
                row?;
            edges.push(FlowEdge {
                id: strip(id),
                source: strip(source),
                target: strip(target),
                edge_type: edge_type_parse(&edge_type),
                tx_count: tx_count as usize,
                total_amount: Decimal::from_str(&total_amount)
                    .map_err(|e| StoreError::CorruptData(e.to_string()))?,
                first_date: first.and_then(|d| d.parse().ok()),
                last_date: last.and_then(|d| d.parse().ok()),
                tx_ids: serde_json::from_str(&tx_ids)?,
            });
        }

        let mut clusters = std::collections::BTreeMap::new();
        for node in &nodes {
            *clusters.entry(node.cluster).or_insert(0) += 1;
        }
        let stats = GraphStats {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            total_transactions: 0,
            clusters,
        };

        Ok(FlowGraph { nodes, edges, stats })
    }
}
