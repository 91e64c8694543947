//! Flow graph model.
//!
//! Persisted as flat node/edge lists with string-id references, so there
//! are no object cycles; lookups go through the id maps.

use std::collections::{BTreeMap, BTreeSet};

use amlscan_core::Channel;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Node kind in the flow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Account,
    Counterparty,
    Merchant,
    CashNode,
    PaymentProvider,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Account => "ACCOUNT",
            NodeType::Counterparty => "COUNTERPARTY",
            NodeType::Merchant => "MERCHANT",
            NodeType::CashNode => "CASH_NODE",
            NodeType::PaymentProvider => "PAYMENT_PROVIDER",
        }
    }
}

/// Node risk level; merges only escalate, never downgrade.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "low" => RiskLevel::Low,
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            _ => RiskLevel::None,
        }
    }
}

/// Risk cluster a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cluster {
    #[default]
    Normal,
    Loans,
    Risky,
    Gambling,
    Crypto,
    /// The owner's account node.
    Account,
}

impl Cluster {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::Normal => "NORMAL",
            Cluster::Loans => "LOANS",
            Cluster::Risky => "RISKY",
            Cluster::Gambling => "GAMBLING",
            Cluster::Crypto => "CRYPTO",
            Cluster::Account => "ACCOUNT",
        }
    }

    /// Escalation priority. GAMBLING and CRYPTO tie at the top: whichever
    /// was assigned first wins on merge.
    pub fn priority(&self) -> u8 {
        match self {
            Cluster::Normal => 0,
            Cluster::Loans => 1,
            Cluster::Risky => 2,
            Cluster::Gambling | Cluster::Crypto => 3,
            Cluster::Account => 0,
        }
    }
}

/// Aggregated per-node metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Union of risk tags seen on this node's transactions.
    pub categories: BTreeSet<String>,
    /// Channel of the first transaction that created the node.
    pub channel: Option<Channel>,
    pub total_amount: Decimal,
    pub tx_count: usize,
}

/// A node in the flow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowNode {
    /// Graph-local id: `account_own` or `cp_<key>`.
    pub id: String,
    pub node_type: NodeType,
    /// Display label, truncated to 60 chars.
    pub label: String,
    pub risk_level: RiskLevel,
    pub cluster: Cluster,
    /// Counterparty memory link, when resolved.
    pub entity_id: Option<String>,
    pub metadata: NodeMetadata,
}

/// Edge kind, derived from the transaction channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    Transfer,
    CardPayment,
    BlikP2p,
    BlikMerchant,
    Cash,
    Refund,
    Fee,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Transfer => "TRANSFER",
            EdgeType::CardPayment => "CARD_PAYMENT",
            EdgeType::BlikP2p => "BLIK_P2P",
            EdgeType::BlikMerchant => "BLIK_MERCHANT",
            EdgeType::Cash => "CASH",
            EdgeType::Refund => "REFUND",
            EdgeType::Fee => "FEE",
        }
    }

    /// Map a channel to its edge type; unknown rails travel as transfers.
    pub fn from_channel(channel: Channel) -> Self {
        match channel {
            Channel::Card => EdgeType::CardPayment,
            Channel::Transfer => EdgeType::Transfer,
            Channel::BlikP2p => EdgeType::BlikP2p,
            Channel::BlikMerchant => EdgeType::BlikMerchant,
            Channel::Cash => EdgeType::Cash,
            Channel::Refund => EdgeType::Refund,
            Channel::Fee => EdgeType::Fee,
            Channel::Other => EdgeType::Transfer,
        }
    }
}

/// Maximum number of transaction ids stored per edge.
pub const EDGE_TX_IDS_CAP: usize = 20;

/// An aggregated directed edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEdge {
    /// `source->target|type`.
    pub id: String,
    pub source: String,
    pub target: String,
    pub edge_type: EdgeType,
    pub tx_count: usize,
    pub total_amount: Decimal,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Evidence transaction ids, capped at [`EDGE_TX_IDS_CAP`].
    pub tx_ids: Vec<String>,
}

/// Graph-level statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub total_transactions: usize,
    /// Node count per cluster.
    pub clusters: BTreeMap<Cluster, usize>,
}

/// The complete flow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
    pub stats: GraphStats,
}

impl FlowGraph {
    /// Look up a node by graph-local id.
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::None < RiskLevel::Low);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }

    #[test]
    fn test_cluster_priority_tie() {
        assert_eq!(Cluster::Gambling.priority(), Cluster::Crypto.priority());
        assert!(Cluster::Loans.priority() < Cluster::Risky.priority());
    }

    #[test]
    fn test_edge_type_from_channel() {
        assert_eq!(EdgeType::from_channel(Channel::Card), EdgeType::CardPayment);
        assert_eq!(EdgeType::from_channel(Channel::Other), EdgeType::Transfer);
    }
}
