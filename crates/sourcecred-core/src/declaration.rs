//! Plugin declarations.
//!
//! A plugin announces the kinds of nodes and edges it emits: each type
//! claims an address prefix and a default weight. Declarations are the
//! source of default weights (users can override them) and tell the scoring
//! step which nodes represent participants.

use serde::{Deserialize, Serialize};

use crate::address::{EdgeAddress, NodeAddress};
use crate::errors::CredError;
use crate::weights::{EdgeWeight, NodeWeight, Weights};

/// First address part claimed by every plugin.
pub const VENDOR_PREFIX: &str = "sourcecred";

/// A kind of node a plugin can emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeType {
    pub name: String,
    pub plural_name: String,
    pub prefix: NodeAddress,
    pub default_weight: NodeWeight,
    pub description: String,
}

/// A kind of edge a plugin can emit. The two names describe the relation
/// read along and against the edge's direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeType {
    pub forward_name: String,
    pub backward_name: String,
    pub prefix: EdgeAddress,
    pub default_weight: EdgeWeight,
    pub description: String,
}

/// Everything a plugin declares about itself.
///
/// `user_types` marks which node types represent scoring participants. A
/// user type must also appear in `node_types` and must carry a zero default
/// weight, so participants earn cred from their contributions rather than
/// minting it by existing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDeclaration {
    pub name: String,
    pub node_prefix: NodeAddress,
    pub edge_prefix: EdgeAddress,
    pub node_types: Vec<NodeType>,
    pub edge_types: Vec<EdgeType>,
    pub user_types: Vec<NodeType>,
}

impl PluginDeclaration {
    /// Checks the declaration's internal consistency.
    ///
    /// # Errors
    ///
    /// - [`CredError::InvalidAddress`] when a prefix falls outside the
    ///   plugin's namespace or the namespace is not under
    ///   `["sourcecred", name]`
    /// - [`CredError::InvalidWeight`] when a default weight is negative or
    ///   non-finite, or a user type carries a nonzero default weight
    pub fn validate(&self) -> Result<(), CredError> {
        if self.name.is_empty() {
            return Err(CredError::InvalidAddress(
                "plugin name must be non-empty".to_string(),
            ));
        }
        let node_namespace = NodeAddress::from_parts([VENDOR_PREFIX, &self.name])?;
        let edge_namespace = EdgeAddress::from_parts([VENDOR_PREFIX, &self.name])?;
        if !self.node_prefix.has_prefix(&node_namespace) {
            return Err(CredError::InvalidAddress(format!(
                "plugin {:?} node prefix {} is outside {}",
                self.name, self.node_prefix, node_namespace
            )));
        }
        if !self.edge_prefix.has_prefix(&edge_namespace) {
            return Err(CredError::InvalidAddress(format!(
                "plugin {:?} edge prefix {} is outside {}",
                self.name, self.edge_prefix, edge_namespace
            )));
        }

        for node_type in &self.node_types {
            if !node_type.prefix.has_prefix(&self.node_prefix) {
                return Err(CredError::InvalidAddress(format!(
                    "node type {:?} prefix {} is outside {}",
                    node_type.name, node_type.prefix, self.node_prefix
                )));
            }
            check_weight(&node_type.name, node_type.default_weight)?;
        }
        for edge_type in &self.edge_types {
            if !edge_type.prefix.has_prefix(&self.edge_prefix) {
                return Err(CredError::InvalidAddress(format!(
                    "edge type {:?} prefix {} is outside {}",
                    edge_type.forward_name, edge_type.prefix, self.edge_prefix
                )));
            }
            check_weight(&edge_type.forward_name, edge_type.default_weight.forwards)?;
            check_weight(&edge_type.forward_name, edge_type.default_weight.backwards)?;
        }

        for user_type in &self.user_types {
            if !self.node_types.contains(user_type) {
                return Err(CredError::InvalidAddress(format!(
                    "user type {:?} is not among the declared node types",
                    user_type.name
                )));
            }
            if user_type.default_weight != 0.0 {
                return Err(CredError::InvalidWeight(format!(
                    "user type {:?} must have zero default weight, found {}",
                    user_type.name, user_type.default_weight
                )));
            }
        }
        Ok(())
    }
}

fn check_weight(name: &str, weight: f64) -> Result<(), CredError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(CredError::InvalidWeight(format!(
            "type {name:?} declares default weight {weight}"
        )));
    }
    Ok(())
}

/// Collects the default weights of several declarations into one weights
/// map. When two declarations claim the same prefix, the later one wins.
pub fn weights_from_declarations(declarations: &[PluginDeclaration]) -> Weights {
    let mut weights = Weights::new();
    for declaration in declarations {
        for node_type in &declaration.node_types {
            weights.set_node_weight(node_type.prefix.clone(), node_type.default_weight);
        }
        for edge_type in &declaration.edge_types {
            weights.set_edge_weight(edge_type.prefix.clone(), edge_type.default_weight);
        }
    }
    weights
}
