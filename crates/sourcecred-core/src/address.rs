//! Structured addresses for nodes and edges.
//!
//! An address is an ordered list of non-empty UTF-8 parts, stored internally
//! as a single string joined with a NUL separator. Because valid parts can
//! never contain NUL, the joined form is injective: two addresses are equal
//! exactly when their part lists are equal, and byte-wise comparison of the
//! joined form agrees with part-wise lexicographic comparison.
//!
//! Node and edge addresses are deliberately distinct types. They never
//! compare equal and cannot be substituted for one another, even when their
//! parts coincide.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::CredError;

/// Separator byte for the joined address form. Parts are validated to never
/// contain it.
pub(crate) const SEPARATOR: char = '\0';

fn join_parts<I, S>(kind: &str, parts: I) -> Result<Arc<str>, CredError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    let mut first = true;
    for part in parts {
        let part = part.as_ref();
        if part.is_empty() {
            return Err(CredError::InvalidAddress(format!(
                "{kind} address contains an empty part"
            )));
        }
        if part.contains(SEPARATOR) {
            return Err(CredError::InvalidAddress(format!(
                "{kind} address part {part:?} contains the separator byte"
            )));
        }
        if first {
            first = false;
        } else {
            joined.push(SEPARATOR);
        }
        joined.push_str(part);
    }
    Ok(Arc::from(joined))
}

fn check_raw(kind: &str, raw: &str) -> Result<(), CredError> {
    if raw.is_empty() {
        return Ok(());
    }
    if raw.split(SEPARATOR).any(str::is_empty) {
        return Err(CredError::InvalidAddress(format!(
            "{kind} address string {raw:?} contains an empty part"
        )));
    }
    Ok(())
}

fn raw_has_prefix(addr: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    // A prefix must end exactly on a part boundary, so the next byte in the
    // longer address has to be the separator.
    addr.len() >= prefix.len()
        && addr.as_bytes()[..prefix.len()] == *prefix.as_bytes()
        && (addr.len() == prefix.len() || addr.as_bytes()[prefix.len()] == 0)
}

fn fmt_address(f: &mut fmt::Formatter<'_>, name: &str, raw: &str) -> fmt::Result {
    write!(f, "{name}[")?;
    let mut first = true;
    // Splitting "" yields one empty segment; valid parts are never empty.
    for part in raw.split(SEPARATOR).filter(|p| !p.is_empty()) {
        if first {
            first = false;
        } else {
            write!(f, ", ")?;
        }
        write!(f, "{part:?}")?;
    }
    write!(f, "]")
}

/// Address of a node. Ordered by part-wise lexicographic comparison.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeAddress(Arc<str>);

/// Address of an edge. Ordered by part-wise lexicographic comparison.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeAddress(Arc<str>);

impl NodeAddress {
    /// The address with no parts. It is a prefix of every node address.
    pub fn empty() -> Self {
        NodeAddress(Arc::from(""))
    }

    /// Builds an address from parts. Every part must be non-empty and free
    /// of the separator byte. An empty part list yields [`NodeAddress::empty`].
    pub fn from_parts<I, S>(parts: I) -> Result<Self, CredError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        join_parts("node", parts).map(NodeAddress)
    }

    /// Parses the separator-joined raw form, as used for serialized map keys.
    pub fn from_raw(raw: &str) -> Result<Self, CredError> {
        check_raw("node", raw)?;
        Ok(NodeAddress(Arc::from(raw)))
    }

    /// The separator-joined raw form. This is the string used as a map key
    /// in serialized weights and scores.
    pub fn raw(&self) -> &str {
        &self.0
    }

    /// Iterates over the parts in order.
    pub fn parts(&self) -> impl Iterator<Item = &str> + '_ {
        // Splitting "" yields one empty segment; valid parts are never empty.
        self.0.split(SEPARATOR).filter(|p| !p.is_empty())
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts().count()
    }

    /// True for the empty address.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new address with `parts` appended.
    pub fn append<I, S>(&self, parts: I) -> Result<Self, CredError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffix = join_parts("node", parts)?;
        if self.0.is_empty() {
            return Ok(NodeAddress(suffix));
        }
        if suffix.is_empty() {
            return Ok(self.clone());
        }
        let mut joined = String::with_capacity(self.0.len() + 1 + suffix.len());
        joined.push_str(&self.0);
        joined.push(SEPARATOR);
        joined.push_str(&suffix);
        Ok(NodeAddress(Arc::from(joined)))
    }

    /// True when `prefix`'s parts form an initial segment of this address's
    /// parts. Every address is a prefix of itself.
    pub fn has_prefix(&self, prefix: &NodeAddress) -> bool {
        raw_has_prefix(&self.0, &prefix.0)
    }
}

impl EdgeAddress {
    /// The address with no parts. It is a prefix of every edge address.
    pub fn empty() -> Self {
        EdgeAddress(Arc::from(""))
    }

    /// Builds an address from parts. Every part must be non-empty and free
    /// of the separator byte. An empty part list yields [`EdgeAddress::empty`].
    pub fn from_parts<I, S>(parts: I) -> Result<Self, CredError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        join_parts("edge", parts).map(EdgeAddress)
    }

    /// Parses the separator-joined raw form, as used for serialized map keys.
    pub fn from_raw(raw: &str) -> Result<Self, CredError> {
        check_raw("edge", raw)?;
        Ok(EdgeAddress(Arc::from(raw)))
    }

    /// The separator-joined raw form. This is the string used as a map key
    /// in serialized weights.
    pub fn raw(&self) -> &str {
        &self.0
    }

    /// Iterates over the parts in order.
    pub fn parts(&self) -> impl Iterator<Item = &str> + '_ {
        // Splitting "" yields one empty segment; valid parts are never empty.
        self.0.split(SEPARATOR).filter(|p| !p.is_empty())
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts().count()
    }

    /// True for the empty address.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new address with `parts` appended.
    pub fn append<I, S>(&self, parts: I) -> Result<Self, CredError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffix = join_parts("edge", parts)?;
        if self.0.is_empty() {
            return Ok(EdgeAddress(suffix));
        }
        if suffix.is_empty() {
            return Ok(self.clone());
        }
        let mut joined = String::with_capacity(self.0.len() + 1 + suffix.len());
        joined.push_str(&self.0);
        joined.push(SEPARATOR);
        joined.push_str(&suffix);
        Ok(EdgeAddress(Arc::from(joined)))
    }

    /// True when `prefix`'s parts form an initial segment of this address's
    /// parts. Every address is a prefix of itself.
    pub fn has_prefix(&self, prefix: &EdgeAddress) -> bool {
        raw_has_prefix(&self.0, &prefix.0)
    }
}

impl Borrow<str> for NodeAddress {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for EdgeAddress {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_address(f, "NodeAddress", &self.0)
    }
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_address(f, "NodeAddress", &self.0)
    }
}

impl fmt::Display for EdgeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_address(f, "EdgeAddress", &self.0)
    }
}

impl fmt::Debug for EdgeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_address(f, "EdgeAddress", &self.0)
    }
}

impl Serialize for NodeAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.parts())
    }
}

impl<'de> Deserialize<'de> for NodeAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = Vec::<String>::deserialize(deserializer)?;
        NodeAddress::from_parts(&parts).map_err(D::Error::custom)
    }
}

impl Serialize for EdgeAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.parts())
    }
}

impl<'de> Deserialize<'de> for EdgeAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = Vec::<String>::deserialize(deserializer)?;
        EdgeAddress::from_parts(&parts).map_err(D::Error::custom)
    }
}
