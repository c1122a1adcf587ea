//! Method resolution order over resolved `inherits_from` links.
//!
//! Python orders base classes with C3 linearization. Hierarchies that have no
//! C3 order (or contain a cycle) fall back to a depth-first, left-to-right
//! walk so self-call dispatch still finds something sensible.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Class id -> resolved base ids in declaration order
pub type Hierarchy = HashMap<String, Vec<String>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MroError {
    #[error("inconsistent hierarchy for class '{0}': no C3 linearization")]
    InconsistentHierarchy(String),

    #[error("inheritance cycle through class '{0}'")]
    Cycle(String),
}

/// C3 linearization of `class_id`, starting with the class itself.
/// Classes missing from `hierarchy` have no bases.
pub fn c3_linearization(class_id: &str, hierarchy: &Hierarchy) -> Result<Vec<String>, MroError> {
    let mut visiting = HashSet::new();
    linearize(class_id, hierarchy, &mut visiting)
}

fn linearize(
    class_id: &str,
    hierarchy: &Hierarchy,
    visiting: &mut HashSet<String>,
) -> Result<Vec<String>, MroError> {
    if !visiting.insert(class_id.to_string()) {
        return Err(MroError::Cycle(class_id.to_string()));
    }

    let bases = hierarchy.get(class_id).map(Vec::as_slice).unwrap_or_default();
    let mut sequences = Vec::with_capacity(bases.len() + 1);
    for base in bases {
        sequences.push(linearize(base, hierarchy, visiting)?);
    }
    sequences.push(bases.to_vec());

    visiting.remove(class_id);

    let mut order = vec![class_id.to_string()];
    order.extend(
        merge(sequences).ok_or_else(|| MroError::InconsistentHierarchy(class_id.to_string()))?,
    );
    Ok(order)
}

/// C3 merge: repeatedly take the first head that appears in no tail
fn merge(mut sequences: Vec<Vec<String>>) -> Option<Vec<String>> {
    let mut result = Vec::new();

    loop {
        sequences.retain(|seq| !seq.is_empty());
        if sequences.is_empty() {
            return Some(result);
        }

        let candidate = sequences
            .iter()
            .map(|seq| &seq[0])
            .find(|head| !sequences.iter().any(|seq| seq[1..].contains(*head)))?
            .clone();

        for seq in &mut sequences {
            if seq.first() == Some(&candidate) {
                seq.remove(0);
            }
        }
        result.push(candidate);
    }
}

/// Depth-first, left-to-right order without repeats; tolerates cycles
#[must_use]
pub fn depth_first_order(class_id: &str, hierarchy: &Hierarchy) -> Vec<String> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![class_id];

    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        order.push(current.to_string());
        if let Some(bases) = hierarchy.get(current) {
            stack.extend(bases.iter().rev().map(String::as_str));
        }
    }
    order
}

/// C3 order, or the depth-first order when the hierarchy has none
#[must_use]
pub fn method_resolution_order(class_id: &str, hierarchy: &Hierarchy) -> Vec<String> {
    c3_linearization(class_id, hierarchy).unwrap_or_else(|err| {
        log::debug!("{err}; using depth-first order");
        depth_first_order(class_id, hierarchy)
    })
}
