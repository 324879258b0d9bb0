//! Dependency ordering for plugin candidates
//!
//! Two strategies are available:
//! - `Topological`: depth-first topological sort with cycle detection. Visits
//!   candidates in their discovery order so independent plugins keep it.
//! - `Legacy`: the historical pairwise comparator. It is not transitive and can
//!   misorder chains longer than two or diamond shapes; kept for deployments
//!   that depend on the old load order.

use super::manifest::PluginManifest;
use crate::core::error::{BusError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Load-order strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyOrdering {
    /// Dependencies strictly before dependents; cycles are an error
    #[default]
    Topological,
    /// Pairwise comparator applied the way a timsort applies it to a short
    /// input: leading run detection followed by binary insertion
    Legacy,
}

impl std::fmt::Display for DependencyOrdering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyOrdering::Topological => write!(f, "topological"),
            DependencyOrdering::Legacy => write!(f, "legacy"),
        }
    }
}

/// Order manifests so each plugin comes after the plugins it depends on
pub fn order(manifests: Vec<PluginManifest>, strategy: DependencyOrdering) -> Result<Vec<PluginManifest>> {
    match strategy {
        DependencyOrdering::Topological => topological_order(manifests),
        DependencyOrdering::Legacy => Ok(legacy_order(manifests)),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Topological sort over the candidate set
///
/// Dependency names that match no candidate are ignored. Duplicate names (the
/// same plugin discovered twice) all satisfy a dependency on that name.
pub fn topological_order(manifests: Vec<PluginManifest>) -> Result<Vec<PluginManifest>> {
    let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, manifest) in manifests.iter().enumerate() {
        by_name.entry(manifest.name.as_str()).or_default().push(index);
    }

    // Dependencies are visited in discovery order, not in manifest key order
    let edges: Vec<Vec<usize>> = manifests
        .iter()
        .map(|manifest| {
            let mut deps: Vec<usize> = manifest
                .dependency_names()
                .filter_map(|name| by_name.get(name))
                .flatten()
                .copied()
                .collect();
            deps.sort_unstable();
            deps.dedup();
            deps
        })
        .collect();

    let mut marks = vec![Mark::Unvisited; manifests.len()];
    let mut stack = Vec::new();
    let mut sorted = Vec::with_capacity(manifests.len());

    for index in 0..manifests.len() {
        if marks[index] == Mark::Unvisited {
            visit(index, &edges, &mut marks, &mut stack, &mut sorted, &manifests)?;
        }
    }

    let mut slots: Vec<Option<PluginManifest>> = manifests.into_iter().map(Some).collect();
    Ok(sorted
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect())
}

fn visit(
    index: usize,
    edges: &[Vec<usize>],
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
    sorted: &mut Vec<usize>,
    manifests: &[PluginManifest],
) -> Result<()> {
    marks[index] = Mark::InProgress;
    stack.push(index);

    for &dep in &edges[index] {
        match marks[dep] {
            Mark::Unvisited => visit(dep, edges, marks, stack, sorted, manifests)?,
            Mark::InProgress => {
                // Report the cycle from the first occurrence of `dep` on the stack
                let start = stack.iter().position(|&i| i == dep).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..]
                    .iter()
                    .map(|&i| manifests[i].name.clone())
                    .collect();
                cycle.push(manifests[dep].name.clone());
                return Err(BusError::CyclicDependency(cycle));
            }
            Mark::Done => {}
        }
    }

    stack.pop();
    marks[index] = Mark::Done;
    sorted.push(index);
    Ok(())
}

/// Pairwise comparison used by the legacy strategy
///
/// Comparing `a` against `b`: if `b` declares no dependencies `a` goes after
/// `b`; else if `b` depends on `a`, `a` goes before `b`; otherwise after.
pub fn legacy_compare(a: &PluginManifest, b: &PluginManifest) -> Ordering {
    if b.dependencies.is_empty() {
        Ordering::Greater
    } else if b.depends_on(&a.name) {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Apply [`legacy_compare`] with run detection and binary insertion
///
/// The leading run (ascending, or strictly descending and then reversed) is
/// kept as is; every later candidate is placed by binary search over the
/// already placed prefix. This is the comparison sequence a timsort performs
/// on fewer than 64 elements, so the resulting order matches it exactly.
/// Larger candidate sets are still handled as a single run. The comparator is
/// not a total order so `sort_by` must not be used with it.
pub fn legacy_order(mut manifests: Vec<PluginManifest>) -> Vec<PluginManifest> {
    if manifests.len() < 2 {
        return manifests;
    }

    let run = leading_run(&mut manifests);
    for start in run..manifests.len() {
        let mut left = 0;
        let mut right = start;
        while left < right {
            let mid = left + (right - left) / 2;
            if legacy_compare(&manifests[start], &manifests[mid]) == Ordering::Less {
                right = mid;
            } else {
                left = mid + 1;
            }
        }
        manifests[left..=start].rotate_right(1);
    }
    manifests
}

/// Length of the leading run, reversing it in place when it is descending
fn leading_run(manifests: &mut [PluginManifest]) -> usize {
    let descending = legacy_compare(&manifests[1], &manifests[0]) == Ordering::Less;
    let mut run = 2;
    while run < manifests.len() {
        let less = legacy_compare(&manifests[run], &manifests[run - 1]) == Ordering::Less;
        if less != descending {
            break;
        }
        run += 1;
    }
    if descending {
        manifests[..run].reverse();
    }
    run
}
