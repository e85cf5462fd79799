//! # molpc-examples utilities
//!
//! Helpers shared by the demos: conversion of sampled graphs to petgraph,
//! batch statistics and plain-text rendering.

use molpc_core::{MixtureVariant, NO_BOND, PADDING};
use molpc_models::MolGraph;
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

/// A molecule with atom labels as node weights and bond labels as edge weights.
pub type MoleculeGraph = UnGraph<i64, i64>;

/// Which node slots hold an atom.
///
/// Size-prior models mark absent atoms with [`PADDING`]; plain models treat
/// every slot as an atom.
pub fn present_atoms(graph: &MolGraph, variant: MixtureVariant) -> Vec<bool> {
    graph
        .nodes
        .iter()
        .map(|&x| variant == MixtureVariant::Plain || x != PADDING)
        .collect()
}

/// Build a petgraph molecule from a sampled graph.
///
/// # Returns
///
/// A tuple of (graph, slots) where `slots[i]` is the node of slot `i`, `None`
/// for absent atoms.
pub fn to_molecule_graph(
    graph: &MolGraph,
    variant: MixtureVariant,
) -> (MoleculeGraph, Vec<Option<NodeIndex>>) {
    let mut molecule = UnGraph::new_undirected();
    let slots: Vec<Option<NodeIndex>> = present_atoms(graph, variant)
        .into_iter()
        .zip(&graph.nodes)
        .map(|(present, &label)| present.then(|| molecule.add_node(label)))
        .collect();

    let n = graph.max_nodes();
    for i in 0..n {
        for j in 0..i {
            let bond = graph.edge(i, j);
            if bond == NO_BOND {
                continue;
            }
            if let (Some(a), Some(b)) = (slots[i], slots[j]) {
                molecule.add_edge(a, b, bond);
            }
        }
    }

    (molecule, slots)
}

/// Aggregate statistics over a batch of sampled molecules.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub molecules: usize,
    pub mean_atoms: f64,
    pub mean_bonds: f64,
    /// Share of molecules that form a single connected component
    pub connected_fraction: f64,
    /// `atom_counts[k]` molecules with exactly `k` atoms
    pub atom_counts: Vec<usize>,
    /// `bond_types[t]` bonds of type `t` across the batch
    pub bond_types: Vec<usize>,
}

pub fn summarize(graphs: &[MolGraph], variant: MixtureVariant, edge_categories: usize) -> BatchSummary {
    let max_nodes = graphs.first().map_or(0, MolGraph::max_nodes);
    let mut atom_counts = vec![0; max_nodes + 1];
    let mut bond_types = vec![0; edge_categories];
    let mut atoms = 0;
    let mut bonds = 0;
    let mut connected = 0;

    for graph in graphs {
        let (molecule, _) = to_molecule_graph(graph, variant);
        atoms += molecule.node_count();
        bonds += molecule.edge_count();
        atom_counts[molecule.node_count()] += 1;
        if molecule.node_count() > 0 && connected_components(&molecule) == 1 {
            connected += 1;
        }
        for edge in molecule.edge_references() {
            if let Some(count) = bond_types.get_mut(*edge.weight() as usize) {
                *count += 1;
            }
        }
    }

    let total = graphs.len().max(1) as f64;
    BatchSummary {
        molecules: graphs.len(),
        mean_atoms: atoms as f64 / total,
        mean_bonds: bonds as f64 / total,
        connected_fraction: connected as f64 / total,
        atom_counts,
        bond_types,
    }
}

/// One-line rendering, e.g. `atoms [2 1 3] bonds 1-0:1 2-1:2`.
///
/// Bonds are named by node slot, so padding slots keep their numbers.
pub fn render(graph: &MolGraph, variant: MixtureVariant) -> String {
    let (molecule, slots) = to_molecule_graph(graph, variant);
    let present: Vec<(usize, NodeIndex)> = slots
        .iter()
        .enumerate()
        .filter_map(|(slot, node)| node.map(|node| (slot, node)))
        .collect();

    let atoms: Vec<String> = present
        .iter()
        .map(|&(_, node)| molecule[node].to_string())
        .collect();
    let mut out = format!("atoms [{}] bonds", atoms.join(" "));
    for (k, &(i, a)) in present.iter().enumerate() {
        for &(j, b) in &present[..k] {
            if let Some(edge) = molecule.find_edge(a, b) {
                out.push_str(&format!(" {i}-{j}:{}", molecule[edge]));
            }
        }
    }
    out
}
