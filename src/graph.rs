//! Minimum spanning tree over a pairwise distance matrix.
//!
//! Globalization only needs, for every shape, the tree path from the base
//! shape. Kruskal's algorithm is run over the symmetrised distances with
//! edges ordered by `(weight, i, j)`, which makes the tree reproducible when
//! distances tie. Pairs with non-finite distance (failed alignments) are left
//! out, so the result may be a forest.

use nalgebra::DMatrix;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::{depth_first_search, DfsEvent};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct SpanningTree {
    graph: UnGraph<(), f64>,
}

impl SpanningTree {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Tree edges as `(i, j, weight)` with `i < j`, in the order Kruskal
    /// accepted them.
    pub fn edges(&self) -> Vec<(usize, usize, f64)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|e| (e.source().index(), e.target().index(), e.weight))
            .collect()
    }

    pub fn total_weight(&self) -> f64 {
        self.graph.edge_weights().sum()
    }

    /// Parent of every node when the tree is hung from `root`; `None` for the
    /// root itself and for nodes in other components.
    pub fn parents(&self, root: usize) -> Vec<Option<usize>> {
        let mut parents = vec![None; self.graph.node_count()];
        if root < parents.len() {
            depth_first_search(&self.graph, Some(NodeIndex::new(root)), |event| {
                if let DfsEvent::TreeEdge(u, v) = event {
                    parents[v.index()] = Some(u.index());
                }
            });
        }
        parents
    }

    /// Nodes on the tree path from `root` to `target`, both included.
    pub fn path(&self, root: usize, target: usize) -> Option<Vec<usize>> {
        path_from_parents(&self.parents(root), root, target)
    }
}

pub(crate) fn path_from_parents(
    parents: &[Option<usize>],
    root: usize,
    target: usize,
) -> Option<Vec<usize>> {
    if root >= parents.len() || target >= parents.len() {
        return None;
    }
    let mut path = vec![target];
    let mut node = target;
    while node != root {
        node = parents[node]?;
        path.push(node);
    }
    path.reverse();
    Some(path)
}

/// Kruskal over the upper triangle of `(weights + weightsᵀ) / 2`.
pub fn minimum_spanning_tree(weights: &DMatrix<f64>) -> Result<SpanningTree> {
    let n = weights.nrows();
    if weights.ncols() != n {
        return Err(Error::mismatch(
            "distance matrix",
            format!("{n}x{n}"),
            format!("{}x{}", n, weights.ncols()),
        ));
    }

    let mut edges: Vec<(f64, usize, usize)> = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| (0.5 * (weights[(i, j)] + weights[(j, i)]), i, j))
        .filter(|(w, _, _)| w.is_finite())
        .collect();
    edges.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });

    let mut graph = UnGraph::<(), f64>::with_capacity(n, n.saturating_sub(1));
    for _ in 0..n {
        graph.add_node(());
    }
    let mut sets = UnionFind::<usize>::new(n);
    for (w, i, j) in edges {
        if sets.union(i, j) {
            graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), w);
            if graph.edge_count() + 1 == n {
                break;
            }
        }
    }
    Ok(SpanningTree { graph })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            4,
            4,
            &[
                0.0, 1.0, 5.0, 9.0, //
                1.0, 0.0, 2.0, 6.0, //
                5.0, 2.0, 0.0, 3.0, //
                9.0, 6.0, 3.0, 0.0,
            ],
        )
    }

    #[test]
    fn kruskal_picks_the_cheapest_chain() {
        let tree = minimum_spanning_tree(&path_graph()).unwrap();
        assert_eq!(tree.edges(), vec![(0, 1, 1.0), (1, 2, 2.0), (2, 3, 3.0)]);
        assert!((tree.total_weight() - 6.0).abs() < 1e-12);
        assert_eq!(tree.path(0, 3), Some(vec![0, 1, 2, 3]));
        assert_eq!(tree.path(3, 1), Some(vec![3, 2, 1]));
        assert_eq!(tree.path(2, 2), Some(vec![2]));
    }

    #[test]
    fn ties_break_on_lowest_indices() {
        let w = DMatrix::from_element(3, 3, 1.0);
        let tree = minimum_spanning_tree(&w).unwrap();
        assert_eq!(tree.edges(), vec![(0, 1, 1.0), (0, 2, 1.0)]);
    }

    #[test]
    fn infinite_weights_leave_a_forest() {
        let mut w = path_graph();
        for k in 0..3 {
            w[(k, 3)] = f64::INFINITY;
            w[(3, k)] = f64::INFINITY;
        }
        let tree = minimum_spanning_tree(&w).unwrap();
        assert_eq!(tree.edges().len(), 2);
        assert_eq!(tree.parents(0)[3], None);
        assert_eq!(tree.path(0, 3), None);
    }

    #[test]
    fn asymmetric_input_is_symmetrised() {
        let w = DMatrix::from_row_slice(3, 3, &[0.0, 4.0, 1.0, 0.0, 0.0, 1.0, 5.0, 1.0, 0.0]);
        let tree = minimum_spanning_tree(&w).unwrap();
        assert_eq!(tree.edges(), vec![(1, 2, 1.0), (0, 1, 2.0)]);
    }
}
