use itertools::Itertools;
use tracing::{debug, trace};

use crate::grid::{Grid, GridError};

/// Computes, for every pair of indices `(i, j)` of the square `adjacency` grid, a shortest
/// sequence of edges leading from `i` to `j`. Cell `(i, j)` of `adjacency` holds the edges
/// from `i` to `j`, and the length of a sequence is its number of edges.
///
/// This is the Floyd-Warshall algorithm, except that the propagated value is the sequence
/// itself instead of a numeric distance:
/// - Every non-empty cell is seeded with a sequence consisting of only its first edge.
/// - For every intermediate `k` (outermost), source `i` and target `j`, the concatenation of
///   the sequences `i -> k` and `k -> j` replaces the sequence `i -> j` if none is known yet,
///   or if it is strictly shorter. On ties, the sequence that was found first is kept.
///
/// Pairs that are not connected are absent in the result. Fails with [`GridError::NotSquare`]
/// if `adjacency` does not have as many rows as columns.
pub fn shortest_sequences<E: Clone>(adjacency: &Grid<Vec<E>>) -> Result<Grid<Vec<E>>, GridError> {
    let size = adjacency.square_size()?;
    debug!("computing shortest sequences for {size} indices");

    let mut dist: Grid<Vec<E>> = Grid::square(size);
    for (row, column, edges) in adjacency.cells() {
        if let Some(first) = edges.first() {
            dist.set(vec![first.clone()], row, column);
        }
    }

    for k in 0..size {
        for i in 0..size {
            for j in 0..size {
                let via = match (dist.get(i, k)?, dist.get(k, j)?, dist.get(i, j)?) {
                    (Some(ik), Some(kj), current)
                        if current.map_or(true, |ij| ik.len() + kj.len() < ij.len()) =>
                    {
                        ik.iter().chain(kj.iter()).cloned().collect_vec()
                    }
                    _ => continue,
                };
                trace!("found sequence of length {} from {i} to {j} via {k}", via.len());
                dist.set(via, i, j);
            }
        }
    }

    Ok(dist)
}
