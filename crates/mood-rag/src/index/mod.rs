//! Exact nearest-neighbor index over passage vectors
//!
//! Vectors are stored row-major in one contiguous buffer; row `i` is index key `i`.
//! Search scores every row in parallel and keeps the `k` smallest squared
//! Euclidean distances, ties broken by ascending key.

use rayon::prelude::*;
use std::cmp::Ordering;

use crate::error::{Error, Result};

/// One search hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row position of the matched vector
    pub key: usize,
    /// Squared Euclidean distance to the query
    pub distance: f32,
}

/// Brute-force L2 index, built once and read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct FlatL2Index {
    data: Vec<f32>,
    dimensions: usize,
    len: usize,
}

impl FlatL2Index {
    /// Build from a set of vectors that share one dimensionality.
    ///
    /// An empty input yields an empty index that answers every query with no results.
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Ok(Self::default());
        };

        let dimensions = first.len();
        if dimensions == 0 {
            return Err(Error::embedding("Cannot index zero-dimensional vectors"));
        }

        let mut data = Vec::with_capacity(dimensions * vectors.len());
        for vector in vectors {
            if vector.len() != dimensions {
                return Err(Error::DimensionMismatch {
                    expected: dimensions,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        tracing::debug!("Built flat index: {} vectors x {} dims", vectors.len(), dimensions);

        Ok(Self {
            data,
            dimensions,
            len: vectors.len(),
        })
    }

    /// Number of indexed vectors
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no vectors are indexed
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Dimensionality of indexed vectors (0 when empty)
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Stored vector for a key
    pub fn vector(&self, key: usize) -> Option<&[f32]> {
        (key < self.len).then(|| &self.data[key * self.dimensions..(key + 1) * self.dimensions])
    }

    /// The `min(k, len)` nearest vectors, ascending by distance then key
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(Error::invalid_request("k must be at least 1"));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut scored: Vec<Neighbor> = self
            .data
            .par_chunks_exact(self.dimensions)
            .enumerate()
            .map(|(key, row)| Neighbor {
                key,
                distance: squared_l2(row, query),
            })
            .collect();

        let k = k.min(self.len);
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, compare_neighbors);
            scored.truncate(k);
        }
        scored.sort_unstable_by(compare_neighbors);

        Ok(scored)
    }
}

/// Squared Euclidean distance
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.key.cmp(&b.key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
        ]
    }

    #[test]
    fn test_nearest_first() {
        let index = FlatL2Index::build(&grid()).unwrap();
        let hits = index.search(&[0.9, 0.1], 2).unwrap();
        assert_eq!(hits[0].key, 1);
        assert!((hits[0].distance - 0.02).abs() < 1e-6);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_ties_break_by_key() {
        let index = FlatL2Index::build(&grid()).unwrap();
        let hits = index.search(&[0.5, 0.5], 4).unwrap();
        let keys: Vec<usize> = hits.iter().map(|h| h.key).collect();
        assert_eq!(keys, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_k_larger_than_index_is_clamped() {
        let index = FlatL2Index::build(&grid()).unwrap();
        let hits = index.search(&[0.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 4);
        let mut keys: Vec<usize> = hits.iter().map(|h| h.key).collect();
        keys.dedup();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn test_empty_index() {
        let index = FlatL2Index::build(&[]).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 2.0, 3.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = FlatL2Index::build(&grid()).unwrap();
        let err = index.search(&[1.0, 0.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));

        let err = FlatL2Index::build(&[vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_zero_k_rejected() {
        let index = FlatL2Index::build(&grid()).unwrap();
        assert!(matches!(index.search(&[0.0, 0.0], 0), Err(Error::InvalidRequest(_))));
    }

    fn vectors_strategy() -> impl Strategy<Value = Vec<Vec<f32>>> {
        (1usize..6).prop_flat_map(|dims| {
            prop::collection::vec(prop::collection::vec(-10.0f32..10.0, dims), 1..40)
        })
    }

    proptest! {
        #[test]
        fn prop_results_sorted_and_match_brute_force(vectors in vectors_strategy(), k in 1usize..50, pick in 0usize..40) {
            let index = FlatL2Index::build(&vectors).unwrap();
            let query = vectors[pick % vectors.len()].iter().map(|x| x * 0.5 + 0.25).collect::<Vec<_>>();
            let hits = index.search(&query, k).unwrap();

            prop_assert_eq!(hits.len(), k.min(vectors.len()));
            for pair in hits.windows(2) {
                prop_assert!(pair[0].distance <= pair[1].distance);
            }

            let best = vectors
                .iter()
                .map(|v| squared_l2(v, &query))
                .fold(f32::INFINITY, f32::min);
            prop_assert!(hits[0].distance <= best);
        }

        #[test]
        fn prop_own_vector_is_top_hit(vectors in vectors_strategy()) {
            // Deduplicate so every query has a unique distance-0 match
            let mut unique: Vec<Vec<f32>> = Vec::new();
            for v in vectors {
                if !unique.contains(&v) {
                    unique.push(v);
                }
            }
            let index = FlatL2Index::build(&unique).unwrap();
            for (i, v) in unique.iter().enumerate() {
                let hits = index.search(v, 1).unwrap();
                prop_assert_eq!(hits[0].key, i);
                prop_assert_eq!(hits[0].distance, 0.0);
            }
        }
    }
}
