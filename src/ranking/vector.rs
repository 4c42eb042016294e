//! Vector representations produced by the embedding strategies.

/// Sparse vector with entries sorted by index, no duplicates, no explicit zeros.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseVector {
    dimensions: usize,
    entries: Vec<(u32, f32)>,
}

impl SparseVector {
    /// Build from `(index, weight)` pairs.
    ///
    /// Pairs are sorted; weights for a repeated index are summed and zero
    /// weights are dropped.
    pub fn new(dimensions: usize, mut entries: Vec<(u32, f32)>) -> Self {
        entries.sort_by_key(|(idx, _)| *idx);

        let mut merged: Vec<(u32, f32)> = Vec::with_capacity(entries.len());
        for (idx, weight) in entries {
            match merged.last_mut() {
                Some((last, acc)) if *last == idx => *acc += weight,
                _ => merged.push((idx, weight)),
            }
        }
        merged.retain(|(_, w)| *w != 0.0);

        Self {
            dimensions,
            entries: merged,
        }
    }

    pub fn zeros(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn entries(&self) -> &[(u32, f32)] {
        &self.entries
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, index: u32) -> f32 {
        self.entries
            .binary_search_by_key(&index, |(idx, _)| *idx)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0.0)
    }

    pub fn l2_norm(&self) -> f32 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt()
    }

    /// Dot product by merging the two sorted entry lists, accumulated in f64.
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (a, b) = (&self.entries, &other.entries);
        let (mut i, mut j) = (0, 0);
        let mut acc = 0.0f64;

        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += f64::from(a[i].1) * f64::from(b[j].1);
                    i += 1;
                    j += 1;
                }
            }
        }

        acc
    }

    /// Scale in place so the L2 norm is 1. Zero vectors are left untouched.
    pub fn normalize(&mut self) {
        let norm = self.l2_norm();
        if norm == 0.0 {
            return;
        }
        for (_, w) in &mut self.entries {
            *w /= norm;
        }
    }
}

/// A text representation under one strategy.
#[derive(Clone, Debug, PartialEq)]
pub enum Vector {
    Sparse(SparseVector),
    Dense(Vec<f32>),
}

impl Vector {
    pub fn dimensions(&self) -> usize {
        match self {
            Self::Sparse(v) => v.dimensions(),
            Self::Dense(v) => v.len(),
        }
    }

    pub fn l2_norm(&self) -> f32 {
        match self {
            Self::Sparse(v) => v.l2_norm(),
            Self::Dense(v) => dense_l2_norm(v),
        }
    }

    /// True when every component is exactly zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Sparse(v) => v.entries().iter().all(|(_, w)| *w == 0.0),
            Self::Dense(v) => v.iter().all(|x| *x == 0.0),
        }
    }
}

pub(crate) fn dense_l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
