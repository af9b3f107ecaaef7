//! Alternating projections for absorbed fixed effects.
//!
//! Demeans a vector within the level groups of one or more categorical
//! dimensions. A single dimension takes one exact pass; several
//! dimensions iterate group demeaning until the largest absolute group
//! mean in a full sweep falls below tolerance:
//!
//! ```text
//! repeat for each dimension d:  v <- v - mean_g(v)  within groups g of d
//! until max_g |mean_g(v)| < tolerance
//! ```
//!
//! Absorbed degrees of freedom use the standard two-way accounting: the
//! level counts of the first two dimensions minus the number of connected
//! components of their bipartite level graph, plus `levels - 1` for each
//! further dimension.
//!
//! # References
//! - Guimaraes, P., & Portugal, P. (2010). "A simple feasible procedure
//!   to fit models with high-dimensional fixed effects."
//!   The Stata Journal, 10(4), 628-649.

use crate::EngineError;

/// Group structure of one absorbed dimension.
#[derive(Debug, Clone)]
struct Dimension {
    /// Row indices per level.
    groups: Vec<Vec<usize>>,
    /// Level code per row.
    codes: Vec<usize>,
}

impl Dimension {
    fn from_codes(codes: Vec<usize>, n_levels: usize) -> Self {
        let mut groups = vec![Vec::new(); n_levels];
        for (row, &level) in codes.iter().enumerate() {
            groups[level].push(row);
        }
        Self { groups, codes }
    }
}

/// Demeans vectors within the groups of the configured dimensions.
#[derive(Debug, Clone)]
pub(crate) struct Absorber {
    dimensions: Vec<Dimension>,
    tolerance: f64,
    max_iterations: usize,
}

impl Absorber {
    /// Builds an absorber from dense level codes, one `(codes, n_levels)`
    /// pair per dimension.
    pub(crate) fn new(
        dimensions: Vec<(Vec<usize>, usize)>,
        n_rows: usize,
        tolerance: f64,
        max_iterations: usize,
    ) -> Result<Self, EngineError> {
        for (codes, _) in &dimensions {
            if codes.len() != n_rows {
                return Err(EngineError::InvalidPlan(format!(
                    "absorb dimension has {} codes for {} rows",
                    codes.len(),
                    n_rows
                )));
            }
        }
        Ok(Self {
            dimensions: dimensions
                .into_iter()
                .map(|(codes, n_levels)| Dimension::from_codes(codes, n_levels))
                .collect(),
            tolerance,
            max_iterations,
        })
    }

    /// Removes the group means of every dimension from `values` in place.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoConvergence`] when the sweep cap is hit
    /// before the group means vanish.
    pub(crate) fn demean(&self, values: &mut [f64]) -> Result<(), EngineError> {
        match self.dimensions.as_slice() {
            [] => Ok(()),
            [only] => {
                subtract_group_means(only, values);
                Ok(())
            }
            dimensions => {
                for _ in 0..self.max_iterations {
                    let mut worst = 0.0f64;
                    for dimension in dimensions {
                        worst = worst.max(subtract_group_means(dimension, values));
                    }
                    if worst < self.tolerance {
                        return Ok(());
                    }
                }
                Err(EngineError::NoConvergence {
                    iterations: self.max_iterations,
                })
            }
        }
    }

    /// Degrees of freedom consumed by the absorbed fixed effects,
    /// including the overall mean.
    pub(crate) fn absorbed_dof(&self) -> usize {
        match self.dimensions.as_slice() {
            [] => 0,
            [only] => only.groups.len(),
            [first, second, rest @ ..] => {
                let components = bipartite_components(first, second);
                let extra: usize = rest.iter().map(|d| d.groups.len().saturating_sub(1)).sum();
                first.groups.len() + second.groups.len() - components + extra
            }
        }
    }
}

/// Subtracts each group's mean and reports the largest absolute mean seen.
fn subtract_group_means(dimension: &Dimension, values: &mut [f64]) -> f64 {
    let mut largest = 0.0f64;
    for rows in &dimension.groups {
        if rows.is_empty() {
            continue;
        }
        let mean = rows.iter().map(|&r| values[r]).sum::<f64>() / rows.len() as f64;
        largest = largest.max(mean.abs());
        for &r in rows {
            values[r] -= mean;
        }
    }
    largest
}

/// Connected components of the bipartite graph whose edges are the
/// observed (level of `first`, level of `second`) pairs.
fn bipartite_components(first: &Dimension, second: &Dimension) -> usize {
    let offset = first.groups.len();
    let mut forest = UnionFind::new(offset + second.groups.len());
    for (row, &a) in first.codes.iter().enumerate() {
        forest.union(a, offset + second.codes[row]);
    }
    forest.count_roots()
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent[root_a] = root_b;
        }
    }

    fn count_roots(&mut self) -> usize {
        (0..self.parent.len()).filter(|&i| self.find(i) == i).count()
    }
}
