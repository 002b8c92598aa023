use std::cmp::Ordering;

/// Objective value assigned to every objective of an Individual whose
/// replicates all failed.
pub const PENALTY_VALUE: f64 = 1e10;

/// Number of objectives the search optimizes.
pub const N_OBJECTIVES: usize = 3;

/// `(innovation, diversity, gini)` in minimization form: the two
/// maximized metrics are stored negated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Objectives([f64; N_OBJECTIVES]);

impl Objectives {
    pub const PENALTY: Objectives = Objectives([PENALTY_VALUE; N_OBJECTIVES]);

    /// Converts raw simulator means into minimization form.
    pub fn from_metrics(innovation: f64, diversity: f64, gini: f64) -> Self {
        Self([-innovation, -diversity, gini])
    }

    /// Wraps values that are already in minimization form.
    pub fn from_minimization(values: [f64; N_OBJECTIVES]) -> Self {
        Self(values)
    }

    #[inline(always)]
    pub fn values(&self) -> &[f64; N_OBJECTIVES] {
        &self.0
    }

    pub fn is_penalty(&self) -> bool {
        *self == Self::PENALTY
    }

    /// Pareto dominance: no worse everywhere, strictly better somewhere.
    pub fn dominates(&self, other: &Objectives) -> bool {
        let mut strictly_better = false;
        for (&a, &b) in self.0.iter().zip(other.0.iter()) {
            if a > b {
                return false;
            }
            if a < b {
                strictly_better = true;
            }
        }
        strictly_better
    }
}

/// An evaluated candidate. `rank` and `crowding` are selection metadata,
/// recomputed every generation and never persisted.
#[derive(Debug, Clone)]
pub struct Individual {
    pub params: Vec<f64>,
    pub objectives: Objectives,
    pub rank: usize,
    pub crowding: f64,
}

impl Individual {
    pub fn new(params: Vec<f64>, objectives: Objectives) -> Self {
        Self {
            params,
            objectives,
            rank: usize::MAX,
            crowding: 0.0,
        }
    }

    /// Crowded-comparison: lower rank first, then larger crowding distance.
    pub fn crowded_cmp(&self, other: &Individual) -> Ordering {
        self.rank.cmp(&other.rank).then_with(|| {
            other
                .crowding
                .partial_cmp(&self.crowding)
                .unwrap_or(Ordering::Equal)
        })
    }
}

/// Structural identity of a parameter vector. `-0.0` and `0.0` map to the
/// same key.
pub fn param_key(params: &[f64]) -> Vec<u64> {
    params.iter().map(|&v| (v + 0.0).to_bits()).collect()
}

#[derive(Debug, Clone, Default)]
pub struct Population {
    members: Vec<Individual>,
}

impl Population {
    pub fn new(members: Vec<Individual>) -> Self {
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Individual] {
        &self.members
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Individual> {
        self.members.iter()
    }

    pub fn into_members(self) -> Vec<Individual> {
        self.members
    }

    /// Members of the first non-dominated front, as ranked by the last
    /// environmental selection.
    pub fn front(&self) -> impl Iterator<Item = &Individual> {
        self.members.iter().filter(|i| i.rank == 0)
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a Individual;
    type IntoIter = std::slice::Iter<'a, Individual>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn obj(a: f64, b: f64, c: f64) -> Objectives {
        Objectives::from_minimization([a, b, c])
    }

    #[rstest]
    #[case(obj(1.0, 1.0, 1.0), obj(2.0, 2.0, 2.0), true)]
    #[case(obj(1.0, 2.0, 2.0), obj(2.0, 2.0, 2.0), true)]
    #[case(obj(2.0, 2.0, 2.0), obj(2.0, 2.0, 2.0), false)]
    #[case(obj(1.0, 3.0, 2.0), obj(2.0, 2.0, 2.0), false)]
    #[case(obj(3.0, 3.0, 3.0), obj(2.0, 2.0, 2.0), false)]
    fn test_dominance_cases(#[case] a: Objectives, #[case] b: Objectives, #[case] expected: bool) {
        assert_eq!(a.dominates(&b), expected);
    }

    #[test]
    fn test_metrics_are_negated_for_maximized_objectives() {
        let o = Objectives::from_metrics(100.0, 0.5, 0.25);
        assert_eq!(o.values(), &[-100.0, -0.5, 0.25]);
    }

    #[test]
    fn test_penalty_is_dominated_by_finite_vector() {
        let real = Objectives::from_metrics(0.0, 0.0, 0.9);
        assert!(real.dominates(&Objectives::PENALTY));
        assert!(!Objectives::PENALTY.dominates(&real));
        assert!(Objectives::PENALTY.is_penalty());
    }

    #[test]
    fn test_param_key_normalizes_signed_zero() {
        assert_eq!(param_key(&[0.0, 1.0]), param_key(&[-0.0, 1.0]));
        assert_ne!(param_key(&[0.0, 1.0]), param_key(&[0.0, 1.0000001]));
    }
}
