use crate::core_types::{Objectives, N_OBJECTIVES};
use std::cmp::Ordering;

/// Fast non-dominated sorting (Deb et al., 2002).
///
/// `fronts[0]` holds the indices dominated by nobody; `fronts[k]` those
/// dominated only by members of earlier fronts. O(M * N^2).
pub fn non_dominated_sort(objectives: &[Objectives]) -> Vec<Vec<usize>> {
    let n = objectives.len();
    if n == 0 {
        return Vec::new();
    }

    let mut dominates: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut dominated_count = vec![0usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if objectives[i].dominates(&objectives[j]) {
                dominates[i].push(j);
                dominated_count[j] += 1;
            } else if objectives[j].dominates(&objectives[i]) {
                dominates[j].push(i);
                dominated_count[i] += 1;
            }
        }
    }

    let mut fronts = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| dominated_count[i] == 0).collect();

    while !current.is_empty() {
        let mut next = Vec::new();
        for &p in &current {
            for &q in &dominates[p] {
                dominated_count[q] -= 1;
                if dominated_count[q] == 0 {
                    next.push(q);
                }
            }
        }
        next.sort_unstable();
        fronts.push(current);
        current = next;
    }

    fronts
}

/// Crowding distance of each member of `front` (indices into
/// `objectives`), returned in the order of `front`.
///
/// Per objective with a non-zero range the front is sorted, both extremes
/// get infinity and each interior member adds the gap between its
/// neighbours divided by the objective's range across the front.
pub fn crowding_distance(front: &[usize], objectives: &[Objectives]) -> Vec<f64> {
    let n = front.len();
    if n <= 2 {
        return vec![f64::INFINITY; n];
    }

    let mut distances = vec![0.0f64; n];
    let value = |pos: usize, m: usize| objectives[front[pos]].values()[m];

    for m in 0..N_OBJECTIVES {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| value(a, m).partial_cmp(&value(b, m)).unwrap_or(Ordering::Equal));

        // A flat objective says nothing about spacing.
        let range = value(order[n - 1], m) - value(order[0], m);
        if range <= 0.0 || !range.is_finite() {
            continue;
        }

        distances[order[0]] = f64::INFINITY;
        distances[order[n - 1]] = f64::INFINITY;
        for k in 1..(n - 1) {
            let gap = value(order[k + 1], m) - value(order[k - 1], m);
            distances[order[k]] += gap / range;
        }
    }

    distances
}
