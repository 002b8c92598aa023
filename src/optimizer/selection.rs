use super::pareto::{crowding_distance, non_dominated_sort};
use crate::core_types::{param_key, Individual, Objectives};
use fastrand::Rng;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Recomputes `rank` and `crowding` for every member from scratch.
pub fn assign_rank_and_crowding(members: &mut [Individual]) {
    let objectives: Vec<Objectives> = members.iter().map(|m| m.objectives).collect();
    for (rank, front) in non_dominated_sort(&objectives).iter().enumerate() {
        let distances = crowding_distance(front, &objectives);
        for (&idx, d) in front.iter().zip(distances) {
            members[idx].rank = rank;
            members[idx].crowding = d;
        }
    }
}

/// Binary tournament under the crowded-comparison operator. Ties on both
/// rank and crowding are broken at random.
pub fn binary_tournament<'a>(rng: &mut Rng, members: &'a [Individual]) -> &'a Individual {
    let n = members.len();
    let a = rng.usize(0..n);
    if n == 1 {
        return &members[a];
    }
    // second contestant is always a different member
    let mut b = rng.usize(0..n - 1);
    if b >= a {
        b += 1;
    }

    match members[a].crowded_cmp(&members[b]) {
        Ordering::Less => &members[a],
        Ordering::Greater => &members[b],
        Ordering::Equal => {
            if rng.bool() {
                &members[a]
            } else {
                &members[b]
            }
        }
    }
}

/// Drops members whose parameter vector already appeared earlier in the
/// list. The first occurrence wins.
pub fn eliminate_duplicates(members: Vec<Individual>) -> Vec<Individual> {
    let mut seen = HashSet::with_capacity(members.len());
    members
        .into_iter()
        .filter(|m| seen.insert(param_key(&m.params)))
        .collect()
}

/// NSGA-II survival: merges parents and offspring, removes duplicates,
/// then fills `size` slots front by front. The front that does not fit
/// is truncated by descending crowding distance, equal distances in
/// random order.
///
/// Survivors come back ordered by front with `rank` and `crowding` set.
pub fn environmental_selection(
    rng: &mut Rng,
    parents: Vec<Individual>,
    offspring: Vec<Individual>,
    size: usize,
) -> Vec<Individual> {
    let mut merged = parents;
    merged.extend(offspring);
    let mut merged = eliminate_duplicates(merged);

    let objectives: Vec<Objectives> = merged.iter().map(|m| m.objectives).collect();
    let fronts = non_dominated_sort(&objectives);

    let mut chosen: Vec<usize> = Vec::with_capacity(size.min(merged.len()));
    for (rank, front) in fronts.iter().enumerate() {
        if chosen.len() >= size {
            break;
        }

        let distances = crowding_distance(front, &objectives);
        for (&idx, &d) in front.iter().zip(&distances) {
            merged[idx].rank = rank;
            merged[idx].crowding = d;
        }

        let room = size - chosen.len();
        if front.len() <= room {
            chosen.extend_from_slice(front);
            continue;
        }

        // Shuffle first so the stable sort leaves ties in random order.
        let mut order: Vec<usize> = (0..front.len()).collect();
        rng.shuffle(&mut order);
        order.sort_by(|&a, &b| distances[b].partial_cmp(&distances[a]).unwrap_or(Ordering::Equal));
        chosen.extend(order.into_iter().take(room).map(|pos| front[pos]));
    }

    let mut slots: Vec<Option<Individual>> = merged.into_iter().map(Some).collect();
    chosen
        .into_iter()
        .filter_map(|idx| slots[idx].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ind(params: Vec<f64>, objs: [f64; 3]) -> Individual {
        Individual::new(params, Objectives::from_minimization(objs))
    }

    #[test]
    fn test_ranks_and_crowding_are_assigned() {
        let mut members = vec![
            ind(vec![0.0], [1.0, 5.0, 0.0]),
            ind(vec![1.0], [5.0, 1.0, 0.0]),
            ind(vec![2.0], [6.0, 6.0, 0.0]),
        ];
        assign_rank_and_crowding(&mut members);
        assert_eq!(members[0].rank, 0);
        assert_eq!(members[1].rank, 0);
        assert_eq!(members[2].rank, 1);
        assert!(members.iter().all(|m| m.crowding.is_infinite()));
    }

    #[test]
    fn test_tournament_prefers_lower_rank() {
        let mut members = vec![ind(vec![0.0], [1.0, 1.0, 1.0]), ind(vec![1.0], [2.0, 2.0, 2.0])];
        assign_rank_and_crowding(&mut members);
        let mut rng = Rng::with_seed(4);
        for _ in 0..50 {
            assert_eq!(binary_tournament(&mut rng, &members).params, vec![0.0]);
        }
    }

    #[test]
    fn test_tournament_breaks_full_ties_randomly() {
        let mut members = vec![ind(vec![0.0], [1.0, 2.0, 0.0]), ind(vec![1.0], [2.0, 1.0, 0.0])];
        assign_rank_and_crowding(&mut members);
        let mut rng = Rng::with_seed(8);
        let firsts = (0..200)
            .filter(|_| binary_tournament(&mut rng, &members).params[0] == 0.0)
            .count();
        assert!(firsts > 50 && firsts < 150, "picked first {} times", firsts);
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let members = vec![
            ind(vec![0.5, 0.5], [1.0, 1.0, 1.0]),
            ind(vec![0.1, 0.2], [2.0, 2.0, 2.0]),
            ind(vec![0.5, 0.5], [0.0, 0.0, 0.0]),
        ];
        let unique = eliminate_duplicates(members);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].objectives.values(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_survival_keeps_best_fronts() {
        let parents = vec![ind(vec![0.0], [3.0, 3.0, 3.0]), ind(vec![1.0], [1.0, 4.0, 0.0])];
        let offspring = vec![ind(vec![2.0], [0.5, 0.5, 0.5]), ind(vec![3.0], [9.0, 9.0, 9.0])];
        let mut rng = Rng::with_seed(1);
        let survivors = environmental_selection(&mut rng, parents, offspring, 2);

        let mut params: Vec<f64> = survivors.iter().map(|s| s.params[0]).collect();
        params.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(params, vec![1.0, 2.0]);
        assert!(survivors.iter().all(|s| s.rank == 0));
    }

    #[test]
    fn test_last_front_truncated_by_crowding() {
        // evenly spaced front: only the two extremes have infinite distance
        let parents: Vec<Individual> = (0..5)
            .map(|i| ind(vec![i as f64], [i as f64, 4.0 - i as f64, 0.0]))
            .collect();
        let mut rng = Rng::with_seed(12);
        let survivors = environmental_selection(&mut rng, parents, Vec::new(), 2);
        let mut params: Vec<f64> = survivors.iter().map(|s| s.params[0]).collect();
        params.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(params, vec![0.0, 4.0]);
    }

    #[test]
    fn test_survival_with_fewer_unique_than_slots() {
        let parents = vec![ind(vec![0.0], [1.0, 1.0, 1.0]), ind(vec![0.0], [1.0, 1.0, 1.0])];
        let mut rng = Rng::with_seed(0);
        let survivors = environmental_selection(&mut rng, parents, Vec::new(), 4);
        assert_eq!(survivors.len(), 1);
    }

    prop_compose! {
        fn arb_individual()(x in 0u8..6, y in 0u8..6, penalized in proptest::bool::weighted(0.2)) -> Individual {
            let objs = if penalized {
                Objectives::PENALTY
            } else {
                Objectives::from_minimization([x as f64, y as f64, (x + y) as f64 / 10.0])
            };
            Individual::new(vec![x as f64, y as f64], objs)
        }
    }

    proptest! {
        #[test]
        fn prop_survivors_are_unique_and_sized(
            parents in prop::collection::vec(arb_individual(), 1..12),
            offspring in prop::collection::vec(arb_individual(), 0..12),
            size in 1usize..10,
            seed in any::<u64>(),
        ) {
            let mut rng = Rng::with_seed(seed);
            let mut keys = HashSet::new();
            for m in parents.iter().chain(&offspring) {
                keys.insert(param_key(&m.params));
            }
            let survivors = environmental_selection(&mut rng, parents, offspring, size);

            prop_assert_eq!(survivors.len(), size.min(keys.len()));
            let mut seen = HashSet::new();
            for s in &survivors {
                prop_assert!(seen.insert(param_key(&s.params)), "duplicate survivor {:?}", s.params);
            }
        }

        #[test]
        fn prop_penalty_never_leads_a_mixed_population(
            members in prop::collection::vec(arb_individual(), 2..16),
        ) {
            let mut members = eliminate_duplicates(members);
            assign_rank_and_crowding(&mut members);
            if members.iter().any(|m| !m.objectives.is_penalty()) {
                for m in members.iter().filter(|m| m.rank == 0) {
                    prop_assert!(!m.objectives.is_penalty());
                }
            }
        }
    }
}
