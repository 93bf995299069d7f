use rand::seq::SliceRandom;
use rand::Rng;

use crate::elo::EloBook;

/// Two disjoint sides whose union is the input pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamSplit {
    pub side_a: Vec<String>,
    pub side_b: Vec<String>,
}

impl TeamSplit {
    pub fn rating_difference(&self, ratings: &EloBook) -> i64 {
        (ratings.team_total(&self.side_a) - ratings.team_total(&self.side_b)).abs()
    }
}

/// Random order, then each player joins whichever side currently has the
/// lower rating sum (ties go to side A). Repeated calls give different teams.
pub fn elo_shuffle<R: Rng + ?Sized>(players: &[String], ratings: &EloBook, rng: &mut R) -> TeamSplit {
    let mut shuffled = players.to_vec();
    shuffled.shuffle(rng);

    let mut split = TeamSplit {
        side_a: Vec::new(),
        side_b: Vec::new(),
    };
    let (mut total_a, mut total_b) = (0_i64, 0_i64);
    for player in shuffled {
        let rating = ratings.get(&player);
        if total_a <= total_b {
            total_a += rating;
            split.side_a.push(player);
        } else {
            total_b += rating;
            split.side_b.push(player);
        }
    }
    split
}

/// Exhaustive search for the split with the smallest rating difference.
///
/// Side A takes every combination of `n/2` and then `n/2 + 1` players, so the
/// cost is O(C(n, n/2)) rating sums. That is fine for a server's worth of
/// players (up to a dozen or so) and not meant for anything larger.
///
/// Players are sorted first and combinations are visited in lexicographic
/// order, keeping only strictly better splits. Ties therefore resolve to the
/// smaller side A, then to the lexicographically smallest side A.
pub fn smart_shuffle_balanced(players: &[String], ratings: &EloBook) -> TeamSplit {
    let mut pool = players.to_vec();
    pool.sort();
    pool.dedup();

    let pool_size = pool.len();
    if pool_size < 2 {
        return TeamSplit {
            side_a: pool,
            side_b: Vec::new(),
        };
    }

    let player_ratings = pool
        .iter()
        .map(|player| ratings.get(player))
        .collect::<Vec<i64>>();
    let pool_total = player_ratings.iter().sum::<i64>();

    let mut best: Option<(i64, Vec<usize>)> = None;
    for side_size in [pool_size / 2, pool_size / 2 + 1] {
        for_each_combination(pool_size, side_size, |indices| {
            let side_total = indices.iter().map(|index| player_ratings[*index]).sum::<i64>();
            let difference = (2 * side_total - pool_total).abs();
            let improves = best
                .as_ref()
                .map_or(true, |(best_difference, _)| difference < *best_difference);
            if improves {
                best = Some((difference, indices.to_vec()));
            }
        });
    }

    let chosen = best.map(|(_, indices)| indices).unwrap_or_default();
    let mut split = TeamSplit {
        side_a: Vec::with_capacity(chosen.len()),
        side_b: Vec::with_capacity(pool_size - chosen.len()),
    };
    for (index, player) in pool.into_iter().enumerate() {
        if chosen.contains(&index) {
            split.side_a.push(player);
        } else {
            split.side_b.push(player);
        }
    }
    split
}

/// Calls `visit` with every `size`-element index combination of `0..count`,
/// in lexicographic order.
fn for_each_combination(count: usize, size: usize, mut visit: impl FnMut(&[usize])) {
    if size > count {
        return;
    }

    let mut indices = (0..size).collect::<Vec<usize>>();
    loop {
        visit(&indices);

        let mut position = size;
        loop {
            if position == 0 {
                return;
            }
            position -= 1;
            if indices[position] != position + count - size {
                break;
            }
        }

        indices[position] += 1;
        for next in position + 1..size {
            indices[next] = indices[next - 1] + 1;
        }
    }
}

/// Expected win probability of a side rated `rating_a` against `rating_b`.
pub fn predict_winrate(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10_f64.powf((rating_b - rating_a) / 400.0))
}

#[cfg(test)]
mod tests {
    use super::{elo_shuffle, for_each_combination, predict_winrate, smart_shuffle_balanced};
    use crate::elo::EloBook;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn names(players: &[&str]) -> Vec<String> {
        players.iter().map(|player| player.to_string()).collect()
    }

    fn sample_ratings() -> EloBook {
        EloBook::from_value(&json!({"A": 1000, "B": 1000, "C": 1200, "D": 800}))
    }

    #[test]
    fn smart_shuffle_matches_brute_force_minimum() {
        let ratings = sample_ratings();
        let players = names(&["A", "B", "C", "D"]);

        let mut brute_force_minimum = i64::MAX;
        for_each_combination(players.len(), 2, |indices| {
            let side_a = indices.iter().map(|index| players[*index].clone()).collect::<Vec<_>>();
            let side_b = players
                .iter()
                .filter(|player| !side_a.contains(player))
                .cloned()
                .collect::<Vec<_>>();
            let difference = (ratings.team_total(&side_a) - ratings.team_total(&side_b)).abs();
            brute_force_minimum = brute_force_minimum.min(difference);
        });

        let split = smart_shuffle_balanced(&players, &ratings);
        assert_eq!(brute_force_minimum, 0);
        assert_eq!(split.rating_difference(&ratings), 0);
        assert_eq!(split.side_a, names(&["A", "B"]));
        assert_eq!(split.side_b, names(&["C", "D"]));
    }

    #[test]
    fn smart_shuffle_ignores_input_order() {
        let ratings = sample_ratings();
        let forward = smart_shuffle_balanced(&names(&["A", "B", "C", "D"]), &ratings);
        let reversed = smart_shuffle_balanced(&names(&["D", "C", "B", "A"]), &ratings);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn smart_shuffle_handles_odd_and_tiny_pools() {
        // {A,E} and {B,C,D} both leave a 400 gap; the smaller side A wins the tie.
        let ratings = EloBook::from_value(&json!({"A": 1300, "B": 1000, "C": 1000, "D": 900, "E": 1200}));
        let split = smart_shuffle_balanced(&names(&["E", "D", "C", "B", "A"]), &ratings);
        assert_eq!(split.side_a.len() + split.side_b.len(), 5);
        assert_eq!(split.rating_difference(&ratings), 400);
        assert_eq!(split.side_a, names(&["A", "E"]));
        assert_eq!(split.side_b, names(&["B", "C", "D"]));

        let single = smart_shuffle_balanced(&names(&["solo"]), &ratings);
        assert_eq!(single.side_a, names(&["solo"]));
        assert!(single.side_b.is_empty());
    }

    #[test]
    fn greedy_shuffle_partitions_the_pool() {
        let ratings = sample_ratings();
        let players = names(&["A", "B", "C", "D", "E", "F"]);
        let mut rng = StdRng::seed_from_u64(42);

        let split = elo_shuffle(&players, &ratings, &mut rng);
        let union = split
            .side_a
            .iter()
            .chain(split.side_b.iter())
            .cloned()
            .collect::<BTreeSet<String>>();
        assert_eq!(union.len(), players.len());
        assert!(split.side_a.iter().all(|player| !split.side_b.contains(player)));

        let mut same_seed = StdRng::seed_from_u64(42);
        assert_eq!(elo_shuffle(&players, &ratings, &mut same_seed), split);
    }

    #[test]
    fn greedy_shuffle_alternates_equal_ratings() {
        let ratings = EloBook::new();
        let mut rng = StdRng::seed_from_u64(7);
        let split = elo_shuffle(&names(&["p1", "p2", "p3", "p4"]), &ratings, &mut rng);
        assert_eq!(split.side_a.len(), 2);
        assert_eq!(split.side_b.len(), 2);
    }

    #[test]
    fn combinations_are_lexicographic() {
        let mut seen = Vec::new();
        for_each_combination(4, 2, |indices| seen.push(indices.to_vec()));
        assert_eq!(
            seen,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3],
            ]
        );
    }

    #[test]
    fn equal_ratings_predict_even_odds() {
        assert!((predict_winrate(1000.0, 1000.0) - 0.5).abs() < 1e-9);
        assert!(predict_winrate(1400.0, 1000.0) > 0.9);
    }
}
