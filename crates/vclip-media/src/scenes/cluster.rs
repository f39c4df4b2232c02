//! Adaptive-eps density clustering, representative selection, and balance
//! selection against the precision-level target scene count.

use vclip_models::Scene;

use super::precision::PrecisionConfig;

const NOISE: i32 = -1;
const UNVISITED: i32 = -2;

/// `eps` shrinks as the candidate count grows (tighter clusters needed to
/// avoid merging everything into one) and is scaled by precision: low
/// precision tolerates looser clusters, high precision wants tight ones.
fn adaptive_eps(n: usize, similarity_threshold: f64, precision_level: u8) -> f64 {
    let count_factor = if n < 10 {
        0.8
    } else if n > 50 {
        1.3
    } else {
        1.0
    };
    let precision_factor = if precision_level <= 3 {
        1.5
    } else if precision_level >= 8 {
        0.7
    } else {
        1.0
    };
    (1.0 - similarity_threshold) * count_factor * precision_factor
}

fn min_samples(n: usize) -> usize {
    (n / 15).clamp(2, 4)
}

/// DBSCAN over a precomputed distance matrix. Returns one cluster id per
/// index; noise points get `NOISE`.
pub fn cluster(distances: &[Vec<f64>], similarity_threshold: f64, precision: &PrecisionConfig) -> Vec<i32> {
    let n = distances.len();
    if n == 0 {
        return Vec::new();
    }

    let eps = adaptive_eps(n, similarity_threshold, precision.level);
    let min_pts = min_samples(n);
    let mut labels = vec![UNVISITED; n];
    let mut next_cluster = 0i32;

    for i in 0..n {
        if labels[i] != UNVISITED {
            continue;
        }

        let mut neighbors = region_query(distances, i, eps);
        if neighbors.len() < min_pts {
            labels[i] = NOISE;
            continue;
        }

        labels[i] = next_cluster;
        let mut seed_idx = 0;
        while seed_idx < neighbors.len() {
            let j = neighbors[seed_idx];
            if labels[j] == NOISE {
                labels[j] = next_cluster;
            }
            if labels[j] == UNVISITED {
                labels[j] = next_cluster;
                let j_neighbors = region_query(distances, j, eps);
                if j_neighbors.len() >= min_pts {
                    for &k in &j_neighbors {
                        if !neighbors.contains(&k) {
                            neighbors.push(k);
                        }
                    }
                }
            }
            seed_idx += 1;
        }
        next_cluster += 1;
    }

    labels
}

fn region_query(distances: &[Vec<f64>], point: usize, eps: f64) -> Vec<usize> {
    (0..distances.len()).filter(|&j| j != point && distances[point][j] <= eps).collect()
}

/// One representative scene index per cluster, plus the noise indices.
pub fn select_representatives(
    distances: &[Vec<f64>],
    labels: &[i32],
    precision_level: u8,
) -> (Vec<usize>, Vec<usize>) {
    let num_clusters = labels.iter().filter(|&&l| l >= 0).max().map(|&m| m + 1).unwrap_or(0);
    let mut representatives = Vec::new();

    for cluster_id in 0..num_clusters {
        let members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == cluster_id)
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }

        if precision_level <= 3 {
            representatives.push(members[0]);
            continue;
        }

        let best = members
            .iter()
            .copied()
            .min_by(|&a, &b| {
                let sum_a: f64 = members.iter().map(|&m| distances[a][m]).sum();
                let sum_b: f64 = members.iter().map(|&m| distances[b][m]).sum();
                sum_a.partial_cmp(&sum_b).unwrap()
            })
            .unwrap();
        representatives.push(best);
    }

    let noise: Vec<usize> = labels.iter().enumerate().filter(|(_, &l)| l == NOISE).map(|(i, _)| i).collect();
    (representatives, noise)
}

/// Adjust the clustered representative set to hit `target_scene_count`,
/// filling from unused (noise or redundant) scenes time-distributed, or
/// trimming via greedy max-min-time selection.
pub fn balance_scene_selection(scenes: &[Scene], selected: Vec<usize>, unused: &[usize], target: usize) -> Vec<usize> {
    if selected.len() == target {
        return selected;
    }

    if selected.len() < target {
        let mut out = selected;
        let needed = target - out.len();
        let fill = select_time_distributed_scenes(scenes, unused, needed, &out);
        out.extend(fill);
        out.sort_by(|&a, &b| scenes[a].timestamp_seconds.partial_cmp(&scenes[b].timestamp_seconds).unwrap());
        out
    } else {
        select_diverse_scenes(scenes, &selected, target)
    }
}

/// Pick up to `needed` indices from `candidates` spread evenly across the
/// timeline, skipping any index already in `exclude`.
fn select_time_distributed_scenes(scenes: &[Scene], candidates: &[usize], needed: usize, exclude: &[usize]) -> Vec<usize> {
    let mut pool: Vec<usize> = candidates.iter().copied().filter(|c| !exclude.contains(c)).collect();
    pool.sort_by(|&a, &b| scenes[a].timestamp_seconds.partial_cmp(&scenes[b].timestamp_seconds).unwrap());

    if pool.len() <= needed {
        return pool;
    }

    let step = pool.len() as f64 / needed as f64;
    (0..needed).map(|i| pool[((i as f64 * step) as usize).min(pool.len() - 1)]).collect()
}

/// Greedily trim `selected` down to `target` entries, at each step dropping
/// the index whose removal leaves the remaining set with the largest
/// minimum pairwise time gap (keeps the most temporally spread scenes).
fn select_diverse_scenes(scenes: &[Scene], selected: &[usize], target: usize) -> Vec<usize> {
    let mut current = selected.to_vec();
    current.sort_by(|&a, &b| scenes[a].timestamp_seconds.partial_cmp(&scenes[b].timestamp_seconds).unwrap());

    while current.len() > target {
        let mut worst_idx = 0;
        let mut best_min_gap = f64::NEG_INFINITY;

        for drop in 0..current.len() {
            let remaining: Vec<usize> = current.iter().enumerate().filter(|(i, _)| *i != drop).map(|(_, &v)| v).collect();
            let min_gap = min_pairwise_time_gap(scenes, &remaining);
            if min_gap > best_min_gap {
                best_min_gap = min_gap;
                worst_idx = drop;
            }
        }
        current.remove(worst_idx);
    }

    current
}

fn min_pairwise_time_gap(scenes: &[Scene], indices: &[usize]) -> f64 {
    if indices.len() < 2 {
        return f64::INFINITY;
    }
    let mut min_gap = f64::INFINITY;
    for w in indices.windows(2) {
        let gap = (scenes[w[1]].timestamp_seconds - scenes[w[0]].timestamp_seconds).abs();
        if gap < min_gap {
            min_gap = gap;
        }
    }
    min_gap
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use vclip_models::SceneType;

    fn scene_at(t: f64) -> Scene {
        Scene::new(t, PathBuf::from(format!("{t}.jpg")), SceneType::Mid)
    }

    #[test]
    fn min_samples_clamps_between_two_and_four() {
        assert_eq!(min_samples(5), 2);
        assert_eq!(min_samples(100), 4);
    }

    #[test]
    fn balance_fills_when_under_target() {
        let scenes: Vec<Scene> = (0..10).map(|i| scene_at(i as f64)).collect();
        let selected = vec![0usize, 5];
        let unused: Vec<usize> = (0..10).filter(|i| *i != 0 && *i != 5).collect();
        let out = balance_scene_selection(&scenes, selected, &unused, 5);
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn balance_trims_when_over_target() {
        let scenes: Vec<Scene> = (0..10).map(|i| scene_at(i as f64)).collect();
        let selected: Vec<usize> = (0..8).collect();
        let out = balance_scene_selection(&scenes, selected, &[], 4);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn cluster_of_identical_points_forms_one_cluster_or_noise() {
        let distances = vec![vec![0.0; 20]; 20];
        let precision = PrecisionConfig::for_level(5);
        let labels = cluster(&distances, 0.8, &precision);
        assert_eq!(labels.len(), 20);
    }
}
