//! Minimum-weight perfect matching over a small complete graph, used by the
//! undirected solver's T-join step: find a minimum-weight perfect matching
//! on the odd-degree set. Exact bitmask DP rather than Blossom - the
//! odd-degree set is expected to stay small enough that the exponential DP
//! is both exact and fast in practice.

use crate::error::SolverError;
use crate::N64;

/// Finds a perfect matching of `0..cost.len()` minimizing total `cost[i][j]`,
/// where `cost[i][j] = None` means `i` and `j` cannot be matched. `labels[i]`
/// is used only to build [`SolverError::MatchingInfeasible`] if some `i` has
/// no reachable partner at all.
///
/// Returns pairs `(i, j)` with `i < j`. `cost.len()` must be even - the
/// odd-degree set of any graph always has even size (handshake lemma),
/// and the caller is expected to have established that already.
pub fn min_weight_perfect_matching(
    cost: &[Vec<Option<N64>>],
    labels: &[crate::NodeId],
) -> Result<Vec<(usize, usize)>, SolverError> {
    let n = cost.len();
    debug_assert_eq!(n % 2, 0);
    if n == 0 {
        return Ok(Vec::new());
    }
    for (i, row) in cost.iter().enumerate() {
        if row.iter().all(|c| c.is_none()) {
            return Err(SolverError::MatchingInfeasible { node: labels[i] });
        }
    }

    let full_mask: u32 = (1 << n) - 1;
    let mut memo: Vec<Option<N64>> = vec![None; 1 << n];
    let mut choice: Vec<Option<usize>> = vec![None; 1 << n];
    memo[0] = Some(crate::n64(0.0));

    // Iterate masks in increasing order: every submask of `mask` with fewer
    // bits than `mask` has already been resolved by the time we reach it.
    for mask in 0..=full_mask {
        let cur = match memo[mask as usize] {
            Some(c) => c,
            None => continue,
        };
        let i = match (0..n).find(|&i| mask & (1 << i) == 0) {
            Some(i) => i,
            None => continue,
        };
        for j in (i + 1)..n {
            if mask & (1 << j) != 0 {
                continue;
            }
            let w = match cost[i][j] {
                Some(w) => w,
                None => continue,
            };
            let next_mask = mask | (1 << i) | (1 << j);
            let candidate = cur + w;
            if memo[next_mask as usize].map_or(true, |best| candidate < best) {
                memo[next_mask as usize] = Some(candidate);
                choice[next_mask as usize] = Some(i * n + j);
            }
        }
    }

    if memo[full_mask as usize].is_none() {
        // Every node individually has a partner, but no assignment covers
        // all of them at once - report the smallest-indexed node as the
        // representative failure, matching the rest of the crate's
        // deterministic tie-breaking by node id.
        return Err(SolverError::MatchingInfeasible { node: labels[0] });
    }

    let mut pairs = Vec::with_capacity(n / 2);
    let mut mask = full_mask;
    while mask != 0 {
        let packed = choice[mask as usize].expect("reachable mask must have a recorded choice");
        let (i, j) = (packed / n, packed % n);
        pairs.push((i, j));
        mask &= !(1 << i);
        mask &= !(1 << j);
    }
    pairs.sort_unstable();
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::n64;

    #[test]
    fn matches_cheapest_pairing_over_four_nodes() {
        // 0-1 and 2-3 cost 1+1=2; 0-2 and 1-3 cost 5+5=10. Cheapest wins.
        let cost = vec![
            vec![None, Some(n64(1.0)), Some(n64(5.0)), Some(n64(9.0))],
            vec![Some(n64(1.0)), None, Some(n64(9.0)), Some(n64(5.0))],
            vec![Some(n64(5.0)), Some(n64(9.0)), None, Some(n64(1.0))],
            vec![Some(n64(9.0)), Some(n64(5.0)), Some(n64(1.0)), None],
        ];
        let labels = vec![0, 1, 2, 3];
        let pairs = min_weight_perfect_matching(&cost, &labels).unwrap();
        assert_eq!(pairs, vec![(0, 1), (2, 3)]);
    }

    #[test]
    fn reports_unreachable_node() {
        let cost = vec![
            vec![None, None],
            vec![None, None],
        ];
        let labels = vec![42, 7];
        let err = min_weight_perfect_matching(&cost, &labels).unwrap_err();
        matches!(err, SolverError::MatchingInfeasible { node: 42 });
    }
}
