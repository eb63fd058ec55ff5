//! Parity monitor: detects when the remaining holes' required parity sum is
//! unreachable from the remaining pieces' signed magnitudes.

/// A precomputed state machine over "how many pieces of each magnitude
/// remain". Construction is exponential in the number of *distinct*
/// magnitudes (acceptable: that count is small in practice), not in the
/// number of pieces.
#[derive(Debug)]
pub struct ParityMonitor {
    magnitudes: Vec<i32>,
    /// Mixed-radix bound for each magnitude: `counts[i] in 0..=max_count[i]`.
    max_count: Vec<u32>,
    /// `states[state_index].possible[target_offset]`.
    states: Vec<StateEntry>,
    /// Current state index; advanced by `place`/`unplace`.
    current: u32,
}

struct StateEntry {
    /// Achievable target sums, offset by `offset` so index `0` means
    /// `-offset`.
    possible: Vec<bool>,
    offset: i32,
}

impl ParityMonitor {
    /// `remaining_magnitudes` is one entry per remaining mobile piece: the
    /// absolute value of that piece's parity (spec: "each piece contributes
    /// a parity in {-p, +p} where p = |piece.parity|").
    pub fn new(remaining_magnitudes: &[i32]) -> ParityMonitor {
        let mut counts: std::collections::BTreeMap<i32, u32> = Default::default();
        for &m in remaining_magnitudes {
            *counts.entry(m).or_insert(0) += 1;
        }
        let magnitudes: Vec<i32> = counts.keys().copied().collect();
        let max_count: Vec<u32> = magnitudes.iter().map(|m| counts[m]).collect();

        let total_states: usize = max_count.iter().map(|&c| c as usize + 1).product();
        let mut states = Vec::with_capacity(total_states);

        for state_index in 0..total_states {
            let current_counts = decode(state_index, &max_count);
            states.push(build_state(&magnitudes, &current_counts));
        }

        let initial = encode(&max_count, &max_count);
        ParityMonitor {
            magnitudes,
            max_count,
            states,
            current: initial as u32,
        }
    }

    fn state_counts(&self) -> Vec<u32> {
        decode(self.current as usize, &self.max_count)
    }

    fn magnitude_index(&self, magnitude: i32) -> usize {
        self.magnitudes
            .iter()
            .position(|&m| m == magnitude)
            .expect("placed piece's magnitude was not registered at construction")
    }

    /// Record that a piece of magnitude `p` has just been placed.
    pub fn place(&mut self, magnitude: i32) {
        let idx = self.magnitude_index(magnitude);
        let mut counts = self.state_counts();
        debug_assert!(counts[idx] > 0);
        counts[idx] -= 1;
        self.current = encode(&counts, &self.max_count) as u32;
    }

    /// Exact inverse of [`ParityMonitor::place`].
    pub fn unplace(&mut self, magnitude: i32) {
        let idx = self.magnitude_index(magnitude);
        let mut counts = self.state_counts();
        counts[idx] += 1;
        self.current = encode(&counts, &self.max_count) as u32;
    }

    /// `true` iff some signed sum of the remaining pieces' magnitudes equals
    /// `target` — the signed parity-sum of the currently unfilled cells.
    pub fn check(&self, target: i32) -> bool {
        let entry = &self.states[self.current as usize];
        let idx = target + entry.offset;
        if idx < 0 || idx as usize >= entry.possible.len() {
            false
        } else {
            entry.possible[idx as usize]
        }
    }
}

fn decode(mut index: usize, max_count: &[u32]) -> Vec<u32> {
    let mut counts = vec![0u32; max_count.len()];
    for (i, &m) in max_count.iter().enumerate() {
        let radix = m as usize + 1;
        counts[i] = (index % radix) as u32;
        index /= radix;
    }
    counts
}

fn encode(counts: &[u32], max_count: &[u32]) -> usize {
    let mut index = 0usize;
    let mut mult = 1usize;
    for (i, &m) in max_count.iter().enumerate() {
        index += counts[i] as usize * mult;
        mult *= m as usize + 1;
    }
    index
}

fn build_state(magnitudes: &[i32], counts: &[u32]) -> StateEntry {
    // Minkowski sum of each magnitude's achievable-increment set:
    // with `c` copies of magnitude `m`, achievable sums are
    // `{ (c - 2j) * m : j = 0..=c }`.
    let mut achievable: std::collections::BTreeSet<i32> = [0].into_iter().collect();
    for (i, &m) in magnitudes.iter().enumerate() {
        let c = counts[i] as i32;
        let mut next = std::collections::BTreeSet::new();
        for j in 0..=c {
            let delta = (c - 2 * j) * m;
            for &prev in &achievable {
                next.insert(prev + delta);
            }
        }
        achievable = next;
    }

    let max_sum: i32 = magnitudes
        .iter()
        .zip(counts)
        .map(|(&m, &c)| m.unsigned_abs() as i32 * c as i32)
        .sum();
    let offset = max_sum;
    let mut possible = vec![false; (2 * max_sum + 1).max(1) as usize];
    for &s in &achievable {
        possible[(s + offset) as usize] = true;
    }

    StateEntry { possible, offset }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_piece_parity_is_exactly_plus_or_minus() {
        let mon = ParityMonitor::new(&[1]);
        assert!(mon.check(1));
        assert!(mon.check(-1));
        assert!(!mon.check(0));
    }

    #[test]
    fn empty_remaining_only_reaches_zero() {
        let mon = ParityMonitor::new(&[]);
        assert!(mon.check(0));
        assert!(!mon.check(1));
    }

    #[test]
    fn place_then_unplace_restores_check() {
        let mut mon = ParityMonitor::new(&[1, 1, 3]);
        let before: Vec<bool> = (-5..=5).map(|t| mon.check(t)).collect();
        mon.place(1);
        mon.place(3);
        mon.unplace(3);
        mon.unplace(1);
        let after: Vec<bool> = (-5..=5).map(|t| mon.check(t)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn scenario_parity_impossible() {
        // Two magnitude-1 pieces (a tromino and a monomino, each parity ±1)
        // whose required target can't be reached.
        let mon = ParityMonitor::new(&[1, 1]);
        // Both magnitude-1 pieces: achievable sums are -2, 0, 2. A target of
        // 1 (an odd remaining-cell parity) is unreachable.
        assert!(!mon.check(1));
        assert!(mon.check(0));
        assert!(mon.check(2));
        assert!(mon.check(-2));
    }
}
