//! Volume monitor: detects when an isolated unoccupied region's size cannot
//! be expressed as a sum of any subset of the remaining pieces' sizes.

/// Analogous to [`crate::parity::ParityMonitor`] but keyed on piece *size*
/// and testing reachability by any subset (not a signed total). Built
/// lazily — only when volume checking will actually fire — since its
/// memory grows multiplicatively in the number of distinct sizes.
#[derive(Debug)]
pub struct VolumeMonitor {
    sizes: Vec<u32>,
    max_count: Vec<u32>,
    states: Vec<StateEntry>,
    current: u32,
}

struct StateEntry {
    /// `possible[v]` for `v` in `0..=max_sum`.
    possible: Vec<bool>,
}

impl VolumeMonitor {
    /// `remaining_sizes` is one entry per remaining mobile piece (its cell
    /// count).
    pub fn new(remaining_sizes: &[u32]) -> VolumeMonitor {
        let mut counts: std::collections::BTreeMap<u32, u32> = Default::default();
        for &s in remaining_sizes {
            *counts.entry(s).or_insert(0) += 1;
        }
        let sizes: Vec<u32> = counts.keys().copied().collect();
        let max_count: Vec<u32> = sizes.iter().map(|s| counts[s]).collect();

        let total_states: usize = max_count.iter().map(|&c| c as usize + 1).product();
        let mut states = Vec::with_capacity(total_states);
        for state_index in 0..total_states {
            let current_counts = decode(state_index, &max_count);
            states.push(build_state(&sizes, &current_counts));
        }

        let initial = encode(&max_count, &max_count);
        VolumeMonitor {
            sizes,
            max_count,
            states,
            current: initial as u32,
        }
    }

    fn state_counts(&self) -> Vec<u32> {
        decode(self.current as usize, &self.max_count)
    }

    fn size_index(&self, size: u32) -> usize {
        self.sizes
            .iter()
            .position(|&s| s == size)
            .expect("placed piece's size was not registered at construction")
    }

    pub fn place(&mut self, size: u32) {
        let idx = self.size_index(size);
        let mut counts = self.state_counts();
        debug_assert!(counts[idx] > 0);
        counts[idx] -= 1;
        self.current = encode(&counts, &self.max_count) as u32;
    }

    pub fn unplace(&mut self, size: u32) {
        let idx = self.size_index(size);
        let mut counts = self.state_counts();
        counts[idx] += 1;
        self.current = encode(&counts, &self.max_count) as u32;
    }

    /// `true` iff some subset of the remaining pieces sums to exactly `v`.
    pub fn check(&self, v: u32) -> bool {
        let entry = &self.states[self.current as usize];
        (v as usize) < entry.possible.len() && entry.possible[v as usize]
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

fn build_state(sizes: &[u32], counts: &[u32]) -> StateEntry {
    let mut achievable: std::collections::BTreeSet<u32> = [0].into_iter().collect();
    for (i, &s) in sizes.iter().enumerate() {
        let c = counts[i];
        let mut next = std::collections::BTreeSet::new();
        for k in 0..=c {
            let delta = k * s;
            for &prev in &achievable {
                next.insert(prev + delta);
            }
        }
        achievable = next;
    }
    let max_sum: u32 = sizes.iter().zip(counts).map(|(&s, &c)| s * c).sum();
    let mut possible = vec![false; max_sum as usize + 1];
    for &v in &achievable {
        possible[v as usize] = true;
    }
    StateEntry { possible }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_always_reachable() {
        let mon = VolumeMonitor::new(&[3, 5]);
        assert!(mon.check(0));
    }

    #[test]
    fn subset_sum_reachability() {
        let mon = VolumeMonitor::new(&[1, 2, 4]);
        for v in [0, 1, 2, 3, 4, 5, 6, 7] {
            assert!(mon.check(v), "expected {v} reachable from {{1,2,4}}");
        }
        assert!(!mon.check(8));
    }

    #[test]
    fn place_then_unplace_restores_check() {
        let mut mon = VolumeMonitor::new(&[1, 1, 5]);
        let before: Vec<bool> = (0..=7).map(|v| mon.check(v)).collect();
        mon.place(1);
        mon.place(5);
        mon.unplace(5);
        mon.unplace(1);
        let after: Vec<bool> = (0..=7).map(|v| mon.check(v)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn isolated_single_cell_needs_a_unit_piece() {
        let mon = VolumeMonitor::new(&[2, 2]);
        assert!(!mon.check(1));
        assert!(mon.check(2));
        assert!(mon.check(4));
        assert!(!mon.check(3));
    }
}
