use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::hash::Hash;

use crate::util::IndexSet;

/// The one source of randomness of a generation session.
///
/// Everything random goes through this so that the same seed always
/// produces the same quest.
#[derive(Debug, Clone)]
pub struct Random {
    rng: StdRng,
}

impl Random {
    pub fn new(seed: u64) -> Self {
        Random {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform in `0..=max`.
    pub fn int(&mut self, max: usize) -> usize {
        self.rng.gen_range(0..=max)
    }

    /// A coin flip.
    pub fn roll_d2(&mut self) -> bool {
        self.rng.gen_ratio(1, 2)
    }

    /// True one time in five.
    pub fn roll_d5(&mut self) -> bool {
        self.rng.gen_ratio(1, 5)
    }

    pub fn pick_one<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    pub fn pick_index<T>(&mut self, items: &IndexSet<T>) -> Option<usize> {
        if items.is_empty() {
            None
        } else {
            Some(self.rng.gen_range(0..items.len()))
        }
    }

    pub fn pick_from_set<'a, T>(&mut self, items: &'a IndexSet<T>) -> Option<&'a T> {
        let index = self.pick_index(items)?;
        items.get_index(index)
    }

    /// Picks an item that is not in `used` yet and marks it as used.
    pub fn pick_one_unique<T>(&mut self, items: &IndexSet<T>, used: &mut IndexSet<T>) -> Option<T>
    where
        T: Clone + Eq + Hash,
    {
        let available: Vec<&T> = items.iter().filter(|item| !used.contains(*item)).collect();
        let picked = (*available.choose(&mut self.rng)?).clone();
        used.insert(picked.clone());
        Some(picked)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut r1 = Random::new(42);
        let mut r2 = Random::new(42);
        let a: Vec<usize> = (0..20).map(|_| r1.int(100)).collect();
        let b: Vec<usize> = (0..20).map(|_| r2.int(100)).collect();
        assert_eq!(a, b);
        assert!(a.iter().all(|&x| x <= 100));
    }

    #[test]
    fn unique_picks_exhaust_the_set() {
        let mut random = Random::new(7);
        let items: IndexSet<&str> = ["a", "b", "c"].into_iter().collect();
        let mut used = IndexSet::default();

        let mut picked: Vec<&str> = (0..3)
            .map(|_| random.pick_one_unique(&items, &mut used).unwrap())
            .collect();
        picked.sort();
        assert_eq!(picked, vec!["a", "b", "c"]);
        assert_eq!(random.pick_one_unique(&items, &mut used), None);
    }

    #[test]
    fn empty_inputs_pick_nothing() {
        let mut random = Random::new(1);
        let empty: Vec<u8> = vec![];
        assert_eq!(random.pick_one(&empty), None);
        assert_eq!(random.pick_from_set(&IndexSet::<u8>::default()), None);
    }
}
