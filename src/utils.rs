use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::TbResult;
use crate::signal::SimObject;
use crate::value::Word;

pub async fn clock_cycles(signal: &SimObject, n_cycles: u32) -> TbResult<()> {
    for _ in 0..n_cycles {
        signal.rising_edge().await?;
    }
    Ok(())
}

/// Reproducible generator for stimulus.
#[inline]
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

#[inline]
pub fn rand_word(rng: &mut impl Rng) -> Word {
    rng.gen::<Word>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stimulus() {
        let mut a = seeded_rng(7);
        let mut b = seeded_rng(7);
        let xs: Vec<Word> = (0..8).map(|_| rand_word(&mut a)).collect();
        let ys: Vec<Word> = (0..8).map(|_| rand_word(&mut b)).collect();
        assert_eq!(xs, ys);
    }
}
