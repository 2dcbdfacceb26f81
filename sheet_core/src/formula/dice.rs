//! Dice rolling - injected random integer generators

use rand::Rng;
use std::cell::RefCell;

/// Source of random integers for dice terms
///
/// `roll(min, max)` returns an integer in `min..=max`. Any
/// `Fn(i64, i64) -> i64` closure is a roller, so tests can pass `|_, _| 1`.
pub trait DiceRoller {
    fn roll(&self, min: i64, max: i64) -> i64;
}

impl<F> DiceRoller for F
where
    F: Fn(i64, i64) -> i64,
{
    fn roll(&self, min: i64, max: i64) -> i64 {
        self(min, max)
    }
}

/// Roller backed by any `rand` generator
#[derive(Debug)]
pub struct RngRoller<R: Rng> {
    rng: RefCell<R>,
}

impl<R: Rng> RngRoller<R> {
    pub fn new(rng: R) -> Self {
        RngRoller {
            rng: RefCell::new(rng),
        }
    }
}

impl<R: Rng> DiceRoller for RngRoller<R> {
    fn roll(&self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        self.rng.borrow_mut().gen_range(min..=max)
    }
}

/// Roller for production use, seeded from the thread-local generator
pub fn thread_roller() -> RngRoller<rand::rngs::ThreadRng> {
    RngRoller::new(rand::thread_rng())
}

/// Roll `count` dice with `sides` faces and sum them
pub fn roll_dice(count: u32, sides: u32, roller: &dyn DiceRoller) -> i64 {
    (0..count).map(|_| roller.roll(1, sides as i64)).sum()
}
