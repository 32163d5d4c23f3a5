//! `take2 intervals` – print the delay schedule for a strategy.

use anyhow::Result;
use take2_core::backoff::{Backoff, BackoffStrategy};

pub fn run_intervals(strategy: BackoffStrategy, start: f64) -> Result<()> {
    let intervals = Backoff::new(strategy, start)?.intervals();
    println!("{:<6} {}", "RETRY", "DELAY (s)");
    for (i, delay) in intervals.iter().enumerate() {
        println!("{:<6} {}", i + 1, delay);
    }
    Ok(())
}
