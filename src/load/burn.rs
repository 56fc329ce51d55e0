//! CPU-burning primitives.
//!
//! None of these do useful work. They exist so a sampling profiler sees a
//! clearly named frame eating CPU for a predictable amount of time.

use std::hint::black_box;
use std::time::{Duration, Instant};

/// Spin until `duration` has elapsed, returning the number of loop iterations.
#[inline(never)]
pub fn busy_wait(duration: Duration) -> u64 {
    let start = Instant::now();
    let mut iterations: u64 = 0;
    while start.elapsed() < duration {
        iterations = black_box(iterations.wrapping_add(1));
    }
    iterations
}

/// Naive recursive Fibonacci, exponential on purpose.
#[inline(never)]
pub fn fibonacci(n: u32) -> u64 {
    if n < 2 {
        return n as u64;
    }
    black_box(fibonacci(n - 1)).wrapping_add(fibonacci(n - 2))
}

/// Trial-division primality test
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Search for primes until `budget` runs out; returns how many were found.
#[inline(never)]
pub fn count_primes_for(budget: Duration) -> u64 {
    let start = Instant::now();
    let mut candidate: u64 = 2;
    let mut found = 0;
    while start.elapsed() < budget {
        if is_prime(black_box(candidate)) {
            found += 1;
        }
        candidate += 1;
    }
    found
}
