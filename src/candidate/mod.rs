//! Candidate peak bookkeeping.

pub mod peak;
