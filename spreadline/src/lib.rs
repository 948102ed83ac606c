//! Numerical building blocks for causal feature engineering over ordered sample streams:
//! descriptive statistics, order statistics, a sliding-window accumulator and credibility
//! shrinkage, together with the file utilities used to move tables in and out.

pub mod csv;
pub mod file;
pub mod quantile;
pub mod shrink;
pub mod sliding;
pub mod stats;
pub mod timed;

#[doc = include_str!("../../README.md")]
#[cfg(doc)]
fn readme() {}
