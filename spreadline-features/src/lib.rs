//! The temporal feature-engineering engine: converts an ordered game log into causal,
//! participant-perspective consistency profiles against the quoted line, and combines two such
//! profiles into a joint assessment of a paired event.

pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod matchup;
pub mod normalise;
pub mod partition;
pub mod pipeline;
pub mod print;
pub mod profile;
pub mod score;
pub mod shrinkage;
pub mod state;
pub mod table;
pub mod trend;
pub mod window;

#[doc = include_str!("../../README.md")]
#[cfg(doc)]
fn readme() {}
