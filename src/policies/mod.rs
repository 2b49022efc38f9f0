//! Residency decision policy.
//!
//! ## Contents
//! - [`ResidencyPolicy`] thresholds + budget, and the pure `decide` function
//! - [`Candidate`] per-location input of one tick
//! - [`Decision`] unloads and loads to start
//!
//! ## Quick wiring
//! ```text
//! Streamer::tick()
//!   ├─► DistanceEvaluator::refresh(observer)
//!   ├─► ResidencyPolicy::decide(candidates) ─► Decision { to_unload, to_load }
//!   └─► TransitionExecutor::begin_unload / begin_load
//! ```

mod residency;

pub use residency::{Candidate, Decision, ResidencyPolicy};
