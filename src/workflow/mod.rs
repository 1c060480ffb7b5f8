pub mod fixture_ctx;
pub mod fixture_flow;

pub use fixture_ctx::FixtureCtx;
pub use fixture_flow::{FixtureFlow, FixtureState, GroupOutcome};
