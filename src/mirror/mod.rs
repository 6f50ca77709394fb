//! Mirroring engine — activity gate, identity map, backpressure and the
//! per-event pipeline that ties them together.

pub mod activity;
pub mod identity;
pub mod pipeline;
pub mod rate_limit;

pub use activity::{ActiveSet, ActivityFilter, ActivityPolicy};
pub use identity::IdentityMap;
pub use pipeline::{MirrorPipeline, Outcome, Plan, SkipReason};
pub use rate_limit::RateLimiter;
