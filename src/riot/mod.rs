//! Riot API access: admission control, resilient fetch, endpoint shaping.

pub mod client;
pub mod http_client;
pub mod rate_limiter;

pub use client::{RiotClient, SUPPORTED_TIERS};
pub use http_client::{ApiResponse, HttpTransport, ReqwestTransport, RiotHttpClient};
pub use rate_limiter::SlidingWindowLimiter;
