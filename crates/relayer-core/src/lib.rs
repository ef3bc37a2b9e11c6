//! Core relay logic.
//!
//! [`AllowlistPolicy`] decides which adapters, tokens and directional pairs
//! the relayer will serve. [`IntentPipeline`] runs the two request flows:
//! building an unsigned intent with a freshly reserved nonce, and executing
//! a signed intent on chain after verifying its signature against the
//! settlement's EIP-712 domain.

pub mod allowlist;
pub mod pipeline;

pub use allowlist::{parse_address_list, parse_pair_list, AllowlistPolicy, PolicyError};
pub use pipeline::{ExecutionOutcome, IntentPipeline, PipelineConfig, PipelineError};
