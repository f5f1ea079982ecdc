//! Claim subsystem: the faucet's core.
//!
//! # Responsibilities
//! - Validate and verify incoming claims
//! - Gate each network by the recipient's cooldown
//! - Fan transfers out to every eligible network and aggregate the outcomes
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → orchestrator.rs (state machine, fan-out/fan-in)
//!         → verification::HumanVerifier
//!         → cooldown.rs (reserve / commit / release)
//!         → blockchain::NetworkEndpoint (one per network)
//!     → types.rs (ClaimResult or ClaimError back to the handler)
//! ```

pub mod cooldown;
pub mod orchestrator;
pub mod types;

pub use cooldown::{CooldownBlock, CooldownReservation, CooldownTracker};
pub use orchestrator::{ClaimOrchestrator, ClaimPolicy};
pub use types::{ClaimError, ClaimRequest, ClaimResult};
