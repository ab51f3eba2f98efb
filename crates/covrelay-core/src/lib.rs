//! # covrelay-core
//!
//! Cross-chain coverage relay. A holder buys parametric coverage on one
//! network and an equivalent obligation is recognized on another through an
//! at-least-once message transport. Each relay endpoint:
//!
//! - validates outbound coverage requests against fixed bounds
//! - caps throughput per destination with a fixed-window rate limit
//! - applies each inbound message exactly once despite duplicate delivery
//! - exposes administrative controls (chain enable/disable, emergency pause)
//!
//! ## Core Concepts
//!
//! - **Destination**: a non-zero chain selector with a trusted remote
//!   endpoint, see [`registry`]
//! - **Envelope**: a [`types::CoverageRequest`] sealed under a content-derived
//!   [`types::MessageId`], see [`types::MessageEnvelope`]
//! - **Replay guard**: the processed-id set and per-sender nonces, see
//!   [`replay`]
//! - **Pending ledger**: admitted requests awaiting resolution, see
//!   [`pending`]
//! - **Signals**: committed events retained in a bounded log, see [`signal`]
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use covrelay_core::prelude::*;
//!
//! struct FlatFee;
//!
//! impl Transport for FlatFee {
//!     fn quote(&self, _: DestinationId, _: &CoverageRequest) -> Result<Amount, TransportError> {
//!         Ok(1_000)
//!     }
//!
//!     fn deliver(&self, _: DestinationId, _: &MessageEnvelope) -> Result<Amount, TransportError> {
//!         Ok(1_000)
//!     }
//! }
//!
//! struct Pool;
//!
//! impl CoveragePool for Pool {
//!     fn materialize_policy(&self, _: &CoverageRequest) -> Result<PolicyId, PoolError> {
//!         Ok(PolicyId::new(1))
//!     }
//! }
//!
//! let admin = Address::repeat_byte(0xad);
//! let mut config = RelayConfig::new(DestinationId::new(1), Address::repeat_byte(0x11));
//! config.admin = Some(admin);
//!
//! let relay = CoverageRelay::builder(config, Arc::new(FlatFee), Arc::new(Pool))
//!     .build()
//!     .unwrap();
//! relay
//!     .enable_chain(admin, DestinationId::new(137), Address::repeat_byte(0x22), 10)
//!     .unwrap();
//!
//! let request = CoverageRequest::new(
//!     Address::repeat_byte(0xaa),
//!     10 * COVERAGE_UNIT,
//!     30 * SECONDS_PER_DAY,
//!     COVERAGE_UNIT / 10,
//!     DestinationId::new(1),
//!     1_700_000_000,
//! )
//! .unwrap();
//!
//! let id = relay
//!     .send_coverage(admin, DestinationId::new(137), request, 1_500)
//!     .unwrap();
//! assert_eq!(relay.get_pending_coverage(id).unwrap().status, CoverageStatus::Pending);
//! assert_eq!(relay.reserve(), 500);
//! ```

pub mod access;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod fee;
pub mod hash;
pub mod pending;
pub mod pool;
pub mod registry;
pub mod relay;
pub mod replay;
pub mod signal;
pub mod types;
pub mod validator;

// Re-export main types at crate root for convenience
pub use access::{AccessControl, Capability, CapabilitySet};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ChainSeed, ConfigError, RelayConfig, RoleSeed};
pub use error::RelayError;
pub use fee::{FeeEstimator, Transport, TransportError};
pub use pending::{CoverageStatus, PendingCoverage, PendingLedger, Route};
pub use pool::{CoveragePool, PoolError};
pub use registry::{ChainConfig, ChainRegistry, RateLimitPolicy};
pub use relay::{CoverageRelay, CoverageRelayBuilder, ReserveWithdrawal};
pub use replay::ReplayGuard;
pub use signal::{RelaySignal, SignalRecord};
pub use types::{
    Address, Amount, CoverageRequest, DestinationId, MessageEnvelope, MessageId, PolicyId,
    Timestamp,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::access::{Capability, CapabilitySet};
    pub use crate::clock::{Clock, ManualClock};
    pub use crate::config::RelayConfig;
    pub use crate::constants::{COVERAGE_UNIT, SECONDS_PER_DAY};
    pub use crate::error::RelayError;
    pub use crate::fee::{Transport, TransportError};
    pub use crate::pending::{CoverageStatus, PendingCoverage, Route};
    pub use crate::pool::{CoveragePool, PoolError};
    pub use crate::relay::CoverageRelay;
    pub use crate::signal::RelaySignal;
    pub use crate::types::{
        Address, Amount, CoverageRequest, DestinationId, MessageEnvelope, MessageId, PolicyId,
    };
}
