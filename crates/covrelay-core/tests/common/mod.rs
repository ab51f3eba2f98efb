//! Shared fixtures for relay integration tests.
//!
//! Two relays, one on chain 1 and one on chain 137, each trusting the
//! other's endpoint. Outbound envelopes land in a [`Loopback`] outbox and
//! are handed to the peer explicitly with [`pump`], so tests control
//! ordering, duplication and loss.
//!
//! ```text
//! ethereum.send ─> eth_link.outbox ──pump──> polygon.receive
//! polygon.send  ─> poly_link.outbox ─pump──> ethereum.receive
//! ```

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use covrelay_core::prelude::*;
use tracing_subscriber::EnvFilter;

pub const ETHEREUM: DestinationId = DestinationId::new(1);
pub const POLYGON: DestinationId = DestinationId::new(137);
pub const ETH_ENDPOINT: Address = Address::repeat_byte(0x11);
pub const POLY_ENDPOINT: Address = Address::repeat_byte(0x22);
pub const OPERATOR: Address = Address::repeat_byte(0xad);
pub const HOLDER: Address = Address::repeat_byte(0xaa);
pub const QUOTE: Amount = 2_500;
pub const START: u64 = 1_700_000_000;

static TRACING: Once = Once::new();

/// Routes relay logs to the test writer. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

// =============================================================================
// Transport
// =============================================================================

/// Transport that queues envelopes instead of delivering them.
pub struct Loopback {
    outbox: Mutex<Vec<MessageEnvelope>>,
    copies: AtomicUsize,
    down: AtomicBool,
}

impl Loopback {
    pub fn new() -> Self {
        Self {
            outbox: Mutex::new(Vec::new()),
            copies: AtomicUsize::new(1),
            down: AtomicBool::new(false),
        }
    }

    /// Each delivery queues `copies` identical envelopes.
    pub fn duplicate(&self, copies: usize) {
        self.copies.store(copies, Ordering::SeqCst);
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn take(&self) -> Vec<MessageEnvelope> {
        std::mem::take(&mut *self.outbox.lock().unwrap())
    }

    pub fn queued(&self) -> usize {
        self.outbox.lock().unwrap().len()
    }
}

impl Transport for Loopback {
    fn quote(&self, _: DestinationId, request: &CoverageRequest) -> Result<Amount, TransportError> {
        // Larger policies cost slightly more to carry.
        Ok(QUOTE + request.amount() / COVERAGE_UNIT)
    }

    fn deliver(
        &self,
        destination: DestinationId,
        envelope: &MessageEnvelope,
    ) -> Result<Amount, TransportError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(TransportError::unreachable(destination, "loopback down"));
        }
        let mut outbox = self.outbox.lock().unwrap();
        for _ in 0..self.copies.load(Ordering::SeqCst) {
            outbox.push(envelope.clone());
        }
        Ok(QUOTE + envelope.payload().amount() / COVERAGE_UNIT)
    }
}

// =============================================================================
// Pool
// =============================================================================

/// Pool that numbers policies sequentially and can be told to refuse.
pub struct Pool {
    issued: AtomicU64,
    refuse: AtomicBool,
}

impl Pool {
    pub fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            refuse: AtomicBool::new(false),
        }
    }

    pub fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

impl CoveragePool for Pool {
    fn materialize_policy(&self, _: &CoverageRequest) -> Result<PolicyId, PoolError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(PoolError::unavailable("underwriting halted"));
        }
        Ok(PolicyId::new(self.issued.fetch_add(1, Ordering::SeqCst) + 1))
    }
}

// =============================================================================
// Relay pair
// =============================================================================

/// One side of the channel.
pub struct Side {
    pub relay: CoverageRelay,
    pub link: Arc<Loopback>,
    pub pool: Arc<Pool>,
}

pub struct Pair {
    pub ethereum: Side,
    pub polygon: Side,
    pub clock: Arc<ManualClock>,
}

fn config_toml(
    local: DestinationId,
    endpoint: Address,
    peer: DestinationId,
    peer_endpoint: Address,
) -> String {
    format!(
        r#"
local_chain = {local}
local_endpoint = "{endpoint}"
admin = "{OPERATOR}"
window_secs = 3600

[[chains]]
destination = {peer}
remote_endpoint = "{peer_endpoint}"
rate_limit = 5
"#
    )
}

fn side(toml: &str, clock: &Arc<ManualClock>) -> Side {
    let config = RelayConfig::from_toml(toml).unwrap();
    let link = Arc::new(Loopback::new());
    let pool = Arc::new(Pool::new());
    let relay = CoverageRelay::builder(config, link.clone(), pool.clone())
        .clock(clock.clone())
        .build()
        .unwrap();
    Side { relay, link, pool }
}

impl Pair {
    pub fn new() -> Self {
        init_tracing();
        let clock = Arc::new(ManualClock::new(START));
        let ethereum = side(
            &config_toml(ETHEREUM, ETH_ENDPOINT, POLYGON, POLY_ENDPOINT),
            &clock,
        );
        let polygon = side(
            &config_toml(POLYGON, POLY_ENDPOINT, ETHEREUM, ETH_ENDPOINT),
            &clock,
        );
        Self {
            ethereum,
            polygon,
            clock,
        }
    }
}

/// A request for `units` whole units of coverage over thirty days.
pub fn request(units: u128, source_chain: DestinationId) -> CoverageRequest {
    CoverageRequest::new(
        HOLDER,
        units * COVERAGE_UNIT,
        30 * SECONDS_PER_DAY,
        units * COVERAGE_UNIT / 50,
        source_chain,
        START,
    )
    .unwrap()
}

/// Hands every queued envelope from `from` to `to`.
pub fn pump(from: &Side, to: &Side) -> Vec<Result<PolicyId, RelayError>> {
    from.link
        .take()
        .iter()
        .map(|envelope| to.relay.receive_coverage(envelope))
        .collect()
}
