//! Single-slot actor cache.
//!
//! The cache holds at most one current [`ActorHandle`]. The slot moves
//! through three states:
//!
//! ```text
//!            get_actor()                 build ok, same generation
//!   Empty ───────────────▶ Building ─────────────────────────────▶ Ready
//!     ▲                      │  │                                    │
//!     │   build failed       │  │ reset_actor()                      │
//!     └──────────────────────┘  └──────────▶ Empty ◀─────────────────┘
//!                                             (generation + 1)
//! ```
//!
//! # Invariants
//!
//! - While `Ready`, every `get_actor()` returns the same `Arc` without any
//!   network traffic.
//! - While `Building`, callers join the in-flight construction (a
//!   [`Shared`] future) instead of starting another one.
//! - `reset_actor()` bumps the generation. A construction that completes
//!   after the bump is handed to the callers that were already awaiting it,
//!   but is never published to the slot.
//! - A failed construction leaves the slot `Empty`, so the next call starts
//!   over.
//!
//! The mutex guarding the slot is only held for bookkeeping, never across an
//! `.await`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use candid::Principal;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};
use url::Url;

use crate::actor::TokenActor;
use crate::agent::{AgentFactory, Connector};
use crate::config::PortalConfig;
use crate::error::ClientError;
use crate::identity::{resolve_or_anonymous, IdentityResolver};
use crate::trust::TrustBootstrap;

/// The current callable stub. Compare handles with [`Arc::ptr_eq`].
pub type ActorHandle = Arc<TokenActor>;

type Build = Shared<BoxFuture<'static, Result<ActorHandle, ClientError>>>;

enum Slot {
    Empty,
    Building { build_id: u64, build: Build },
    Ready(ActorHandle),
}

struct State {
    slot: Slot,
    generation: u64,
    next_build_id: u64,
}

/// Everything a construction needs, shareable with the spawned build future.
struct Builder {
    resolver: Arc<dyn IdentityResolver>,
    connector: Connector,
    canister_id: Principal,
    endpoint: Url,
    allow_uncertified_updates: bool,
    constructions: AtomicU64,
}

impl Builder {
    async fn build(&self, generation: u64) -> Result<ActorHandle, ClientError> {
        self.constructions.fetch_add(1, Ordering::SeqCst);
        let identity = resolve_or_anonymous(self.resolver.as_ref()).await;
        info!(
            generation,
            principal = %identity.principal(),
            anonymous = identity.is_anonymous(),
            "constructing actor"
        );

        let agent = self.connector.build_agent(&identity, &self.endpoint).await?;
        Ok(Arc::new(TokenActor::new(
            agent,
            self.canister_id,
            generation,
            self.allow_uncertified_updates,
        )))
    }
}

pub struct ActorCache {
    state: Mutex<State>,
    builder: Arc<Builder>,
}

impl ActorCache {
    pub fn new(
        config: &PortalConfig,
        resolver: Arc<dyn IdentityResolver>,
        factory: Arc<dyn AgentFactory>,
    ) -> Self {
        Self {
            state: Mutex::new(State {
                slot: Slot::Empty,
                generation: 0,
                next_build_id: 0,
            }),
            builder: Arc::new(Builder {
                resolver,
                connector: Connector::new(factory, TrustBootstrap::new(config.fetch_root_key)),
                canister_id: config.canister_id,
                endpoint: config.network_host.clone(),
                allow_uncertified_updates: config.allow_uncertified_updates,
                constructions: AtomicU64::new(0),
            }),
        }
    }

    /// Return the current actor, constructing it if the slot is empty.
    pub async fn get_actor(&self) -> Result<ActorHandle, ClientError> {
        let (generation, build_id, build) = {
            let mut state = self.state.lock().unwrap();
            match &state.slot {
                Slot::Ready(handle) => return Ok(Arc::clone(handle)),
                Slot::Building { build_id, build } => {
                    debug!(generation = state.generation, "joining in-flight actor construction");
                    (state.generation, *build_id, build.clone())
                }
                Slot::Empty => {
                    let generation = state.generation;
                    let build_id = state.next_build_id;
                    state.next_build_id += 1;

                    let builder = Arc::clone(&self.builder);
                    let build = async move { builder.build(generation).await }
                        .boxed()
                        .shared();
                    state.slot = Slot::Building {
                        build_id,
                        build: build.clone(),
                    };
                    (generation, build_id, build)
                }
            }
        };

        let result = build.await;
        self.settle(generation, build_id, &result);
        result
    }

    /// Drop the current actor and invalidate any construction in flight.
    pub fn reset_actor(&self) {
        let mut state = self.state.lock().unwrap();
        state.slot = Slot::Empty;
        state.generation += 1;
        info!(generation = state.generation, "actor cache reset");
    }

    /// The ready actor, if any. Never starts a construction.
    pub fn peek(&self) -> Option<ActorHandle> {
        match &self.state.lock().unwrap().slot {
            Slot::Ready(handle) => Some(Arc::clone(handle)),
            _ => None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().unwrap().generation
    }

    /// How many constructions have been started since the cache was created.
    pub fn construction_count(&self) -> u64 {
        self.builder.constructions.load(Ordering::SeqCst)
    }

    fn settle(&self, generation: u64, build_id: u64, result: &Result<ActorHandle, ClientError>) {
        let mut state = self.state.lock().unwrap();
        if state.generation != generation {
            debug!(
                built_for = generation,
                current = state.generation,
                "discarding actor from a stale generation"
            );
            return;
        }

        let ours = matches!(&state.slot, Slot::Building { build_id: id, .. } if *id == build_id);
        if !ours {
            return;
        }

        state.slot = match result {
            Ok(handle) => Slot::Ready(Arc::clone(handle)),
            Err(e) => {
                warn!(generation, error = %e, "actor construction failed");
                Slot::Empty
            }
        };
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
