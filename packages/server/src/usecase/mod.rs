//! UseCase layer: the relay's behaviour, written against the domain traits.

pub mod display_name;
pub mod forward_action;
pub mod heartbeat;
pub mod join;
pub mod message_bus;
pub mod rate_limiter;
pub mod router;
pub mod storekeeper;
pub mod trust_gate;

pub use display_name::DisplayNameResolver;
pub use forward_action::{ForwardActionUseCase, ForwardOutcome};
pub use heartbeat::{HeartbeatMonitor, HeartbeatReport};
pub use join::JoinUseCase;
pub use message_bus::MessageBus;
pub use rate_limiter::RateLimiter;
pub use router::{DropReason, EnvelopeRouter, RouteOutcome};
pub use storekeeper::{StorekeeperReply, StorekeeperUseCase};
pub use trust_gate::TrustGate;
