//! Actor-based fleet core
//!
//! The entity store has exactly one owner: the [`fleet::FleetActor`] task. HTTP
//! handlers and the simulation ticker never touch the store directly; they go
//! through the actor's mpsc mailbox, which serializes every mutation.
//!
//! ## Architecture Overview
//!
//! ```text
//!   HTTP handlers ──┐                      ┌──▶ observer 1 (WebSocket)
//!                   │ FleetCommand         │
//!                   ▼                      │
//!            ┌──────────────┐  publish  ┌──┴──────────┐
//!  ticker ──▶│  FleetActor  │──────────▶│ Broadcaster │──▶ observer N
//!            │ (FleetStore) │           └─────────────┘
//!            └──────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: typed [`messages::FleetCommand`] values sent through the
//!    [`fleet::FleetHandle`]
//! 2. **Request/Response**: oneshot channels carry the result back
//! 3. **Events**: the actor hands envelopes to the broadcaster after each
//!    successful mutation and after every tick

pub mod fleet;
pub mod messages;
