//! # Exchange Module
//!
//! Storage of in-flight protocol steps (proposals, offers, requests, issued credentials,
//! proof requests, did-auth challenges). Records are correlated by thread id and consumed once the next step of the
//! same thread is processed, which is what blocks replays.
//!
//! Stage specific data lives in [`ExchangeMeta`], one variant per stage.
pub mod memory;
pub mod types;

pub use memory::MemoryExchanges;
pub use types::{
    DidAuthMeta, ExchangeError, ExchangeMessage, ExchangeMeta, IssuedMeta, OfferMeta,
    ProofRequestMeta, RepoExchangeBuilder, RequestReceivedMeta, RequestSentMeta,
};
