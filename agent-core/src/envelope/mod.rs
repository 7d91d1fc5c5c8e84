//! # Envelope Module
//!
//! The `envelope` module is the codec layer between protocol messages and the bytes a transport moves.
//!
//! ## Module Structure
//!
//! - [`types`] - [`Envelope`], [`Target`], [`Unpacked`], [`Thread`] and [`EnvelopeError`]
//! - [`codec`] - single hop anonymous/authenticated encryption plus the onion style forward wrap
//! - [`signed`] - signed fields binding a timestamp and a payload to a key
//! - [`attachment`] - typed `~attach` entries, base64 decoded once when a message is parsed
//! - [`message`] - message type helpers shared by every protocol (`@type`, `~thread`, ids)
//!
//! ## Forward wrap
//!
//! ```text
//! pack(message, {recipientKeys: [R], routingKeys: [K1, K2]})
//!
//!   E0 = encrypt_for(R, message)
//!   E1 = anoncrypt_for(K1, {forward, to: R,  msg: E0})
//!   E2 = anoncrypt_for(K2, {forward, to: K1, msg: E1})   <- goes on the wire
//! ```
//!
//! Only the holder of `K2` can remove the outermost layer, the unwrap side repeats
//! "decrypt, read `to`, resolve the owner of `to`" until a non forward message appears.
pub mod attachment;
pub mod codec;
pub mod message;
pub mod signed;
pub mod types;

pub use attachment::Attachment;
pub use signed::SignedField;
pub use types::{Algorithm, Envelope, EnvelopeError, Forward, Target, Thread, Unpacked};
