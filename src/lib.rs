// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Descant is a Discord voice client core: it joins a voice channel as an
//! authenticated user, negotiates a UDP audio session, plays synthesized
//! speech into the channel and transcribes what the other participants say
//! into an append-only transcript.
//!
//! The entry point for most users is [client::VoiceClient]. The lower level
//! building blocks (the main gateway connection, the voice gateway, the UDP
//! transport and the audio pipelines) are public as well, so the pieces can
//! be recombined where the packaged client does not fit.

#![allow(clippy::module_inception)]

pub mod client;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod providers;
pub mod transcript;
pub mod types;
pub mod voice;

// Pub use this so users can interact with packet types if they want
pub use discortp;
