// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Thin boundaries to the external speech providers and the audio
//! transcoder. Everything here is a network or subprocess call; failures
//! are surfaced as [crate::errors::ProviderError] /
//! [crate::errors::AudioError] and never terminate a voice session.

pub mod stt;
pub mod transcode;
pub mod tts;

pub use stt::*;
pub use tts::*;
