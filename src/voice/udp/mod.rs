// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Defines the UDP component of voice communications: one connected socket
//! per session, ip discovery, and the receive loop feeding the decode
//! pipeline.

pub mod backends;
pub mod discovery;
pub mod handle;
pub mod handler;

pub use backends::*;
pub use handle::*;
pub use handler::*;
