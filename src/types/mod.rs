// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! All the types, structs and enums needed to talk to the gateway and the
//! voice servers.

pub use events::*;
pub use snowflake::Snowflake;

pub mod events;
mod snowflake;
