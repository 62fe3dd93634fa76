// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! EVM integration: contract bindings and the transaction gateway.

pub mod contracts;
pub mod gateway;

pub use gateway::{ChainError, ChainGateway};
