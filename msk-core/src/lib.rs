//! msk-core - Resource model and async operation waiter
//!
//! Providers describe resources with [`schema`] and [`resource`] types and
//! drive long-running remote operations to completion with [`waiter`].

pub mod provider;
pub mod resource;
pub mod schema;
pub mod waiter;
