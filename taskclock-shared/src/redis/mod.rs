/// Redis integration
///
/// Only the notification queue lives in Redis; see [`crate::events`] for the
/// stream format.

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig};
