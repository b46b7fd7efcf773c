//! Session lock adapters.
//!
//! - `InMemorySessionLock` - single process, tokio mutex per token
//! - `RedisSessionLock` - shared across processes, `SET NX PX` with a holder token

mod in_memory;
mod redis;

pub use in_memory::InMemorySessionLock;
pub use redis::RedisSessionLock;
