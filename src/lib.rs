//! A recursive/forwarding DNS resolver: wire codec, TTL cache, and the
//! resolution engine that ties them together. See `main` for the
//! runnable server built on top of this library.

pub mod buffer;
pub mod cache;
pub mod config;
pub mod protocol;
pub mod resolver;
