//! Pure IPv4 CIDR arithmetic (`spec.md` C1: "CIDR utilities").
//!
//! Every operation here is a pure function over [`Ipv4Prefix`]: no I/O, no panics, typed
//! [`CidrError`] on invalid input. This crate has no knowledge of pools, accounts, or storage —
//! those live in `cloudpam-domain`/`cloudpam-store`.

mod error;
mod prefix;
mod range;
mod rfc1918;

pub use error::CidrError;
pub use prefix::Ipv4Prefix;
pub use range::{range_to_cidrs, Subdivide};
pub use rfc1918::is_rfc1918;
