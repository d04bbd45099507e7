#![deny(missing_docs)]
#![doc = "Shared primitives for the sweep workspace: the structured error surface, canonical serialization helpers and stable hashing."]

pub mod errors;
pub mod hash;
pub mod serde;

pub use errors::{io_error, ErrorInfo, SweepError};
pub use hash::stable_hash_string;
pub use serde::{from_json_slice, from_yaml_slice, to_canonical_json_bytes};
