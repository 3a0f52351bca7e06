//! Opaque bearer tokens: plaintext, digest, scope, stored record, and the issuing service.

pub mod hash;
pub mod record;
pub mod scope;
pub mod secret;
pub mod service;
