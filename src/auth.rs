//! Auth-domain identifiers, permission sets, identities, and bearer tokens.

pub mod id;
pub mod identity;
pub mod password;
pub mod permission;
pub mod token;

pub use id::*;
pub use identity::*;
pub use password::*;
pub use permission::*;
pub use token::{hash::*, record::*, scope::*, secret::*, service::*};
