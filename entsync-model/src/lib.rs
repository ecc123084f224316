//! Record model for entsync.
//!
//! Defines the types the sync engine reads out of the host's state:
//! - [`Record`]: one addressable entity with its confirmed fields, its
//!   pending local changes and the client-side bookkeeping flags
//! - [`EntitySchema`]: declares a channel's remote table and the
//!   sub-collections that cascade from it on fetch and remove
//!
//! The engine never holds a `Record` across an await point; it works on
//! owned snapshots handed out by the record store.

mod record;
mod schema;

pub use record::{CLIENT_ONLY_FIELDS, Record, is_client_only, server_projection};
pub use schema::{EntitySchema, SubCollection};
