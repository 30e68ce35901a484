//! Backend implementations behind the store seams.
//!
//! - [`mongo`] and [`redis`] talk to the real servers.
//! - [`memory`] keeps everything in process, for `STORE_BACKEND=memory` and tests.

pub mod memory;
pub mod mongo;
pub mod redis;

use mongodb::bson::Bson;

/// Renders an inserted id as the string handed back to callers.
///
/// Object ids use their hex form and strings are returned as-is; any other id type falls
/// back to its BSON display form.
pub(crate) fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}
