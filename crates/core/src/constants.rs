//! Constants used throughout the files manager core crate.
//!
//! Collection names, defaults for every configuration key and the labels the stores use when
//! they log or report errors.

use std::time::Duration;

/// Collection holding user accounts.
pub const USERS_COLLECTION: &str = "users";

/// Collection holding file metadata.
pub const FILES_COLLECTION: &str = "files";

/// Collections provisioned at startup.
pub const PROVISIONED_COLLECTIONS: [&str; 2] = [USERS_COLLECTION, FILES_COLLECTION];

/// Parent id of records stored at the root.
pub const ROOT_PARENT_ID: &str = "0";

/// Label used for the document store in logs and errors.
pub const DOCUMENT_STORE_NAME: &str = "document store";

/// Label used for the cache in logs and errors.
pub const CACHE_STORE_NAME: &str = "cache";

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 27017;
pub const DEFAULT_DB_DATABASE: &str = "files_manager";

pub const DEFAULT_REDIS_HOST: &str = "localhost";
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Default storage root for uploaded bytes.
pub const DEFAULT_FOLDER_PATH: &str = "/tmp/files_manager";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 5000;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound on the delay between reconnection attempts after a failed setup.
pub const RECONNECT_BACKOFF_CEILING: Duration = Duration::from_secs(60);
