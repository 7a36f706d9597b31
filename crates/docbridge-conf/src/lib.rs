//! # docbridge-conf
//!
//! Connection settings for document database adapters.
//!
//! Settings are read from environment variables, optionally namespaced by a
//! prefix so several logical connections can coexist in one process, and
//! rendered into a MongoDB connection string.
//!
//! ## Environment variables
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `MONGO_HOSTS` | Comma-separated host list (required) |
//! | `MONGO_PORTS` | Comma-separated port list, paired positionally with hosts |
//! | `MONGO_DATABASE` | Database name (required) |
//! | `MONGO_USERNAME` / `MONGO_PASSWORD` | Credentials |
//! | `MONGO_AUTH_MECHANISM` / `MONGO_AUTH_SOURCE` | Authentication options |
//! | `MONGO_REPLICA_SET` | Replica set name |
//! | `MONGO_TLS` / `MONGO_SRV` | Boolean flags |
//!
//! With a prefix such as `ANALYTICS`, every variable is looked up as
//! `ANALYTICS_MONGO_HOSTS`, `ANALYTICS_MONGO_PORTS`, and so on.
//!
//! ## Example
//!
//! ```rust
//! use docbridge_conf::ConnectionSettings;
//!
//! let vars = vec![
//!     ("MONGO_HOSTS".to_string(), "db1,db2".to_string()),
//!     ("MONGO_PORTS".to_string(), "27017".to_string()),
//!     ("MONGO_DATABASE".to_string(), "app".to_string()),
//! ];
//! let settings = ConnectionSettings::from_vars(None, vars).unwrap();
//! assert_eq!(settings.to_url(), "mongodb://db1:27017,db2:27017/app");
//! ```

pub mod error;
pub mod settings;
pub mod url;

pub use error::{ConfigError, Result};
pub use settings::{ConnectionSettings, DEFAULT_PORT};
