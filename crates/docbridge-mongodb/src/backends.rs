//! Driver backends
//!
//! | Backend | Driver crate |
//! |---------|--------------|
//! | [`MongoDriver`] | `mongodb` |

pub mod mongodb;

pub use self::mongodb::MongoDriver;
