//! Convenient imports for typical `pgfluent` usage.
//!
//! ```ignore
//! use pgfluent::prelude::*;
//! ```

pub use crate::{
    Arg, Db, Driver, Model, OrmError, OrmResult, Record, Records, Scalar, Scalars,
    SessionConfig, args, connect,
};

#[cfg(feature = "pool")]
pub use crate::{create_pool, create_pool_with_config};
