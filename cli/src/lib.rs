//! Helpers behind the `capryos-cli` admin tool, exposed for its integration
//! tests.

pub mod utils;
