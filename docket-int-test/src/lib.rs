//! Shared fixtures for the docket integration suites.

pub mod test_util;
