//! Helpers for setting up throwaway databases and fixture data in tests.
pub mod prepare_env;
pub mod seed;
