//! PostgreSQL-backed integration tests.
//!
//! Set `TREEHUB_TEST_DATABASE_URL` to a disposable database to run them;
//! without it every test returns early.

mod helpers;
mod store_test;
mod tree_test;
