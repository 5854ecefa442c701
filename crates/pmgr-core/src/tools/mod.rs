//! File system adapters.
//!
//! Everything that touches the library file goes through [`fs::FsAdapter`],
//! so loading, backup rotation and saving can run against the in-memory
//! [`fs_mock::MockFsAdapter`] in tests.

pub mod fs;
pub mod fs_impl;
pub mod fs_mock;

pub use fs::FsAdapter;
pub use fs_impl::StdFsAdapter;
pub use fs_mock::MockFsAdapter;
