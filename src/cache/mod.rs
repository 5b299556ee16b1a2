// SPDX-License-Identifier: GPL-3.0-only
pub mod traits;
pub mod sqlite;

pub use traits::SnapshotCache;
pub use sqlite::SqliteCache;
