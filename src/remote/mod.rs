// SPDX-License-Identifier: GPL-3.0-only
pub mod error;
pub mod client;
pub mod fallback;

pub use error::StoreError;
pub use client::{ContentsClient, RemoteFileHandle, RepoInfo, WriteResult};
pub use fallback::PublicReader;
