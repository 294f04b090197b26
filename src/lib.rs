//! Session and access layer for user-administration consoles—singleflight token refresh,
//! durable session stores, and fail-closed access checks in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod access;
pub mod api;
pub mod client;
pub mod error;
pub mod guard;
pub mod obs;
pub mod session;
pub mod store;

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
