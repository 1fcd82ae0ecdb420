//! YRC Canteen: reads a student's canteen balance from the school portal.
//!
//! The library emulates a browser session against the portal: it probes the
//! entry page to learn whether a login is needed, submits the login form with
//! the page's anti-forgery token, scrapes the dashboard with layered selector
//! fallbacks, normalizes the amounts, and logs out. Every failure surfaces as
//! a short [`FailureTag`] string; nothing panics out to the caller.
//!
//! ```no_run
//! use yrc_canteen::{ClientOptions, Credentials, PortalProfile, Retriever};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let retriever = Retriever::new(PortalProfile::yupparaj(), ClientOptions::default())?;
//! let balance = retriever
//!     .retrieve_balance(&Credentials::new("student", "secret"))
//!     .await;
//! println!("{balance}");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod error;
pub mod fields;
pub mod http_client;
pub mod logout;
pub mod normalize;
pub mod probe;
pub mod profile;
pub mod retrieve;
pub mod snapshot;
pub mod strategy;
pub mod token;
pub mod types;

pub use error::{ClientError, FailureTag, LoginError, ProbeError};
pub use fields::{extract_cards, extract_field, extract_fields, CardSpec, FieldSpec};
pub use http_client::{ClientOptions, PortalClient, PortalResponse};
pub use normalize::{display_value, normalize, parse_amount};
pub use profile::{LoginForm, PortalProfile, SuccessSignal, BUILTIN_PROFILES};
pub use retrieve::{Retriever, Stage};
pub use snapshot::{RefreshSchedule, Snapshot, SnapshotLine};
pub use token::{extract_token, TokenExtractor, TokenSpec};
pub use types::*;
