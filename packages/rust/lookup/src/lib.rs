//! Browser-automation lookup against phonevalidator.com.
//!
//! This crate provides:
//! - [`selectors`] — Ordered fallback chains for every page element we touch
//! - [`page`] — The page-interaction trait and its WebDriver implementation
//! - [`session`] — Scoped browser-session acquisition with bounded retries
//! - [`engine`] — The never-failing single-lookup sequence

pub mod engine;
pub mod error;
pub mod page;
pub mod selectors;
pub mod session;

pub use engine::{LookupEngine, PhoneLookup, WebDriverLookup, drive_lookup};
pub use error::{LookupError, PageError};
pub use page::{PageDriver, WebDriverPage};
pub use selectors::Selector;
pub use session::{SessionProvider, WebDriverSessions, is_webdriver_ready};
