//! Platform-agnostic page fetching contract.
//!
//! Every provider adapter exposes its list endpoints as [`PageFetcher`]s
//! wrapped in named [`Source`]s. The sync engine drives each source with a
//! paginator and never looks at provider-specific response shapes.
//!
//! # Example
//!
//! ```ignore
//! use hoard::platform::{Page, PageFetcher};
//!
//! async fn first_page(fetcher: &dyn PageFetcher) -> Result<Page, PlatformError> {
//!     let page = fetcher.fetch_page(0).await?;
//!     for repo in &page.records {
//!         println!("{}", repo.name);
//!     }
//!     Ok(page)
//! }
//! ```

mod errors;
mod types;

pub use errors::{PlatformError, Result, short_error_message};
pub use types::{PAGE_SIZE, Page, PageFetcher, PageInfo, RateInfo, Source};
