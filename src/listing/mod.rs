pub mod extract;
pub mod url;

pub use url::{ListingSource, ParsedListing};
