//! Library layer: the Ben-Yehuda texts/authors API and encyclopedia portrait lookup.

pub mod http;
pub mod portrait;
pub mod wiki;

pub use http::{LibraryClient, LibraryError, TextSource};
pub use portrait::{PortraitFinder, PortraitSource};
pub use wiki::EncyclopediaClient;
