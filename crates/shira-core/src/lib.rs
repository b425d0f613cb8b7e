pub mod date;
pub mod markup;
pub mod normalize;
pub mod poem;
pub mod settings;

pub use date::format_date;
pub use markup::escape_html;
pub use normalize::{DEFAULT_MARKERS, NormalizedContent, count_words, normalize, normalize_with};
pub use poem::{POETRY_GENRE, PoemRecord, PublicationDate, Scalar, TextMetadata, TextRecord, Unsuitable};
pub use settings::{Settings, Timeouts};
