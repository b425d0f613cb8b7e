//! Commentary generation: prompt construction, the Gemini backend, and the
//! first-success fallback across an ordered backend list.

mod error;
mod fallback;
mod gemini;
mod prompt;

pub use error::BackendError;
pub use fallback::{Backend, CommentaryGenerator, FALLBACK_COMMENTARY, first_success, strip_fences};
pub use gemini::GeminiBackend;
pub use prompt::{CommentaryRequest, build_prompt};
