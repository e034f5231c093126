pub mod pydoc_markdown;
pub mod traits;

pub use pydoc_markdown::*;
pub use traits::*;
