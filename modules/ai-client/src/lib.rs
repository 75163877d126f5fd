pub mod openai;
pub mod traits;
pub mod util;

pub use openai::OpenAi;
pub use traits::{CompletionOptions, JsonCompletion, Message};
