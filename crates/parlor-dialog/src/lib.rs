//! Slot-filling conversation policies.
//!
//! Two interchangeable strategies implement the same turn contract
//! (utterance in, `{reply, end_call}` out): a rule-based keyword router
//! and an LLM-assisted structured extractor. A deployment picks one via
//! configuration; they are never hybridized.

pub mod assistant;
pub mod error;
pub mod intent;
pub mod keyword;
pub mod policy;

pub use assistant::{AssistantClient, AssistantConfig, AssistantPolicy, ASSISTANT_REQUIRED_FIELDS};
pub use error::DialogError;
pub use intent::detect_intent;
pub use keyword::{KeywordPolicy, KEYWORD_REQUIRED_FIELDS};
pub use policy::ConversationPolicy;
