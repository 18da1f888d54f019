//! Prompt document model for prompt-manager
//!
//! Everything between a YAML file on disk and a registrable prompt: the
//! serde document model, structure validation, metadata classification,
//! argument schemas with boundary coercion, the `registry.yaml` overlay,
//! group filtering, and priority ranking.

pub mod args;
pub mod classify;
pub mod describe;
pub mod document;
pub mod error;
pub mod groups;
pub mod parser;
pub mod partial_refs;
pub mod rank;
pub mod registry;

pub use args::{ArgDef, ArgSchema, ArgType};
pub use classify::{
    PromptRuntime, PromptStatus, RuntimeState, SourceKind, Visibility,
};
pub use describe::build_description;
pub use document::{ArgSpec, PromptDocument};
pub use error::{Error, Result};
pub use groups::{group_of, GroupFilter, COMMON_GROUP, ROOT_GROUP};
pub use parser::{
    is_prompt_file, parse_prompt_file, parse_prompt_source, ParsedPrompt, EXCLUDED_FILES,
};
pub use partial_refs::extract_partial_refs;
pub use rank::{compare_priority, rank_candidates};
pub use registry::{RegistryEntry, RegistryOverlay, REGISTRY_FILE};
