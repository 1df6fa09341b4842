//! Structured extraction from model output.
//!
//! - [`proteus`]: strict boolean and tolerant enum conversion
//! - [`list`]: numbered and line-delimited list extraction
//! - [`codex`]: markdown sections bound onto typed models

pub mod codex;
pub mod list;
pub mod proteus;

pub use codex::{CodexBinding, CodexModel, HermeticCodex, Property, PropertyKind, Sections};
pub use list::{ListExtractor, ListItem};
pub use proteus::{to_bool, to_enum, to_enum_dynamic, EnumDescriptor, EnumMember, TolerantEnum};
