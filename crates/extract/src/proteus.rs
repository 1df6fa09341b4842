//! Tolerant conversion of model output into booleans and enums.
//!
//! Booleans are strict: ten accepted tokens, anything else is an error.
//! Enums are forgiving: names and aliases match case-insensitively, a
//! second pass ignores punctuation, and unmatched text lands on the enum's
//! no-match member when it declares one.
//!
//! Enum metadata is static. The [`tolerant_enum!`](crate::tolerant_enum)
//! macro declares an enum together with its aliases and no-match marker.

use quill_core::{AppError, AppResult};

const TRUE_TOKENS: [&str; 5] = ["yes", "y", "true", "t", "1"];
const FALSE_TOKENS: [&str; 5] = ["no", "n", "false", "f", "0"];

/// Member name that is treated as the no-match sentinel without a marker.
pub const NO_MATCH_NAME: &str = "NoMatch";

/// Convert a yes/no style token to `bool`.
///
/// Accepts `yes y true t 1` and `no n false f 0`, ignoring case and
/// surrounding whitespace.
pub fn to_bool(text: &str) -> AppResult<bool> {
    let token = text.trim().to_lowercase();

    if TRUE_TOKENS.contains(&token.as_str()) {
        Ok(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Ok(false)
    } else {
        Err(AppError::Conversion(format!(
            "Cannot convert '{}' to bool",
            text.trim()
        )))
    }
}

/// Static description of one enum member.
#[derive(Debug, Clone, Copy)]
pub struct EnumMember {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Explicit no-match marker
    pub no_match: bool,
}

/// Static description of an enum usable with [`to_enum`].
#[derive(Debug)]
pub struct EnumDescriptor {
    pub type_name: &'static str,
    pub members: &'static [EnumMember],
}

impl EnumDescriptor {
    /// Index of the no-match member, if the enum designates one.
    ///
    /// Fails when the explicit marker and a member named `NoMatch` point at
    /// different members, or when several members carry the marker.
    pub fn no_match_index(&self) -> AppResult<Option<usize>> {
        let marked: Vec<usize> = self
            .members
            .iter()
            .enumerate()
            .filter(|(_, m)| m.no_match)
            .map(|(i, _)| i)
            .collect();
        let named = self.members.iter().position(|m| m.name == NO_MATCH_NAME);

        match (marked.as_slice(), named) {
            ([], named) => Ok(named),
            ([index], None) => Ok(Some(*index)),
            ([index], Some(named)) if *index == named => Ok(Some(named)),
            _ => Err(AppError::Conversion(format!(
                "Enum {} declares more than one no-match member",
                self.type_name
            ))),
        }
    }

    /// Names of the members a model is expected to produce.
    pub fn answer_names(&self) -> Vec<&'static str> {
        let no_match = self.no_match_index().ok().flatten();
        self.members
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != no_match)
            .map(|(_, m)| m.name)
            .collect()
    }

    fn match_candidate(&self, candidate: &str) -> Option<usize> {
        if candidate.is_empty() {
            return None;
        }

        self.members
            .iter()
            .position(|m| m.name.eq_ignore_ascii_case(candidate))
            .or_else(|| {
                self.members.iter().position(|m| {
                    m.aliases
                        .iter()
                        .any(|alias| alias.eq_ignore_ascii_case(candidate))
                })
            })
    }

    /// Resolve `text` to a member index.
    pub fn convert(&self, text: &str) -> AppResult<usize> {
        let trimmed = text.trim();

        let matched = if trimmed.is_empty() {
            None
        } else {
            self.match_candidate(trimmed).or_else(|| {
                let stripped: String = trimmed
                    .chars()
                    .filter(|c| c.is_alphanumeric() || *c == '_')
                    .collect();
                self.match_candidate(&stripped)
            })
        };

        if let Some(index) = matched {
            return Ok(index);
        }

        match self.no_match_index()? {
            Some(index) => {
                tracing::debug!("No {} member matches '{}', using no-match", self.type_name, trimmed);
                Ok(index)
            }
            None => Err(AppError::Conversion(format!(
                "Enum {} has no member matching '{}'",
                self.type_name, trimmed
            ))),
        }
    }
}

/// Enums with static conversion metadata.
///
/// Implemented by [`tolerant_enum!`](crate::tolerant_enum); member indexes
/// follow declaration order.
pub trait TolerantEnum: Sized + Copy + 'static {
    fn descriptor() -> &'static EnumDescriptor;

    fn from_member(index: usize) -> Option<Self>;

    fn member_index(self) -> usize;

    fn member_name(self) -> &'static str {
        Self::descriptor().members[self.member_index()].name
    }

    fn is_no_match(self) -> bool {
        Self::descriptor().no_match_index().ok().flatten() == Some(self.member_index())
    }
}

/// Convert free text to a member of `T`.
pub fn to_enum<T: TolerantEnum>(text: &str) -> AppResult<T> {
    let descriptor = T::descriptor();
    let index = descriptor.convert(text)?;
    T::from_member(index).ok_or_else(|| {
        AppError::Conversion(format!(
            "Enum {} has no member at index {}",
            descriptor.type_name, index
        ))
    })
}

/// Convert free text for an enum known only through its descriptor.
///
/// Returns the matched member name.
pub fn to_enum_dynamic(descriptor: &EnumDescriptor, text: &str) -> AppResult<&'static str> {
    let index = descriptor.convert(text)?;
    Ok(descriptor.members[index].name)
}

#[doc(hidden)]
#[macro_export]
macro_rules! __tolerant_flag {
    () => {
        false
    };
    (no_match) => {
        true
    };
}

/// Declare a fieldless enum together with its tolerant-conversion metadata.
///
/// Each variant may list alias strings in brackets and may carry the
/// `@no_match` marker. A variant literally named `NoMatch` is the no-match
/// member without a marker. The enum must derive `Clone` and `Copy`.
///
/// ```
/// use quill_extract::{tolerant_enum, proteus::to_enum};
///
/// tolerant_enum! {
///     #[derive(Debug, Clone, Copy, PartialEq, Eq)]
///     pub enum Sentiment {
///         Positive ["good", "+"],
///         Negative ["bad", "-"],
///         Unclear @no_match,
///     }
/// }
///
/// assert_eq!(to_enum::<Sentiment>("GOOD").unwrap(), Sentiment::Positive);
/// assert_eq!(to_enum::<Sentiment>("meh").unwrap(), Sentiment::Unclear);
/// ```
#[macro_export]
macro_rules! tolerant_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident $( [ $($alias:literal),* $(,)? ] )? $( @ $flag:ident )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),*
        }

        impl $crate::proteus::TolerantEnum for $name {
            fn descriptor() -> &'static $crate::proteus::EnumDescriptor {
                static DESCRIPTOR: $crate::proteus::EnumDescriptor = $crate::proteus::EnumDescriptor {
                    type_name: stringify!($name),
                    members: &[
                        $(
                            $crate::proteus::EnumMember {
                                name: stringify!($variant),
                                aliases: &[ $( $($alias),* )? ],
                                no_match: $crate::__tolerant_flag!($($flag)?),
                            }
                        ),*
                    ],
                };
                &DESCRIPTOR
            }

            fn from_member(index: usize) -> Option<Self> {
                const MEMBERS: &[$name] = &[ $( $name::$variant ),* ];
                MEMBERS.get(index).copied()
            }

            fn member_index(self) -> usize {
                self as usize
            }
        }
    };
}
