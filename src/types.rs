use std::ops::{BitAnd, BitOr, Not};

use serde::{Deserialize, Serialize};

/// How a link to a target is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkCategory {
    /// Inert text, no hyperlink.
    #[default]
    None,
    /// The target is the current topic (or lives in the same output file).
    #[serde(rename = "self")]
    SelfLink,
    /// A hyperlink into the locally built help output.
    Local,
    /// A keyword link resolved by the help viewer's index.
    Index,
    /// Local when the target shares the current topic's container, Index otherwise.
    #[serde(rename = "localorindex")]
    LocalOrIndex,
    /// An external link whose address comes from the remote ID service.
    Msdn,
    /// An opaque-id link scheme.
    Id,
}

#[allow(clippy::should_implement_trait)]
impl LinkCategory {
    /// Returns the string representation of this link category.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkCategory::None => "none",
            LinkCategory::SelfLink => "self",
            LinkCategory::Local => "local",
            LinkCategory::Index => "index",
            LinkCategory::LocalOrIndex => "localorindex",
            LinkCategory::Msdn => "msdn",
            LinkCategory::Id => "id",
        }
    }

    /// Parses a string into a `LinkCategory`, ignoring ASCII case.
    pub fn from_str(s: &str) -> Option<LinkCategory> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(LinkCategory::None),
            "self" => Some(LinkCategory::SelfLink),
            "local" => Some(LinkCategory::Local),
            "index" => Some(LinkCategory::Index),
            "localorindex" => Some(LinkCategory::LocalOrIndex),
            "msdn" => Some(LinkCategory::Msdn),
            "id" => Some(LinkCategory::Id),
            _ => None,
        }
    }
}

/// Bit-flag set controlling which parts of a name are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayOptions(u8);

impl DisplayOptions {
    pub const NONE: DisplayOptions = DisplayOptions(0);
    /// Prefix the containing namespace or type.
    pub const SHOW_CONTAINER: DisplayOptions = DisplayOptions(1);
    /// Decorate generic names with their parameters or arguments.
    pub const SHOW_TEMPLATES: DisplayOptions = DisplayOptions(2);
    /// Append the parameter list of methods, constructors and indexers.
    pub const SHOW_PARAMETERS: DisplayOptions = DisplayOptions(4);

    /// Returns `true` if every flag in `other` is set.
    pub fn contains(self, other: DisplayOptions) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns a copy with the flags in `other` set.
    pub fn with(self, other: DisplayOptions) -> DisplayOptions {
        DisplayOptions(self.0 | other.0)
    }

    /// Returns a copy with the flags in `other` cleared.
    pub fn without(self, other: DisplayOptions) -> DisplayOptions {
        DisplayOptions(self.0 & !other.0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl Default for DisplayOptions {
    /// Templates and parameters are shown, containers are not.
    fn default() -> Self {
        DisplayOptions::SHOW_TEMPLATES | DisplayOptions::SHOW_PARAMETERS
    }
}

impl BitOr for DisplayOptions {
    type Output = DisplayOptions;

    fn bitor(self, rhs: DisplayOptions) -> DisplayOptions {
        DisplayOptions(self.0 | rhs.0)
    }
}

impl BitAnd for DisplayOptions {
    type Output = DisplayOptions;

    fn bitand(self, rhs: DisplayOptions) -> DisplayOptions {
        DisplayOptions(self.0 & rhs.0)
    }
}

impl Not for DisplayOptions {
    type Output = DisplayOptions;

    fn not(self) -> DisplayOptions {
        DisplayOptions(!self.0 & 0b111)
    }
}

/// Severity at which a recoverable problem is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ignore,
    Info,
    #[default]
    Warn,
    Error,
}

impl Severity {
    /// Emits `message` through `tracing` at this severity, tagged with the
    /// topic key and the offending target id.
    pub fn report(self, key: &str, target: &str, message: &str) {
        match self {
            Severity::Ignore => {}
            Severity::Info => tracing::info!(key = %key, id = %target, "{message}"),
            Severity::Warn => tracing::warn!(key = %key, id = %target, "{message}"),
            Severity::Error => tracing::error!(key = %key, id = %target, "{message}"),
        }
    }
}

/// Surface syntax dialects rendered side by side in link text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    CSharp,
    VisualBasic,
    Cpp,
    Neutral,
    FSharp,
}

#[allow(clippy::should_implement_trait)]
impl Dialect {
    /// All dialects in the order their spans are emitted.
    pub const ALL: [Dialect; 5] = [
        Dialect::CSharp,
        Dialect::VisualBasic,
        Dialect::Cpp,
        Dialect::Neutral,
        Dialect::FSharp,
    ];

    /// Returns the CSS class used for this dialect's span.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::CSharp => "cs",
            Dialect::VisualBasic => "vb",
            Dialect::Cpp => "cpp",
            Dialect::Neutral => "nu",
            Dialect::FSharp => "fs",
        }
    }

    /// Parses a span class back into a `Dialect`.
    pub fn from_str(s: &str) -> Option<Dialect> {
        match s {
            "cs" => Some(Dialect::CSharp),
            "vb" => Some(Dialect::VisualBasic),
            "cpp" => Some(Dialect::Cpp),
            "nu" => Some(Dialect::Neutral),
            "fs" => Some(Dialect::FSharp),
            _ => None,
        }
    }
}
