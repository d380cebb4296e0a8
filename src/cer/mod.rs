//! Code entity references: the reference tree and the grammar that builds it.

pub mod parser;
pub mod reference;

pub use parser::{
    decompose_member_identifier, find_matching_end_bracket, generic_arity, separate_types,
    CerParser, MemberIdentifier, UNKNOWN_METHOD_PARAMETER, UNKNOWN_TYPE_PARAMETER,
};
pub use reference::*;
