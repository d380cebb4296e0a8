//! Target model, reflection builder and the dictionaries that index targets.

pub mod builder;
pub mod collection;
pub mod dictionary;
pub mod target;

pub use collection::TargetCollection;
pub use dictionary::{DictionaryRegistry, TargetDictionary, TargetTypeDictionary};
pub use target::*;
