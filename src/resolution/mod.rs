/// Reference link resolution.
///
/// Turns `referenceLink` placeholders into rendered links by classifying
/// each target against the target dictionaries, consulting the remote ID
/// service for external links.
pub mod link;
pub mod remote;
mod resolver;

pub use link::{ReferenceLink, ResolutionResult, ResolvedLink};
pub use remote::{HttpIdLookup, IdLookup, RemoteIdResolver};
pub use resolver::{relative_href, ReferenceLinkResolver, MSHELP_NAMESPACE};
