use super::link::{ReferenceLink, ResolutionResult, ResolvedLink, REFERENCE_LINK_TAG};
use super::remote::RemoteIdResolver;
use crate::cer::{CerParser, Reference};
use crate::config::LinkSettings;
use crate::document::{apply_splices, parse, Splice};
use crate::errors::Result;
use crate::render::{to_xml, LinkTextResolver, Markup};
use crate::targets::builder::{create_extension_method_reference, create_reference};
use crate::targets::{Target, TargetTypeDictionary};
use crate::types::{DisplayOptions, LinkCategory};

/// Namespace of the keyword-index link element.
pub const MSHELP_NAMESPACE: &str = "http://msdn.microsoft.com/mshelp";

/// Replaces `referenceLink` placeholders with rendered links.
///
/// Each link is looked up in the target dictionaries, classified into a
/// [`LinkCategory`] and written out with display text from the
/// [`LinkTextResolver`]. Ids that are not indexed are parsed as CERs and
/// rendered from the parsed reference.
pub struct ReferenceLinkResolver {
    targets: TargetTypeDictionary,
    links: LinkSettings,
    parser: CerParser,
    remote: Option<RemoteIdResolver>,
}

impl ReferenceLinkResolver {
    pub fn new(
        targets: TargetTypeDictionary,
        links: LinkSettings,
        remote: Option<RemoteIdResolver>,
    ) -> Self {
        Self {
            targets,
            links,
            parser: CerParser::new(),
            remote,
        }
    }

    pub fn targets(&self) -> &TargetTypeDictionary {
        &self.targets
    }

    pub fn remote(&self) -> Option<&RemoteIdResolver> {
        self.remote.as_ref()
    }

    /// Resolves every outermost `referenceLink` of a document.
    pub fn resolve_document(&mut self, text: &str, key: &str) -> Result<ResolutionResult> {
        self.parser.set_generic_context(key);

        let links: Vec<ReferenceLink> = {
            let doc = parse(text, key)?;
            doc.descendants()
                .filter(|n| n.has_tag_name(REFERENCE_LINK_TAG))
                .filter(|n| {
                    !n.ancestors()
                        .skip(1)
                        .any(|a| a.has_tag_name(REFERENCE_LINK_TAG))
                })
                .map(|n| ReferenceLink::from_node(text, n))
                .collect()
        };

        let total = links.len();
        let mut resolved_count = 0;
        let mut unresolved = Vec::new();
        let mut splices = Vec::with_capacity(total);

        for link in &links {
            let outcome = self.resolve_link(link, key)?;
            if outcome.resolved {
                resolved_count += 1;
            } else if !link.target.is_empty() {
                unresolved.push(link.target.clone());
            }
            splices.push(Splice::replace(link.range.clone(), to_xml(&outcome.markup)));
        }

        tracing::debug!(key = %key, total, resolved = resolved_count, "resolved reference links");

        Ok(ResolutionResult {
            text: apply_splices(text, splices),
            total,
            resolved_count,
            unresolved,
        })
    }

    /// Resolves one link for the topic `key`.
    pub fn resolve_link(&mut self, link: &ReferenceLink, key: &str) -> Result<ResolvedLink> {
        if link.target.is_empty() {
            tracing::warn!(key = %key, "reference link has no target");
            let markup = link
                .content
                .as_ref()
                .map(|c| vec![Markup::Raw(c.clone())])
                .unwrap_or_default();
            return Ok(ResolvedLink {
                target_id: String::new(),
                category: LinkCategory::None,
                resolved: false,
                markup,
            });
        }

        let mut options = link.options;
        let mut target_id = link.target.clone();
        let mut found: Option<(Target, LinkCategory)> = self
            .targets
            .lookup(&target_id)
            .map(|(t, c)| (t.clone(), c));

        if found.is_none() {
            self.links
                .missing_target
                .report(key, &target_id, "unknown reference link target");
            // Only methods are expected to carry a parameter list.
            if !target_id.starts_with("M:") {
                options = options.without(DisplayOptions::SHOW_PARAMETERS);
            }
        }

        // Conversion operators keep their own topic and show their signature.
        let overload = found.as_ref().map(|(t, _)| {
            (
                t.is_conversion_operator(),
                t.overload_id().map(str::to_string),
            )
        });
        if link.prefer_overload {
            match overload {
                Some((true, Some(_))) => {
                    options = options.with(DisplayOptions::SHOW_PARAMETERS);
                }
                Some((false, Some(overload_id))) => {
                    if let Some((overload_target, category)) = self.targets.lookup(&overload_id) {
                        found = Some((overload_target.clone(), category));
                        target_id = overload_id;
                    }
                    options = options.without(DisplayOptions::SHOW_PARAMETERS);
                }
                Some((_, None)) => options = options.without(DisplayOptions::SHOW_PARAMETERS),
                None => {}
            }
        }

        let mut category = found.as_ref().map_or(LinkCategory::None, |(_, c)| *c);
        let key_target = self.targets.get(key);

        if category == LinkCategory::LocalOrIndex {
            category = match (&found, key_target) {
                (Some((target, _)), Some(current)) if target.container == current.container => {
                    LinkCategory::Local
                }
                _ => LinkCategory::Index,
            };
        }

        let same_file = match (&found, key_target) {
            (Some((target, _)), Some(current)) => target.file == current.file,
            _ => false,
        };
        if target_id == key || same_file {
            category = LinkCategory::SelfLink;
        }
        if !link.render_as_link {
            category = LinkCategory::None;
        }

        // Enumeration fields have no topic of their own.
        let mut address_id = target_id.clone();
        if matches!(
            category,
            LinkCategory::Msdn | LinkCategory::Id | LinkCategory::Index
        ) && target_id.starts_with("F:")
        {
            if let Some(enumeration) = self.containing_enumeration(found.as_ref().map(|(t, _)| t)) {
                address_id = enumeration;
            }
        }

        let mut remote_url = None;
        if category == LinkCategory::Msdn {
            remote_url = self.remote.as_mut().and_then(|r| r.resolve(&address_id));
            if remote_url.is_none() {
                self.links
                    .missing_target
                    .report(key, &address_id, "no remote address for reference link target");
                category = LinkCategory::None;
            }
        }

        let target = found.as_ref().map(|(t, _)| t);
        let body = self.render_body(link, target, &target_id, options, key)?;
        let markup = self.wrap(category, target, &address_id, remote_url.as_deref(), body);

        Ok(ResolvedLink {
            target_id,
            category,
            resolved: found.is_some(),
            markup,
        })
    }

    fn containing_enumeration(&self, target: Option<&Target>) -> Option<String> {
        let member = target?.as_member()?;
        let container = self.targets.get(&member.containing_type.id)?;
        container.is_enumeration().then(|| container.id.clone())
    }

    /// Link text: a display-target directive, else authored content, else
    /// the rendered target or reference.
    fn render_body(
        &self,
        link: &ReferenceLink,
        target: Option<&Target>,
        target_id: &str,
        options: DisplayOptions,
        key: &str,
    ) -> Result<Vec<Markup>> {
        let resolver = LinkTextResolver::new(&self.targets);

        if let Some(directive) = link.display_target.as_deref() {
            if let Some(body) = self.render_directive(directive, link, &resolver, target, target_id, options, key)? {
                return Ok(body);
            }
        } else if let Some(content) = &link.content {
            return Ok(vec![Markup::Raw(content.clone())]);
        }

        self.render_default(&resolver, target, target_id, options, key)
    }

    fn render_default(
        &self,
        resolver: &LinkTextResolver,
        target: Option<&Target>,
        target_id: &str,
        options: DisplayOptions,
        key: &str,
    ) -> Result<Vec<Markup>> {
        if let Some(target) = target {
            return Ok(resolver.render_target(target, options));
        }

        let reference = self.parser.parse_reference(target_id)?;
        if reference.is_invalid() {
            self.links
                .invalid_reference
                .report(key, target_id, "reference link target is not a valid code entity reference");
        }
        Ok(resolver.render_reference(&reference, options))
    }

    #[allow(clippy::too_many_arguments)]
    fn render_directive(
        &self,
        directive: &str,
        link: &ReferenceLink,
        resolver: &LinkTextResolver,
        target: Option<&Target>,
        target_id: &str,
        options: DisplayOptions,
        key: &str,
    ) -> Result<Option<Vec<Markup>>> {
        let content = link.content.as_deref();

        match directive.to_ascii_lowercase().as_str() {
            "format" => {
                let Some(format) = content else {
                    return Ok(None);
                };
                let rendered = self.render_default(resolver, target, target_id, options, key)?;
                Ok(Some(vec![Markup::Raw(format.replace("{0}", &to_xml(&rendered)))]))
            }
            "content" | "extension" => {
                let Some(content) = content else {
                    return Ok(None);
                };
                let doc = match roxmltree::Document::parse(content) {
                    Ok(doc) => doc,
                    Err(e) => {
                        tracing::warn!(key = %key, id = %target_id, error = %e, "display target content is not well-formed");
                        return Ok(None);
                    }
                };
                let reference = if directive.eq_ignore_ascii_case("extension") {
                    Reference::ExtensionMethod(create_extension_method_reference(doc.root_element(), key)?)
                } else {
                    create_reference(doc.root_element(), key)?
                };
                Ok(Some(resolver.render_reference(&reference, options)))
            }
            _ => match self.targets.get(directive) {
                Some(display) => Ok(Some(resolver.render_target(display, options))),
                None => {
                    let reference = self.parser.parse_reference(directive)?;
                    Ok(Some(resolver.render_reference(&reference, options)))
                }
            },
        }
    }

    fn wrap(
        &self,
        category: LinkCategory,
        target: Option<&Target>,
        address_id: &str,
        remote_url: Option<&str>,
        body: Vec<Markup>,
    ) -> Vec<Markup> {
        let element = match (category, target) {
            (LinkCategory::SelfLink, _) => Markup::span("selflink", body),
            (LinkCategory::Local, Some(target)) => {
                let href = self.links.href_format.replace("{file}", &target.file);
                let href = match self.links.base_url.as_deref() {
                    Some(base) => relative_href(&href, base),
                    None => href,
                };
                Markup::element("a", &[("href", href.as_str())], body)
            }
            (LinkCategory::Index, _) => Markup::element(
                "mshelp:link",
                &[
                    ("xmlns:mshelp", MSHELP_NAMESPACE),
                    ("keywords", address_id),
                    ("tabindex", "0"),
                ],
                body,
            ),
            (LinkCategory::Msdn, _) => match remote_url {
                Some(url) => Markup::element(
                    "a",
                    &[("href", url), ("target", self.links.link_target.as_str())],
                    body,
                ),
                None => Markup::span("nolink", body),
            },
            (LinkCategory::Id, _) => {
                let href = format!("ms-xhelp:///?Id={}", address_id.replace('#', "%23"));
                Markup::element("a", &[("href", href.as_str())], body)
            }
            (LinkCategory::None, Some(_)) => Markup::span("identifier", body),
            _ => Markup::span("nolink", body),
        };
        vec![element]
    }

    /// Persists the remote id cache if it changed.
    pub fn finish(&mut self) -> Result<()> {
        if let Some(remote) = self.remote.as_mut() {
            remote.save()?;
        }
        Ok(())
    }
}

/// Rewrites `href` relative to the directory `base`: shared leading
/// directories are dropped and each remaining base directory becomes `../`.
pub fn relative_href(href: &str, base: &str) -> String {
    let base_dirs: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    let href_parts: Vec<&str> = href.split('/').filter(|s| !s.is_empty()).collect();
    let (href_dirs, file) = match href_parts.split_last() {
        Some((file, dirs)) => (dirs, *file),
        None => return href.to_string(),
    };

    let common = base_dirs
        .iter()
        .zip(href_dirs.iter())
        .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
        .count();

    let mut relative = "../".repeat(base_dirs.len() - common);
    for dir in &href_dirs[common..] {
        relative.push_str(dir);
        relative.push('/');
    }
    relative.push_str(file);
    relative
}
