//! Localized changelog resolution.
//!
//! Release bodies may embed language-tagged sections using HTML comment
//! markers, which render as nothing on the GitHub release page while staying
//! machine-readable:
//!
//! ```markdown
//! <!-- au:lang=en -->
//! ## What's new
//! <!-- au:end -->
//! <!-- au:lang=zh_Hans -->
//! ## 更新内容
//! <!-- au:end -->
//! <!-- au:default -->
//! Fallback notes.
//! <!-- au:end -->
//! ```
//!
//! Publishers can also attach whole-file translations as release assets named
//! `CHANGELOG.<lang>.{md,markdown,txt}`; those take precedence over embedded
//! sections for a matching language because they are deliberate, per-language
//! artifacts.
//!
//! # Language matching
//!
//! Tags are normalized (lowercased, underscores to hyphens) and Chinese
//! script/region variants are collapsed: any `zh` tag mentioning `cn` or
//! `hans` becomes `zh-hans`, then any mentioning `tw`, `hk` or `hant`
//! becomes `zh-hant`. A preferred tag expands into candidates from most to
//! least specific, e.g. `zh-CN` → `zh-cn`, `zh-hans`, `zh` — so a body
//! tagged `zh-hans` serves a reader whose locale says `zh_CN.UTF-8`.
//!
//! Resolution order for each preferred language: changelog asset, then body
//! section. A body with no markers at all is returned whole, on the
//! assumption that it is already written in the publisher's one language.
//! When nothing matches any preferred language: `default` block, then `en`,
//! then the first section in document order, then the raw body.

use regex::Regex;
use std::sync::OnceLock;

use crate::constants::{CHANGELOG_ASSET_BASENAME, CHANGELOG_ASSET_EXTENSIONS};
use crate::error::UpdateError;
use crate::release::{Release, ReleaseAsset};
use crate::source::ReleaseSource;

fn lang_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<!--\s*au:lang\s*=\s*([A-Za-z0-9_-]+)\s*-->(.*?)<!--\s*au:end\s*-->")
            .unwrap()
    })
}

fn default_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--\s*au:default\s*-->(.*?)<!--\s*au:end\s*-->").unwrap())
}

/// Language-tagged sections parsed out of one release body.
///
/// Section keys are fully normalized (see [`normalize_language_key`]) and
/// kept in document order; when two blocks normalize to the same key the
/// first one wins. Blocks whose content trims to nothing are dropped.
#[derive(Debug, Clone, Default)]
pub struct ChangelogSections {
    sections: Vec<(String, String)>,
    default: Option<String>,
}

impl ChangelogSections {
    /// Parse every language block and the optional default block in `body`.
    pub fn parse(body: &str) -> Self {
        let mut sections: Vec<(String, String)> = Vec::new();

        for captures in lang_block_regex().captures_iter(body) {
            let key = normalize_language_key(&captures[1]);
            let content = captures[2].trim();
            if content.is_empty() {
                continue;
            }
            if sections.iter().any(|(existing, _)| *existing == key) {
                continue;
            }
            sections.push((key, content.to_string()));
        }

        let default = default_block_regex()
            .captures(body)
            .map(|captures| captures[1].trim().to_string())
            .filter(|content| !content.is_empty());

        Self { sections, default }
    }

    /// Whether the body contained no usable blocks of either kind.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.default.is_none()
    }

    /// Section content for an exact normalized key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, content)| content.as_str())
    }

    /// The first language section in document order.
    pub fn first(&self) -> Option<&str> {
        self.sections.first().map(|(_, content)| content.as_str())
    }

    /// Content of the `au:default` block, when present.
    pub fn default_section(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

/// Normalize a language tag to its canonical section-key form.
///
/// Lowercases, maps underscores to hyphens, and collapses Chinese variants
/// so that `zh_CN`, `zh-Hans-CN` and `zh-hans` all key the same section.
pub fn normalize_language_key(tag: &str) -> String {
    collapse_chinese(split_tag(tag)).join("-")
}

/// Expand a preferred language tag into match candidates, most specific
/// first.
///
/// The literal normalized tag leads, followed by progressively shorter
/// prefixes of its collapsed component list:
///
/// - `zh-hans-cn` → `zh-hans-cn`, `zh-hans`, `zh`
/// - `zh-CN` → `zh-cn`, `zh-hans`, `zh`
/// - `fr_FR` → `fr-fr`, `fr`
pub fn candidate_tags(preferred: &str) -> Vec<String> {
    let parts = split_tag(preferred);
    let literal = parts.join("-");
    let collapsed = collapse_chinese(parts);

    let mut candidates = vec![literal];
    for len in (1..=collapsed.len()).rev() {
        let candidate = collapsed[..len].join("-");
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

fn split_tag(tag: &str) -> Vec<String> {
    tag.to_lowercase()
        .replace('_', "-")
        .split('-')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn collapse_chinese(parts: Vec<String>) -> Vec<String> {
    if parts.first().map(String::as_str) != Some("zh") {
        return parts;
    }

    let mut parts = parts;
    if parts.iter().any(|p| p == "cn" || p == "hans") {
        parts = vec!["zh".to_string(), "hans".to_string()];
    }
    if parts.iter().any(|p| p == "tw" || p == "hk" || p == "hant") {
        parts = vec!["zh".to_string(), "hant".to_string()];
    }
    parts
}

/// Resolve the changelog text for `preferred_languages` from the body alone.
///
/// Synchronous variant used when no release source is at hand; it skips the
/// changelog-asset probe and otherwise follows the module-level rules. Always
/// produces text: the raw trimmed body is the fallback of last resort.
pub fn localized_body(body: &str, preferred_languages: &[String]) -> String {
    let raw = body.trim();
    let sections = ChangelogSections::parse(body);
    if sections.is_empty() {
        return raw.to_string();
    }

    for language in preferred_languages.iter().filter(|l| !l.is_empty()) {
        for candidate in candidate_tags(language) {
            if let Some(content) = sections.get(&candidate) {
                return content.to_string();
            }
        }
    }

    fallback_section(&sections)
        .map(str::to_string)
        .unwrap_or_else(|| raw.to_string())
}

/// Resolve the changelog for `release`, consulting per-language assets.
///
/// For each preferred language the asset probe runs across the full
/// candidate expansion before embedded sections are considered. Asset
/// fetches go through `source`; a fetch failure aborts resolution with the
/// underlying transport error rather than silently degrading to another
/// language.
pub async fn localized_changelog(
    source: &dyn ReleaseSource,
    release: &Release,
    preferred_languages: &[String],
) -> Result<String, UpdateError> {
    let raw = release.body.trim();
    let sections = ChangelogSections::parse(&release.body);

    for language in preferred_languages.iter().filter(|l| !l.is_empty()) {
        let candidates = candidate_tags(language);

        if let Some(asset) = changelog_asset(release, &candidates) {
            let bytes = source.fetch_asset_bytes(asset).await?;
            let text = String::from_utf8_lossy(&bytes);
            let text = text.trim();
            if !text.is_empty() {
                return Ok(text.to_string());
            }
        }

        if sections.is_empty() {
            return Ok(raw.to_string());
        }

        for candidate in &candidates {
            if let Some(content) = sections.get(candidate) {
                return Ok(content.to_string());
            }
        }
    }

    if sections.is_empty() {
        return Ok(raw.to_string());
    }

    Ok(fallback_section(&sections)
        .map(str::to_string)
        .unwrap_or_else(|| raw.to_string()))
}

/// Find a `CHANGELOG.<candidate>.<ext>` asset for any candidate tag.
///
/// Candidates are tried in order, so the most specific language file wins.
/// Matching is case-insensitive on the asset name.
pub fn changelog_asset<'a>(
    release: &'a Release,
    candidates: &[String],
) -> Option<&'a ReleaseAsset> {
    for candidate in candidates {
        for extension in CHANGELOG_ASSET_EXTENSIONS {
            let wanted = format!("{CHANGELOG_ASSET_BASENAME}.{candidate}.{extension}");
            if let Some(asset) = release
                .assets
                .iter()
                .find(|asset| asset.name.to_lowercase() == wanted)
            {
                return Some(asset);
            }
        }
    }
    None
}

fn fallback_section(sections: &ChangelogSections) -> Option<&str> {
    sections
        .default_section()
        .or_else(|| sections.get("en"))
        .or_else(|| sections.first())
}
