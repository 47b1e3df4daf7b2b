//! Template catalog loading and indexing.
//!
//! Provides [`TemplateCatalog`], an immutable in-memory index over the
//! canonical field dictionary. A catalog is built once per run and shared
//! read-only; every lookup takes `&self`.
//!
//! # Loading patterns
//!
//! ```no_run
//! use form_schema_catalog::TemplateCatalog;
//!
//! // Embedded dental dictionary
//! let catalog = TemplateCatalog::builtin().unwrap();
//!
//! // A JSON or YAML store on disk (format chosen by extension)
//! let catalog = TemplateCatalog::from_path("templates.yaml").unwrap();
//! println!("{} templates, digest {}", catalog.len(), catalog.digest());
//! ```

use std::collections::{HashMap, HashSet};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use form_schema_core::{Template, normalize_label};

use crate::error::{CatalogError, Result};

const BUILTIN_TEMPLATES: &str = include_str!("../data/templates.json");

/// Describes where a [`TemplateCatalog`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// The dictionary embedded in this crate.
    Builtin,
    /// A JSON or YAML file.
    File(PathBuf),
    /// Templates passed in directly.
    Inline,
}

/// On-disk shape of a template store.
///
/// Accepts either a bare list of templates or an object with a
/// `templates` list and an optional version string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TemplateStore {
    Versioned {
        #[serde(default)]
        version: Option<String>,
        templates: Vec<Template>,
    },
    Bare(Vec<Template>),
}

impl TemplateStore {
    fn into_parts(self) -> (Option<String>, Vec<Template>) {
        match self {
            Self::Versioned { version, templates } => (version, templates),
            Self::Bare(templates) => (None, templates),
        }
    }
}

/// A normalized alias belonging to one template.
#[derive(Debug, Clone)]
pub(crate) struct AliasEntry {
    pub(crate) template: usize,
    pub(crate) text: String,
    pub(crate) tokens: HashSet<String>,
}

/// Immutable template index with exact and fuzzy lookup support.
///
/// Exact lookups go through a `HashMap` keyed by normalized canonical keys
/// and aliases; fuzzy matching walks the precomputed alias entries in
/// dictionary order (see [`TemplateMatcher`](crate::TemplateMatcher)).
///
/// # Examples
///
/// ```
/// use form_schema_catalog::TemplateCatalog;
/// use form_schema_core::{FieldType, Template};
///
/// let catalog = TemplateCatalog::from_templates(vec![
///     Template::new("first_name", FieldType::Input).with_aliases(&["First Name", "Given Name"]),
///     Template::new("email", FieldType::Input).with_aliases(&["E-mail Address"]),
/// ])
/// .unwrap();
///
/// assert_eq!(catalog.len(), 2);
/// assert_eq!(catalog.lookup_exact("given name").unwrap().canonical_key, "first_name");
/// assert_eq!(catalog.lookup_exact("E-Mail  address").unwrap().canonical_key, "email");
/// ```
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<Template>,
    exact: HashMap<String, usize>,
    aliases: Vec<AliasEntry>,
    version: Option<String>,
    digest: String,
    source: CatalogSource,
}

impl TemplateCatalog {
    /// Builds a catalog from templates already in memory.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::EmptyCanonicalKey`] or
    /// [`CatalogError::DuplicateCanonicalKey`] for malformed dictionaries.
    pub fn from_templates(templates: Vec<Template>) -> Result<Self> {
        Self::build(templates, None, CatalogSource::Inline)
    }

    /// Parses a JSON template store.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let store: TemplateStore = serde_json::from_str(raw)?;
        let (version, templates) = store.into_parts();
        Self::build(templates, version, CatalogSource::Inline)
    }

    /// Parses a YAML template store.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let store: TemplateStore = serde_yaml::from_str(raw)?;
        let (version, templates) = store.into_parts();
        Self::build(templates, version, CatalogSource::Inline)
    }

    /// Loads a template store from disk.
    ///
    /// `.json` files are parsed as JSON; `.yaml` and `.yml` as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::IoError`] if the file cannot be opened,
    /// [`CatalogError::UnsupportedFormat`] for other extensions, or a parse
    /// error.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let store: TemplateStore = match extension.as_str() {
            "json" => serde_json::from_reader(reader)?,
            "yaml" | "yml" => serde_yaml::from_reader(reader)?,
            other => return Err(CatalogError::UnsupportedFormat(other.to_string())),
        };

        let (version, templates) = store.into_parts();
        Self::build(templates, version, CatalogSource::File(path.to_path_buf()))
    }

    /// Loads the dental intake dictionary embedded in this crate.
    pub fn builtin() -> Result<Self> {
        let store: TemplateStore = serde_json::from_str(BUILTIN_TEMPLATES)?;
        let (version, templates) = store.into_parts();
        Self::build(templates, version, CatalogSource::Builtin)
    }

    fn build(
        templates: Vec<Template>,
        version: Option<String>,
        source: CatalogSource,
    ) -> Result<Self> {
        let mut exact = HashMap::new();
        let mut aliases = Vec::new();
        let mut seen_keys = HashSet::new();

        for (idx, template) in templates.iter().enumerate() {
            let key = template.canonical_key.trim();
            if key.is_empty() {
                return Err(CatalogError::EmptyCanonicalKey(idx));
            }
            if !seen_keys.insert(key.to_string()) {
                return Err(CatalogError::DuplicateCanonicalKey(key.to_string()));
            }

            let mut phrases = vec![normalize_label(key)];
            phrases.extend(template.aliases.iter().map(|a| normalize_label(a)));

            for text in phrases {
                if text.is_empty() {
                    continue;
                }
                // First template to claim a phrase keeps it.
                exact.entry(text.clone()).or_insert(idx);
                if aliases
                    .iter()
                    .any(|a: &AliasEntry| a.template == idx && a.text == text)
                {
                    continue;
                }
                let tokens = text.split_whitespace().map(str::to_string).collect();
                aliases.push(AliasEntry {
                    template: idx,
                    text,
                    tokens,
                });
            }
        }

        let digest = compute_digest(&templates)?;
        debug!(
            templates = templates.len(),
            aliases = aliases.len(),
            source = ?source,
            "template catalog built"
        );

        Ok(Self {
            templates,
            exact,
            aliases,
            version,
            digest,
            source,
        })
    }

    /// Finds a template whose canonical key or alias equals `label` after
    /// normalization.
    pub fn lookup_exact(&self, label: &str) -> Option<&Template> {
        self.exact_index(&normalize_label(label))
            .map(|idx| &self.templates[idx])
    }

    pub(crate) fn exact_index(&self, normalized: &str) -> Option<usize> {
        self.exact.get(normalized).copied()
    }

    pub(crate) fn alias_entries(&self) -> &[AliasEntry] {
        &self.aliases
    }

    /// Looks up a template by canonical key.
    pub fn get(&self, canonical_key: &str) -> Option<&Template> {
        self.templates
            .iter()
            .find(|t| t.canonical_key == canonical_key)
    }

    /// Returns the template at `idx` in dictionary order.
    pub fn template(&self, idx: usize) -> &Template {
        &self.templates[idx]
    }

    /// Returns all templates in dictionary order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Returns the number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns `true` if the catalog holds no templates.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Returns the store's version string, if it declared one.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns the lowercase hex SHA-256 of the canonical serialized
    /// templates.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Returns where this catalog was loaded from.
    pub fn source(&self) -> &CatalogSource {
        &self.source
    }
}

fn compute_digest(templates: &[Template]) -> Result<String> {
    let bytes = serde_json::to_vec(templates)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
