use serde::{Deserialize, Serialize};

/// How a breakpoint or rule selects organisms.
///
/// Scopes have a fixed specificity order used when several entries match one
/// organism: exact name beats group membership beats genus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrganismScope {
    Exact { exact: String },
    Genus { genus: String },
    Group { group: String },
    /// Shorthand: a bare string is an exact organism name.
    Name(String),
}

impl OrganismScope {
    pub fn exact(name: impl Into<String>) -> Self {
        OrganismScope::Exact { exact: name.into() }
    }

    pub fn genus(name: impl Into<String>) -> Self {
        OrganismScope::Genus { genus: name.into() }
    }

    pub fn group(name: impl Into<String>) -> Self {
        OrganismScope::Group { group: name.into() }
    }

    /// Higher is more specific: exact 3, group 2, genus 1.
    pub fn specificity(&self) -> u8 {
        match self {
            OrganismScope::Exact { .. } | OrganismScope::Name(_) => 3,
            OrganismScope::Group { .. } => 2,
            OrganismScope::Genus { .. } => 1,
        }
    }

    /// The group name this scope references, if any.
    pub fn group_ref(&self) -> Option<&str> {
        match self {
            OrganismScope::Group { group } => Some(group),
            _ => None,
        }
    }

    /// Human-readable form for rationale and validation messages.
    pub fn describe(&self) -> String {
        match self {
            OrganismScope::Exact { exact } | OrganismScope::Name(exact) => exact.clone(),
            OrganismScope::Genus { genus } => format!("genus {genus}"),
            OrganismScope::Group { group } => format!("group {group}"),
        }
    }
}

/// The genus portion of a binomial organism name.
pub fn genus_of(organism: &str) -> &str {
    organism.split_whitespace().next().unwrap_or(organism)
}
