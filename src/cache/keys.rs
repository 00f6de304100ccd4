use std::fmt;

/// Cache address: a resource kind plus optional narrowing params. A key with
/// fewer params covers every key it prefixes, which is how mutation
/// dependencies invalidate whole resource families.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey {
    kind: &'static str,
    params: Vec<String>,
}

impl QueryKey {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, value: impl Into<String>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn kind(&self) -> &str {
        self.kind
    }

    /// Whether this key, treated as a dependency, covers `key`.
    pub fn covers(&self, key: &QueryKey) -> bool {
        self.kind == key.kind && key.params.starts_with(&self.params)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for param in &self.params {
            write!(f, ":{}", param)?;
        }
        Ok(())
    }
}

pub fn trips() -> QueryKey {
    QueryKey::new("trips")
}

pub fn trip_by_slug(slug: &str) -> QueryKey {
    QueryKey::new("trips").with_param(slug)
}

pub fn ships() -> QueryKey {
    QueryKey::new("ships")
}

pub fn talent() -> QueryKey {
    QueryKey::new("talent")
}

pub fn party_themes() -> QueryKey {
    QueryKey::new("party-themes")
}

pub fn locations() -> QueryKey {
    QueryKey::new("locations")
}

pub fn trip_info_sections() -> QueryKey {
    QueryKey::new("trip-info-sections")
}

pub fn users() -> QueryKey {
    QueryKey::new("users")
}

pub fn trip_updates() -> QueryKey {
    QueryKey::new("trip-updates")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_level_key_covers_narrowed_keys() {
        assert!(trips().covers(&trip_by_slug("alaska-2026")));
        assert!(trips().covers(&trips()));
        assert!(!trip_by_slug("alaska-2026").covers(&trips()));
        assert!(!ships().covers(&trips()));
    }

    #[test]
    fn display_joins_kind_and_params() {
        assert_eq!(trip_by_slug("alaska-2026").to_string(), "trips:alaska-2026");
        assert_eq!(users().to_string(), "users");
    }
}
