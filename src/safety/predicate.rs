use regex::Regex;

/// A forbidden-content check over candidate text.
///
/// `Ok(true)` means the text violates the condition. An `Err` is a predicate
/// evaluation failure; the veto treats it as a violation.
pub trait Predicate: Send + Sync {
    fn name(&self) -> &str;

    fn violates(&self, candidate: &str) -> anyhow::Result<bool>;
}

/// Case-insensitive substring match on a single term.
///
/// The term is trimmed. An empty term never fires, matching how [`Blocklist`]
/// drops empty entries.
#[derive(Debug, Clone)]
pub struct ContainsTerm {
    name: String,
    term: String,
}

impl ContainsTerm {
    pub fn new(term: impl Into<String>) -> Self {
        let term = term.into().trim().to_lowercase();
        Self {
            name: format!("contains:{term}"),
            term,
        }
    }
}

impl Predicate for ContainsTerm {
    fn name(&self) -> &str {
        &self.name
    }

    fn violates(&self, candidate: &str) -> anyhow::Result<bool> {
        if self.term.is_empty() {
            return Ok(false);
        }
        Ok(candidate.to_lowercase().contains(self.term.as_str()))
    }
}

/// Case-insensitive match on any term of a curated list.
#[derive(Debug, Clone)]
pub struct Blocklist {
    name: String,
    terms: Vec<String>,
}

impl Blocklist {
    pub fn new(
        name: impl Into<String>,
        terms: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            terms: terms
                .into_iter()
                .map(|term| term.into().trim().to_lowercase())
                .filter(|term| !term.is_empty())
                .collect(),
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn matched_terms(&self, candidate: &str) -> Vec<&str> {
        let lowercase = candidate.to_lowercase();
        self.terms
            .iter()
            .filter(|term| lowercase.contains(term.as_str()))
            .map(String::as_str)
            .collect()
    }
}

impl Predicate for Blocklist {
    fn name(&self) -> &str {
        &self.name
    }

    fn violates(&self, candidate: &str) -> anyhow::Result<bool> {
        let lowercase = candidate.to_lowercase();
        Ok(self.terms.iter().any(|term| lowercase.contains(term.as_str())))
    }
}

/// Regex match. Patterns are compiled once, at construction.
#[derive(Debug, Clone)]
pub struct PatternPredicate {
    name: String,
    pattern: Regex,
}

impl PatternPredicate {
    pub fn new(name: impl Into<String>, pattern: &str) -> anyhow::Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|error| anyhow::anyhow!("invalid veto pattern `{pattern}`: {error}"))?;
        Ok(Self {
            name: name.into(),
            pattern,
        })
    }
}

impl Predicate for PatternPredicate {
    fn name(&self) -> &str {
        &self.name
    }

    fn violates(&self, candidate: &str) -> anyhow::Result<bool> {
        Ok(self.pattern.is_match(candidate))
    }
}

/// Adapts a named closure into a [`Predicate`].
pub struct FnPredicate<F> {
    name: String,
    check: F,
}

impl<F> FnPredicate<F>
where
    F: Fn(&str) -> anyhow::Result<bool> + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&str) -> anyhow::Result<bool> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn violates(&self, candidate: &str) -> anyhow::Result<bool> {
        (self.check)(candidate)
    }
}
