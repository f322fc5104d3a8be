//! Prefix matching for completion.

/// Anything that can be offered as a completion candidate by name.
pub trait Candidate {
    fn candidate_name(&self) -> &str;
}

impl Candidate for str {
    fn candidate_name(&self) -> &str {
        self
    }
}

impl Candidate for String {
    fn candidate_name(&self) -> &str {
        self
    }
}

impl<T: Candidate + ?Sized> Candidate for &T {
    fn candidate_name(&self) -> &str {
        (**self).candidate_name()
    }
}

/// Outcome of [`match_by_prefix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMatch<T> {
    /// Matching candidates, in the order they were given.
    pub matches: Vec<T>,
    /// Text that can be appended to the prefix without excluding any match.
    pub completion: String,
}

impl<T> Default for PrefixMatch<T> {
    fn default() -> Self {
        Self {
            matches: Vec::new(),
            completion: String::new(),
        }
    }
}

/// Select the candidates whose name starts with `prefix`.
///
/// Comparison is ordinal and case-sensitive; a prefix longer than a name
/// never matches it. The returned completion is the longest common prefix
/// of all matching names, minus `prefix` itself.
///
/// # Example
/// ```
/// use shell_consoles::matcher::match_by_prefix;
/// let found = match_by_prefix(["open", "close", "clone"], "c");
/// assert_eq!(found.matches, vec!["close", "clone"]);
/// assert_eq!(found.completion, "lo");
/// ```
pub fn match_by_prefix<I>(candidates: I, prefix: &str) -> PrefixMatch<I::Item>
where
    I: IntoIterator,
    I::Item: Candidate,
{
    let mut matches = Vec::new();
    let mut common: Option<String> = None;

    for candidate in candidates {
        let name = candidate.candidate_name();
        if !name.starts_with(prefix) {
            continue;
        }
        match common.as_mut() {
            None => common = Some(name.to_string()),
            Some(shared) => {
                let keep = common_prefix(shared, name).len();
                shared.truncate(keep);
            }
        }
        matches.push(candidate);
    }

    let completion = common
        .map(|shared| shared[prefix.len()..].to_string())
        .unwrap_or_default();
    PrefixMatch {
        matches,
        completion,
    }
}

/// Longest common prefix of two strings, compared character by character.
pub fn common_prefix<'a>(lhs: &'a str, rhs: &str) -> &'a str {
    let mut end = 0;
    for ((i, l), r) in lhs.char_indices().zip(rhs.chars()) {
        if l != r {
            break;
        }
        end = i + l.len_utf8();
    }
    &lhs[..end]
}
