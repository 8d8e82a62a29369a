//! "Did you mean" suggestions for faction and unit names.

use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};

const MAX_HINTS: usize = 3;

/// Up to three candidates that best match `query`, best first.
///
/// Candidates sharing a word with the query are kept even when the fuzzy
/// matcher rejects them, so `Boys` still suggests `Boyz Mob`.
pub fn suggest<'a, I>(query: &str, candidates: I) -> Vec<String>
where
  I: IntoIterator<Item = &'a str>,
{
  let matcher = SkimMatcherV2::default().ignore_case();
  let query_words: Vec<String> = query
    .split_whitespace()
    .map(|w| w.to_lowercase())
    .collect();

  let mut scored: Vec<(i64, &str)> = candidates
    .into_iter()
    .filter_map(|c| {
      let fuzzy = matcher.fuzzy_match(c, query);
      let shared = c
        .split_whitespace()
        .filter(|w| query_words.contains(&w.to_lowercase()))
        .count() as i64;
      match (fuzzy, shared) {
        (None, 0) => None,
        (score, shared) => Some((score.unwrap_or(0) + shared * 10, c)),
      }
    })
    .collect();

  scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
  scored
    .into_iter()
    .take(MAX_HINTS)
    .map(|(_, c)| c.to_owned())
    .collect()
}
