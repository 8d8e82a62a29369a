//! Natural ordering of version strings ("3.10" sorts after "3.9").

use std::cmp::Ordering;

/// Compare two version strings segment by segment. Numeric segments compare
/// numerically; anything else falls back to a string comparison.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
  let mut left = a.trim().trim_start_matches(['v', 'V']).split('.');
  let mut right = b.trim().trim_start_matches(['v', 'V']).split('.');
  loop {
    match (left.next(), right.next()) {
      (None, None) => return Ordering::Equal,
      (Some(_), None) => return Ordering::Greater,
      (None, Some(_)) => return Ordering::Less,
      (Some(l), Some(r)) => {
        let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
          (Ok(l), Ok(r)) => l.cmp(&r),
          _ => l.cmp(r),
        };
        if ord != Ordering::Equal {
          return ord;
        }
      }
    }
  }
}

/// The item whose version string (given by `key`) is greatest in natural
/// order, if any.
pub fn latest_by<T, I, F>(items: I, key: F) -> Option<T>
where
  I: IntoIterator<Item = T>,
  F: Fn(&T) -> &str,
{
  items
    .into_iter()
    .max_by(|a, b| compare_versions(key(a), key(b)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn numeric_segments_compare_numerically() {
    assert_eq!(compare_versions("3.10", "3.9"), Ordering::Greater);
    assert_eq!(compare_versions("3.2", "3.2"), Ordering::Equal);
    assert_eq!(compare_versions("3.2.1", "3.2"), Ordering::Greater);
    assert_eq!(compare_versions("v2.0", "1.9"), Ordering::Greater);
  }

  #[test]
  fn latest_picks_natural_max() {
    assert_eq!(latest_by(["3.1", "3.10", "3.9"], |v| *v), Some("3.10"));
    assert_eq!(latest_by(Vec::<&str>::new(), |v| *v), None);

    let priced = [("3.2", 80), ("3.10", 75)];
    assert_eq!(latest_by(priced, |(v, _)| *v), Some(("3.10", 75)));
  }
}
