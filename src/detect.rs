//! Delimiter auto-detection and its shared, bounded cache.
//!
//! Scoring is frequency-based with a consistency bonus: a candidate that
//! splits the first sampled lines into an equal field count is preferred
//! over one that merely occurs often inside field text. Results for a given
//! `(sample fingerprint, candidate set)` pair are memoized in an LRU cache
//! so repeated conversions of similar payloads skip the scan entirely.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;

use crate::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_DELIMITER, DETECT_SAMPLE_BYTES, DETECT_SAMPLE_LINES,
    FINGERPRINT_BYTES,
};

/// Score the candidates against `sample` and return the winner.
///
/// Ties resolve to candidate order; a sample containing no candidate at all
/// yields the default delimiter. Deterministic for fixed inputs.
///
/// # Examples
/// ```
/// use tabwire::detect_delimiter;
///
/// assert_eq!(detect_delimiter("a;b;c\nd;e;f", &[';', ',']), ';');
/// assert_eq!(detect_delimiter("plain text", &[';', ',']), ',');
/// ```
pub fn detect_delimiter(sample: &str, candidates: &[char]) -> char {
    let prefix = bounded_prefix(sample, DETECT_SAMPLE_BYTES);
    let mut best: Option<(char, usize)> = None;
    for &candidate in candidates {
        let score = score_candidate(prefix, candidate);
        if score > 0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }
    best.map(|(c, _)| c).unwrap_or(DEFAULT_DELIMITER)
}

fn score_candidate(prefix: &str, candidate: char) -> usize {
    let occurrences = prefix.matches(candidate).count();
    if occurrences == 0 {
        return 0;
    }

    let mut counts = prefix
        .lines()
        .take(DETECT_SAMPLE_LINES)
        .filter(|line| !line.is_empty())
        .map(|line| line.matches(candidate).count() + 1);
    let consistent = match counts.next() {
        Some(first) if first > 1 => counts.all(|count| count == first),
        _ => false,
    };

    if consistent {
        occurrences * 3
    } else {
        occurrences
    }
}

/// Longest prefix of `text` no larger than `max_bytes`, cut at a character
/// boundary.
fn bounded_prefix(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn fingerprint(sample: &str) -> u64 {
    let head = bounded_prefix(sample, FINGERPRINT_BYTES);
    let mut hasher = DefaultHasher::new();
    head.hash(&mut hasher);
    sample.len().hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DetectKey {
    fingerprint: u64,
    candidates: String,
}

/// Shared, bounded memo of detection results.
///
/// Keys combine a content fingerprint with the candidate set; eviction is
/// least-recently-used and the capacity is fixed at construction. Inject one
/// instance wherever isolation matters (tests get a fresh cache, a server
/// shares one across requests).
///
/// # Examples
/// ```
/// use tabwire::DelimiterCache;
///
/// let cache = DelimiterCache::new(16);
/// let first = cache.detect("a|b|c", &['|', ',']);
/// let second = cache.detect("a|b|c", &['|', ',']);
/// assert_eq!(first, second);
/// assert_eq!(cache.len(), 1);
/// ```
pub struct DelimiterCache {
    inner: Mutex<LruCache<DetectKey, char>>,
}

impl DelimiterCache {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached detection: a hit refreshes recency and skips the scan, a miss
    /// scores the sample and stores the result, evicting the least recently
    /// used entry on capacity pressure.
    pub fn detect(&self, sample: &str, candidates: &[char]) -> char {
        let key = DetectKey {
            fingerprint: fingerprint(sample),
            candidates: candidates.iter().collect(),
        };
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(&delimiter) = inner.get(&key) {
            return delimiter;
        }
        let delimiter = detect_delimiter(sample, candidates);
        inner.put(key, delimiter);
        delimiter
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DelimiterCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl fmt::Debug for DelimiterCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelimiterCache")
            .field("len", &self.len())
            .finish()
    }
}
