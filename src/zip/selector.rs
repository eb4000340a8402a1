//! Predicates deciding which members get surfaced.
//!
//! Selection happens after the directory is parsed and never changes how
//! entries are read, only which ones are extracted and returned.

use super::structures::basename;

/// Decides whether a member, by its full archive name, is of interest.
pub trait MemberSelector {
    fn matches(&self, name: &str) -> bool;
}

impl<F> MemberSelector for F
where
    F: Fn(&str) -> bool,
{
    fn matches(&self, name: &str) -> bool {
        self(name)
    }
}

/// Matches license-like basenames: `LICENSE`, `LICENCE`, `COPYING` or
/// `NOTICE`, in any case, optionally followed by a suffix starting with
/// `.` or `-` (`LICENSE.txt`, `LICENSE-MIT`).
#[derive(Debug, Clone, Copy, Default)]
pub struct LicenseSelector;

impl MemberSelector for LicenseSelector {
    fn matches(&self, name: &str) -> bool {
        is_license_path(name)
    }
}

const LICENSE_STEMS: [&str; 4] = ["LICENSE", "LICENCE", "COPYING", "NOTICE"];

/// Whether the basename of `name` looks like a license or notice file.
pub fn is_license_path(name: &str) -> bool {
    let base = basename(name);
    LICENSE_STEMS.iter().any(|stem| {
        let Some(head) = base.get(..stem.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(stem) {
            return false;
        }
        let rest = &base[stem.len()..];
        rest.is_empty() || rest.starts_with('.') || rest.starts_with('-')
    })
}

/// Include/exclude selection with `*` and `?` wildcards.
///
/// An empty include list accepts everything. A pattern without wildcards
/// matches the full name or the basename exactly.
#[derive(Debug, Clone, Default)]
pub struct GlobSelector {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl GlobSelector {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    fn pattern_matches(pattern: &str, name: &str) -> bool {
        if has_glob_chars(pattern) {
            glob_match(pattern, name)
        } else {
            name == pattern || basename(name) == pattern
        }
    }
}

impl MemberSelector for GlobSelector {
    fn matches(&self, name: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|p| Self::pattern_matches(p, name));
        included && !self.exclude.iter().any(|p| Self::pattern_matches(p, name))
    }
}

fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Glob matching supporting `*` (any run, including `/`) and `?` (one char).
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    // Iterative backtracking: remember the last `*` and retry from there.
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some('?') => {
                p += 1;
                t += 1;
            }
            Some(c) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
