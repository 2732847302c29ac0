//! Matches `"<method> <path>"` against the configured
//! `"<METHOD-GLOB> <PATH-GLOB>"` patterns using shell-style glob semantics
//! (`*` matches any run of characters, `?` matches exactly one), the same
//! as Python's `fnmatch.fnmatch`.

use portcullis_config::Configuration;

use crate::error::{ProxyError, Result};

/// Return every endpoint pattern in `config` that matches `method`/`path`.
///
/// `path` must already have its query string stripped; passing one that
/// still has a `?` in it is an internal invariant violation.
pub fn match_endpoints<'c>(
    config: &'c Configuration,
    method: &str,
    path: &str,
) -> Result<Vec<&'c str>> {
    if path.contains('?') {
        return Err(ProxyError::InvalidRequest);
    }

    let candidate = format!("{method} {path}");
    Ok(config
        .endpoint_patterns()
        .filter(|pattern| glob_match(pattern, &candidate))
        .collect())
}

/// Shell-style glob match, anchored at both ends (there is no implicit
/// prefix/suffix matching, matching `fnmatch.fnmatch`'s full-string
/// semantics).
fn glob_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();
    match_from(&pattern, 0, &candidate, 0)
}

fn match_from(pattern: &[char], pi: usize, candidate: &[char], ci: usize) -> bool {
    let mut pi = pi;
    let mut ci = ci;
    // Backtracking state for the most recent `*`.
    let mut star_pi: Option<usize> = None;
    let mut star_ci = 0usize;

    loop {
        if pi < pattern.len() {
            match pattern[pi] {
                '*' => {
                    star_pi = Some(pi);
                    star_ci = ci;
                    pi += 1;
                    continue;
                }
                '?' if ci < candidate.len() => {
                    pi += 1;
                    ci += 1;
                    continue;
                }
                c if ci < candidate.len() && c == candidate[ci] => {
                    pi += 1;
                    ci += 1;
                    continue;
                }
                _ => {}
            }
        } else if ci == candidate.len() {
            return true;
        }

        // Mismatch (or pattern exhausted with candidate left): backtrack to
        // the last `*`, consuming one more candidate character under it.
        match star_pi {
            Some(sp) => {
                star_ci += 1;
                if star_ci > candidate.len() {
                    return false;
                }
                pi = sp + 1;
                ci = star_ci;
            }
            None => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::glob_match;
    use portcullis_config::Configuration;

    use super::match_endpoints;

    #[test]
    fn exact_match() {
        assert!(glob_match("POST /towel", "POST /towel"));
        assert!(!glob_match("POST /towel", "GET /towel"));
    }

    #[test]
    fn wildcard_method() {
        assert!(glob_match("* /towel", "POST /towel"));
        assert!(glob_match("* /towel", "GET /towel"));
    }

    #[test]
    fn wildcard_path_segment() {
        assert!(glob_match(
            "GET /containers/*/json",
            "GET /containers/abc123/json"
        ));
        assert!(!glob_match(
            "GET /containers/*/json",
            "GET /containers/abc123/logs"
        ));
    }

    #[test]
    fn question_mark_matches_single_char() {
        assert!(glob_match("GET /v?/info", "GET /v1/info"));
        assert!(!glob_match("GET /v?/info", "GET /v12/info"));
    }

    #[test]
    fn no_implicit_anchoring_beyond_full_string() {
        assert!(!glob_match("POST /towel", "POST /towel/extra"));
        assert!(!glob_match("POST /towel", "prefix POST /towel"));
    }

    #[test]
    fn rejects_query_string_in_path() {
        let config = Configuration::parse("endpoints: {}\nadapters: {}\n").unwrap();
        let err = match_endpoints(&config, "GET", "/info?a=1").unwrap_err();
        assert!(matches!(err, crate::error::ProxyError::InvalidRequest));
    }

    #[test]
    fn returns_all_matching_endpoints_in_file_order() {
        let config = Configuration::parse(
            r#"
endpoints:
  "* /towel":
    pre: [a]
  "POST /towel":
    post: [a]
adapters:
  a: "http://x"
"#,
        )
        .unwrap();
        let matched = match_endpoints(&config, "POST", "/towel").unwrap();
        assert_eq!(matched, vec!["* /towel", "POST /towel"]);
    }
}
