//! Wildcard Detection and Deferral
//!
//! Wildcards are `{name}` tokens the workflow engine fills in per sample.
//! A function call whose arguments carry one cannot be evaluated while
//! generating, so its wildcards are rewritten to `{wildcards.name}` and
//! the call is wrapped in a lambda.

use once_cell::sync::Lazy;
use regex::Regex;

/// Wildcard names recognised when none are configured.
pub const DEFAULT_WILDCARDS: &[&str] = &["sample"];

static WILDCARD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^{}]+\}").expect("wildcard pattern is valid"));

/// Checks if a string contains wildcard syntax.
pub fn has_wildcards(text: &str) -> bool {
    WILDCARD_PATTERN.is_match(text)
}

/// Extracts wildcard names from a pattern.
///
/// # Example
/// ```
/// use snakemaker::rules::wildcards::extract_wildcard_names;
///
/// let names = extract_wildcard_names("out/{sample}/{run}.bam");
/// assert_eq!(names, vec!["sample", "run"]);
/// ```
pub fn extract_wildcard_names(pattern: &str) -> Vec<String> {
    WILDCARD_PATTERN
        .find_iter(pattern)
        .map(|m| m.as_str().trim_matches(|c| c == '{' || c == '}').to_string())
        .collect()
}

/// Rewrites each `{name}` listed in `wildcard_names` to `{wildcards.name}`.
///
/// Tokens that are not wildcards (for example `{output_path}`, a variable
/// of the main Snakefile) are left alone.
pub fn defer_wildcards(text: &str, wildcard_names: &[String]) -> String {
    wildcard_names.iter().fold(text.to_string(), |acc, name| {
        substitute_wildcard(&acc, name, &format!("{{wildcards.{}}}", name))
    })
}

/// Substitutes a wildcard in a string with a concrete value.
fn substitute_wildcard(text: &str, wildcard_name: &str, value: &str) -> String {
    text.replace(&format!("{{{}}}", wildcard_name), value)
}

/// Converts the configured wildcard list into owned names, falling back to
/// [`DEFAULT_WILDCARDS`].
pub fn wildcard_names(configured: &[String]) -> Vec<String> {
    if configured.is_empty() {
        DEFAULT_WILDCARDS.iter().map(|s| s.to_string()).collect()
    } else {
        configured.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_wildcards() {
        assert!(has_wildcards("{sample}.fastq"));
        assert!(has_wildcards("read_json(f'/data/{sample}/a.json')"));
        assert!(!has_wildcards("regular_file.txt"));
        assert!(!has_wildcards("empty {} braces"));
    }

    #[test]
    fn test_extract_wildcard_names() {
        let names = extract_wildcard_names("reads/{sample}.fastq");
        assert_eq!(names, vec!["sample"]);

        let names = extract_wildcard_names("{id}_{replicate}.txt");
        assert_eq!(names, vec!["id", "replicate"]);

        let names = extract_wildcard_names("f'{output_path}/{wildcards.sample}.txt' {}");
        assert_eq!(names, vec!["output_path", "wildcards.sample"]);
    }

    #[test]
    fn test_defer_wildcards() {
        let names = vec!["sample".to_string()];
        assert_eq!(
            defer_wildcards("f'{output_path}/bet/{sample}/mask.nii'", &names),
            "f'{output_path}/bet/{wildcards.sample}/mask.nii'"
        );
    }

    #[test]
    fn test_defer_multiple_wildcards() {
        let names = vec!["sample".to_string(), "run".to_string()];
        assert_eq!(
            defer_wildcards("{sample}/{run}/{sample}.txt", &names),
            "{wildcards.sample}/{wildcards.run}/{wildcards.sample}.txt"
        );
    }

    #[test]
    fn test_substitute_wildcard() {
        let result = substitute_wildcard("reads/{sample}.fastq", "sample", "sample1");
        assert_eq!(result, "reads/sample1.fastq");
    }

    #[test]
    fn test_wildcard_names_default() {
        assert_eq!(wildcard_names(&[]), vec!["sample"]);
        assert_eq!(wildcard_names(&["subject".to_string()]), vec!["subject"]);
    }
}
