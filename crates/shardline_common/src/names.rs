//! Identifier helpers. Storage-unit and database names are matched
//! case-insensitively wherever operators type them.

/// True if `names` contains `name`, ignoring ASCII case.
pub fn contains_ignore_case<S: AsRef<str>>(names: &[S], name: &str) -> bool {
    names.iter().any(|each| each.as_ref().eq_ignore_ascii_case(name))
}

/// Resolve `name` to the spelling registered in `names`, ignoring ASCII case.
pub fn find_ignore_case<'a, S: AsRef<str>>(names: &'a [S], name: &str) -> Option<&'a str> {
    names
        .iter()
        .map(|each| each.as_ref())
        .find(|each| each.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_ignore_case() {
        let names = vec!["ds_0".to_string(), "DS_1".to_string()];
        assert!(contains_ignore_case(&names, "DS_0"));
        assert!(contains_ignore_case(&names, "ds_1"));
        assert!(!contains_ignore_case(&names, "ds_2"));
        assert!(!contains_ignore_case::<String>(&[], "ds_0"));
    }

    #[test]
    fn test_find_ignore_case() {
        let names = ["ds_0", "DS_1"];
        assert_eq!(find_ignore_case(&names, "ds_1"), Some("DS_1"));
        assert_eq!(find_ignore_case(&names, "ds_9"), None);
    }
}
