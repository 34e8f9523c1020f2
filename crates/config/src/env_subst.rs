/// Replace `${VAR}` and `${VAR:-fallback}` placeholders in raw config text.
///
/// Unresolvable variables without a fallback are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated: emit the remainder literally.
            result.push_str(&rest[start..]);
            return result;
        };

        let body = &after[..end];
        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body, None),
        };

        match (name.is_empty(), lookup(name), fallback) {
            (false, Some(value), _) if !value.is_empty() || fallback.is_none() => {
                result.push_str(&value);
            },
            (false, _, Some(fallback)) => result.push_str(fallback),
            _ => {
                result.push_str("${");
                result.push_str(body);
                result.push('}');
            },
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "PASSVAULT_TEST_DIR" => Some("/srv/vault".to_string()),
            "PASSVAULT_EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("data_dir = \"${PASSVAULT_TEST_DIR}\"", lookup),
            "data_dir = \"/srv/vault\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${PASSVAULT_NONEXISTENT_XYZ}", lookup),
            "${PASSVAULT_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn uses_fallback_for_unset_or_empty() {
        assert_eq!(
            substitute_env_with("${PASSVAULT_UNSET:-development}", lookup),
            "development"
        );
        assert_eq!(
            substitute_env_with("${PASSVAULT_EMPTY:-platform}", lookup),
            "platform"
        );
        assert_eq!(
            substitute_env_with("${PASSVAULT_TEST_DIR:-/tmp}", lookup),
            "/srv/vault"
        );
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        assert_eq!(substitute_env_with("a ${OPEN", lookup), "a ${OPEN");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
