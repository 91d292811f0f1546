/// Replace `${ENV_VAR}` placeholders in config text.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_with(input, |name| std::env::var(name).ok())
}

/// Implementation with a pluggable lookup, testable without touching the
/// process environment.
fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            // Unclosed or empty placeholder: emit literally and move on.
            _ => {
                out.push_str("${");
                rest = after;
            },
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "CONVOY_TEST_TOKEN" => Some("tok-123".into()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_with("bot_token = \"${CONVOY_TEST_TOKEN}\"", lookup),
            "bot_token = \"tok-123\""
        );
    }

    #[test]
    fn leaves_unknown_var_untouched() {
        assert_eq!(substitute_with("x = ${NOPE}", lookup), "x = ${NOPE}");
    }

    #[test]
    fn handles_multiple_and_adjacent() {
        assert_eq!(
            substitute_with("${CONVOY_TEST_TOKEN}${CONVOY_TEST_TOKEN}", lookup),
            "tok-123tok-123"
        );
    }

    #[test]
    fn unclosed_placeholder_is_literal() {
        assert_eq!(substitute_with("x = ${OOPS", lookup), "x = ${OOPS");
        assert_eq!(substitute_with("x = ${}", lookup), "x = ${}");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(substitute_with("no placeholders here", lookup), "no placeholders here");
    }
}
