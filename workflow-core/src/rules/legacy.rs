use regex::Regex;
use std::sync::OnceLock;

/// Method names already canonical on the `workitem`/`event`/`result`
/// script-scope objects (spec §4.3) — never rewritten even when they match
/// a deprecated-looking shape (e.g. `workitem.getItemValueString(...)`
/// itself must survive untouched).
const CANONICAL_METHODS: &[&str] = &[
    "hasItem",
    "getItemValue",
    "getItemValueString",
    "getItemValueDouble",
    "getItemValueLong",
    "getItemValueBool",
    "setItemValue",
];

/// Item names treated as numeric for the purpose of picking a typed
/// accessor when rewriting an untyped legacy reference (spec §9 Open
/// Question: "what accessor does a bare `workitem.field` rewrite to").
/// This is a heuristic, not a schema lookup — the legacy scripts this shim
/// targets carry no type information to recover exactly.
fn looks_numeric(item_name: &str) -> bool {
    let n = item_name.to_ascii_lowercase();
    ["id", "count", "amount", "sum", "number", "quantity"]
        .iter()
        .any(|hint| n.ends_with(hint) || n.contains(hint))
}

fn accessor_for(item_name: &str) -> &'static str {
    if looks_numeric(item_name) {
        "getItemValueDouble"
    } else {
        "getItemValueString"
    }
}

struct Patterns {
    pragma: Regex,
    bracket_index: Regex,
    bracket: Regex,
    dot_index: Regex,
    dot_get: Regex,
    bare_dot: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        pragma: Regex::new(r#"(?m)^[ \t]*//[ \t]*graalvm\.languageId[ \t]*=[ \t]*nashorn[ \t]*\r?\n?"#).unwrap(),
        bracket_index: Regex::new(r#"(workitem|event)\[['"]([\w$.]+)['"]\]\[0\]"#).unwrap(),
        bracket: Regex::new(r#"(workitem|event)\[['"]([\w$.]+)['"]\]"#).unwrap(),
        dot_index: Regex::new(r#"(workitem|event)\.([A-Za-z_]\w*)\[0\]"#).unwrap(),
        dot_get: Regex::new(r#"(workitem|event)\.get\(\s*['"]([\w$.]+)['"]\s*\)"#).unwrap(),
        bare_dot: Regex::new(r#"(workitem|event)\.([A-Za-z_]\w*)(\s*\()?"#).unwrap(),
    })
}

/// True if `script` contains any accessor shape this shim knows how to
/// rewrite (spec §4.3: legacy scripts written against the pre-typed-accessor
/// API must still be accepted).
pub fn is_deprecated_script(script: &str) -> bool {
    let p = patterns();
    if p.pragma.is_match(script) || p.bracket_index.is_match(script) || p.bracket.is_match(script) || p.dot_index.is_match(script) || p.dot_get.is_match(script) {
        return true;
    }
    p.bare_dot.captures_iter(script).any(|c| {
        let is_call = c.get(3).is_some();
        let name = &c[2];
        !is_call && !CANONICAL_METHODS.contains(&name)
    })
}

/// Rewrites deprecated `workitem`/`event` accessor shapes into the
/// canonical typed-accessor calls the rule engine registers (spec §4.3,
/// §9). Substitution runs longest-match-first — bracket+index and
/// dot+index shapes are rewritten before the bare dot-field fallback, so a
/// shape like `workitem['a'][0]` is never partially rewritten by the bare
/// rule first.
pub fn rewrite(script: &str) -> String {
    let p = patterns();

    let script = p.pragma.replace_all(script, "");

    let script = p.bracket_index.replace_all(&script, |c: &regex::Captures| {
        format!("{}.{}(\"{}\")", &c[1], accessor_for(&c[2]), &c[2])
    });

    let script = p.bracket.replace_all(&script, |c: &regex::Captures| {
        format!("{}.{}(\"{}\")", &c[1], accessor_for(&c[2]), &c[2])
    });

    let script = p.dot_index.replace_all(&script, |c: &regex::Captures| {
        format!("{}.{}(\"{}\")", &c[1], accessor_for(&c[2]), &c[2])
    });

    let script = p.dot_get.replace_all(&script, |c: &regex::Captures| {
        format!("{}.{}(\"{}\")", &c[1], accessor_for(&c[2]), &c[2])
    });

    let script = p.bare_dot.replace_all(&script, |c: &regex::Captures| {
        let object = &c[1];
        let name = &c[2];
        let is_call = c.get(3).is_some();
        if is_call || CANONICAL_METHODS.contains(&name) {
            c[0].to_string()
        } else {
            format!("{object}.{}(\"{name}\")", accessor_for(name))
        }
    });

    script.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_bracket_and_dot_shapes_as_deprecated() {
        assert!(is_deprecated_script(r#"workitem['txtname'][0] == 'x'"#));
        assert!(is_deprecated_script(r#"workitem.txtname[0] == 'x'"#));
        assert!(is_deprecated_script(r#"workitem.get('txtname') == 'x'"#));
        assert!(is_deprecated_script(r#"workitem.orderamount > 10"#));
    }

    #[test]
    fn canonical_accessor_calls_are_not_flagged() {
        assert!(!is_deprecated_script(r#"workitem.getItemValueString("txtname") == 'x'"#));
        assert!(!is_deprecated_script(r#"hasItem("txtname")"#));
    }

    #[test]
    fn rewrites_bracket_index_to_typed_accessor() {
        let out = rewrite(r#"workitem['txtname'][0] == 'x'"#);
        assert_eq!(out, r#"workitem.getItemValueString("txtname") == 'x'"#);
    }

    #[test]
    fn rewrites_numeric_looking_bare_field_to_double_accessor() {
        let out = rewrite(r#"workitem.orderamount > 10"#);
        assert_eq!(out, r#"workitem.getItemValueDouble("orderamount") > 10"#);
    }

    #[test]
    fn rewrites_dot_get_usage() {
        let out = rewrite(r#"event.get('mailsubject')"#);
        assert_eq!(out, r#"event.getItemValueString("mailsubject")"#);
    }

    #[test]
    fn strips_nashorn_pragma_and_leaves_canonical_calls_untouched() {
        let script = "// graalvm.languageId=nashorn\nworkitem.getItemValueString(\"a\") == \"1\"";
        let out = rewrite(script);
        assert_eq!(out, "workitem.getItemValueString(\"a\") == \"1\"");
    }

    #[test]
    fn does_not_double_rewrite_bracket_index_via_bare_dot_rule() {
        let out = rewrite(r#"workitem['a'][0]"#);
        assert_eq!(out, r#"workitem.getItemValueString("a")"#);
    }
}
