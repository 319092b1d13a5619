//! Pure type- and default-normalization helpers used by the per-dialect
//! inspectors. Kept free of any `Executor`
//! dependency so they can be unit tested directly against string input.

use once_cell::sync::Lazy;
use regex::Regex;

/// `timestamp with time zone` → `timestamptz`, `timestamp without time
/// zone` → `timestamp`.
pub fn normalize_time_type(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("timestamp with time zone") || lower.starts_with("timestamptz") {
        "timestamptz".to_string()
    } else if lower.starts_with("timestamp without time zone") {
        "timestamp".to_string()
    } else {
        raw.to_string()
    }
}

/// `float(p)` with `p < 25` becomes `real` (precision 24); `p >= 25`
/// becomes `double precision` (precision 53).
pub fn normalize_float_type(raw: &str) -> String {
    static FLOAT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^float\((\d+)\)$").unwrap());
    match FLOAT_RE.captures(raw.trim()) {
        Some(caps) => {
            let precision: u32 = caps[1].parse().unwrap_or(24);
            if precision < 25 {
                "real".to_string()
            } else {
                "double precision".to_string()
            }
        }
        None => raw.to_string(),
    }
}

/// Bare `character`/`char` (no length) is size 1.
pub fn normalize_character_type(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    if lower == "character" || lower == "char" {
        format!("{}(1)", raw.trim())
    } else {
        raw.to_string()
    }
}

/// The default sequence name for a SERIAL column absent an explicit
/// `SequenceName` override.
pub fn default_serial_sequence_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_seq")
}

/// A SERIAL/BIGSERIAL/SMALLSERIAL column's underlying integer width and
/// the name of the sequence implicitly created for it, derived from the
/// raw `nextval('<seq>'::regclass)` default expression the inspector read
/// off the catalog. Returns `None` if the default doesn't look like a
/// sequence-backed default.
pub fn split_serial_default(default_expr: &str) -> Option<String> {
    static NEXTVAL_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"(?i)nextval\('"?([\w.]+)"?'(?:::regclass)?\)"#).unwrap());
    NEXTVAL_RE
        .captures(default_expr)
        .map(|caps| caps[1].to_string())
}

/// Identity sequence defaults of `Start=1, Increment=1` carry no
/// information beyond "this column is an identity column" and are elided.
pub fn should_elide_identity_default(start: i64, increment: i64) -> bool {
    start == 1 && increment == 1
}

/// Strips a trailing `::<type>` typecast suffix when it matches the
/// column's own declared type, e.g. `'active'::character varying` on a
/// `character varying` column becomes `'active'`.
pub fn strip_matching_typecast<'a>(default_expr: &'a str, column_type: &str) -> &'a str {
    match default_expr.rsplit_once("::") {
        Some((value, cast)) if cast.trim() == column_type.trim() => value,
        _ => default_expr,
    }
}

/// A default expression that looks like a formatted currency string
/// (`"$1,234.56"`) rather than a number or well-formed SQL literal; the
/// inspector discards these unless they can be parsed as a plain number.
pub fn is_unparseable_currency_default(default_expr: &str) -> bool {
    static CURRENCY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^'?\$[\d,]+(\.\d+)?'?$"#).unwrap());
    CURRENCY_RE.is_match(default_expr.trim()) && default_expr.trim().trim_matches('\'').parse::<f64>().is_err()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_timestamptz() {
        assert_eq!(normalize_time_type("timestamp with time zone"), "timestamptz");
        assert_eq!(normalize_time_type("timestamp without time zone"), "timestamp");
        assert_eq!(normalize_time_type("date"), "date");
    }

    #[test]
    fn normalizes_float_precision() {
        assert_eq!(normalize_float_type("float(24)"), "real");
        assert_eq!(normalize_float_type("float(53)"), "double precision");
        assert_eq!(normalize_float_type("integer"), "integer");
    }

    #[test]
    fn normalizes_bare_char() {
        assert_eq!(normalize_character_type("char"), "char(1)");
        assert_eq!(normalize_character_type("character"), "character(1)");
        assert_eq!(normalize_character_type("character varying(10)"), "character varying(10)");
    }

    #[test]
    fn extracts_sequence_name_from_nextval_default() {
        assert_eq!(
            split_serial_default("nextval('posts_id_seq'::regclass)"),
            Some("posts_id_seq".to_string())
        );
        assert_eq!(split_serial_default("now()"), None);
    }

    #[test]
    fn identity_default_elision_matches_start_and_increment_one() {
        assert!(should_elide_identity_default(1, 1));
        assert!(!should_elide_identity_default(100, 1));
    }

    #[test]
    fn strips_matching_typecast_suffix() {
        assert_eq!(strip_matching_typecast("'active'::text", "text"), "'active'");
        assert_eq!(strip_matching_typecast("'active'::varchar", "text"), "'active'::varchar");
    }

    #[test]
    fn detects_unparseable_currency_default() {
        assert!(is_unparseable_currency_default("'$1,234.56'"));
        assert!(!is_unparseable_currency_default("1234.56"));
    }
}
