// Systemd unit-name escaping and template instantiation.
//
// The escaping rules are the ones documented under "STRING ESCAPING FOR
// INCLUSION IN UNIT NAMES" in systemd.unit(5): bytes outside [A-Za-z0-9:_.]
// become C-style \xHH escapes on the raw byte, a leading '.' is escaped,
// and '/' maps to '-'.

use anyhow::{Result, anyhow};

/// Escapes an arbitrary string for use as a unit instance name.
/// Matches `systemd-escape` with no flags.
pub fn escape(s: &str) -> String {
    s.bytes()
        .enumerate()
        .map(|(n, b)| {
            let c = char::from(b);
            match c {
                '/' => '-'.to_string(),
                ':' | '_' | '0'..='9' | 'a'..='z' | 'A'..='Z' => c.to_string(),
                '.' if n > 0 => c.to_string(),
                _ => format!(r"\x{b:02x}"),
            }
        })
        .collect()
}

/// Escapes a filesystem path for use as a unit instance name.
/// Matches `systemd-escape --path`: leading/trailing/duplicate slashes are
/// dropped before escaping, and the root path becomes "-".
pub fn path_escape(path: &str) -> String {
    let cleaned: Vec<&str> = path.split('/').filter(|seg| !seg.is_empty()).collect();
    if cleaned.is_empty() {
        return "-".to_string();
    }
    escape(&cleaned.join("/"))
}

/// Undoes [`path_escape`], turning an instance name discovered from the
/// manager back into an absolute path.
pub fn path_unescape(s: &str) -> String {
    if s == "-" {
        return "/".to_string();
    }

    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len() + 1);
    out.push(b'/');

    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'-' => {
                out.push(b'/');
                i += 1;
            }
            b'\\'
                if bytes.len() >= i + 4
                    && bytes[i + 1] == b'x'
                    && bytes[i + 2].is_ascii_hexdigit()
                    && bytes[i + 3].is_ascii_hexdigit() =>
            {
                // Cannot fail, both digits were just checked.
                let b = u8::from_str_radix(&s[i + 2..i + 4], 16).unwrap_or_default();
                out.push(b);
                i += 4;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Instantiates a unit template name with an already-escaped instance,
/// e.g. ("onedriver@.service", "mnt-x") -> "onedriver@mnt-x.service".
pub fn template_unit(template: &str, instance: &str) -> Result<String> {
    let at = template
        .find('@')
        .ok_or_else(|| anyhow!("template \"{template}\" has no @ instantiation marker"))?;
    Ok(format!(
        "{}{}{}",
        &template[..=at],
        instance,
        &template[at + 1..]
    ))
}

/// Extracts the instance segment back out of a concrete unit name, if the
/// unit is an instantiation of the given template.
pub fn unit_instance(unit: &str, template: &str) -> Option<String> {
    let at = template.find('@')?;
    let prefix = &template[..=at];
    let suffix = &template[at + 1..];
    let middle = unit.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if middle.is_empty() {
        return None;
    }
    Some(middle.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_is_identity_on_safe_strings() {
        for s in ["", "abc", "ABC:xyz_0.9", "unit.instance_1"] {
            assert_eq!(escape(s), s);
        }
    }

    #[test]
    fn escape_replaces_slashes_and_leading_dot() {
        assert_eq!(escape("/mnt/x"), "-mnt-x");
        assert_eq!(escape(".hidden"), r"\x2ehidden");
        assert!(!escape("a/b/c").contains('/'));
    }

    #[test]
    fn escape_hex_encodes_everything_else() {
        assert_eq!(escape("my mount"), r"my\x20mount");
        assert_eq!(escape("a-b"), r"a\x2db");
        // multi-byte characters escape byte by byte
        assert_eq!(escape("é"), r"\xc3\xa9");
    }

    #[test]
    fn escape_is_deterministic() {
        let input = "/home/user/My Drive";
        assert_eq!(escape(input), escape(input));
    }

    #[test]
    fn path_escape_trims_and_collapses() {
        assert_eq!(path_escape("/home/user/OneDrive"), "home-user-OneDrive");
        assert_eq!(path_escape("//mnt///x/"), "mnt-x");
        assert_eq!(path_escape("/"), "-");
        assert_eq!(path_escape(""), "-");
    }

    #[test]
    fn path_unescape_inverts_path_escape() {
        for path in ["/home/user/OneDrive", "/mnt/my drive", "/"] {
            assert_eq!(path_unescape(&path_escape(path)), path);
        }
    }

    #[test]
    fn template_inserts_instance_at_marker() {
        assert_eq!(
            template_unit("onedriver@.service", &escape("/mnt/x")).unwrap(),
            "onedriver@-mnt-x.service"
        );
        assert_eq!(
            template_unit("onedriver@.service", &escape("my mount")).unwrap(),
            r"onedriver@my\x20mount.service"
        );
    }

    #[test]
    fn template_without_marker_is_an_error() {
        assert!(template_unit("onedriver.service", "x").is_err());
    }

    #[test]
    fn instance_roundtrips_through_template() {
        let unit = template_unit("onedriver@.service", "home-user-OneDrive").unwrap();
        assert_eq!(
            unit_instance(&unit, "onedriver@.service").as_deref(),
            Some("home-user-OneDrive")
        );
        assert_eq!(unit_instance("other@x.service", "onedriver@.service"), None);
        assert_eq!(
            unit_instance("onedriver@.service", "onedriver@.service"),
            None
        );
    }
}
