//! Flexible integer parsing for `mark`/`mask`, preserving the source's
//! `strtol(s, NULL, 0)` base-detection rule: decimal, `0x`-prefixed hex,
//! and `0`-prefixed octal.

pub fn parse_value(value: &serde_yaml::Value) -> Result<u32, String> {
    match value {
        serde_yaml::Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| format!("integer out of range: {n:?}")),
        serde_yaml::Value::String(s) => parse_flexible_int(s),
        other => Err(format!("expected integer or string, found {other:?}")),
    }
}

pub fn parse_flexible_int(raw: &str) -> Result<u32, String> {
    let s = raw.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else if s.len() > 1 && s.starts_with('0') {
        u32::from_str_radix(&s[1..], 8).map_err(|e| e.to_string())
    } else {
        s.parse::<u32>().map_err(|e| e.to_string())
    }
}
