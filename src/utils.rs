/// Renders one subfield token of the patient or recording identification.
/// Spaces inside the token become `_`, a missing value becomes `X`.
pub(crate) fn serialize_subfield(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.replace(' ', "_"),
        _ => "X".to_string(),
    }
}

/// Reverses [`serialize_subfield`]: `X` is a missing value, `_` is a space.
pub(crate) fn deserialize_subfield(token: &str) -> Option<String> {
    if token == "X" {
        return None;
    }
    Some(token.replace('_', " "))
}

/// One subfield token: printable ASCII without the space separator.
pub(crate) fn is_subfield_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| matches!(b, 0x21..=0x7E))
}
