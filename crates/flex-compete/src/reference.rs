/// Longest reference the document format accepts.
pub const MAX_REFERENCE_LEN: usize = 40;
pub const DEFAULT_LICENCE_AREA: &str = "SPEN";

/// Build `T{yy}{mm}[{dd}]_{licence}_{name}`.
///
/// The substation name keeps only ASCII letters, digits and `_`. When the
/// result exceeds [`MAX_REFERENCE_LEN`] the name is shortened; the date
/// prefix and licence area are never cut.
pub fn sanitize_reference(
    substation: &str,
    licence_area: &str,
    year: i32,
    month: u32,
    day: Option<u32>,
) -> String {
    let name: String = substation
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let mut prefix = format!("T{:02}{:02}", year.rem_euclid(100), month);
    if let Some(day) = day {
        prefix.push_str(&format!("{day:02}"));
    }
    let head = format!("{prefix}_{licence_area}_");
    let room = MAX_REFERENCE_LEN.saturating_sub(head.len());
    let name = &name[..name.len().min(room)];
    format!("{head}{name}")
}
