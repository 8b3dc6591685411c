//! A1-notation helpers.

/// Column letter for a zero-based column index (`0` → `A`, `26` → `AA`).
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Prefix `range` with a quoted worksheet title (`'My Tab'!A1:B2`).
pub fn sheet_range(worksheet: &str, range: &str) -> String {
    format!("'{}'!{range}", worksheet.replace('\'', "''"))
}
