/// Next sequential code for `prefix`: one past the largest numeric suffix in
/// use, zero-padded to four digits (`EMP0001`, `PRD0042`). Codes whose suffix
/// is not a number are ignored.
pub fn next_code<'a, I>(prefix: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter_map(|code| code.strip_prefix(prefix))
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    format!("{}{:04}", prefix, max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_one() {
        assert_eq!(next_code("EMP", Vec::<&str>::new()), "EMP0001");
    }

    #[test]
    fn follows_the_largest_suffix() {
        let codes = ["PRD0003", "PRD0010", "PRD0002", "custom"];
        assert_eq!(next_code("PRD", codes.iter().copied()), "PRD0011");
    }

    #[test]
    fn grows_past_four_digits() {
        assert_eq!(next_code("EMP", ["EMP9999"].iter().copied()), "EMP10000");
    }
}
