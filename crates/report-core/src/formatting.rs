/// Render a minute count the way the report expects it.
///
/// # Examples
///
/// ```
/// use report_core::formatting::format_minutes;
///
/// assert_eq!(format_minutes(75), "75 min.");
/// assert_eq!(format_minutes(0), "0 min.");
/// ```
pub fn format_minutes(minutes: u64) -> String {
    format!("{} min.", minutes)
}

/// Join already-ordered items with `separator`.
///
/// # Examples
///
/// ```
/// use report_core::formatting::join_with;
///
/// assert_eq!(join_with(["CHROME 2", "SAFARI 1"], ","), "CHROME 2,SAFARI 1");
/// assert_eq!(join_with(Vec::<String>::new(), ", "), "");
/// ```
pub fn join_with<I, S>(items: I, separator: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        out.push_str(item.as_ref());
    }
    out
}

/// Sort a copy of `items` ascending (duplicates kept) and join with `", "`.
///
/// # Examples
///
/// ```
/// use report_core::formatting::sorted_listing;
///
/// let browsers = vec!["SAFARI 1".to_string(), "CHROME 2".to_string(), "CHROME 2".to_string()];
/// assert_eq!(sorted_listing(&browsers), "CHROME 2, CHROME 2, SAFARI 1");
/// ```
pub fn sorted_listing(items: &[String]) -> String {
    let mut sorted: Vec<&str> = items.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    join_with(sorted, ", ")
}
