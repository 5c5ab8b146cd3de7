/// Convert spaces to hyphens. Remove characters that aren't alphanumerics,
/// underscores, or hyphens. Convert to lowercase. Also strip leading and
/// trailing whitespace.
///
/// Non-ASCII characters are transliterated first, so `"Ünïcödé"` becomes
/// `"unicode"`. The result may be empty if `string` contains nothing
/// sluggable.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut need_dash = false;
    for ch in string.chars() {
        // `deunicode` maps control whitespace like `\n` and `\t` to nothing.
        let ascii = match ch.is_whitespace() {
            true => "-",
            false => deunicode::deunicode_char(ch).unwrap_or("-"),
        };

        for b in ascii.bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }

                    output.push(b.to_ascii_lowercase() as char);
                }
                _ => {
                    // This deviates from Django: all sequences of characters
                    // not alphanumeric or `_` or converted into one `-`.
                    need_dash = !output.is_empty();
                }
            }
        }
    }

    output
}

/// Joins `segments` onto `root` with exactly one `/` between each piece.
///
/// ```
/// use folio::util::join_url;
///
/// assert_eq!(join_url("/", ["install.html"]), "/install.html");
/// assert_eq!(join_url("/docs/", ["/a/", "b"]), "/docs/a/b");
/// assert_eq!(join_url("https://x.io", ["guide", "#top"]), "https://x.io/guide/#top");
/// ```
pub fn join_url<I, S>(root: &str, segments: I) -> String
    where I: IntoIterator<Item = S>, S: AsRef<str>
{
    let mut url = root.to_string();
    for segment in segments {
        let segment = segment.as_ref().trim_start_matches('/');
        if !url.ends_with('/') {
            url.push('/');
        }

        url.push_str(segment);
    }

    url
}
