//! Output file naming.
//!
//! When a recovered file would land on an existing, different file, a
//! counter is inserted before the last extension: `name.1.ext`,
//! `name.2.ext`, ... Leading dots do not start an extension, so
//! `.env` becomes `.env.1`.

/// Split a file name into stem and extension (extension includes the dot)
pub fn split_extension(name: &str) -> (&str, &str) {
    let leading_dots = name.len() - name.trim_start_matches('.').len();
    match name[leading_dots..].rfind('.') {
        Some(idx) => name.split_at(leading_dots + idx),
        None => (name, ""),
    }
}

/// The `n`-th alternative for `name`; `n == 0` is the name itself
pub fn disambiguated_name(name: &str, n: usize) -> String {
    if n == 0 {
        return name.to_string();
    }
    let (stem, ext) = split_extension(name);
    format!("{}.{}{}", stem, n, ext)
}

/// Successive candidate names: `name`, `name.1.ext`, `name.2.ext`, ...
pub fn candidate_names(name: &str) -> impl Iterator<Item = String> + '_ {
    (0..).map(move |n| disambiguated_name(name, n))
}
