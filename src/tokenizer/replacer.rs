use crate::pattern::SuffixFamily;
use regex::Captures;

/// Where the suffix inserted by `${suffix}` comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixSource<'a> {
    /// Group 2 starts with this search key; the suffix is whatever follows.
    SearchKey(&'a str),
    /// Search key unknown: the longest known derived-field suffix that group 2
    /// ends with.
    KnownSuffixes,
}

impl SuffixSource<'_> {
    pub fn suffix<'t>(&self, name_group: &'t str) -> &'t str {
        match self {
            SuffixSource::SearchKey(search) => name_group.get(search.len()..).unwrap_or_default(),
            SuffixSource::KnownSuffixes => SuffixFamily::ALL
                .iter()
                .flat_map(|family| family.suffixes().iter())
                .filter(|suffix| {
                    name_group.len() > suffix.len() && name_group.ends_with(*suffix)
                })
                .max_by_key(|suffix| suffix.len())
                .map_or("", |suffix| &name_group[name_group.len() - suffix.len()..]),
        }
    }
}

/// Expand a replacement template against one match.
///
/// `$N` and `${N}` insert capture group N (empty when it did not
/// participate), `${suffix}` inserts the suffix trailing the name in group 2,
/// `$$` inserts a literal `$`. Any other `$` is kept as is.
pub fn expand_template(template: &str, caps: &Captures<'_>, source: SuffixSource<'_>) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        if let Some(braced) = after.strip_prefix('{') {
            if let Some(close) = braced.find('}') {
                let name = &braced[..close];
                if name == "suffix" {
                    let group = caps.get(2).map_or("", |m| m.as_str());
                    out.push_str(source.suffix(group));
                    rest = &braced[close + 1..];
                    continue;
                }
                if let Ok(index) = name.parse::<usize>() {
                    out.push_str(caps.get(index).map_or("", |m| m.as_str()));
                    rest = &braced[close + 1..];
                    continue;
                }
            }
            out.push('$');
            rest = after;
            continue;
        }

        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 {
            if let Ok(index) = after[..digits].parse::<usize>() {
                out.push_str(caps.get(index).map_or("", |m| m.as_str()));
            }
            rest = &after[digits..];
            continue;
        }

        out.push('$');
        rest = after;
    }

    out.push_str(rest);
    out
}
