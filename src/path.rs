use serde_json::{Map, Value};

/// One step through a nested value: an object key or an array index.
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Splits a dot-and-bracket path into its segments.
///
/// `"a.b[0].c"` becomes `Key("a"), Key("b"), Index(0), Key("c")`. Returns
/// `None` for anything that does not scan cleanly (empty segment, unclosed
/// bracket, non-numeric index); callers treat that the same as an absent
/// path.
fn parse(path: &str) -> Option<Vec<Segment<'_>>> {
    let mut segments = Vec::new();

    for part in path.split('.') {
        let bracket = part.find('[').unwrap_or(part.len());
        let key = &part[..bracket];

        if key.is_empty() {
            if bracket == part.len() {
                return None;
            }
        } else {
            segments.push(Segment::Key(key));
        }

        let mut rest = &part[bracket..];
        while let Some(inner) = rest.strip_prefix('[') {
            let close = inner.find(']')?;
            let index = inner[..close].parse::<usize>().ok()?;
            segments.push(Segment::Index(index));
            rest = &inner[close + 1..];
        }

        if !rest.is_empty() {
            return None;
        }
    }

    Some(segments)
}

fn walk<'a, 'p, I>(mut current: &'a Value, segments: I) -> Option<&'a Value>
where
    I: IntoIterator<Item = Segment<'p>>,
{
    for segment in segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key)?,
            (Segment::Index(index), Value::Array(array)) => array.get(index)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Resolves `path` against an arbitrary value.
///
/// Returns `None` when any segment is absent, indexes the wrong shape, or
/// is out of range. Never panics, regardless of how mangled the path is.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse(path)?;
    walk(root, segments)
}

/// Resolves `path` rooted at a top-level state mapping.
///
/// The first segment must be an object key; a leading bracket index cannot
/// match a mapping and resolves to `None`.
pub fn resolve_in<'a>(state: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = parse(path)?.into_iter();

    let current = match segments.next()? {
        Segment::Key(key) => state.get(key)?,
        Segment::Index(_) => return None,
    };

    walk(current, segments)
}
