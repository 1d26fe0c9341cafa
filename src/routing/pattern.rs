//! URL rule compilation and path matching.
//!
//! A rule is an ordered sequence of literal segments and typed
//! placeholders written as `<name>`, `<int:name>`, `<float:name>` or
//! `<path:name>`. Each placeholder type defines a matching predicate, a
//! conversion to a typed value and a rendering check for reverse lookup.

use std::collections::BTreeMap;

/// The closed set of placeholder types a rule may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// Any non-empty text without a slash. The default.
    Str,
    /// Decimal digits, converted to `i64`.
    Int,
    /// Digits with a decimal point, converted to `f64`.
    Float,
    /// Greedy: any non-empty text, slashes included.
    Path,
}

impl PlaceholderKind {
    fn parse(tag: &str) -> Option<Self> {
        match tag {
            "string" => Some(Self::Str),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "path" => Some(Self::Path),
            _ => None,
        }
    }

    /// Convert raw path text into a typed value, or reject it.
    pub fn convert(self, raw: &str) -> Option<ParamValue> {
        if raw.is_empty() {
            return None;
        }
        match self {
            Self::Str => {
                (!raw.contains('/')).then(|| ParamValue::Str(raw.to_string()))
            }
            Self::Int => {
                if !raw.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                raw.parse::<i64>().ok().map(ParamValue::Int)
            }
            Self::Float => {
                let shape_ok = raw.bytes().all(|b| b.is_ascii_digit() || b == b'.')
                    && raw.bytes().filter(|b| *b == b'.').count() == 1
                    && !raw.starts_with('.')
                    && !raw.ends_with('.');
                if !shape_ok {
                    return None;
                }
                raw.parse::<f64>().ok().map(ParamValue::Float)
            }
            Self::Path => Some(ParamValue::Str(raw.to_string())),
        }
    }

    /// Whether a caller-supplied value is renderable for this placeholder
    /// in reverse lookup.
    pub fn accepts(self, value: &str) -> bool {
        self.convert(value).is_some()
    }
}

/// A typed, extracted path parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Rendering for reverse URL construction.
    pub fn render(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
        }
    }
}

/// Extracted path parameters, passed to handlers as named arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathArgs(BTreeMap<String, ParamValue>);

impl PathArgs {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(ParamValue::as_str)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(ParamValue::as_int)
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(ParamValue::as_float)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }
}

/// One compiled rule segment.
#[derive(Debug, Clone)]
pub enum Segment {
    Literal(String),
    Placeholder { name: String, kind: PlaceholderKind },
}

/// A compiled URL rule.
///
/// A rule ending in `/` requires the incoming path to carry the trailing
/// slash; a GET/HEAD request without it is redirected to the canonical
/// form. A rule not ending in `/` rejects paths that carry one.
#[derive(Debug, Clone)]
pub struct Pattern {
    rule: String,
    segments: Vec<Segment>,
    trailing_slash: bool,
}

impl Pattern {
    /// Compile a rule string into segments.
    pub fn compile(rule: &str) -> Result<Self, String> {
        if !rule.starts_with('/') {
            return Err(format!("URL rule {rule:?} must start with a slash"));
        }
        if rule == "/" {
            return Ok(Self {
                rule: rule.to_string(),
                segments: Vec::new(),
                trailing_slash: false,
            });
        }

        let trailing_slash = rule.ends_with('/');
        let inner = rule.trim_start_matches('/').trim_end_matches('/');
        let mut segments = Vec::new();
        let mut seen = Vec::new();

        for piece in inner.split('/') {
            if piece.is_empty() {
                return Err(format!("URL rule {rule:?} contains an empty segment"));
            }
            if let Some(marker) = piece.strip_prefix('<').and_then(|p| p.strip_suffix('>')) {
                let (kind, name) = match marker.split_once(':') {
                    Some((tag, name)) => {
                        let kind = PlaceholderKind::parse(tag)
                            .ok_or_else(|| format!("unknown placeholder type {tag:?} in {rule:?}"))?;
                        (kind, name)
                    }
                    None => (PlaceholderKind::Str, marker),
                };
                if name.is_empty() {
                    return Err(format!("placeholder without a name in {rule:?}"));
                }
                if seen.contains(&name.to_string()) {
                    return Err(format!("duplicate placeholder {name:?} in {rule:?}"));
                }
                seen.push(name.to_string());
                segments.push(Segment::Placeholder {
                    name: name.to_string(),
                    kind,
                });
            } else if piece.contains('<') || piece.contains('>') {
                return Err(format!("malformed placeholder in segment {piece:?} of {rule:?}"));
            } else {
                segments.push(Segment::Literal(piece.to_string()));
            }
        }

        Ok(Self {
            rule: rule.to_string(),
            segments,
            trailing_slash,
        })
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn trailing_slash(&self) -> bool {
        self.trailing_slash
    }

    pub fn placeholder_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Placeholder { .. }))
            .count()
    }

    pub fn literal_count(&self) -> usize {
        self.segments.len() - self.placeholder_count()
    }

    /// Match an incoming path against this rule, extracting typed
    /// parameters. Trailing-slash expectations must line up exactly;
    /// canonicalization redirects are the matcher's concern.
    pub fn match_path(&self, path: &str) -> Option<PathArgs> {
        if !path.starts_with('/') {
            return None;
        }
        if self.rule == "/" {
            return (path == "/").then(PathArgs::new);
        }
        let has_trailing = path.len() > 1 && path.ends_with('/');
        if has_trailing != self.trailing_slash {
            return None;
        }

        let inner = path.trim_start_matches('/').trim_end_matches('/');
        if inner.is_empty() {
            return None;
        }
        let parts: Vec<&str> = inner.split('/').collect();

        let mut args = PathArgs::new();
        let mut pos = 0;
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => {
                    if parts.get(pos).copied() != Some(literal.as_str()) {
                        return None;
                    }
                    pos += 1;
                }
                Segment::Placeholder { name, kind } => {
                    if *kind == PlaceholderKind::Path {
                        // Greedy: consume everything not claimed by the
                        // segments that follow.
                        let rest = self.segments.len() - index - 1;
                        if parts.len() < pos + 1 + rest {
                            return None;
                        }
                        let take = parts.len() - rest - pos;
                        let value = parts[pos..pos + take].join("/");
                        args.insert(name, ParamValue::Str(value));
                        pos += take;
                    } else {
                        let part = parts.get(pos)?;
                        let value = kind.convert(part)?;
                        args.insert(name, value);
                        pos += 1;
                    }
                }
            }
        }

        (pos == parts.len()).then_some(args)
    }
}
