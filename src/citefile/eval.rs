//! Evaluation of parsed citation statements into bibliographic entries.

use super::parser::{Arg, Expr, ExprKind, Stmt};
use super::{Meta, ParseError};
use crate::entry::{BibEntry, EntryType, FieldValue, Person};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]*)>").expect("email pattern is valid"));
static ROLES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]").expect("role pattern is valid"));
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]*)\)").expect("comment pattern is valid"));
static AND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+and\s+").expect("separator pattern is valid"));

/// Positional parameter order of `person()`.
const PERSON_PARAMS: &[&str] = &["given", "family", "middle", "email", "role", "comment"];

/// Positional parameter order of `sub()` and `gsub()`.
const SUB_PARAMS: &[&str] = &["pattern", "replacement", "x", "ignore.case", "perl", "fixed"];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Null,
    Logical(bool),
    Number { value: f64, integer: bool },
    Text(String),
    /// Result of `c()` over scalars.
    Vector(Vec<Value>),
    /// Result of `c()` with named elements, e.g. `c(ORCID = "...")`.
    Named(BTreeMap<String, String>),
    People(Vec<Person>),
    Entries(Vec<BibEntry>),
    Meta,
}

impl Value {
    fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Logical(_) | Value::Number { .. } | Value::Text(_) | Value::Vector(_)
        )
    }

    /// All scalar elements as strings; empty for `NULL`.
    fn texts(&self) -> Vec<String> {
        match self {
            Value::Null => Vec::new(),
            Value::Logical(b) => vec![if *b { "TRUE" } else { "FALSE" }.to_string()],
            Value::Number { value, .. } => vec![format_number(*value)],
            Value::Text(s) => vec![s.clone()],
            Value::Vector(items) => items.iter().flat_map(Value::texts).collect(),
            Value::Named(map) => map.values().cloned().collect(),
            Value::People(_) | Value::Entries(_) | Value::Meta => Vec::new(),
        }
    }

    /// The scalar elements of a vector, or the value itself.
    fn elements(&self) -> Vec<Value> {
        match self {
            Value::Null => Vec::new(),
            Value::Vector(items) => items.clone(),
            Value::Named(map) => map.values().cloned().map(Value::Text).collect(),
            other => vec![other.clone()],
        }
    }

    fn is_true(&self) -> bool {
        matches!(self, Value::Logical(true))
    }

    /// The first non-blank element, for fields that hold a single value.
    fn first_text(&self) -> Option<String> {
        self.texts().into_iter().find(|t| !t.trim().is_empty())
    }

    /// The value as a single string, elements joined by a space.
    fn text(&self) -> Option<String> {
        let texts = self.texts();
        let joined = texts.join(" ");
        if joined.trim().is_empty() {
            None
        } else {
            Some(joined)
        }
    }

    fn field(&self) -> Option<FieldValue> {
        match self {
            Value::Number { value, integer }
                if (*integer || value.fract() == 0.0) && value.abs() < 1e15 =>
            {
                Some(FieldValue::Integer(*value as i64))
            }
            other => other.text().and_then(FieldValue::text),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

pub(crate) struct Evaluator<'m> {
    meta: &'m Meta,
    env: HashMap<String, Value>,
}

impl<'m> Evaluator<'m> {
    pub(crate) fn new(meta: &'m Meta) -> Self {
        Evaluator {
            meta,
            env: HashMap::new(),
        }
    }

    /// Runs all statements, collecting every entry a top-level statement yields.
    pub(crate) fn run(&mut self, statements: &[Stmt]) -> Result<Vec<BibEntry>, ParseError> {
        let mut entries = Vec::new();

        for stmt in statements {
            let value = match stmt {
                Stmt::Assign { name, value } => {
                    let value = self.eval(value)?;
                    self.env.insert(name.clone(), value.clone());
                    value
                }
                Stmt::Expr(expr) => self.eval(expr)?,
            };
            if let Value::Entries(found) = value {
                entries.extend(found);
            }
        }

        Ok(entries)
    }

    pub(crate) fn eval(&self, expr: &Expr) -> Result<Value, ParseError> {
        match &expr.kind {
            ExprKind::Str(s) => Ok(Value::Text(s.clone())),
            ExprKind::Num { value, integer } => Ok(Value::Number {
                value: *value,
                integer: *integer,
            }),
            ExprKind::Ident(name) => self.lookup(name, expr.line),
            ExprKind::Member { target, field } => match self.eval(target)? {
                Value::Meta => Ok(self
                    .meta
                    .get(field)
                    .map_or(Value::Null, |v| Value::Text(v.clone()))),
                Value::Null => Ok(Value::Null),
                _ => Err(ParseError::InvalidArgument {
                    line: expr.line,
                    function: "$".to_string(),
                    message: format!("cannot extract '{}' from this object", field),
                }),
            },
            ExprKind::Call { name, args } => self.call(name, args, expr.line),
        }
    }

    fn lookup(&self, name: &str, line: usize) -> Result<Value, ParseError> {
        match name {
            "TRUE" | "T" => Ok(Value::Logical(true)),
            "FALSE" | "F" => Ok(Value::Logical(false)),
            "NULL" | "NA" => Ok(Value::Null),
            "meta" => Ok(Value::Meta),
            _ => self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| ParseError::UnknownVariable {
                    line,
                    name: name.to_string(),
                }),
        }
    }

    fn call(&self, name: &str, args: &[Arg], line: usize) -> Result<Value, ParseError> {
        match name {
            "bibentry" => self.bibentry(name, "bibtype", args, line),
            "citEntry" => self.bibentry(name, "entry", args, line),
            "citHeader" | "citFooter" => {
                self.eval_args(args)?;
                Ok(Value::Null)
            }
            "person" => self.person(args, line),
            "as.person" => {
                let people = self
                    .eval_args(args)?
                    .iter()
                    .flat_map(|(_, v)| v.texts())
                    .flat_map(|text| parse_person_text(&text))
                    .collect();
                Ok(Value::People(people))
            }
            "c" => combine(self.eval_args(args)?, line),
            "paste" | "paste0" => {
                let default_sep = if name == "paste" { " " } else { "" };
                let mut sep = default_sep.to_string();
                let mut parts = Vec::new();
                for (arg_name, value) in self.eval_args(args)? {
                    match arg_name.as_deref() {
                        Some("sep") => sep = value.texts().concat(),
                        Some("collapse") => {}
                        _ => parts.extend(value.texts()),
                    }
                }
                Ok(Value::Text(parts.join(&sep)))
            }
            "sub" | "gsub" => self.substitute(name, args, line),
            "sprintf" => self.sprintf(args, line),
            "format" => self.format(args),
            "I" => match args {
                [arg] => self.eval(&arg.value),
                _ => Err(ParseError::InvalidArgument {
                    line,
                    function: "I".to_string(),
                    message: "expected exactly one argument".to_string(),
                }),
            },
            "citation" if args.iter().any(|a| a.name.as_deref() == Some("auto")) => {
                Err(ParseError::SelfReferentialCitation { line })
            }
            _ => Err(ParseError::UnknownFunction {
                line,
                name: name.to_string(),
            }),
        }
    }

    fn eval_args(&self, args: &[Arg]) -> Result<Vec<(Option<String>, Value)>, ParseError> {
        args.iter()
            .map(|arg| Ok((arg.name.clone(), self.eval(&arg.value)?)))
            .collect()
    }

    /// `bibentry(bibtype, ...)` and `citEntry(entry, ...)`.
    fn bibentry(
        &self,
        function: &str,
        type_param: &str,
        args: &[Arg],
        line: usize,
    ) -> Result<Value, ParseError> {
        let mut bibtype = None;
        let mut fields = Vec::new();

        for (name, value) in self.eval_args(args)? {
            match name {
                Some(n) if n == type_param => bibtype = Some(value),
                None if bibtype.is_none() => bibtype = Some(value),
                Some(n) => fields.push((n.to_lowercase(), value)),
                None => {}
            }
        }

        let bibtype = bibtype
            .and_then(|v| v.text())
            .ok_or_else(|| ParseError::InvalidArgument {
                line,
                function: function.to_string(),
                message: format!("argument '{}' is missing", type_param),
            })?;
        let entry_type = EntryType::from_bibtype(&bibtype)
            .map_err(|source| ParseError::EntryType { line, source })?;

        let mut entry = BibEntry::new(entry_type);
        // textVersion, header, footer, key and unknown fields are dropped
        for (name, value) in fields {
            match name.as_str() {
                "title" => entry.title = value.text(),
                "author" => entry.author = people_of(value),
                "year" => entry.year = value.field(),
                "doi" => entry.doi = value.first_text(),
                "url" => entry.url = value.first_text().and_then(|urls| first_url(&urls)),
                "note" => entry.note = value.text(),
                "pages" => entry.pages = value.field(),
                "journal" => entry.journal = value.text(),
                "volume" => entry.volume = value.field(),
                "number" => entry.number = value.field(),
                _ => {}
            }
        }

        Ok(Value::Entries(vec![entry]))
    }

    /// `person(given, family, middle, email, role, comment, first, last)`.
    fn person(&self, args: &[Arg], line: usize) -> Result<Value, ParseError> {
        let named = self.bind_args("person", PERSON_PARAMS, args, line)?;

        let take = |key: &str| named.get(key).cloned().unwrap_or(Value::Null);

        let mut given = take("given").texts();
        given.extend(take("first").texts());
        given.extend(take("middle").texts());
        let family = take("family").text().or_else(|| take("last").text());

        let comment = match take("comment") {
            Value::Named(map) => map,
            Value::Null => BTreeMap::new(),
            other => other
                .text()
                .map(|text| BTreeMap::from([(String::new(), text)]))
                .unwrap_or_default(),
        };

        if given.is_empty() && family.is_none() {
            return Ok(Value::People(Vec::new()));
        }

        Ok(Value::People(vec![Person {
            given,
            family,
            email: take("email").text(),
            role: take("role").texts(),
            comment,
        }]))
    }

    /// Evaluates arguments, binding unnamed ones to the `params` not given by name.
    fn bind_args(
        &self,
        function: &str,
        params: &[&str],
        args: &[Arg],
        line: usize,
    ) -> Result<HashMap<String, Value>, ParseError> {
        let mut bound: HashMap<String, Value> = HashMap::new();
        let mut unnamed = Vec::new();
        for (name, value) in self.eval_args(args)? {
            match name {
                Some(name) => {
                    bound.insert(name, value);
                }
                None => unnamed.push(value),
            }
        }

        let free: Vec<&str> = params
            .iter()
            .copied()
            .filter(|p| !bound.contains_key(*p))
            .collect();
        if unnamed.len() > free.len() {
            return Err(ParseError::InvalidArgument {
                line,
                function: function.to_string(),
                message: "too many unnamed arguments".to_string(),
            });
        }
        for (param, value) in free.into_iter().zip(unnamed) {
            bound.insert(param.to_string(), value);
        }
        Ok(bound)
    }

    /// `sub(pattern, replacement, x)` and `gsub(...)`, honouring `fixed` and
    /// `ignore.case`.
    fn substitute(&self, function: &str, args: &[Arg], line: usize) -> Result<Value, ParseError> {
        let bound = self.bind_args(function, SUB_PARAMS, args, line)?;
        let invalid = |message: String| ParseError::InvalidArgument {
            line,
            function: function.to_string(),
            message,
        };
        let required = |key: &str| {
            bound
                .get(key)
                .and_then(|v| v.texts().into_iter().next())
                .ok_or_else(|| invalid(format!("argument '{}' is missing", key)))
        };
        let flag = |key: &str| bound.get(key).is_some_and(Value::is_true);

        let pattern = required("pattern")?;
        let replacement = required("replacement")?;
        let Some(x) = bound.get("x") else {
            return Err(invalid("argument 'x' is missing".to_string()));
        };

        let fixed = flag("fixed");
        let mut source = if fixed {
            regex::escape(&pattern)
        } else {
            pattern.clone()
        };
        if flag("ignore.case") {
            source.insert_str(0, "(?i)");
        }
        let re = Regex::new(&source)
            .map_err(|e| invalid(format!("invalid regular expression '{}': {}", pattern, e)))?;
        let replacement = if fixed {
            replacement.replace('$', "$$")
        } else {
            r_replacement(&replacement)
        };

        let replaced = x
            .texts()
            .iter()
            .map(|text| {
                if function == "gsub" {
                    re.replace_all(text, replacement.as_str()).into_owned()
                } else {
                    re.replace(text, replacement.as_str()).into_owned()
                }
            })
            .collect();
        Ok(strings(replaced))
    }

    /// `sprintf(fmt, ...)`, recycling shorter arguments like R does.
    fn sprintf(&self, args: &[Arg], line: usize) -> Result<Value, ParseError> {
        let invalid = |message: String| ParseError::InvalidArgument {
            line,
            function: "sprintf".to_string(),
            message,
        };

        let mut fmt = None;
        let mut values = Vec::new();
        for (name, value) in self.eval_args(args)? {
            match name.as_deref() {
                Some("fmt") => fmt = Some(value),
                None if fmt.is_none() => fmt = Some(value),
                _ => values.push(value.elements()),
            }
        }

        let formats = fmt
            .map(|f| f.texts())
            .filter(|f| !f.is_empty())
            .ok_or_else(|| invalid("argument 'fmt' is missing".to_string()))?;
        if values.iter().any(Vec::is_empty) {
            return Ok(Value::Null);
        }

        let rows = values
            .iter()
            .map(Vec::len)
            .chain([formats.len()])
            .max()
            .unwrap_or(0);
        let formatted = (0..rows)
            .map(|i| {
                let row: Vec<&Value> = values.iter().map(|v| &v[i % v.len()]).collect();
                sprintf_one(&formats[i % formats.len()], &row).map_err(invalid)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(strings(formatted))
    }

    /// `format(x, ...)`: the elements of `x` as text. Formatting options are ignored.
    fn format(&self, args: &[Arg]) -> Result<Value, ParseError> {
        let evaluated = self.eval_args(args)?;
        let x = evaluated
            .iter()
            .find(|(name, _)| name.as_deref() == Some("x"))
            .or_else(|| evaluated.iter().find(|(name, _)| name.is_none()));
        Ok(x.map_or(Value::Null, |(_, value)| strings(value.texts())))
    }
}

/// One string as `Text`, several as a `Vector`, none as `NULL`.
fn strings(mut texts: Vec<String>) -> Value {
    match texts.len() {
        0 => Value::Null,
        1 => Value::Text(texts.remove(0)),
        _ => Value::Vector(texts.into_iter().map(Value::Text).collect()),
    }
}

/// Rewrites an R replacement string, where `\\1` is a backreference, into
/// `regex` syntax.
fn r_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(d) if d.is_ascii_digit() => {
                    out.push_str("${");
                    out.push(d);
                    out.push('}');
                }
                Some('$') => out.push_str("$$"),
                Some(other) => out.push(other),
                None => {}
            },
            '$' => out.push_str("$$"),
            c => out.push(c),
        }
    }
    out
}

/// Formats one row of `sprintf` arguments. Supports `%s`, `%d`, `%i`, `%f`
/// and `%%`, with `-`, `0` and `+` flags, width and precision.
fn sprintf_one(fmt: &str, args: &[&Value]) -> Result<String, String> {
    let mut out = String::new();
    let mut next_arg = args.iter().copied();
    let mut chars = fmt.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.next_if_eq(&'%').is_some() {
            out.push('%');
            continue;
        }

        let mut flags = String::new();
        while let Some(f) = chars.next_if(|c| matches!(c, '-' | '0' | '+' | ' ')) {
            flags.push(f);
        }
        let mut width = String::new();
        while let Some(d) = chars.next_if(char::is_ascii_digit) {
            width.push(d);
        }
        let mut precision = None;
        if chars.next_if_eq(&'.').is_some() {
            let mut digits = String::new();
            while let Some(d) = chars.next_if(char::is_ascii_digit) {
                digits.push(d);
            }
            precision = Some(digits.parse::<usize>().unwrap_or(0));
        }

        let conversion = chars
            .next()
            .ok_or_else(|| format!("unrecognised format specification '{}'", fmt))?;
        let value = next_arg
            .next()
            .ok_or_else(|| "too few arguments".to_string())?;

        let body = match (conversion, value) {
            ('s', value) => {
                let text = value.texts().join(" ");
                match precision {
                    Some(p) => text.chars().take(p).collect(),
                    None => text,
                }
            }
            ('d' | 'i', Value::Number { value, .. }) if value.fract() == 0.0 => {
                format!("{}", *value as i64)
            }
            ('d' | 'i', Value::Logical(b)) => u8::from(*b).to_string(),
            ('f', Value::Number { value, .. }) => format!("{:.*}", precision.unwrap_or(6), value),
            ('d' | 'i' | 'f', _) => {
                return Err(format!(
                    "invalid format '%{}'; use format %s for character objects",
                    conversion
                ))
            }
            (other, _) => return Err(format!("unrecognised format specification '%{}'", other)),
        };

        let numeric = conversion != 's';
        let body = if numeric && flags.contains('+') && !body.starts_with('-') {
            format!("+{}", body)
        } else {
            body
        };
        let width: usize = width.parse().unwrap_or(0);
        let fill = width.saturating_sub(body.chars().count());
        if flags.contains('-') {
            out.push_str(&body);
            out.extend(std::iter::repeat(' ').take(fill));
        } else if numeric && flags.contains('0') {
            let (sign, digits) = body.split_at(usize::from(body.starts_with(['-', '+'])));
            out.push_str(sign);
            out.extend(std::iter::repeat('0').take(fill));
            out.push_str(digits);
        } else {
            out.extend(std::iter::repeat(' ').take(fill));
            out.push_str(&body);
        }
    }

    Ok(out)
}

/// The first address in a URL field, which may list several.
fn first_url(urls: &str) -> Option<String> {
    urls.split(|c: char| c == ',' || c.is_whitespace())
        .find(|u| !u.is_empty())
        .map(String::from)
}

/// `c(...)`: concatenates people, entries, scalars, or builds a named vector.
fn combine(values: Vec<(Option<String>, Value)>, line: usize) -> Result<Value, ParseError> {
    let values: Vec<_> = values
        .into_iter()
        .filter(|(_, v)| *v != Value::Null)
        .collect();
    let mismatch = || ParseError::InvalidArgument {
        line,
        function: "c".to_string(),
        message: "cannot combine these values".to_string(),
    };

    if values.is_empty() {
        return Ok(Value::Null);
    }

    if values.iter().any(|(name, _)| name.is_some()) {
        let mut map = BTreeMap::new();
        for (name, value) in values {
            let (Some(name), Some(text)) = (name, value.text()) else {
                return Err(mismatch());
            };
            map.insert(name, text);
        }
        return Ok(Value::Named(map));
    }

    let values: Vec<Value> = values.into_iter().map(|(_, v)| v).collect();

    if matches!(values[0], Value::People(_)) {
        let mut people = Vec::new();
        for value in values {
            let Value::People(more) = value else {
                return Err(mismatch());
            };
            people.extend(more);
        }
        Ok(Value::People(people))
    } else if matches!(values[0], Value::Entries(_)) {
        let mut entries = Vec::new();
        for value in values {
            let Value::Entries(more) = value else {
                return Err(mismatch());
            };
            entries.extend(more);
        }
        Ok(Value::Entries(entries))
    } else if values.iter().all(Value::is_scalar) {
        let mut flat = Vec::new();
        for value in values {
            match value {
                Value::Vector(items) => flat.extend(items),
                scalar => flat.push(scalar),
            }
        }
        Ok(Value::Vector(flat))
    } else {
        Err(mismatch())
    }
}

/// Converts an `author` field value to people; strings go through [`parse_person_text`].
fn people_of(value: Value) -> Vec<Person> {
    match value {
        Value::People(people) => people,
        other => other
            .texts()
            .iter()
            .flat_map(|text| parse_person_text(text))
            .collect(),
    }
}

/// Parses `"Given Family <email> [role, role] (comment) and ..."` into people.
///
/// A name wrapped in braces, e.g. `{R Core Team}`, is kept whole as an
/// organization name.
pub(crate) fn parse_person_text(text: &str) -> Vec<Person> {
    split_names(text, false)
        .into_iter()
        .filter_map(person_from_text)
        .collect()
}

/// Splits a list of names at ` and `, and also at commas and newlines when
/// `commas` is set. Separators inside `[...]`, `(...)`, `<...>` or `{...}`
/// belong to the annotation and do not split.
pub(crate) fn split_names(text: &str, commas: bool) -> Vec<&str> {
    let mut top_level = vec![false; text.len()];
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '[' | '(' | '<' | '{' => {
                top_level[i] = depth == 0;
                depth += 1;
            }
            ']' | ')' | '>' | '}' => {
                depth = depth.saturating_sub(1);
                top_level[i] = depth == 0;
            }
            _ => top_level[i] = depth == 0,
        }
    }

    let mut separators: Vec<(usize, usize)> = AND
        .find_iter(text)
        .filter(|m| top_level[m.start()])
        .map(|m| (m.start(), m.end()))
        .collect();
    if commas {
        separators.extend(
            text.char_indices()
                .filter(|&(i, c)| (c == ',' || c == '\n') && top_level[i])
                .map(|(i, _)| (i, i + 1)),
        );
    }
    separators.sort_unstable();

    let mut names = Vec::new();
    let mut start = 0;
    for (from, to) in separators {
        if from < start {
            // overlaps the previous separator, e.g. ",\nand "
            start = start.max(to);
            continue;
        }
        names.push(&text[start..from]);
        start = to;
    }
    names.push(&text[start..]);

    names
        .into_iter()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Parses a single annotated name.
pub(crate) fn person_from_text(part: &str) -> Option<Person> {
    let email = EMAIL.captures(part).map(|c| c[1].trim().to_string());
    let role: Vec<String> = ROLES
        .captures(part)
        .map(|c| {
            c[1].split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let comment: BTreeMap<String, String> = COMMENT
        .captures(part)
        .map(|c| BTreeMap::from([(String::new(), c[1].trim().to_string())]))
        .unwrap_or_default();

    let without_email = EMAIL.replace_all(part, "");
    let without_roles = ROLES.replace_all(&without_email, "");
    let name = COMMENT.replace_all(&without_roles, "");
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let (given, family) =
        if let Some(org) = name.strip_prefix('{').and_then(|n| n.strip_suffix('}')) {
            (vec![org.trim().to_string()], None)
        } else {
            let mut words: Vec<String> = name.split_whitespace().map(String::from).collect();
            let family = words.pop();
            (words, family)
        };

    Some(Person {
        given,
        family,
        email,
        role,
        comment,
    })
}
