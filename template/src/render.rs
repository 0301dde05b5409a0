use crate::{
    parser::parse_expression,
    Expr,
    TemplateError,
    TemplateNode,
    TemplateSpec,
};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Expr(Expr),
}

/// A compiled template string.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Split `source` into literal text and `${...}` expressions.
    ///
    /// `\${` produces a literal `${`. A lone `$` is plain text.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(start) = rest.find("${") {
            if rest[..start].ends_with('\\') {
                literal.push_str(&rest[..start - 1]);
                literal.push_str("${");
                rest = &rest[start + 2..];
                continue;
            }

            literal.push_str(&rest[..start]);
            let offset = source.len() - rest.len() + start;
            let body_start = start + 2;
            let body_len = expression_len(&rest[body_start..]).ok_or(TemplateError::UnterminatedExpression(offset))?;
            let body = &rest[body_start..body_start + body_len];
            if body.trim().is_empty() {
                return Err(TemplateError::EmptyExpression(offset));
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Expr(parse_expression(body)?));
            rest = &rest[body_start + body_len + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn render(&self, scope: Option<&serde_json::Value>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Expr(expr) => out.push_str(&expr.eval(scope).to_string()),
            }
        }
        out
    }
}

/// Length of the expression body up to (not including) its closing `}`.
/// Braces inside quoted strings do not count.
fn expression_len(body: &str) -> Option<usize> {
    let mut quote = None;
    let mut escaped = false;
    let mut depth = 0usize;
    for (i, c) in body.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '{' => depth += 1,
                '}' if depth == 0 => return Some(i),
                '}' => depth -= 1,
                _ => {}
            },
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompiledNode {
    Template(Template),
    Nested(CompiledTemplates),
}

/// [`TemplateSpec`] with every leaf parsed, ready to render on each tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledTemplates(BTreeMap<String, CompiledNode>);

impl CompiledTemplates {
    /// Parse every template in the tree. Errors name the dotted key of the
    /// offending template.
    pub fn compile(spec: &TemplateSpec) -> Result<Self, TemplateError> {
        let mut compiled = BTreeMap::new();
        for (key, node) in spec {
            let node = match node {
                TemplateNode::Template(source) => {
                    CompiledNode::Template(Template::parse(source).map_err(|err| err.in_key(key))?)
                }
                TemplateNode::Nested(nested) => {
                    CompiledNode::Nested(Self::compile(nested).map_err(|err| err.in_key(key))?)
                }
            };
            compiled.insert(key.clone(), node);
        }
        Ok(Self(compiled))
    }

    /// Render the tree against `scope`.
    ///
    /// A nested group under `key` is rendered against `scope[key]`; when the
    /// record or that field is missing its templates see `undefined` values.
    pub fn render(&self, scope: Option<&serde_json::Value>) -> RenderedOutput {
        let rendered = self
            .0
            .iter()
            .map(|(key, node)| {
                let node = match node {
                    CompiledNode::Template(template) => RenderedNode::Text(template.render(scope)),
                    CompiledNode::Nested(nested) => {
                        RenderedNode::Nested(nested.render(scope.and_then(|record| record.get(key.as_str()))))
                    }
                };
                (key.clone(), node)
            })
            .collect();
        RenderedOutput(rendered)
    }
}

/// Compile and render in one go.
pub fn render(spec: &TemplateSpec, scope: Option<&serde_json::Value>) -> Result<RenderedOutput, TemplateError> {
    Ok(CompiledTemplates::compile(spec)?.render(scope))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RenderedNode {
    Text(String),
    Nested(RenderedOutput),
}

/// Rendered strings, shaped exactly like the [`TemplateSpec`] they came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RenderedOutput(BTreeMap<String, RenderedNode>);

impl RenderedOutput {
    /// Look up a leaf by its dotted key, e.g. `fitnessPointData.distanceInMiles`.
    pub fn text(&self, dotted_key: &str) -> Option<&str> {
        let (head, tail) = match dotted_key.split_once('.') {
            Some((head, tail)) => (head, Some(tail)),
            None => (dotted_key, None),
        };
        match (self.0.get(head)?, tail) {
            (RenderedNode::Text(text), None) => Some(text.as_str()),
            (RenderedNode::Nested(nested), Some(tail)) => nested.text(tail),
            _ => None,
        }
    }

    /// Every leaf with the chain of keys leading to it, depth first.
    pub fn leaves(&self) -> Vec<(Vec<&str>, &str)> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut Vec::new(), &mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, prefix: &mut Vec<&'a str>, leaves: &mut Vec<(Vec<&'a str>, &'a str)>) {
        for (key, node) in &self.0 {
            prefix.push(key.as_str());
            match node {
                RenderedNode::Text(text) => leaves.push((prefix.clone(), text.as_str())),
                RenderedNode::Nested(nested) => nested.collect_leaves(prefix, leaves),
            }
            prefix.pop();
        }
    }
}
