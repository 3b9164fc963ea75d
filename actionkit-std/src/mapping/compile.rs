//! Structural validation of mapping JSON into a [`Node`] tree.

use super::{MappingIssue, template::Template};
use actionkit_core::{FieldPath, describe_value};
use serde_json::{Map, Value};

/// Key allowed next to a directive key.
const METADATA_KEY: &str = "_metadata";

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Node {
    /// Scalars, including null.
    Value(Value),
    Object(Vec<(String, Node)>),
    Array(Vec<Node>),
    Path(Operand),
    If {
        test: Test,
        condition: Box<Node>,
        then: Option<Box<Node>>,
        otherwise: Option<Box<Node>>,
    },
    ArrayPath {
        source: Operand,
        template: Option<Box<Node>>,
    },
    Template(TemplateOperand),
    Literal(Box<Node>),
}

/// A path given either inline or produced by a nested directive.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Operand {
    Static(FieldPath),
    Dynamic(Box<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum TemplateOperand {
    Static(Template),
    Dynamic(Box<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Test {
    Exists,
    Blank,
}

/// Compile a mapping, collecting every structural problem.
pub(super) fn compile(mapping: &Value) -> Result<Node, Vec<MappingIssue>> {
    let mut compiler = Compiler::default();
    match compiler.node(mapping, "") {
        Some(node) if compiler.issues.is_empty() => Ok(node),
        _ => Err(compiler.issues),
    }
}

fn child(at: &str, key: &str) -> String {
    format!("{at}/{key}")
}

fn is_directive(map: &Map<String, Value>) -> bool {
    map.keys().any(|key| key.starts_with('@'))
}

#[derive(Default)]
struct Compiler {
    issues: Vec<MappingIssue>,
}

impl Compiler {
    fn issue(&mut self, at: &str, message: impl Into<String>) -> Option<Node> {
        self.issues.push(MappingIssue::new(at, message));
        None
    }

    fn node(&mut self, value: &Value, at: &str) -> Option<Node> {
        match value {
            Value::Object(map) if is_directive(map) => self.directive(map, at),
            Value::Object(map) => {
                let mut children = Vec::with_capacity(map.len());
                let mut failed = false;
                for (key, value) in map {
                    match self.node(value, &child(at, key)) {
                        Some(node) => children.push((key.clone(), node)),
                        None => failed = true,
                    }
                }
                (!failed).then_some(Node::Object(children))
            }
            Value::Array(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                let mut failed = false;
                for (index, item) in items.iter().enumerate() {
                    match self.node(item, &child(at, &index.to_string())) {
                        Some(node) => nodes.push(node),
                        None => failed = true,
                    }
                }
                (!failed).then_some(Node::Array(nodes))
            }
            scalar => Some(Node::Value(scalar.clone())),
        }
    }

    fn directive(&mut self, map: &Map<String, Value>, at: &str) -> Option<Node> {
        let directives: Vec<&String> = map.keys().filter(|k| k.starts_with('@')).collect();
        if directives.len() > 1 {
            return self.issue(
                at,
                format!(
                    "should only have one @-prefixed key but it has {} keys",
                    directives.len()
                ),
            );
        }
        if let Some(other) = map
            .keys()
            .find(|k| !k.starts_with('@') && k.as_str() != METADATA_KEY)
        {
            return self.issue(
                at,
                format!("should not mix a directive with other keys but it has {other:?}"),
            );
        }

        let name = directives.first()?.as_str();
        let operand = map.get(name)?;
        let here = child(at, name);
        match name {
            "@path" => self.operand(operand, &here).map(Node::Path),
            "@template" => self.template(operand, &here),
            "@literal" => self
                .node(operand, &here)
                .map(|node| Node::Literal(Box::new(node))),
            "@if" => self.if_directive(operand, &here),
            "@arrayPath" => self.array_path(operand, &here),
            unknown => self.issue(at, format!("has an invalid directive: {unknown}")),
        }
    }

    fn nested_directive(&mut self, value: &Value, at: &str) -> Option<Option<Box<Node>>> {
        match value {
            Value::Object(map) if is_directive(map) => {
                Some(self.directive(map, at).map(Box::new))
            }
            _ => None,
        }
    }

    fn operand(&mut self, value: &Value, at: &str) -> Option<Operand> {
        if let Value::String(path) = value {
            return Some(Operand::Static(FieldPath::parse_scoped(path)));
        }
        match self.nested_directive(value, at) {
            Some(node) => node.map(Operand::Dynamic),
            None => {
                self.issue(
                    at,
                    format!(
                        "should be a string or a mapping directive but it is {}",
                        describe_value(value)
                    ),
                );
                None
            }
        }
    }

    fn template(&mut self, value: &Value, at: &str) -> Option<Node> {
        if let Value::String(source) = value {
            return Some(Node::Template(TemplateOperand::Static(Template::parse(
                source,
            ))));
        }
        match self.nested_directive(value, at) {
            Some(node) => node.map(|node| Node::Template(TemplateOperand::Dynamic(node))),
            None => self.issue(
                at,
                format!(
                    "should be a string or a mapping directive but it is {}",
                    describe_value(value)
                ),
            ),
        }
    }

    fn if_directive(&mut self, value: &Value, at: &str) -> Option<Node> {
        let Value::Object(fields) = value else {
            return self.issue(
                at,
                format!("should be an object but it is {}", describe_value(value)),
            );
        };

        let mut failed = false;
        if let Some(unknown) = fields
            .keys()
            .find(|k| !matches!(k.as_str(), "exists" | "blank" | "then" | "else"))
        {
            self.issue(at, format!("has an unknown field {unknown:?}"));
            failed = true;
        }

        let test = match (fields.get("exists"), fields.get("blank")) {
            (Some(condition), None) => Some((Test::Exists, "exists", condition)),
            (None, Some(condition)) => Some((Test::Blank, "blank", condition)),
            (None, None) => {
                self.issue(at, "should have field \"exists\" or \"blank\" but it doesn't");
                None
            }
            (Some(_), Some(_)) => {
                self.issue(at, "should have only one of \"exists\" and \"blank\"");
                None
            }
        };
        let condition = test.and_then(|(test, key, condition)| {
            self.node(condition, &child(at, key))
                .map(|node| (test, Box::new(node)))
        });

        let mut branch = |key: &str| -> Option<Box<Node>> {
            let value = fields.get(key)?;
            let node = self.node(value, &child(at, key));
            if node.is_none() {
                failed = true;
            }
            node.map(Box::new)
        };
        let then = branch("then");
        let otherwise = branch("else");

        let (test, condition) = condition?;
        (!failed).then_some(Node::If {
            test,
            condition,
            then,
            otherwise,
        })
    }

    fn array_path(&mut self, value: &Value, at: &str) -> Option<Node> {
        let items = match value {
            Value::Array(items) if (1..=2).contains(&items.len()) => items,
            Value::Array(items) => {
                return self.issue(
                    at,
                    format!(
                        "should have a source path and an optional template but it has {} items",
                        items.len()
                    ),
                );
            }
            other => {
                return self.issue(
                    at,
                    format!("should be an array but it is {}", describe_value(other)),
                );
            }
        };

        let source = self.operand(&items[0], &child(at, "0"));
        let template = match items.get(1) {
            Some(template) => Some(self.node(template, &child(at, "1"))?),
            None => None,
        };
        Some(Node::ArrayPath {
            source: source?,
            template: template.map(Box::new),
        })
    }
}
