use super::{
    TransformOptions,
    compile::{Node, Operand, TemplateOperand, Test},
    template::Template,
};
use actionkit_core::FieldPath;
use serde_json::{Map, Value};

/// Evaluate a node against the current scope. `None` means undefined.
pub(super) fn evaluate(node: &Node, scope: &Value, options: &TransformOptions) -> Option<Value> {
    match node {
        Node::Value(value) => Some(value.clone()),
        Node::Object(children) => Some(Value::Object(
            children
                .iter()
                .filter_map(|(key, child)| {
                    evaluate(child, scope, options).map(|value| (key.clone(), value))
                })
                .collect::<Map<_, _>>(),
        )),
        Node::Array(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| evaluate(item, scope, options).unwrap_or(Value::Null))
                .collect(),
        )),
        Node::Path(operand) => match operand {
            Operand::Static(path) => path.resolve(scope).cloned(),
            Operand::Dynamic(inner) => {
                let path = evaluate(inner, scope, options)?;
                FieldPath::parse_scoped(path.as_str()?)
                    .resolve(scope)
                    .cloned()
            }
        },
        Node::If {
            test,
            condition,
            then,
            otherwise,
        } => {
            let value = evaluate(condition, scope, options);
            let passed = match (test, value) {
                (_, None | Some(Value::Null)) => false,
                (Test::Exists, Some(_)) => true,
                (Test::Blank, Some(value)) => value.as_str() != Some(""),
            };
            let branch = if passed { then } else { otherwise };
            branch
                .as_deref()
                .and_then(|branch| evaluate(branch, scope, options))
        }
        Node::ArrayPath { source, template } => {
            // A directive source yields the array itself, not a path.
            let resolved = match source {
                Operand::Static(path) => path.resolve(scope).cloned(),
                Operand::Dynamic(inner) => evaluate(inner, scope, options),
            };
            let Some(Value::Array(elements)) = resolved else {
                return Some(Value::Array(Vec::new()));
            };
            Some(Value::Array(
                elements
                    .into_iter()
                    .map(|element| match template {
                        Some(template) => {
                            evaluate(template, &element, options).unwrap_or(Value::Null)
                        }
                        None => element,
                    })
                    .collect(),
            ))
        }
        Node::Template(operand) => {
            let rendered = match operand {
                TemplateOperand::Static(template) => {
                    template.render(scope, options.escape_templates)
                }
                TemplateOperand::Dynamic(inner) => {
                    let source = evaluate(inner, scope, options)?;
                    Template::parse(source.as_str()?).render(scope, options.escape_templates)
                }
            };
            Some(Value::String(rendered))
        }
        Node::Literal(inner) => evaluate(inner, scope, options),
    }
}
