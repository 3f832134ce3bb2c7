//! Expression output formatting.

use owo_colors::OwoColorize;
use serde::Serialize;
use vidlib_filter::{walk, DomainType, Expr, NodeKind, ParseDiagnostic, Value, Visitor};

use super::helpers::{format_label, yes_no};

/// JSON output structure for the check command.
#[derive(Serialize)]
pub struct CheckOutput<'a> {
    pub expression: String,
    pub domain_type: DomainType,
    pub constant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'a Value>,
    pub needs_tags: bool,
    pub tree: NodeOutput<'a>,
}

/// JSON output structure for one tree node.
#[derive(Serialize)]
pub struct NodeOutput<'a> {
    pub kind: &'static str,
    pub domain_type: DomainType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'a Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeOutput<'a>>,
}

impl<'a> NodeOutput<'a> {
    fn from_expr(expr: &'a Expr) -> Self {
        let kind = match expr.kind() {
            NodeKind::Literal => "literal",
            NodeKind::Attribute => "attribute",
            NodeKind::Binary(_) => "binary",
            NodeKind::Unary => "unary",
        };
        let attribute = expr.attribute();
        Self {
            kind,
            domain_type: expr.domain_type(),
            operator: expr.operator().map(|op| format!("{op:?}")),
            name: attribute.map(|a| a.name()),
            tag: attribute.map(|a| a.is_tag()),
            value: expr.literal(),
            children: expr.children().into_iter().map(Self::from_expr).collect(),
        }
    }
}

/// Formats a checked expression as JSON.
pub fn format_check_json(expr: &Expr) -> Result<String, serde_json::Error> {
    let output = CheckOutput {
        expression: expr.to_string(),
        domain_type: expr.domain_type(),
        constant: expr.is_constant(),
        value: expr.constant_value(),
        needs_tags: expr.needs_tags(),
        tree: NodeOutput::from_expr(expr),
    };

    serde_json::to_string_pretty(&output)
}

/// Formats a checked expression as a summary table.
pub fn format_check_table(expr: &Expr, use_colors: bool) -> String {
    let mut output = String::new();

    let canonical = expr.to_string();
    if use_colors {
        output.push_str(&format!("{}\n", canonical.bold()));
    } else {
        output.push_str(&canonical);
        output.push('\n');
    }

    let constant = match expr.constant_value() {
        Some(value) => format!("yes ({value})"),
        None => "no".to_string(),
    };
    let rows = [
        ("Type:", expr.domain_type().to_string()),
        ("Constant:", constant),
        ("Reads tags:", yes_no(expr.needs_tags()).to_string()),
    ];
    for (label, value) in rows {
        output.push_str(&format!(
            "  {} {value}\n",
            format_label(&format!("{label:<12}"), use_colors)
        ));
    }

    output
}

/// Renders a tree one node per line, children indented under parents.
struct TreePrinter {
    lines: Vec<String>,
}

impl Visitor for TreePrinter {
    fn enter(&mut self, node: &Expr, depth: usize) -> bool {
        let label = match node {
            Expr::Literal(value) => format!("{value} : {}", value.domain_type()),
            Expr::Attribute(attr) if attr.is_tag() => format!("{} : Tag (tag)", attr.name()),
            Expr::Attribute(attr) => format!("{} : {}", attr.name(), attr.domain_type()),
            Expr::Binary(binary) => {
                format!("{:?} [{:?}]", binary.operator(), binary.kind())
            }
            Expr::Unary(unary) => format!("{:?}", unary.operator()),
        };
        let folded = match node {
            Expr::Binary(_) | Expr::Unary(_) => node
                .constant_value()
                .map(|value| format!(" = {value}"))
                .unwrap_or_default(),
            Expr::Literal(_) | Expr::Attribute(_) => String::new(),
        };
        self.lines
            .push(format!("{}{label}{folded}", "  ".repeat(depth)));
        true
    }
}

/// Formats an expression tree.
pub fn format_tree(expr: &Expr) -> String {
    let mut printer = TreePrinter { lines: Vec::new() };
    walk(expr, &mut printer);

    let mut output = printer.lines.join("\n");
    output.push('\n');
    output
}

/// Formats a parse diagnostic with a caret under the offending column.
pub fn format_diagnostic(diag: &ParseDiagnostic, use_colors: bool) -> String {
    if !use_colors {
        return diag.render();
    }

    let caret = format!("^ {}", diag.message);
    format!(
        "{}\n{}{}",
        diag.text,
        " ".repeat(diag.column),
        caret.red().bold()
    )
}
