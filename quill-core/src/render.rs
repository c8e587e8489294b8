//! Code model: the render tree the evaluator builds and its serialization
//! to C++ text.

use std::fmt;

use crate::span::Span;

/// Output identifier of a user definition. Builtins keep their name;
/// everything else is suffixed with its file so that private definitions
/// of different files never collide.
pub fn out_id(name: &str, span: Span) -> String {
    if span.is_builtin() {
        name.to_string()
    } else {
        format!("{}_{}", name, span.file.index())
    }
}

/// Block indentation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub indent: String,
    pub indent_count: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            indent: "\t".to_string(),
            indent_count: 1,
        }
    }
}

impl RenderConfig {
    pub fn spaces(width: usize) -> Self {
        RenderConfig {
            indent: " ".to_string(),
            indent_count: width,
        }
    }
}

/// Indentation state of one render pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'c> {
    config: &'c RenderConfig,
    depth: usize,
}

impl<'c> RenderContext<'c> {
    pub fn new(config: &'c RenderConfig) -> Self {
        RenderContext { config, depth: 0 }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn nested(&self) -> Self {
        RenderContext {
            config: self.config,
            depth: self.depth + 1,
        }
    }

    pub fn indent(&self) -> String {
        self.config.indent.repeat(self.config.indent_count * self.depth)
    }
}

/// A node of the code model. Every node owns its children; serialization
/// order is construction order.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    Text(String),
    Seq(Vec<RenderNode>),
    /// `callee<generics>(args)`
    Call {
        callee: Box<RenderNode>,
        generics: Vec<String>,
        args: Vec<RenderNode>,
    },
    /// `(left op right)`
    Binary {
        left: Box<RenderNode>,
        op: String,
        right: Box<RenderNode>,
    },
    /// `T({a,b})`
    SliceLit { ty: String, elems: Vec<RenderNode> },
    /// `T{{k,v},{k,v}}`
    MapLit {
        ty: String,
        entries: Vec<(RenderNode, RenderNode)>,
    },
    /// `std::make_tuple(a,b)`
    Tuple(Vec<RenderNode>),
    /// `[=](params) mutable -> ret {...}`
    AnonFunc {
        params: Vec<String>,
        ret: String,
        body: Box<RenderNode>,
    },
    /// Braced statement list, one statement per line.
    Block(Vec<RenderNode>),
    /// `expr;`
    Stmt(Box<RenderNode>),
    /// `return expr;`
    Return(Option<Box<RenderNode>>),
}

impl RenderNode {
    pub fn text(text: impl Into<String>) -> Self {
        RenderNode::Text(text.into())
    }

    pub fn render(&self, ctx: &RenderContext<'_>) -> String {
        let mut out = String::new();
        self.write_to(&mut out, ctx);
        out
    }

    pub fn write_to(&self, out: &mut String, ctx: &RenderContext<'_>) {
        match self {
            RenderNode::Text(text) => out.push_str(text),
            RenderNode::Seq(nodes) => {
                for node in nodes {
                    node.write_to(out, ctx);
                }
            }
            RenderNode::Call {
                callee,
                generics,
                args,
            } => {
                callee.write_to(out, ctx);
                if !generics.is_empty() {
                    out.push('<');
                    out.push_str(&generics.join(","));
                    out.push('>');
                }
                out.push('(');
                write_joined(out, args, ", ", ctx);
                out.push(')');
            }
            RenderNode::Binary { left, op, right } => {
                out.push('(');
                left.write_to(out, ctx);
                out.push(' ');
                out.push_str(op);
                out.push(' ');
                right.write_to(out, ctx);
                out.push(')');
            }
            RenderNode::SliceLit { ty, elems } => {
                out.push_str(ty);
                out.push_str("({");
                write_joined(out, elems, ", ", ctx);
                out.push_str("})");
            }
            RenderNode::MapLit { ty, entries } => {
                out.push_str(ty);
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push('{');
                    key.write_to(out, ctx);
                    out.push_str(", ");
                    value.write_to(out, ctx);
                    out.push('}');
                }
                out.push('}');
            }
            RenderNode::Tuple(elems) => {
                out.push_str("std::make_tuple(");
                write_joined(out, elems, ", ", ctx);
                out.push(')');
            }
            RenderNode::AnonFunc { params, ret, body } => {
                out.push_str("[=](");
                out.push_str(&params.join(", "));
                out.push_str(") mutable -> ");
                out.push_str(ret);
                out.push(' ');
                body.write_to(out, ctx);
            }
            RenderNode::Block(stmts) => {
                if stmts.is_empty() {
                    out.push_str("{}");
                    return;
                }
                out.push_str("{\n");
                let inner = ctx.nested();
                for stmt in stmts {
                    out.push_str(&inner.indent());
                    stmt.write_to(out, &inner);
                    out.push('\n');
                }
                out.push_str(&ctx.indent());
                out.push('}');
            }
            RenderNode::Stmt(expr) => {
                expr.write_to(out, ctx);
                out.push(';');
            }
            RenderNode::Return(expr) => {
                out.push_str("return");
                if let Some(expr) = expr {
                    out.push(' ');
                    expr.write_to(out, ctx);
                }
                out.push(';');
            }
        }
    }
}

fn write_joined(out: &mut String, nodes: &[RenderNode], sep: &str, ctx: &RenderContext<'_>) {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        node.write_to(out, ctx);
    }
}

impl fmt::Display for RenderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = RenderConfig::default();
        f.write_str(&self.render(&RenderContext::new(&config)))
    }
}

/// Append-only accumulator for the nodes of one operand chain.
#[derive(Debug, Default)]
pub struct ExprModel {
    nodes: Vec<RenderNode>,
}

impl ExprModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: RenderNode) {
        self.nodes.push(node);
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.nodes.push(RenderNode::Text(text.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn into_node(mut self) -> RenderNode {
        if self.nodes.len() == 1 {
            if let Some(node) = self.nodes.pop() {
                return node;
            }
        }
        RenderNode::Seq(self.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::FileId;

    #[test]
    fn out_id_suffixes_user_definitions() {
        assert_eq!(out_id("x", Span::new(FileId(3), 0, 1)), "x_3");
        assert_eq!(out_id("out", Span::builtin()), "out");
    }

    #[test]
    fn renders_nested_blocks_with_configured_indent() {
        let inner = RenderNode::Block(vec![RenderNode::Stmt(Box::new(RenderNode::text("b()")))]);
        let outer = RenderNode::Block(vec![
            RenderNode::Stmt(Box::new(RenderNode::text("a()"))),
            RenderNode::Seq(vec![RenderNode::text("if (c) "), inner]),
        ]);
        let config = RenderConfig::spaces(2);
        let text = outer.render(&RenderContext::new(&config));
        assert_eq!(text, "{\n  a();\n  if (c) {\n    b();\n  }\n}");
    }

    #[test]
    fn renders_composites() {
        let slice = RenderNode::SliceLit {
            ty: "slice<int>".into(),
            elems: vec![RenderNode::text("int{1}"), RenderNode::text("int{2}")],
        };
        assert_eq!(slice.to_string(), "slice<int>({int{1}, int{2}})");

        let map = RenderNode::MapLit {
            ty: "map<int,str>".into(),
            entries: vec![(RenderNode::text("int{1}"), RenderNode::text("str{\"a\"}"))],
        };
        assert_eq!(map.to_string(), "map<int,str>{{int{1}, str{\"a\"}}}");
    }

    #[test]
    fn expr_model_keeps_push_order() {
        let mut m = ExprModel::new();
        m.push_text("a");
        m.push_text(".");
        m.push_text("b");
        assert_eq!(m.into_node().to_string(), "a.b");
    }
}
