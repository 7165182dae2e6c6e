//! AST nodes for the template language.
//!
//! Every node carries its byte position and 1-based line so diagnostics can
//! point back into the source. `Display` renders the classical delimited
//! form (`{{ … }}`); tests and diagnostics rely on that rendering being
//! re-parseable. Deep copy is `Clone`: the node structures own their data,
//! so a clone is a structurally identical tree with preserved positions.

use crate::number::Number;
use std::fmt::{self, Display};

/// A node in the tree.
#[derive(Debug, Clone)]
pub enum Node {
    Action(ActionNode),
    Bool(BoolNode),
    Break(BreakNode),
    Chain(ChainNode),
    Command(CommandNode),
    Comment(CommentNode),
    Continue(ContinueNode),
    Dot(DotNode),
    /// Parser-internal marker for `else`; never survives into a finished tree.
    Else(ElseNode),
    /// Parser-internal marker for `end`; never survives into a finished tree.
    End(EndNode),
    Field(FieldNode),
    Identifier(IdentifierNode),
    If(IfNode),
    List(ListNode),
    Nil(NilNode),
    Number(NumberNode),
    /// A pipeline appearing as an argument is a parenthesized sub-expression.
    Pipe(PipeNode),
    Range(RangeNode),
    String(StringNode),
    Template(TemplateNode),
    Variable(VariableNode),
    With(WithNode),
}

impl Node {
    /// Byte offset of the node in the source.
    pub fn pos(&self) -> usize {
        match self {
            Node::Action(n) => n.pos,
            Node::Bool(n) => n.pos,
            Node::Break(n) => n.pos,
            Node::Chain(n) => n.pos,
            Node::Command(n) => n.pos,
            Node::Comment(n) => n.pos,
            Node::Continue(n) => n.pos,
            Node::Dot(n) => n.pos,
            Node::Else(n) => n.pos,
            Node::End(n) => n.pos,
            Node::Field(n) => n.pos,
            Node::Identifier(n) => n.pos,
            Node::If(n) => n.pos,
            Node::List(n) => n.pos,
            Node::Nil(n) => n.pos,
            Node::Number(n) => n.pos,
            Node::Pipe(n) => n.pos,
            Node::Range(n) => n.pos,
            Node::String(n) => n.pos,
            Node::Template(n) => n.pos,
            Node::Variable(n) => n.pos,
            Node::With(n) => n.pos,
        }
    }

    /// 1-based line of the node's first byte.
    pub fn line(&self) -> usize {
        match self {
            Node::Action(n) => n.line,
            Node::Bool(n) => n.line,
            Node::Break(n) => n.line,
            Node::Chain(n) => n.line,
            Node::Command(n) => n.line,
            Node::Comment(n) => n.line,
            Node::Continue(n) => n.line,
            Node::Dot(n) => n.line,
            Node::Else(n) => n.line,
            Node::End(n) => n.line,
            Node::Field(n) => n.line,
            Node::Identifier(n) => n.line,
            Node::If(n) => n.line,
            Node::List(n) => n.line,
            Node::Nil(n) => n.line,
            Node::Number(n) => n.line,
            Node::Pipe(n) => n.line,
            Node::Range(n) => n.line,
            Node::String(n) => n.line,
            Node::Template(n) => n.line,
            Node::Variable(n) => n.line,
            Node::With(n) => n.line,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Action(n) => n.fmt(f),
            Node::Bool(n) => n.fmt(f),
            Node::Break(n) => n.fmt(f),
            Node::Chain(n) => n.fmt(f),
            Node::Command(n) => n.fmt(f),
            Node::Comment(n) => n.fmt(f),
            Node::Continue(n) => n.fmt(f),
            Node::Dot(n) => n.fmt(f),
            Node::Else(n) => n.fmt(f),
            Node::End(n) => n.fmt(f),
            Node::Field(n) => n.fmt(f),
            Node::Identifier(n) => n.fmt(f),
            Node::If(n) => n.fmt(f),
            Node::List(n) => n.fmt(f),
            Node::Nil(n) => n.fmt(f),
            Node::Number(n) => n.fmt(f),
            Node::Pipe(n) => n.fmt(f),
            Node::Range(n) => n.fmt(f),
            Node::String(n) => n.fmt(f),
            Node::Template(n) => n.fmt(f),
            Node::Variable(n) => n.fmt(f),
            Node::With(n) => n.fmt(f),
        }
    }
}

/// Ordered node sequence; the body container for trees and branches.
#[derive(Debug, Clone, Default)]
pub struct ListNode {
    pub pos: usize,
    pub line: usize,
    pub nodes: Vec<Node>,
}

impl fmt::Display for ListNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            node.fmt(f)?;
        }
        Ok(())
    }
}

/// An action: one line (or semicolon-separated fragment) of source,
/// wrapping a pipeline.
#[derive(Debug, Clone)]
pub struct ActionNode {
    pub pos: usize,
    pub line: usize,
    pub pipe: PipeNode,
}

impl fmt::Display for ActionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}}}}}", self.pipe)
    }
}

/// A pipeline: optional declarations, then commands joined by `|`.
#[derive(Debug, Clone)]
pub struct PipeNode {
    pub pos: usize,
    pub line: usize,
    /// The declarations are being assigned (`=`), not declared (`:=`).
    pub is_assign: bool,
    pub decl: Vec<VariableNode>,
    pub cmds: Vec<CommandNode>,
}

impl fmt::Display for PipeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.decl.is_empty() {
            for (i, v) in self.decl.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                v.fmt(f)?;
            }
            f.write_str(" := ")?;
        }
        for (i, c) in self.cmds.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            c.fmt(f)?;
        }
        Ok(())
    }
}

/// A command: space-separated arguments, the leftmost being the callee.
#[derive(Debug, Clone)]
pub struct CommandNode {
    pub pos: usize,
    pub line: usize,
    pub args: Vec<Node>,
}

impl fmt::Display for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if let Node::Pipe(pipe) = arg {
                write!(f, "({pipe})")?;
            } else {
                arg.fmt(f)?;
            }
        }
        Ok(())
    }
}

/// A function name appearing in a command.
#[derive(Debug, Clone)]
pub struct IdentifierNode {
    pub pos: usize,
    pub line: usize,
    pub ident: String,
}

impl fmt::Display for IdentifierNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ident)
    }
}

/// A `$`-prefixed variable, with any trailing field names in lexical order.
#[derive(Debug, Clone)]
pub struct VariableNode {
    pub pos: usize,
    pub line: usize,
    /// Variable name and fields: `$x.Field` is `["$x", "Field"]`, the bare
    /// dollar is `["$"]`.
    pub ident: Vec<String>,
}

impl fmt::Display for VariableNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.ident.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(id)?;
        }
        Ok(())
    }
}

/// The cursor, `.`.
#[derive(Debug, Clone)]
pub struct DotNode {
    pub pos: usize,
    pub line: usize,
}

impl fmt::Display for DotNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(".")
    }
}

/// The untyped nil constant.
#[derive(Debug, Clone)]
pub struct NilNode {
    pub pos: usize,
    pub line: usize,
}

impl fmt::Display for NilNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("nil")
    }
}

/// Dotted field access rooted at the cursor: `.X.Y` is `["X", "Y"]`.
#[derive(Debug, Clone)]
pub struct FieldNode {
    pub pos: usize,
    pub line: usize,
    /// The names, without the dots.
    pub ident: Vec<String>,
}

impl fmt::Display for FieldNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in &self.ident {
            write!(f, ".{id}")?;
        }
        Ok(())
    }
}

/// Dotted names attached to a base expression that is not itself a field
/// or variable (a parenthesized pipeline, typically).
#[derive(Debug, Clone)]
pub struct ChainNode {
    pub pos: usize,
    pub line: usize,
    pub node: Box<Node>,
    /// The names, without the dots.
    pub field: Vec<String>,
}

impl ChainNode {
    /// Adds a field to the chain; the name must start with a dot.
    pub fn add(&mut self, field: &str) {
        let name = field.strip_prefix('.').unwrap_or(field);
        self.field.push(name.to_string());
    }
}

impl fmt::Display for ChainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Node::Pipe(pipe) = self.node.as_ref() {
            write!(f, "({pipe})")?;
        } else {
            self.node.fmt(f)?;
        }
        for field in &self.field {
            write!(f, ".{field}")?;
        }
        Ok(())
    }
}

/// A boolean constant.
#[derive(Debug, Clone)]
pub struct BoolNode {
    pub pos: usize,
    pub line: usize,
    pub val: bool,
}

impl fmt::Display for BoolNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.val { "true" } else { "false" })
    }
}

/// A numeric constant, rendered as it was written.
#[derive(Debug, Clone)]
pub struct NumberNode {
    pub pos: usize,
    pub line: usize,
    pub value: Number,
    /// The original textual representation.
    pub text: String,
}

impl fmt::Display for NumberNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A string constant; renders in its original quoted form.
#[derive(Debug, Clone)]
pub struct StringNode {
    pub pos: usize,
    pub line: usize,
    /// The original text of the string, with quotes.
    pub quoted: String,
    /// The string, after quote processing.
    pub text: String,
}

impl fmt::Display for StringNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted)
    }
}

/// An `if` construct.
#[derive(Debug, Clone)]
pub struct IfNode {
    pub pos: usize,
    pub line: usize,
    pub pipe: PipeNode,
    pub list: ListNode,
    pub else_list: Option<ListNode>,
}

impl fmt::Display for IfNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_branch(f, "if", &self.pipe, &self.list, self.else_list.as_ref())
    }
}

/// A `range` loop.
#[derive(Debug, Clone)]
pub struct RangeNode {
    pub pos: usize,
    pub line: usize,
    pub pipe: PipeNode,
    pub list: ListNode,
    pub else_list: Option<ListNode>,
}

impl fmt::Display for RangeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_branch(f, "range", &self.pipe, &self.list, self.else_list.as_ref())
    }
}

/// A `with` construct.
#[derive(Debug, Clone)]
pub struct WithNode {
    pub pos: usize,
    pub line: usize,
    pub pipe: PipeNode,
    pub list: ListNode,
    pub else_list: Option<ListNode>,
}

impl fmt::Display for WithNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_branch(f, "with", &self.pipe, &self.list, self.else_list.as_ref())
    }
}

fn write_branch(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    pipe: &PipeNode,
    list: &ListNode,
    else_list: Option<&ListNode>,
) -> fmt::Result {
    write!(f, "{{{{{name} {pipe}}}}}")?;
    list.fmt(f)?;
    if let Some(else_list) = else_list {
        f.write_str("{{else}}")?;
        else_list.fmt(f)?;
    }
    f.write_str("{{end}}")
}

/// A `template` invocation.
#[derive(Debug, Clone)]
pub struct TemplateNode {
    pub pos: usize,
    pub line: usize,
    /// The name of the template, unquoted.
    pub name: String,
    pub pipe: Option<PipeNode>,
}

impl fmt::Display for TemplateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{template {:?}", self.name)?;
        if let Some(pipe) = &self.pipe {
            write!(f, " {pipe}")?;
        }
        f.write_str("}}")
    }
}

/// A `break` inside a range body.
#[derive(Debug, Clone)]
pub struct BreakNode {
    pub pos: usize,
    pub line: usize,
}

impl fmt::Display for BreakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{{break}}")
    }
}

/// A `continue` inside a range body.
#[derive(Debug, Clone)]
pub struct ContinueNode {
    pub pos: usize,
    pub line: usize,
}

impl fmt::Display for ContinueNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{{continue}}")
    }
}

/// A comment; retained only when comment parsing is enabled.
#[derive(Debug, Clone)]
pub struct CommentNode {
    pub pos: usize,
    pub line: usize,
    /// The comment text, without the leading `#`.
    pub text: String,
}

impl fmt::Display for CommentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{/*{}*/}}}}", self.text)
    }
}

/// Parser-internal `end` marker.
#[derive(Debug, Clone)]
pub struct EndNode {
    pub pos: usize,
    pub line: usize,
}

impl fmt::Display for EndNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{{end}}")
    }
}

/// Parser-internal `else` marker.
#[derive(Debug, Clone)]
pub struct ElseNode {
    pub pos: usize,
    pub line: usize,
}

impl fmt::Display for ElseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{{else}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_rendering() {
        let v = VariableNode {
            pos: 0,
            line: 1,
            ident: vec![
                "$".to_string(),
                "A".to_string(),
                "BB".to_string(),
                "CCC".to_string(),
            ],
        };
        assert_eq!(v.to_string(), "$.A.BB.CCC");

        let v = VariableNode {
            pos: 0,
            line: 1,
            ident: vec!["$x".to_string()],
        };
        assert_eq!(v.to_string(), "$x");
    }

    #[test]
    fn test_field_rendering() {
        let field = FieldNode {
            pos: 0,
            line: 1,
            ident: vec!["x".to_string(), "y".to_string(), "z".to_string()],
        };
        assert_eq!(field.to_string(), ".x.y.z");
    }

    #[test]
    fn test_template_rendering() {
        let t = TemplateNode {
            pos: 0,
            line: 1,
            name: "inner".to_string(),
            pipe: None,
        };
        assert_eq!(t.to_string(), r#"{{template "inner"}}"#);
    }
}
