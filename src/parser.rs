//! Parser for the line-oriented action syntax.
//!
//! Pulls tokens synchronously from the [`Lexer`] and builds a [`Tree`] by
//! recursive descent. The parser owns a three-token lookahead buffer (space
//! tokens force a worst-case lookahead of three when disambiguating `$x :=`
//! from `$x foo`), a variable scope stack, and a range-nesting counter that
//! gates `break`/`continue`. Named subtrees produced by `define` and
//! `block` are staged during the parse and committed to the shared
//! [`TreeSet`] only when the whole parse succeeds.

use crate::ast::*;
use crate::error::{ParseError, Result, TemplateSource};
use crate::funcs::TemplateFuncs;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::number::{unquote_string, Number};
use bitflags::bitflags;
use miette::SourceSpan;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

bitflags! {
    /// Parsing modes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Mode: u8 {
        /// Retain comment nodes in the tree.
        const PARSE_COMMENTS = 1 << 0;
        /// Do not report errors for unknown functions at parse time.
        const SKIP_FUNC_CHECK = 1 << 1;
    }
}

/// The shared template registry: a mapping from name to parsed tree,
/// populated by `define` and `block` and by successful root parses.
pub type TreeSet = HashMap<String, Tree>;

/// The representation of a single parsed template.
#[derive(Debug, Clone)]
pub struct Tree {
    /// Name of the template represented by the tree.
    pub name: String,
    /// Name of the top-level template during parsing, for error messages.
    pub parse_name: String,
    /// Top-level root of the tree; populated by a successful parse.
    pub root: Option<ListNode>,
    /// Parsing mode flags.
    pub mode: Mode,
    text: Arc<String>,
}

impl Tree {
    /// Allocates a new, unparsed tree.
    pub fn new(name: impl Into<String>) -> Tree {
        let name = name.into();
        Tree {
            parse_name: name.clone(),
            name,
            root: None,
            mode: Mode::empty(),
            text: Arc::new(String::new()),
        }
    }

    /// Parses the template definition string to construct a representation
    /// of the template for execution. Named definitions in the input are
    /// added to `tree_set`, as is the tree itself; nothing is added if the
    /// parse fails.
    pub fn parse(
        mut self,
        text: &str,
        tree_set: &mut TreeSet,
        funcs: Option<&dyn TemplateFuncs>,
    ) -> Result<Tree> {
        self.parse_name = self.name.clone();
        let text_arc = Arc::new(text.to_string());
        self.text = Arc::clone(&text_arc);
        debug!(name = %self.name, bytes = text.len(), "parsing template");

        let source = TemplateSource::new(self.name.clone(), Arc::clone(&text_arc));
        let lex = Lexer::new(text_arc, self.mode.contains(Mode::PARSE_COMMENTS));
        let mut parser = Parser {
            source,
            mode: self.mode,
            lex,
            token: Default::default(),
            peek_count: 0,
            vars: vec!["$".to_string()],
            funcs,
            set: tree_set,
            staged: HashMap::new(),
            range_depth: 0,
        };

        let root = parser.parse_tree()?;
        self.root = Some(root);
        parser.add(&self)?;
        let Parser { staged, .. } = parser;
        for (name, tree) in staged {
            tree_set.insert(name, tree);
        }
        Ok(self)
    }

    /// Reports whether this tree (root list) contains no executable actions:
    /// only comments and definitions.
    pub fn is_empty(&self) -> bool {
        match &self.root {
            None => true,
            Some(list) => list.nodes.iter().all(is_empty_node),
        }
    }

    /// Returns the location (`name:line:column`) and a short snippet of the
    /// node's string form, for inclusion in error messages.
    pub fn error_context(&self, node: &Node) -> (String, String) {
        let pos = node.pos().min(self.text.len());
        let text = &self.text[..pos];
        let byte_num = match text.rfind('\n') {
            None => pos, // on first line
            Some(newline) => pos - (newline + 1),
        };
        let line_num = 1 + text.matches('\n').count();
        let mut context = node.to_string();
        if context.chars().count() > 20 {
            context = format!("{}...", context.chars().take(20).collect::<String>());
        }
        (
            format!("{}:{}:{}", self.parse_name, line_num, byte_num),
            context,
        )
    }
}

fn is_empty_node(node: &Node) -> bool {
    match node {
        Node::Comment(_) => true,
        Node::List(list) => list.nodes.iter().all(is_empty_node),
        _ => false,
    }
}

struct Parser<'a> {
    source: TemplateSource,
    mode: Mode,
    lex: Lexer,
    /// Three-token lookahead buffer.
    token: [Token; 3],
    /// How many of `token` are valid lookahead.
    peek_count: usize,
    /// Stack of declared variable names, reset to its entry mark when a
    /// control construct completes.
    vars: Vec<String>,
    funcs: Option<&'a dyn TemplateFuncs>,
    /// Shared registry, consulted for duplicate definitions.
    set: &'a TreeSet,
    /// Definitions made by this parse, committed on success.
    staged: HashMap<String, Tree>,
    /// Nesting depth of range bodies; gates break and continue.
    range_depth: usize,
}

impl<'a> Parser<'a> {
    // Token plumbing.

    fn next(&mut self) -> Token {
        if self.peek_count > 0 {
            self.peek_count -= 1;
        } else {
            self.token[0] = self.lex.next_token();
        }
        self.token[self.peek_count].clone()
    }

    /// Backs the input stream up one token.
    fn backup(&mut self) {
        self.peek_count += 1;
    }

    /// Backs the input stream up two tokens; `t1` is the most recently read.
    fn backup2(&mut self, t1: Token) {
        self.token[1] = t1;
        self.peek_count = 2;
    }

    /// Backs the input stream up three tokens; `t1` was read before `t2`.
    fn backup3(&mut self, t2: Token, t1: Token) {
        self.token[1] = t1;
        self.token[2] = t2;
        self.peek_count = 3;
    }

    fn peek(&mut self) -> Token {
        if self.peek_count > 0 {
            return self.token[self.peek_count - 1].clone();
        }
        self.peek_count = 1;
        self.token[0] = self.lex.next_token();
        self.token[0].clone()
    }

    fn next_non_space(&mut self) -> Token {
        loop {
            let token = self.next();
            if token.kind != TokenKind::Space {
                return token;
            }
        }
    }

    fn peek_non_space(&mut self) -> Token {
        let token = self.next_non_space();
        self.backup();
        token
    }

    // Error plumbing.

    /// Builds a parse error anchored at the most recently read token.
    fn error_msg(&self, message: impl Into<String>) -> ParseError {
        let token = &self.token[0];
        let pos = token.pos.min(self.source.text().len());
        let len = match token.kind {
            TokenKind::Error | TokenKind::Eof => 0,
            _ => token.text.len(),
        }
        .min(self.source.text().len() - pos);
        ParseError::new(
            &self.source,
            token.line,
            SourceSpan::new(pos.into(), len),
            message,
        )
    }

    fn unexpected(&self, token: &Token, context: &str) -> ParseError {
        if token.kind == TokenKind::Error {
            return self.error_msg(token.text.clone());
        }
        self.error_msg(format!("unexpected {token} in {context}"))
    }

    fn expect(&mut self, expected: TokenKind, context: &str) -> Result<Token> {
        let token = self.next_non_space();
        if token.kind != expected {
            return Err(self.unexpected(&token, context));
        }
        Ok(token)
    }

    fn expect_one_of(&mut self, k1: TokenKind, k2: TokenKind, context: &str) -> Result<Token> {
        let token = self.next_non_space();
        if token.kind != k1 && token.kind != k2 {
            return Err(self.unexpected(&token, context));
        }
        Ok(token)
    }

    fn has_function(&self, name: &str) -> bool {
        self.funcs.is_some_and(|funcs| funcs.has(name))
    }

    // Node constructors that need parser state.

    fn new_list(&self, pos: usize, line: usize) -> ListNode {
        ListNode {
            pos,
            line,
            nodes: Vec::new(),
        }
    }

    fn new_variable(&self, pos: usize, line: usize, ident: &str) -> VariableNode {
        VariableNode {
            pos,
            line,
            ident: ident.split('.').map(String::from).collect(),
        }
    }

    fn new_field(&self, pos: usize, line: usize, ident: &str) -> FieldNode {
        // The leading dot is part of the spelling, not a name.
        FieldNode {
            pos,
            line,
            ident: ident[1..].split('.').map(String::from).collect(),
        }
    }

    /// Builds a variable reference, checking that it has been declared.
    fn use_var(&mut self, pos: usize, line: usize, name: &str) -> Result<VariableNode> {
        let node = self.new_variable(pos, line, name);
        if self.vars.iter().any(|declared| declared == &node.ident[0]) {
            return Ok(node);
        }
        Err(self.error_msg(format!("undefined variable {:?}", node.ident[0])))
    }

    /// Stages a named tree for the shared set. An existing entry survives
    /// unless it is empty; two non-empty definitions clash.
    fn add(&mut self, tree: &Tree) -> Result<()> {
        let existing = self
            .staged
            .get(&tree.name)
            .or_else(|| self.set.get(&tree.name));
        if let Some(existing) = existing {
            if !existing.is_empty() {
                if tree.is_empty() {
                    return Ok(());
                }
                return Err(
                    self.error_msg(format!("multiple definition of template {:?}", tree.name))
                );
            }
        }
        self.staged.insert(tree.name.clone(), tree.clone());
        Ok(())
    }

    /// Builds a subtree sharing this parse's source, mode, and parse name.
    fn subtree(&self, name: String, root: ListNode) -> Tree {
        Tree {
            name,
            parse_name: self.source.name().to_string(),
            root: Some(root),
            mode: self.mode,
            text: Arc::clone(self.source.text()),
        }
    }

    // The grammar.

    /// Top-level parse: runs the text through actions and definitions.
    fn parse_tree(&mut self) -> Result<ListNode> {
        let first = self.peek();
        let mut root = self.new_list(first.pos, first.line);
        while self.peek().kind != TokenKind::Eof {
            if self.peek().kind == TokenKind::LeftDelim {
                let delim = self.next();
                if self.next_non_space().kind == TokenKind::Define {
                    self.parse_definition()?;
                    continue;
                }
                self.backup2(delim);
            }
            let node = self.text_or_action()?;
            match node {
                Node::End(_) | Node::Else(_) => {
                    return Err(self.error_msg(format!("unexpected {node}")));
                }
                node => root.nodes.push(node),
            }
        }
        Ok(root)
    }

    /// Parses a `define` clause: the name, then a body list terminated by
    /// `end`. The body gets a fresh variable scope and range depth.
    fn parse_definition(&mut self) -> Result<()> {
        const CONTEXT: &str = "define clause";
        let name_token = self.expect_one_of(TokenKind::String, TokenKind::RawString, CONTEXT)?;
        let name = unquote_string(&name_token.text)
            .ok_or_else(|| self.error_msg("invalid syntax"))?;
        self.expect(TokenKind::RightDelim, CONTEXT)?;

        let (list, end) = self.fresh_scope(Self::item_list)?;
        if !matches!(end, Node::End(_)) {
            return Err(self.error_msg(format!("unexpected {end} in {CONTEXT}")));
        }
        let tree = self.subtree(name, list);
        debug!(name = %tree.name, "registering template definition");
        self.add(&tree)
    }

    /// Runs `f` with a fresh variable scope and range depth, the way a
    /// definition body is parsed, then restores the enclosing state.
    fn fresh_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved_vars = std::mem::replace(&mut self.vars, vec!["$".to_string()]);
        let saved_depth = std::mem::replace(&mut self.range_depth, 0);
        let result = f(self);
        self.vars = saved_vars;
        self.range_depth = saved_depth;
        result
    }

    /// Parses the body of a construct up to the `end` or `else` that
    /// terminates it.
    fn item_list(&mut self) -> Result<(ListNode, Node)> {
        let first = self.peek_non_space();
        let mut list = self.new_list(first.pos, first.line);
        while self.peek_non_space().kind != TokenKind::Eof {
            let node = self.text_or_action()?;
            match node {
                Node::End(_) | Node::Else(_) => return Ok((list, node)),
                node => list.nodes.push(node),
            }
        }
        Err(self.error_msg("unexpected EOF"))
    }

    fn text_or_action(&mut self) -> Result<Node> {
        let token = self.next_non_space();
        match token.kind {
            TokenKind::LeftDelim => self.action(),
            TokenKind::Comment => Ok(Node::Comment(CommentNode {
                pos: token.pos,
                line: token.line,
                text: token.text,
            })),
            _ => Err(self.unexpected(&token, "input")),
        }
    }

    /// Parses one action: a control construct or a pipeline. The left delim
    /// has already been consumed.
    fn action(&mut self) -> Result<Node> {
        let token = self.next_non_space();
        match token.kind {
            TokenKind::Block => self.block_control(),
            TokenKind::Break => self.break_control(token.pos, token.line),
            TokenKind::Continue => self.continue_control(token.pos, token.line),
            TokenKind::Else => self.else_control(),
            TokenKind::End => self.end_control(),
            TokenKind::If => self.if_control(),
            TokenKind::Range => self.range_control(),
            TokenKind::Template => self.template_control(),
            TokenKind::With => self.with_control(),
            _ => {
                self.backup();
                let token = self.peek();
                // Do not pop variables; they persist until "end".
                let pipe = self.pipeline("command", TokenKind::RightDelim)?;
                Ok(Node::Action(ActionNode {
                    pos: token.pos,
                    line: token.line,
                    pipe,
                }))
            }
        }
    }

    fn break_control(&mut self, pos: usize, line: usize) -> Result<Node> {
        let token = self.next_non_space();
        if token.kind != TokenKind::RightDelim {
            return Err(self.unexpected(&token, "break"));
        }
        if self.range_depth == 0 {
            return Err(self.error_msg("can't use break outside of range"));
        }
        Ok(Node::Break(BreakNode { pos, line }))
    }

    fn continue_control(&mut self, pos: usize, line: usize) -> Result<Node> {
        let token = self.next_non_space();
        if token.kind != TokenKind::RightDelim {
            return Err(self.unexpected(&token, "continue"));
        }
        if self.range_depth == 0 {
            return Err(self.error_msg("can't use continue outside of range"));
        }
        Ok(Node::Continue(ContinueNode { pos, line }))
    }

    fn end_control(&mut self) -> Result<Node> {
        let token = self.expect(TokenKind::RightDelim, "end")?;
        Ok(Node::End(EndNode {
            pos: token.pos,
            line: token.line,
        }))
    }

    fn else_control(&mut self) -> Result<Node> {
        // Special case for "else if": leave the if token for parse_control.
        let peek = self.peek_non_space();
        if peek.kind == TokenKind::If {
            return Ok(Node::Else(ElseNode {
                pos: peek.pos,
                line: peek.line,
            }));
        }
        let token = self.expect(TokenKind::RightDelim, "else")?;
        Ok(Node::Else(ElseNode {
            pos: token.pos,
            line: token.line,
        }))
    }

    fn if_control(&mut self) -> Result<Node> {
        let (pos, line, pipe, list, else_list) = self.parse_control(true, "if")?;
        Ok(Node::If(IfNode {
            pos,
            line,
            pipe,
            list,
            else_list,
        }))
    }

    fn range_control(&mut self) -> Result<Node> {
        let (pos, line, pipe, list, else_list) = self.parse_control(false, "range")?;
        Ok(Node::Range(RangeNode {
            pos,
            line,
            pipe,
            list,
            else_list,
        }))
    }

    fn with_control(&mut self) -> Result<Node> {
        let (pos, line, pipe, list, else_list) = self.parse_control(false, "with")?;
        Ok(Node::With(WithNode {
            pos,
            line,
            pipe,
            list,
            else_list,
        }))
    }

    /// Shared grammar for if, range, and with: pipeline, body, optional
    /// else branch, end. Variables declared anywhere inside go out of scope
    /// when the construct completes.
    #[allow(clippy::type_complexity)]
    fn parse_control(
        &mut self,
        allow_else_if: bool,
        context: &'static str,
    ) -> Result<(usize, usize, PipeNode, ListNode, Option<ListNode>)> {
        let mark = self.vars.len();
        let result = self.parse_control_body(allow_else_if, context);
        self.vars.truncate(mark);
        result
    }

    #[allow(clippy::type_complexity)]
    fn parse_control_body(
        &mut self,
        allow_else_if: bool,
        context: &'static str,
    ) -> Result<(usize, usize, PipeNode, ListNode, Option<ListNode>)> {
        let pipe = self.pipeline(context, TokenKind::RightDelim)?;
        if context == "range" {
            self.range_depth += 1;
        }
        let (list, next) = self.item_list()?;
        if context == "range" {
            self.range_depth -= 1;
        }
        let mut else_list = None;
        if let Node::Else(else_node) = next {
            if allow_else_if && self.peek().kind == TokenKind::If {
                // "else if ..." is sugar for "else" containing a single
                // nested if; the nested if consumes the only "end" needed.
                self.next();
                let mut nested = self.new_list(else_node.pos, else_node.line);
                nested.nodes.push(self.if_control()?);
                else_list = Some(nested);
            } else {
                let (list, next) = self.item_list()?;
                if !matches!(next, Node::End(_)) {
                    return Err(self.error_msg(format!("expected end; found {next}")));
                }
                else_list = Some(list);
            }
        }
        Ok((pipe.pos, pipe.line, pipe, list, else_list))
    }

    /// Parses a `template` invocation: a quoted name, then an optional
    /// pipeline.
    fn template_control(&mut self) -> Result<Node> {
        const CONTEXT: &str = "template clause";
        let token = self.next_non_space();
        let name = self.parse_template_name(&token, CONTEXT)?;
        let pipe = if self.next_non_space().kind != TokenKind::RightDelim {
            self.backup();
            Some(self.pipeline(CONTEXT, TokenKind::RightDelim)?)
        } else {
            None
        };
        Ok(Node::Template(TemplateNode {
            pos: token.pos,
            line: token.line,
            name,
            pipe,
        }))
    }

    /// Parses a `block` clause: registers the body as a named tree and
    /// leaves a template invocation at the call site.
    fn block_control(&mut self) -> Result<Node> {
        const CONTEXT: &str = "block clause";
        let token = self.next_non_space();
        let name = self.parse_template_name(&token, CONTEXT)?;
        let pipe = self.pipeline(CONTEXT, TokenKind::RightDelim)?;

        let (list, end) = self.fresh_scope(Self::item_list)?;
        if !matches!(end, Node::End(_)) {
            return Err(self.error_msg(format!("unexpected {end} in {CONTEXT}")));
        }
        let tree = self.subtree(name.clone(), list);
        debug!(name = %tree.name, "registering block definition");
        self.add(&tree)?;

        Ok(Node::Template(TemplateNode {
            pos: token.pos,
            line: token.line,
            name,
            pipe: Some(pipe),
        }))
    }

    fn parse_template_name(&mut self, token: &Token, context: &str) -> Result<String> {
        match token.kind {
            TokenKind::String | TokenKind::RawString => {
                unquote_string(&token.text).ok_or_else(|| self.error_msg("invalid syntax"))
            }
            _ => Err(self.unexpected(token, context)),
        }
    }

    /// Parses a pipeline terminated by `end_kind` (right delim, or right
    /// paren for a parenthesized sub-pipeline): optional declarations, then
    /// commands separated by `|`.
    fn pipeline(&mut self, context: &'static str, end_kind: TokenKind) -> Result<PipeNode> {
        let first = self.peek_non_space();
        let mut pipe = PipeNode {
            pos: first.pos,
            line: first.line,
            is_assign: false,
            decl: Vec::new(),
            cmds: Vec::new(),
        };

        // Are there declarations or assignments?
        'decls: loop {
            let variable = self.peek_non_space();
            if variable.kind != TokenKind::Variable {
                break 'decls;
            }
            self.next();
            // Space is a token, so discovering whether this variable is a
            // declaration target needs up to three tokens of lookahead: in
            // "$x foo" the "foo" (rather than ":=") decides it. Remember
            // the token adjacent to the variable to push back if needed.
            let token_after_variable = self.peek();
            let next = self.peek_non_space();
            match next.kind {
                TokenKind::Assign | TokenKind::Declare => {
                    pipe.is_assign = next.kind == TokenKind::Assign;
                    self.next_non_space();
                    pipe.decl
                        .push(self.new_variable(variable.pos, variable.line, &variable.text));
                    self.vars.push(variable.text.clone());
                    break 'decls;
                }
                TokenKind::Char if next.text == "," => {
                    self.next_non_space();
                    pipe.decl
                        .push(self.new_variable(variable.pos, variable.line, &variable.text));
                    self.vars.push(variable.text.clone());
                    if context == "range" && pipe.decl.len() < 2 {
                        match self.peek_non_space().kind {
                            TokenKind::Variable | TokenKind::RightDelim | TokenKind::RightParen => {
                                // second initialized variable in a range pipeline
                                continue 'decls;
                            }
                            _ => {
                                return Err(
                                    self.error_msg("range can only initialize variables")
                                );
                            }
                        }
                    }
                    return Err(self.error_msg(format!("too many declarations in {context}")));
                }
                _ if token_after_variable.kind == TokenKind::Space => {
                    self.backup3(variable, token_after_variable);
                    break 'decls;
                }
                _ => {
                    self.backup2(variable);
                    break 'decls;
                }
            }
        }

        loop {
            let token = self.next_non_space();
            if token.kind == end_kind {
                self.check_pipeline(&pipe, context)?;
                return Ok(pipe);
            }
            match token.kind {
                TokenKind::Bool
                | TokenKind::CharConstant
                | TokenKind::Complex
                | TokenKind::Dot
                | TokenKind::Field
                | TokenKind::Identifier
                | TokenKind::Number
                | TokenKind::Nil
                | TokenKind::RawString
                | TokenKind::String
                | TokenKind::Variable
                | TokenKind::LeftParen => {
                    self.backup();
                    let cmd = self.command()?;
                    pipe.cmds.push(cmd);
                }
                _ => return Err(self.unexpected(&token, context)),
            }
        }
    }

    fn check_pipeline(&self, pipe: &PipeNode, context: &str) -> Result<()> {
        // Reject empty pipelines.
        if pipe.cmds.is_empty() {
            return Err(self.error_msg(format!("missing value for {context}")));
        }
        // Only the first command of a pipeline can start with a
        // non-executable operand.
        for (stage, cmd) in pipe.cmds.iter().enumerate().skip(1) {
            match cmd.args.first() {
                Some(Node::Bool(_))
                | Some(Node::Dot(_))
                | Some(Node::Nil(_))
                | Some(Node::Number(_))
                | Some(Node::String(_)) => {
                    return Err(self.error_msg(format!(
                        "non executable command in pipeline stage {}",
                        stage + 1
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Parses one command: a space-separated run of operands up to a pipe,
    /// right delim, or right paren.
    fn command(&mut self) -> Result<CommandNode> {
        let first = self.peek_non_space();
        let mut cmd = CommandNode {
            pos: first.pos,
            line: first.line,
            args: Vec::new(),
        };
        loop {
            self.peek_non_space(); // skip leading spaces
            if let Some(operand) = self.operand()? {
                cmd.args.push(operand);
            }
            let token = self.next();
            match token.kind {
                TokenKind::Space => continue,
                TokenKind::RightDelim | TokenKind::RightParen => self.backup(),
                TokenKind::Pipe => {}
                _ => return Err(self.unexpected(&token, "operand")),
            }
            break;
        }
        if cmd.args.is_empty() {
            return Err(self.error_msg("empty command"));
        }
        Ok(cmd)
    }

    /// Parses an operand: a term, possibly followed by field accesses.
    /// Trailing fields fold into field and variable terms; a literal
    /// followed by a dot is an error.
    fn operand(&mut self) -> Result<Option<Node>> {
        let Some(node) = self.term()? else {
            return Ok(None);
        };
        if self.peek().kind != TokenKind::Field {
            return Ok(Some(node));
        }
        let first_field = self.peek();
        let mut chain = ChainNode {
            pos: first_field.pos,
            line: first_field.line,
            node: Box::new(node),
            field: Vec::new(),
        };
        while self.peek().kind == TokenKind::Field {
            let token = self.next();
            chain.add(&token.text);
        }
        let node = match chain.node.as_ref() {
            Node::Field(_) => {
                Node::Field(self.new_field(chain.pos, chain.line, &chain.to_string()))
            }
            Node::Variable(_) => {
                Node::Variable(self.new_variable(chain.pos, chain.line, &chain.to_string()))
            }
            Node::Bool(_) | Node::String(_) | Node::Number(_) | Node::Nil(_) | Node::Dot(_) => {
                return Err(self.error_msg(format!(
                    "unexpected . after term {:?}",
                    chain.node.to_string()
                )));
            }
            _ => Node::Chain(chain),
        };
        Ok(Some(node))
    }

    /// Parses a term: a single token-level operand. Returns `None` (with
    /// the token pushed back) when the next token cannot start a term.
    fn term(&mut self) -> Result<Option<Node>> {
        let token = self.next_non_space();
        let node = match token.kind {
            TokenKind::Identifier => {
                if !self.mode.contains(Mode::SKIP_FUNC_CHECK) && !self.has_function(&token.text) {
                    return Err(self.error_msg(format!("function {:?} not defined", token.text)));
                }
                Node::Identifier(IdentifierNode {
                    pos: token.pos,
                    line: token.line,
                    ident: token.text,
                })
            }
            TokenKind::Dot => Node::Dot(DotNode {
                pos: token.pos,
                line: token.line,
            }),
            TokenKind::Nil => Node::Nil(NilNode {
                pos: token.pos,
                line: token.line,
            }),
            TokenKind::Variable => {
                Node::Variable(self.use_var(token.pos, token.line, &token.text)?)
            }
            TokenKind::Field => Node::Field(self.new_field(token.pos, token.line, &token.text)),
            TokenKind::Bool => Node::Bool(BoolNode {
                pos: token.pos,
                line: token.line,
                val: token.text == "true",
            }),
            TokenKind::CharConstant | TokenKind::Complex | TokenKind::Number => {
                let value = Number::parse(&token.text, token.kind)
                    .map_err(|message| self.error_msg(message))?;
                Node::Number(NumberNode {
                    pos: token.pos,
                    line: token.line,
                    value,
                    text: token.text,
                })
            }
            TokenKind::LeftParen => {
                Node::Pipe(self.pipeline("parenthesized pipeline", TokenKind::RightParen)?)
            }
            TokenKind::String | TokenKind::RawString => {
                let text =
                    unquote_string(&token.text).ok_or_else(|| self.error_msg("invalid syntax"))?;
                Node::String(StringNode {
                    pos: token.pos,
                    line: token.line,
                    quoted: token.text,
                    text,
                })
            }
            _ => {
                self.backup();
                return Ok(None);
            }
        };
        Ok(Some(node))
    }
}
