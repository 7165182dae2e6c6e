//! lignage - a line-oriented template scripting language
//!
//! A scripting dialect of the classical delimited template languages with
//! the delimiters removed: there is no surrounding literal text, and every
//! source line (or semicolon-separated fragment) is an action. The crate
//! provides the lexer, the recursive-descent parser, the tree model, a
//! shared template registry with `define`/`block`/`template` semantics, and
//! the lazy-value primitive the evaluator uses for deferred data.
//!
//! # Syntax overview
//!
//! ```text
//! .Field.Sub                  - field access on the current cursor
//! printf "%d" 23              - function call with arguments
//! .Items | len | printf "%d"  - pipelines
//! $x := .Value                - variable declaration
//! if .Ok                      - conditionals (else / else if / end)
//! range $i, $v := .List       - loops (break / continue / else / end)
//! with .Section               - cursor rebinding
//! define "name" / block "name" pipeline / template "name"
//! # comment                   - line comment
//! cmd one; cmd two            - semicolons separate actions
//! long \
//!   continuation              - backslash continues a line
//! ```
//!
//! # Example
//!
//! ```
//! use lignage::{Mode, Tree, TreeSet};
//!
//! let mut set = TreeSet::new();
//! let mut tree = Tree::new("greeting");
//! tree.mode = Mode::SKIP_FUNC_CHECK;
//! let tree = tree.parse("printf \"hello, %s\" .Name", &mut set, None)?;
//! let root = tree.root.as_ref().unwrap();
//! assert_eq!(root.to_string(), "{{printf \"hello, %s\" .Name}}");
//! # Ok::<(), lignage::ParseError>(())
//! ```
//!
//! Lexing and parsing run on a single thread of control: the parser pulls
//! tokens one at a time and the lexer advances a state machine in place.
//! Only the [`LazyValue`] cell is shared across threads.

pub mod ast;
mod error;
pub mod funcs;
mod lazy;
pub mod lexer;
mod number;
pub mod parser;

pub use error::{ParseError, Result, TemplateSource};
pub use funcs::{FuncMap, TemplateFn, TemplateFuncs};
pub use lazy::{Immediate, LazyValue, Resolve};
pub use number::Number;
pub use parser::{Mode, Tree, TreeSet};
