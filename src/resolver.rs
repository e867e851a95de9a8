//! Static resolver pass.
//!
//! One walk over the AST that:
//! 1. builds lexical scopes (a stack of `name → defined?` maps; the global
//!    scope is not on the stack),
//! 2. rejects programs that are statically wrong: duplicate bindings in one
//!    scope, reading a variable inside its own initializer, `return` outside a
//!    function, `return <value>` inside `init`, `break` outside a loop, and
//!    `this` outside a class,
//! 3. records, for every `Variable`/`Assign`/`This` node, how many scopes out
//!    its binding lives. Nodes with no entry are globals and are looked up by
//!    name at run time.
//!
//! The pass stops at the first error; nothing is executed before it succeeds.

use std::collections::HashMap;

use crate::ast::{Expr, ExprId, FunctionDecl, Ident, Stmt};
use crate::error::ResolveError;
use log::{debug, info};

/// Distances computed by the resolver, keyed by node identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locals(HashMap<ExprId, usize>);

impl Locals {
    pub fn get(&self, id: ExprId) -> Option<usize> {
        self.0.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge in the table of a later program (one REPL line after another).
    pub fn extend(&mut self, other: Locals) {
        self.0.extend(other.0);
    }

    fn insert(&mut self, id: ExprId, distance: usize) {
        self.0.insert(id, distance);
    }
}

/// What kind of function body is being resolved. Drives the `return` checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
}

pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    locals: Locals,
    current_function: FunctionType,
    current_class: ClassType,
    loop_depth: usize,
    initializing_global: Option<&'a str>, // global whose initializer is being resolved
}

impl Default for Resolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        Resolver {
            scopes: Vec::new(),
            locals: Locals::default(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            loop_depth: 0,
            initializing_global: None,
        }
    }

    /// Resolve a whole program.
    pub fn resolve(mut self, statements: &'a [Stmt]) -> Result<Locals, ResolveError> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_stmts(statements)?;

        info!("Resolved {} local reference(s)", self.locals.len());
        Ok(self.locals)
    }

    fn resolve_stmts(&mut self, statements: &'a [Stmt]) -> Result<(), ResolveError> {
        statements.iter().try_for_each(|stmt| self.resolve_stmt(stmt))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'a Stmt) -> Result<(), ResolveError> {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                let result = self.resolve_stmts(statements);
                self.end_scope();
                result?;
            }

            Stmt::Var { name, initializer } => {
                self.declare(name)?;

                if self.scopes.is_empty() {
                    self.initializing_global = Some(name.name.as_str());
                }
                let result = self.resolve_expr(initializer);
                self.initializing_global = None;
                result?;

                self.define(name);
            }

            Stmt::Function(declaration) => {
                // Defined before the body so the function can call itself.
                self.declare(&declaration.name)?;
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionType::Function)?;
            }

            Stmt::Class { name, methods } => {
                self.declare(name)?;
                self.define(name);

                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;

                self.begin_scope();
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert("this", true);
                }

                let result = methods.iter().try_for_each(|method| {
                    let kind = if method.name.name == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };
                    self.resolve_function(method, kind)
                });

                self.end_scope();
                self.current_class = enclosing_class;
                result?;
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(else_branch) = else_branch.as_deref() {
                    self.resolve_stmt(else_branch)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;

                self.loop_depth += 1;
                let result = self.resolve_stmt(body);
                self.loop_depth -= 1;
                result?;
            }

            Stmt::Break { line } => {
                if self.loop_depth == 0 {
                    return Err(ResolveError::BreakOutsideLoop { line: *line });
                }
            }

            Stmt::Return { line, value } => {
                if self.current_function == FunctionType::None {
                    return Err(ResolveError::ReturnOutsideFunction { line: *line });
                }

                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        return Err(ResolveError::ReturnValueFromInitializer { line: *line });
                    }

                    self.resolve_expr(value)?;
                }
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr) -> Result<(), ResolveError> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner)?,

            Expr::Unary { right, .. } => self.resolve_expr(right)?,

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Variable { id, name } => {
                let in_own_initializer = match self.scopes.last() {
                    Some(scope) => scope.get(name.name.as_str()) == Some(&false),
                    None => self.initializing_global == Some(name.name.as_str()),
                };

                if in_own_initializer {
                    return Err(ResolveError::SelfReference {
                        name: name.name.clone(),
                        line: name.line,
                    });
                }

                self.resolve_local(*id, &name.name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value)?;
                self.resolve_local(*id, &name.name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;
                for argument in arguments {
                    self.resolve_expr(argument)?;
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object)?,

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value)?;
                self.resolve_expr(object)?;
            }

            Expr::This { id, line } => {
                if self.current_class == ClassType::None {
                    return Err(ResolveError::ThisOutsideClass { line: *line });
                }

                self.resolve_local(*id, "this");
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Fresh scope for parameters and body. Loops outside the function do not
    /// make `break` legal inside it.
    fn resolve_function(
        &mut self,
        function: &'a FunctionDecl,
        kind: FunctionType,
    ) -> Result<(), ResolveError> {
        let enclosing_function = self.current_function;
        let enclosing_loops = self.loop_depth;
        self.current_function = kind;
        self.loop_depth = 0;

        self.begin_scope();
        let result = self.resolve_function_body(function);
        self.end_scope();

        self.current_function = enclosing_function;
        self.loop_depth = enclosing_loops;
        result
    }

    fn resolve_function_body(&mut self, function: &'a FunctionDecl) -> Result<(), ResolveError> {
        for param in &function.params {
            self.declare(param)?;
            self.define(param);
        }

        self.resolve_stmts(&function.body)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &'a Ident) -> Result<(), ResolveError> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.name.as_str()) {
                return Err(ResolveError::DuplicateBinding {
                    name: name.name.clone(),
                    line: name.line,
                });
            }
            scope.insert(&name.name, false);
        }
        Ok(())
    }

    fn define(&mut self, name: &'a Ident) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(&name.name, true);
        }
    }

    /// Record the distance to the innermost scope declaring `name`; leave
    /// globals unrecorded.
    fn resolve_local(&mut self, id: ExprId, name: &str) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                debug!("Resolved '{}' {} at depth {}", name, id, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' {} as global", name, id);
    }
}
