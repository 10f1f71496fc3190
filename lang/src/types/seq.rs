use crate::parser::ast::{NodeId, NodeKind, Params};
use crate::types::env::{CallStack, Env};
use crate::types::fault::Fault;
use crate::types::infer::{Analyzer, InferError};
use crate::types::ty::{Type, TypeSet};

impl<'a> Analyzer<'a> {
    /// Pre-bind, then sequence a block; the block's environment is dropped
    pub(crate) fn infer_block(&mut self, block: &[NodeId], env: &Env, stack: &CallStack) -> Result<TypeSet, InferError> {
        let env = self.close(block, env);
        let (types, _) = self.sequence(block, env, stack)?;
        Ok(types)
    }

    /// Bind every function defined directly in `block` to a closure whose
    /// environment is filled in when its `def` statement is reached. This
    /// makes forward and mutually recursive references resolve.
    pub(crate) fn close(&mut self, block: &[NodeId], env: &Env) -> Env {
        let ast = self.ast;
        let mut env = env.clone();

        for stmt in block {
            if let NodeKind::FunctionDef { name, .. } = ast.kind(*stmt) {
                let closure = self.new_closure(*stmt, None, Vec::new());
                env = env.extend(name, Type::Closure(closure).into(), Some(*stmt));
            }
        }

        env
    }

    /// Evaluate statements in order, returning the block's result and the
    /// environment in effect where control falls off the end.
    ///
    /// The result holds `cont` exactly when some path falls through.
    pub(crate) fn sequence(
        &mut self,
        block: &[NodeId],
        env: Env,
        stack: &CallStack,
    ) -> Result<(TypeSet, Env), InferError> {
        let ast = self.ast;
        let mut env = env;
        let mut result = TypeSet::empty();

        for (i, stmt) in block.iter().enumerate() {
            let rest = &block[i + 1..];

            match ast.kind(*stmt) {
                NodeKind::If { test, body, orelse } => {
                    // Both branches are analyzed whatever the test says
                    self.infer(*test, &env, stack)?;

                    let then_env = self.close(body, &env);
                    let (then_types, then_env) = self.sequence(body, then_env, stack)?;
                    let else_env = self.close(orelse, &env);
                    let (else_types, else_env) = self.sequence(orelse, else_env, stack)?;

                    env = match (then_types.terminates(), else_types.terminates()) {
                        (true, true) => {
                            self.mark_unreachable(rest);
                            result.extend(&then_types);
                            result.extend(&else_types);
                            return Ok((result, env));
                        }
                        (true, false) => else_env,
                        (false, true) => then_env,
                        (false, false) => then_env.merge(&else_env),
                    };

                    result.extend(&then_types.finalize());
                    result.extend(&else_types.finalize());
                }

                NodeKind::Assign { targets, value } => {
                    let types = self.infer(*value, &env, stack)?;
                    for target in targets {
                        env = self.bind_target(*target, &types, env);
                    }
                }

                NodeKind::FunctionDef { name, params, .. } => {
                    env = self.define(*stmt, name, params, env, stack)?;
                }

                NodeKind::Return { value } => {
                    let types = match value {
                        Some(value) => self.infer(*value, &env, stack)?,
                        None => Type::none().into(),
                    };

                    // Whatever follows is still analyzed for its diagnostics
                    self.sequence(rest, env.clone(), stack)?;
                    self.mark_unreachable(rest);

                    result.extend(&types);
                    return Ok((result, env));
                }

                NodeKind::Expr { value } => {
                    self.infer(*value, &env, stack)?;
                }

                other => {
                    return Err(InferError::UnrecognizedStatement {
                        kind: other.name(),
                        line: ast.line(*stmt),
                    })
                }
            }
        }

        result.insert(Type::cont());
        Ok((result, env))
    }

    fn bind_target(&mut self, target: NodeId, types: &TypeSet, env: Env) -> Env {
        let ast = self.ast;
        match ast.name_of(target) {
            Some(name) => {
                self.history.record(target, types);
                env.extend(name, types.clone(), Some(target))
            }
            None => {
                self.history.record_fault(target, Fault::NotAssignable);
                env
            }
        }
    }

    /// Close the recursion cycle for a `def`: its pre-bound closure now
    /// captures the current environment, which already binds its own name.
    fn define(
        &mut self,
        def: NodeId,
        name: &str,
        params: &Params,
        env: Env,
        stack: &CallStack,
    ) -> Result<Env, InferError> {
        let mut defaults = Vec::with_capacity(params.defaults.len());
        for default in &params.defaults {
            defaults.push(self.infer(*default, &env, stack)?);
        }

        let prebound: Vec<usize> = env
            .lookup(name)
            .map(|binding| {
                binding
                    .types
                    .iter()
                    .filter_map(|ty| match ty {
                        Type::Closure(closure) if closure.def == def => Some(closure.id.index()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if prebound.is_empty() {
            // The pre-bound name was reassigned before the def ran
            let closure = self.new_closure(def, None, defaults);
            let index = closure.id.index();
            let env = env.extend(name, Type::Closure(closure).into(), Some(def));
            self.closures[index].env = Some(env.clone());
            return Ok(env);
        }

        for index in prebound {
            let data = &mut self.closures[index];
            data.env = Some(env.clone());
            data.defaults = defaults.clone();
        }
        Ok(env)
    }

    fn mark_unreachable(&mut self, statements: &[NodeId]) {
        for stmt in statements {
            self.history.record_fault(*stmt, Fault::Unreachable);
        }
    }
}
