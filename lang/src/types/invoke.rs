use tracing::trace;

use crate::parser::ast::{NodeId, NodeKind};
use crate::types::binder::BindOutcome;
use crate::types::builtins::construct;
use crate::types::env::{CallStack, Env, Frame};
use crate::types::fault::Fault;
use crate::types::infer::{Analyzer, InferError};
use crate::types::ty::{ClosureRef, Type, TypeSet};

impl<'a> Analyzer<'a> {
    /// Apply every alternative of the callee to the call's arguments
    pub(crate) fn invoke(
        &mut self,
        call: NodeId,
        func: NodeId,
        args: &[NodeId],
        keywords: &[NodeId],
        env: &Env,
        stack: &CallStack,
    ) -> Result<TypeSet, InferError> {
        let callees = self.infer(func, env, stack)?;

        if callees.is_empty() {
            self.infer_arguments(args, keywords, env, stack)?;
            return Ok(TypeSet::empty());
        }

        let mut result = TypeSet::empty();
        for callee in &callees {
            let types = self.invoke_one(call, callee, args, keywords, env, stack)?;
            result.extend(&types);
        }
        Ok(result)
    }

    fn invoke_one(
        &mut self,
        call: NodeId,
        callee: &Type,
        args: &[NodeId],
        keywords: &[NodeId],
        env: &Env,
        stack: &CallStack,
    ) -> Result<TypeSet, InferError> {
        if callee.is_bottom() {
            return Ok(Type::bottom().into());
        }

        match callee {
            Type::Closure(closure) => self.invoke_closure(call, closure, args, keywords, env, stack),
            Type::Function { to, .. } => {
                self.infer_arguments(args, keywords, env, stack)?;
                Ok(to.clone())
            }
            Type::ClassRef(class) => {
                self.infer_arguments(args, keywords, env, stack)?;
                let instance = match construct(class) {
                    Some(ty) => ty,
                    None => self.fresh_unknown(),
                };
                Ok(instance.into())
            }
            Type::Unknown(_) => {
                self.infer_arguments(args, keywords, env, stack)?;
                Ok(self.fresh_unknown().into())
            }
            other => {
                // Still resolve the arguments for their diagnostics
                self.infer_arguments(args, keywords, env, stack)?;
                let fault = Fault::NotCallable {
                    callee: other.to_string(),
                };
                Ok(self.reject(call, fault))
            }
        }
    }

    fn invoke_closure(
        &mut self,
        call: NodeId,
        closure: &ClosureRef,
        args: &[NodeId],
        keywords: &[NodeId],
        env: &Env,
        stack: &CallStack,
    ) -> Result<TypeSet, InferError> {
        let ast = self.ast;
        let data = &self.closures[closure.id.index()];
        let (def, captured, defaults) = (data.def, data.env.clone(), data.defaults.clone());

        let Some(captured) = captured else {
            self.infer_arguments(args, keywords, env, stack)?;
            let fault = Fault::CalledBeforeDefinition {
                name: closure.name.clone().unwrap_or_else(|| "<lambda>".to_string()),
            };
            return Ok(self.reject(call, fault));
        };

        let (params, body) = match ast.kind(def) {
            NodeKind::FunctionDef { params, body, .. } => (params, Body::Block(body.as_slice())),
            NodeKind::Lambda { params, body } => (params, Body::Expr(*body)),
            _ => return Ok(self.fresh_unknown().into()),
        };

        let outcome = self.bind_arguments(call, params, &defaults, args, keywords, env, stack)?;
        let (bound, signature) = match outcome {
            BindOutcome::Bound { params, signature } => (params, signature),
            BindOutcome::Rejected(fault) => return Ok(self.reject(call, fault)),
        };

        if stack.contains(call, &signature) {
            trace!(call = %call, function = %closure, depth = stack.depth(), "recursion guard hit");
            return Ok(Type::bottom().into());
        }

        trace!(call = %call, function = %closure, depth = stack.depth(), "invoking closure");
        let stack = stack.push(Frame {
            call,
            signature: signature.clone(),
        });

        let mut body_env = captured;
        for param in bound {
            body_env = body_env.extend(&param.name, param.types, Some(param.node));
        }

        let result = match body {
            Body::Block(statements) => self
                .infer_block(statements, &body_env, &stack)?
                .fall_through_as(Type::none()),
            Body::Expr(expr) => self.infer(expr, &body_env, &stack)?,
        };

        self.history.record(
            def,
            &Type::Function {
                from: signature,
                to: result.clone(),
            }
            .into(),
        );
        Ok(result)
    }

    /// Infer argument expressions only for what they record
    fn infer_arguments(
        &mut self,
        args: &[NodeId],
        keywords: &[NodeId],
        env: &Env,
        stack: &CallStack,
    ) -> Result<(), InferError> {
        for node in args.iter().chain(keywords) {
            self.infer(*node, env, stack)?;
        }
        Ok(())
    }

    fn reject(&mut self, call: NodeId, fault: Fault) -> TypeSet {
        self.history.record_fault(call, fault.clone());
        Type::Error(fault).into()
    }
}

enum Body<'n> {
    Block(&'n [NodeId]),
    Expr(NodeId),
}
