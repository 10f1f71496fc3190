use crate::parser::ast::{NodeId, NodeKind, Params};
use crate::types::env::{CallStack, Env};
use crate::types::fault::Fault;
use crate::types::infer::{Analyzer, InferError};
use crate::types::ty::{Signature, Type, TypeSet};

/// One formal parameter with the types it received
pub(crate) struct BoundParam {
    pub name: String,
    pub node: NodeId,
    pub types: TypeSet,
}

pub(crate) enum BindOutcome {
    Bound {
        params: Vec<BoundParam>,
        /// The call's effective input types, in declaration order
        signature: Signature,
    },
    /// Binding gave up; the fault is the call's only result
    Rejected(Fault),
}

impl<'a> Analyzer<'a> {
    /// Match a call's arguments against a definition's formals.
    ///
    /// Arguments are inferred in the caller's environment. Problems that do
    /// not prevent binding are recorded at the call node and binding goes on.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn bind_arguments(
        &mut self,
        call: NodeId,
        params: &Params,
        defaults: &[TypeSet],
        args: &[NodeId],
        keywords: &[NodeId],
        env: &Env,
        stack: &CallStack,
    ) -> Result<BindOutcome, InferError> {
        let ast = self.ast;

        let formals: Vec<(NodeId, &str)> = params
            .args
            .iter()
            .filter_map(|node| ast.name_of(*node).map(|name| (*node, name)))
            .collect();

        let mut positional = Vec::with_capacity(args.len());
        for arg in args {
            positional.push(self.infer(*arg, env, stack)?);
        }

        let mut named = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            if let NodeKind::Keyword { arg, value } = ast.kind(*keyword) {
                named.push((arg.as_str(), self.infer(*value, env, stack)?));
            }
        }

        let mut slots: Vec<Option<TypeSet>> = vec![None; formals.len()];
        for (slot, types) in slots.iter_mut().zip(&positional) {
            *slot = Some(types.clone());
        }

        // Excess positionals go to *vararg or reject the call
        let mut vararg_types = TypeSet::empty();
        if positional.len() > formals.len() {
            if params.vararg.is_none() {
                return Ok(BindOutcome::Rejected(Fault::TooManyArguments {
                    expected: formals.len(),
                    given: positional.len(),
                }));
            }
            for types in &positional[formals.len()..] {
                vararg_types.extend(types);
            }
        }

        let mut extra: Vec<(&str, TypeSet)> = Vec::new();
        for (name, types) in named {
            match formals.iter().position(|(_, formal)| *formal == name) {
                Some(i) if slots[i].is_some() => {
                    self.history.record_fault(
                        call,
                        Fault::MultipleValues {
                            name: name.to_string(),
                        },
                    );
                }
                Some(i) => slots[i] = Some(types),
                None if extra.iter().any(|(other, _)| *other == name) => {
                    self.history.record_fault(
                        call,
                        Fault::MultipleValues {
                            name: name.to_string(),
                        },
                    );
                }
                None => extra.push((name, types)),
            }
        }

        if params.kwarg.is_none() && !extra.is_empty() {
            self.history.record_fault(
                call,
                Fault::UnexpectedKeywords {
                    names: extra.iter().map(|(name, _)| name.to_string()).collect(),
                },
            );
        }

        // Defaults line up with the trailing formals
        let first_default = formals.len().saturating_sub(defaults.len());
        for (slot, default) in slots[first_default..].iter_mut().zip(defaults) {
            if slot.is_none() {
                *slot = Some(default.clone());
            }
        }

        let mut bound = Vec::with_capacity(formals.len() + 2);
        for ((node, name), slot) in formals.iter().zip(slots) {
            let types = match slot {
                Some(types) => types,
                None => {
                    self.history.record_fault(
                        call,
                        Fault::MissingArgument {
                            name: name.to_string(),
                        },
                    );
                    self.fresh_unknown().into()
                }
            };
            bound.push(BoundParam {
                name: name.to_string(),
                node: *node,
                types,
            });
        }

        if let Some(node) = params.vararg {
            if let Some(name) = ast.name_of(node) {
                bound.push(BoundParam {
                    name: name.to_string(),
                    node,
                    types: vararg_types,
                });
            }
        }

        if let Some(node) = params.kwarg {
            if let Some(name) = ast.name_of(node) {
                bound.push(BoundParam {
                    name: name.to_string(),
                    node,
                    types: Type::Dict.into(),
                });
            }
        }

        for param in &bound {
            self.history.record(param.node, &param.types);
        }

        let signature = bound
            .iter()
            .map(|param| (param.name.clone(), param.types.clone()))
            .collect();

        Ok(BindOutcome::Bound {
            params: bound,
            signature,
        })
    }
}
