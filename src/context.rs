use crate::ast::Ast;
use crate::error::EvalError;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Variable bindings supplied to an evaluation.
///
/// Implemented for the std and `hashbrown` hash maps and for `BTreeMap`,
/// all keyed by `String` and holding [`Value`]s.
pub trait Variables {
    /// Value bound to `name`, if any
    fn get(&self, name: &str) -> Option<Value>;

    /// Value bound to a name equal to `name` ignoring ASCII case. The default
    /// only accepts exact matches.
    fn get_ignore_case(&self, name: &str) -> Option<Value> {
        self.get(name)
    }
}

impl<S: BuildHasher> Variables for HashMap<String, Value, S> {
    fn get(&self, name: &str) -> Option<Value> {
        HashMap::get(self, name).cloned()
    }

    fn get_ignore_case(&self, name: &str) -> Option<Value> {
        Variables::get(self, name).or_else(|| find_ignore_case(self.iter(), name))
    }
}

impl<S: BuildHasher> Variables for hashbrown::HashMap<String, Value, S> {
    fn get(&self, name: &str) -> Option<Value> {
        hashbrown::HashMap::get(self, name).cloned()
    }

    fn get_ignore_case(&self, name: &str) -> Option<Value> {
        Variables::get(self, name).or_else(|| find_ignore_case(self.iter(), name))
    }
}

impl Variables for BTreeMap<String, Value> {
    fn get(&self, name: &str) -> Option<Value> {
        BTreeMap::get(self, name).cloned()
    }

    fn get_ignore_case(&self, name: &str) -> Option<Value> {
        Variables::get(self, name).or_else(|| find_ignore_case(self.iter(), name))
    }
}

fn find_ignore_case<'a>(
    mut entries: impl Iterator<Item = (&'a String, &'a Value)>,
    name: &str,
) -> Option<Value> {
    entries
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.clone())
}

/// The state of one evaluation: the variable bindings and how to look them
/// up. Functions receive it to evaluate their arguments.
pub struct Scope<'a> {
    variables: &'a dyn Variables,
    ignore_case: bool,
}

impl<'a> Scope<'a> {
    /// A scope looking up `variables`, ignoring ASCII case or not
    pub fn new(variables: &'a dyn Variables, ignore_case: bool) -> Self {
        Self {
            variables,
            ignore_case,
        }
    }

    /// Value of the variable `name`, or `EvalError::UnknownVariable`
    pub fn variable(&self, name: &str) -> Result<Value, EvalError> {
        let value = if self.ignore_case {
            self.variables.get_ignore_case(name)
        } else {
            self.variables.get(name)
        };
        value.ok_or_else(|| EvalError::UnknownVariable {
            name: name.to_owned(),
        })
    }

    /// Evaluate a sub-expression in this scope
    pub fn evaluate(&self, ast: &Ast) -> Result<Value, EvalError> {
        crate::expr::evaluate(ast, self)
    }

    /// Evaluate all the `args`, left to right
    pub fn evaluate_all(&self, args: &[Ast]) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|arg| self.evaluate(arg)).collect()
    }
}
