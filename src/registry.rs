use crate::error::RegistryError;
use crate::functions::{standard_functions, Function};
use crate::lexer::{is_variable, is_variable_part};
use crate::operators::{standard_operators, Operator};
use hashbrown::HashMap;
use std::fmt;
use std::sync::Arc;

lazy_static! {
    /// The registry holding the standard operator and function catalogs
    pub static ref STANDARD: Arc<Registry> = Arc::new(Registry::standard());
}

/// Operators and functions known to the parser.
///
/// A registry is populated before compiling expressions and is read-only
/// afterwards: it is shared between engines through an `Arc`, and compiled
/// expressions keep the functions they call.
#[derive(Clone, Default)]
pub struct Registry {
    operators: HashMap<String, Arc<dyn Operator>>,
    // lowercase tag => registered tag
    operator_tags: HashMap<String, String>,
    longest_tag: usize,
    functions: HashMap<String, Arc<dyn Function>>,
    // lowercase name => registered name
    function_names: HashMap<String, String>,
}

impl Registry {
    /// An empty registry, without any operator or function
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the standard operators and functions
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for operator in standard_operators() {
            let added = registry.add_operator(Arc::from(operator));
            debug_assert!(added.is_ok(), "{:?}", added);
        }
        for function in standard_functions() {
            let added = registry.register_function(function);
            debug_assert!(added.is_ok(), "{:?}", added);
        }
        tracing::debug!(
            operators = registry.operator_tags.len(),
            functions = registry.functions.len(),
            "built the standard registry"
        );
        registry
    }

    /// Add an operator for all its tags. Nothing is added if one of the tags
    /// is invalid or already claimed, even with a different case.
    pub fn register_operator<O: Operator + 'static>(&mut self, operator: O) -> Result<(), RegistryError> {
        self.add_operator(Arc::new(operator))
    }

    fn add_operator(&mut self, operator: Arc<dyn Operator>) -> Result<(), RegistryError> {
        let tags = operator.tags();
        for (i, tag) in tags.iter().enumerate() {
            if tag.is_empty() || tag.chars().any(|c| c.is_whitespace() || matches!(c, '(' | ')' | ',')) {
                return Err(RegistryError::InvalidTag { tag: (*tag).to_owned() });
            }
            let lowercase = tag.to_lowercase();
            let repeated = tags[..i].iter().any(|other| other.to_lowercase() == lowercase);
            if repeated || self.operator_tags.contains_key(&lowercase) {
                return Err(RegistryError::DuplicateOperatorTag { tag: (*tag).to_owned() });
            }
        }

        for tag in tags {
            tracing::trace!(tag, "registering operator");
            self.longest_tag = self.longest_tag.max(tag.len());
            self.operator_tags.insert(tag.to_lowercase(), (*tag).to_owned());
            self.operators.insert((*tag).to_owned(), Arc::clone(&operator));
        }
        Ok(())
    }

    /// Add a function. Names must be identifiers, and are unique ignoring
    /// case.
    pub fn register_function<F: Function + 'static>(&mut self, function: F) -> Result<(), RegistryError> {
        let name = function.name().to_owned();
        if !is_variable(&name) {
            return Err(RegistryError::InvalidFunctionName { name });
        }
        let lowercase = name.to_lowercase();
        if self.function_names.contains_key(&lowercase) {
            return Err(RegistryError::DuplicateFunction { name });
        }

        tracing::trace!(name = name.as_str(), "registering function");
        self.function_names.insert(lowercase, name.clone());
        self.functions.insert(name, Arc::new(function));
        Ok(())
    }

    /// Remove the function registered as `name`, returning it
    pub fn remove_function(&mut self, name: &str) -> Option<Arc<dyn Function>> {
        let function = self.functions.remove(name)?;
        self.function_names.remove(&name.to_lowercase());
        Some(function)
    }

    /// The operator claiming `tag`
    #[must_use]
    pub fn operator(&self, tag: &str, ignore_case: bool) -> Option<&Arc<dyn Operator>> {
        match self.operators.get(tag) {
            Some(operator) => Some(operator),
            None if ignore_case => self
                .operator_tags
                .get(&tag.to_lowercase())
                .and_then(|tag| self.operators.get(tag)),
            None => None,
        }
    }

    /// The function called `name`
    #[must_use]
    pub fn function(&self, name: &str, ignore_case: bool) -> Option<&Arc<dyn Function>> {
        match self.functions.get(name) {
            Some(function) => Some(function),
            None if ignore_case => self
                .function_names
                .get(&name.to_lowercase())
                .and_then(|name| self.functions.get(name)),
            None => None,
        }
    }

    /// Length in bytes of the longest operator tag starting `input`.
    ///
    /// A tag ending with a letter or digit only matches when it is not
    /// directly followed by another identifier character, so that `and` is
    /// not found at the start of `android`.
    pub(crate) fn match_operator(&self, input: &str, ignore_case: bool) -> Option<usize> {
        let longest = self.longest_tag.min(input.len());
        (1..=longest).rev().find(|&len| {
            if !input.is_char_boundary(len) {
                return false;
            }
            let (candidate, rest) = input.split_at(len);
            if self.operator(candidate, ignore_case).is_none() {
                return false;
            }
            let ends_word = candidate.chars().last().map_or(false, is_variable_part);
            let continues = rest.chars().next().map_or(false, is_variable_part);
            !(ends_word && continues)
        })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let mut operators: Vec<_> = self.operators.keys().collect();
        operators.sort_unstable();
        let mut functions: Vec<_> = self.functions.keys().collect();
        functions.sort_unstable();
        fmt.debug_struct("Registry")
            .field("operators", &operators)
            .field("functions", &functions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, BinaryOp};
    use crate::context::Scope;
    use crate::error::EvalError;
    use crate::functions::{Arity, NativeFunction};
    use crate::operators::BinaryOperator;
    use crate::token::Precedence;
    use crate::value::Value;
    use test_case::test_case;

    fn zero(_: &[Ast], _: &Scope) -> Result<Value, EvalError> {
        Ok(Value::Integer(0))
    }

    #[test_case("<=", false => Some(2) ; "two characters")]
    #[test_case("<<=", false => Some(2) ; "longest tag wins")]
    #[test_case("< 3", false => Some(1) ; "single character")]
    #[test_case("and b", false => Some(3) ; "word tag")]
    #[test_case("android", false => None ; "word tag inside an identifier")]
    #[test_case("and(b)", false => Some(3) ; "word tag before parenthesis")]
    #[test_case("OR x", false => None ; "case sensitive")]
    #[test_case("OR x", true => Some(2) ; "case insensitive")]
    #[test_case("é", false => None ; "multibyte input")]
    fn match_operator(input: &str, ignore_case: bool) -> Option<usize> {
        STANDARD.match_operator(input, ignore_case)
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut registry = Registry::standard();
        assert_eq!(
            registry.register_operator(BinaryOperator::new(&["AND"], Precedence::LogicalAnd, BinaryOp::And)),
            Err(RegistryError::DuplicateOperatorTag { tag: "AND".into() })
        );
        assert_eq!(
            registry.register_function(NativeFunction::new("abs", Arity::exactly(1), zero)),
            Err(RegistryError::DuplicateFunction { name: "abs".into() })
        );
    }

    #[test]
    fn invalid_names() {
        let mut registry = Registry::new();
        assert_eq!(
            registry.register_operator(BinaryOperator::new(&["a b"], Precedence::Additive, BinaryOp::Add)),
            Err(RegistryError::InvalidTag { tag: "a b".into() })
        );
        assert_eq!(
            registry.register_operator(BinaryOperator::new(&["+", ""], Precedence::Additive, BinaryOp::Add)),
            Err(RegistryError::InvalidTag { tag: "".into() })
        );
        // a failed registration leaves nothing behind
        assert!(registry.operator("+", false).is_none());
        assert_eq!(
            registry.register_function(NativeFunction::new("2x", Arity::exactly(0), zero)),
            Err(RegistryError::InvalidFunctionName { name: "2x".into() })
        );
    }

    #[test]
    fn custom_entries() {
        let mut registry = Registry::new();
        registry
            .register_operator(BinaryOperator::new(&["plus"], Precedence::Additive, BinaryOp::Add))
            .unwrap();
        registry
            .register_function(NativeFunction::new("Zero", Arity::exactly(0), zero))
            .unwrap();

        assert!(registry.operator("plus", false).is_some());
        assert!(registry.operator("PLUS", false).is_none());
        assert!(registry.operator("PLUS", true).is_some());
        assert!(registry.function("zero", true).is_some());
        assert!(registry.function("zero", false).is_none());

        assert!(registry.remove_function("Zero").is_some());
        assert!(registry.function("zero", true).is_none());
        assert!(registry.remove_function("Zero").is_none());
        // the name is free again
        registry
            .register_function(NativeFunction::new("zero", Arity::exactly(0), zero))
            .unwrap();
    }
}
