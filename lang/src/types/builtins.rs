use std::collections::HashMap;

use crate::types::ty::{Type, TypeSet};

const CLASSES: &[&str] = &["int", "float", "str", "bool", "list", "dict", "tuple", "object", "type"];

/// Known global symbols, consulted when a name is not bound in scope
pub fn builtin_symbols() -> HashMap<&'static str, TypeSet> {
    let mut symbols = HashMap::new();

    symbols.insert("True", Type::primitive("bool").into());
    symbols.insert("False", Type::primitive("bool").into());
    symbols.insert("None", Type::none().into());

    for class in CLASSES {
        symbols.insert(*class, Type::class(class).into());
    }

    symbols.insert("len", function(&["obj"], Type::primitive("int")));
    symbols.insert("repr", function(&["obj"], Type::primitive("str")));
    symbols.insert("input", function(&["prompt"], Type::primitive("str")));
    symbols.insert("abs", function(&["x"], Type::primitive("int")));
    symbols.insert("isinstance", function(&["obj", "cls"], Type::primitive("bool")));
    symbols.insert(
        "range",
        function(&["stop"], Type::List(vec![Type::primitive("int").into()])),
    );
    symbols.insert("print", function(&["value"], Type::none()));

    symbols
}

/// What calling a built-in class yields
pub fn construct(class: &str) -> Option<Type> {
    match class {
        "int" | "float" | "str" | "bool" => Some(Type::primitive(class)),
        "list" => Some(Type::List(Vec::new())),
        "tuple" => Some(Type::Tuple(Vec::new())),
        "dict" => Some(Type::Dict),
        _ => None,
    }
}

fn function(params: &[&str], ret: Type) -> TypeSet {
    Type::Function {
        from: params
            .iter()
            .map(|name| (name.to_string(), TypeSet::empty()))
            .collect(),
        to: ret.into(),
    }
    .into()
}
