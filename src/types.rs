//! Value types: there is no separate "primitive" variant, just an identifier whose name happens
//! to be one of [`PRIMITIVE_NAMES`], or the name of a user-declared struct.

/// The fixed set of built-in primitive type names recognised by the binder and lowering engine.
pub const PRIMITIVE_NAMES: &[&str] = &["int", "float", "double", "void", "string", "byte", "bool", "char"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// A primitive name or a user struct name.
    Identifier(String),
    Pointer(Box<Type>),
}

impl Type {
    pub fn identifier(name: impl Into<String>) -> Type {
        Type::Identifier(name.into())
    }

    pub fn pointer_of(inner: Type) -> Type {
        Type::Pointer(Box::new(inner))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Identifier(name) if PRIMITIVE_NAMES.contains(&name.as_str()))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Identifier(name) if name == "void")
    }

    /// Canonical textual form. Equality between types is defined as equality of this string.
    pub fn to_string(&self) -> String {
        match self {
            Type::Identifier(name) => name.clone(),
            Type::Pointer(inner) => format!("{}*", inner.to_string()),
        }
    }

    /// Walks through every pointer layer, yielding the innermost identifier name.
    pub fn base_of(&self) -> &str {
        match self {
            Type::Identifier(name) => name,
            Type::Pointer(inner) => inner.base_of(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_string_roundtrips_through_pointer_layers() {
        let t = Type::pointer_of(Type::pointer_of(Type::identifier("int")));
        assert_eq!(t.to_string(), "int**");
    }

    #[test]
    fn base_of_ignores_pointer_depth() {
        let t1 = Type::identifier("Point");
        let t2 = Type::pointer_of(Type::pointer_of(t1.clone()));
        assert_eq!(t1.base_of(), t2.base_of());
    }

    #[test]
    fn equality_is_nominal_on_string_form() {
        let a = Type::pointer_of(Type::identifier("int"));
        let b = Type::pointer_of(Type::identifier("int"));
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a, b);
    }

    #[test]
    fn primitive_detection() {
        assert!(Type::identifier("int").is_primitive());
        assert!(!Type::identifier("Point").is_primitive());
        assert!(!Type::pointer_of(Type::identifier("int")).is_primitive());
    }
}
