//! Type and member declarations.

use crate::stmt::Block;
use crate::types::TypeRef;
use serde::{Deserialize, Serialize};

/// The separator between a type name and a member name in full member names.
pub const MEMBER_SEPARATOR: &str = "::";

/// The member name constructors are declared under.
pub const CONSTRUCTOR_NAME: &str = ".ctor";

/// Builds the full name of a member: `Ns.Type::Member`.
pub fn member_full_name(type_name: &str, member: &str) -> String {
    format!("{type_name}{MEMBER_SEPARATOR}{member}")
}

/// Splits a full member name into type name and member name.
pub fn split_member_name(full_name: &str) -> Option<(&str, &str)> {
    full_name.rsplit_once(MEMBER_SEPARATOR)
}

/// The kind of a user-declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// A reference type.
    Class,
    /// A value type.
    Struct,
    /// An interface.
    Interface,
}

/// Visibility of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    /// Accessible from outside the declaring type.
    Public,
    /// Accessible only inside the declaring type.
    Private,
}

/// Modifiers of a method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    /// Declared `static`.
    pub is_static: bool,
    /// Declared `virtual`.
    pub is_virtual: bool,
    /// Declared `override`.
    pub is_override: bool,
    /// Declared `abstract` (no body).
    pub is_abstract: bool,
}

/// Whether a method is an ordinary method or a constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    /// A named method.
    Method,
    /// An instance constructor, named [`CONSTRUCTOR_NAME`].
    Constructor,
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: TypeRef,
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Field name.
    pub name: String,
    /// Declared type.
    pub ty: TypeRef,
    /// Declared `static`.
    pub is_static: bool,
    /// Declared `const` or `readonly` with a constant initializer.
    pub is_const: bool,
    /// Initial value.
    pub initializer: Option<crate::expr::Expr>,
}

/// An auto-property declaration; it behaves like a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyDecl {
    /// Property name.
    pub name: String,
    /// Declared type.
    pub ty: TypeRef,
    /// Declared `static`.
    pub is_static: bool,
    /// Whether the property has a publicly usable setter.
    pub has_setter: bool,
}

/// A method or constructor declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDecl {
    /// Simple name; constructors use [`CONSTRUCTOR_NAME`].
    pub name: String,
    /// Method or constructor.
    pub kind: MethodKind,
    /// Parameters in declaration order.
    pub params: Vec<Param>,
    /// Return type; [`TypeRef::Void`] for none.
    pub return_type: TypeRef,
    /// Body; `None` for abstract and interface methods.
    pub body: Option<Block>,
    /// Modifiers.
    pub modifiers: Modifiers,
    /// Visibility.
    pub visibility: Visibility,
}

impl MethodDecl {
    /// Returns `true` if the method is invoked on an instance.
    pub fn is_instance(&self) -> bool {
        !self.modifiers.is_static
    }

    /// Returns `true` for constructors.
    pub fn is_constructor(&self) -> bool {
        self.kind == MethodKind::Constructor
    }

    /// Looks up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// A member of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Member {
    /// A field.
    Field(FieldDecl),
    /// An auto-property.
    Property(PropertyDecl),
    /// A method or constructor.
    Method(MethodDecl),
}

impl Member {
    /// The member's simple name.
    pub fn name(&self) -> &str {
        match self {
            Member::Field(f) => &f.name,
            Member::Property(p) => &p.name,
            Member::Method(m) => &m.name,
        }
    }

    /// Returns the method declaration, if this member is a method.
    pub fn as_method(&self) -> Option<&MethodDecl> {
        match self {
            Member::Method(m) => Some(m),
            _ => None,
        }
    }

    /// The member's value type: field/property type or method return type.
    pub fn value_type(&self) -> &TypeRef {
        match self {
            Member::Field(f) => &f.ty,
            Member::Property(p) => &p.ty,
            Member::Method(m) => &m.return_type,
        }
    }
}

/// A class, struct or interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Fully qualified name (`Ns.Type`).
    pub name: String,
    /// Class, struct or interface.
    pub kind: TypeKind,
    /// Base class, if any.
    pub base: Option<String>,
    /// Implemented interfaces.
    pub interfaces: Vec<String>,
    /// Declared `abstract`.
    pub is_abstract: bool,
    /// Members in declaration order.
    pub members: Vec<Member>,
}

impl TypeDecl {
    /// Looks up a member by simple name.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name() == name)
    }

    /// Looks up a method by simple name.
    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.member(name).and_then(Member::as_method)
    }

    /// Iterates over the type's methods and constructors.
    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(Member::as_method)
    }

    /// Iterates over instance fields and instance auto-properties as
    /// `(name, type)` pairs, in declaration order.
    pub fn instance_storage(&self) -> impl Iterator<Item = (&str, &TypeRef)> {
        self.members.iter().filter_map(|m| match m {
            Member::Field(f) if !f.is_static => Some((f.name.as_str(), &f.ty)),
            Member::Property(p) if !p.is_static => Some((p.name.as_str(), &p.ty)),
            _ => None,
        })
    }

    /// Returns `true` for interfaces.
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }
}

/// The root of a decompiled program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyntaxTree {
    /// Every type of the program, in a stable order.
    pub types: Vec<TypeDecl>,
}

impl SyntaxTree {
    /// Creates a tree from its types.
    pub fn new(types: Vec<TypeDecl>) -> Self {
        Self { types }
    }

    /// Looks up a type by full name.
    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Looks up a member by full member name.
    pub fn find_member(&self, full_name: &str) -> Option<(&TypeDecl, &Member)> {
        let (type_name, member) = split_member_name(full_name)?;
        let ty = self.find_type(type_name)?;
        Some((ty, ty.member(member)?))
    }

    /// Looks up a method by full member name.
    pub fn find_method(&self, full_name: &str) -> Option<(&TypeDecl, &MethodDecl)> {
        let (ty, member) = self.find_member(full_name)?;
        Some((ty, member.as_method()?))
    }

    /// Iterates over every method in the tree with its declaring type.
    pub fn methods(&self) -> impl Iterator<Item = (&TypeDecl, &MethodDecl)> {
        self.types
            .iter()
            .flat_map(|t| t.methods().map(move |m| (t, m)))
    }

    /// Returns every direct and indirect base type and interface of `name`.
    pub fn supertypes(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut pending = vec![name.to_string()];
        while let Some(current) = pending.pop() {
            let Some(ty) = self.find_type(&current) else {
                continue;
            };
            for parent in ty.base.iter().chain(ty.interfaces.iter()) {
                if !out.contains(parent) {
                    out.push(parent.clone());
                    pending.push(parent.clone());
                }
            }
        }
        out
    }

    /// Returns `true` if `name` is `ancestor` or derives from it.
    pub fn is_subtype_of(&self, name: &str, ancestor: &str) -> bool {
        name == ancestor || self.supertypes(name).iter().any(|s| s == ancestor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::*;
    use crate::types::IntType;

    fn tree() -> SyntaxTree {
        SyntaxTree::new(vec![
            interface("Ns.IShape", vec![abstract_method("Area", vec![], u32_ty())]),
            class("Ns.Square")
                .implements("Ns.IShape")
                .field("side", u32_ty())
                .method(public_instance(
                    "Area",
                    vec![],
                    u32_ty(),
                    vec![ret(mul(field(this(), "Ns.Square", "side"), field(this(), "Ns.Square", "side")))],
                ))
                .build(),
        ])
    }

    #[test]
    fn full_names_round_trip() {
        let full = member_full_name("Ns.Type", "Run");
        assert_eq!(full, "Ns.Type::Run");
        assert_eq!(split_member_name(&full), Some(("Ns.Type", "Run")));
    }

    #[test]
    fn member_lookup() {
        let tree = tree();
        let (ty, method) = tree.find_method("Ns.Square::Area").unwrap();
        assert_eq!(ty.name, "Ns.Square");
        assert_eq!(method.return_type, TypeRef::Int(IntType::U32));
        assert!(tree.find_method("Ns.Square::side").is_none());
        assert!(tree.find_member("Ns.Square::side").is_some());
    }

    #[test]
    fn supertypes_include_interfaces() {
        let tree = tree();
        assert_eq!(tree.supertypes("Ns.Square"), vec!["Ns.IShape"]);
        assert!(tree.is_subtype_of("Ns.Square", "Ns.IShape"));
        assert!(!tree.is_subtype_of("Ns.IShape", "Ns.Square"));
    }

    #[test]
    fn instance_storage_lists_fields() {
        let tree = tree();
        let square = tree.find_type("Ns.Square").unwrap();
        let names: Vec<_> = square.instance_storage().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["side"]);
    }
}
