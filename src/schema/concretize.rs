use super::types::{
    FuncSig, InterfaceMethod, InterfaceType, ListType, MapType, NamedType, Param, StructField,
    StructType, Type,
};

/// Substitute `args` for the type parameters referenced in `ty`.
///
/// Returns a fresh copy and never touches declarations: a named type only has
/// its arguments rewritten. References past the end of `args` are left as
/// they are.
#[must_use]
pub fn concretize(ty: &Type, args: &[Type]) -> Type {
    if args.is_empty() {
        return ty.clone();
    }
    match ty {
        Type::TypeParam(param) => match args.get(param.index) {
            Some(arg) => arg.clone(),
            None => ty.clone(),
        },
        Type::Named(named) => Type::Named(NamedType {
            key: named.key.clone(),
            decl: named.decl.clone(),
            args: concretize_all(&named.args, args),
        }),
        Type::Struct(st) => Type::Struct(StructType {
            fields: st
                .fields
                .iter()
                .map(|field| StructField {
                    ty: concretize(&field.ty, args),
                    ..field.clone()
                })
                .collect(),
        }),
        Type::Map(map) => Type::Map(MapType {
            key: Box::new(concretize(&map.key, args)),
            value: Box::new(concretize(&map.value, args)),
        }),
        Type::List(list) => Type::List(ListType {
            elem: Box::new(concretize(&list.elem, args)),
            len: list.len,
        }),
        Type::Pointer(elem) => Type::Pointer(Box::new(concretize(elem, args))),
        Type::Option(elem) => Type::Option(Box::new(concretize(elem, args))),
        Type::Func(sig) => Type::Func(concretize_sig(sig, args)),
        Type::Interface(iface) => Type::Interface(InterfaceType {
            embeds: concretize_all(&iface.embeds, args),
            methods: iface
                .methods
                .iter()
                .map(|method| InterfaceMethod {
                    sig: concretize_sig(&method.sig, args),
                    ..method.clone()
                })
                .collect(),
            terms: concretize_all(&iface.terms, args),
        }),
        Type::Builtin(_) => ty.clone(),
    }
}

#[must_use]
pub fn concretize_sig(sig: &FuncSig, args: &[Type]) -> FuncSig {
    let params = |list: &[Param]| {
        list.iter()
            .map(|param| Param {
                name: param.name.clone(),
                ty: concretize(&param.ty, args),
            })
            .collect()
    };
    FuncSig {
        params: params(&sig.params),
        results: params(&sig.results),
        variadic: sig.variadic,
    }
}

fn concretize_all(types: &[Type], args: &[Type]) -> Vec<Type> {
    types.iter().map(|ty| concretize(ty, args)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::struct_tag::StructTag;
    use crate::schema::types::{BuiltinKind, TypeParamRef};

    fn param(index: usize, name: &str) -> Type {
        Type::TypeParam(TypeParamRef {
            index,
            name: name.into(),
        })
    }

    fn field(name: &str, ty: Type) -> StructField {
        StructField {
            name: name.into(),
            ty,
            embedded: false,
            raw_tag: None,
            tag: StructTag::default(),
            doc: None,
        }
    }

    #[test]
    fn substitutes_each_instantiation_independently() {
        let body = Type::Struct(StructType {
            fields: vec![
                field("Value", param(0, "T")),
                field("Items", Type::slice(Type::pointer(param(0, "T")))),
            ],
        });
        let int = [Type::Builtin(BuiltinKind::Int)];
        let string = [Type::Builtin(BuiltinKind::String)];

        let first = concretize(&body, &int);
        let again = concretize(&body, &int);
        let other = concretize(&body, &string);
        assert_eq!(first, again);
        assert_eq!(first.to_string(), "struct{Value int; Items []*int}");
        assert_eq!(other.to_string(), "struct{Value string; Items []*string}");
        assert_eq!(body.to_string(), "struct{Value T; Items []*T}");
    }

    #[test]
    fn out_of_range_parameters_pass_through() {
        let ty = Type::Map(MapType {
            key: Box::new(param(0, "K")),
            value: Box::new(param(1, "V")),
        });
        let result = concretize(&ty, &[Type::Builtin(BuiltinKind::String)]);
        assert_eq!(result.to_string(), "map[string]V");
    }
}
