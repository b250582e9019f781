//! Property-based check that printing binding declarations and parsing
//! the output again is the identity on the declaration sequence.
//!
//! Binding files are generated as text from small building blocks
//! (namespaces, classes with member selections, functions, enums) so the
//! parser sees the same shapes real binding files use.
#![cfg(feature = "proptest")]

use cppmm::hir::{lower_bindings, print_bindings, BindDecl};
use cppmm::FileId;
use proptest::prelude::*;

// ============================================================================
// PROPTEST STRATEGIES
// ============================================================================

/// Capitalized identifiers never collide with keywords or the root
/// namespace; lowercased ones get a prefix for the same reason.
fn arb_ident() -> impl Strategy<Value = String> {
    "[A-Z][a-z][a-zA-Z0-9_]{0,11}"
}

fn arb_type() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("int".to_string()),
        Just("unsigned long".to_string()),
        Just("const char*".to_string()),
        Just("double&".to_string()),
        arb_ident().prop_map(|name| format!("const ns::{}&", name)),
        arb_ident().prop_map(|name| format!("std::vector<{}>", name)),
        arb_ident().prop_map(|name| format!("{}**", name)),
    ]
}

fn arb_params() -> impl Strategy<Value = String> {
    prop::collection::vec((arb_type(), any::<bool>()), 0..4).prop_map(|params| {
        params
            .into_iter()
            .enumerate()
            .map(|(i, (ty, default))| {
                if default {
                    format!("{} p{} = 0", ty, i)
                } else {
                    format!("{} p{}", ty, i)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    })
}

fn arb_member(class: String) -> impl Strategy<Value = String> {
    prop_oneof![
        (arb_type(), arb_ident(), arb_params(), any::<bool>()).prop_map(|(ret, name, params, is_const)| {
            format!("{} {}({}){};", ret, name, params, if is_const { " const" } else { "" })
        }),
        (arb_type(), arb_ident()).prop_map(|(ty, name)| format!("{} m_{};", ty, name.to_lowercase())),
        (Just(class.clone()), arb_params()).prop_map(|(class, params)| format!("{}({});", class, params)),
        Just(format!("~{}();", class)),
        (Just(class), arb_ident()).prop_map(|(class, name)| format!("using {}::{};", class, name)),
        (arb_ident(), arb_ident()).prop_map(|(rename, name)| format!("CPPMM_RENAME(r{}) void {}();", rename, name)),
    ]
}

fn arb_markers() -> impl Strategy<Value = String> {
    (
        prop_oneof![
            Just(""),
            Just(" CPPMM_OPAQUEPTR"),
            Just(" CPPMM_OPAQUEBYTES"),
            Just(" CPPMM_VALUETYPE"),
        ],
        any::<bool>(),
    )
        .prop_map(|(policy, ignore)| {
            format!("{}{}", policy, if ignore { " CPPMM_IGNORE_UNBOUND" } else { "" })
        })
}

fn arb_class() -> impl Strategy<Value = String> {
    arb_ident().prop_flat_map(|name| {
        (
            prop::collection::vec(arb_member(name.clone()), 0..5),
            arb_markers(),
            prop_oneof![Just("class"), Just("struct")],
        )
            .prop_map(move |(members, markers, keyword)| {
                format!("{} {} {{ {} }}{};", keyword, name, members.join(" "), markers)
            })
    })
}

fn arb_item() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => arb_class(),
        2 => (arb_type(), arb_ident(), arb_params()).prop_map(|(ret, name, params)| format!("{} {}({});", ret, name, params)),
        1 => arb_ident().prop_map(|name| format!("using ns::{};", name)),
        1 => (arb_ident(), any::<bool>()).prop_map(|(name, scoped)| {
            format!("enum {}{} {{}};", if scoped { "class " } else { "" }, name)
        }),
        1 => arb_ident().prop_map(|name| format!("namespace a_{} = ::ns::{};", name.to_lowercase(), name)),
    ]
}

fn arb_file() -> impl Strategy<Value = String> {
    prop::collection::vec((prop::option::of(arb_ident()), prop::collection::vec(arb_item(), 1..4)), 1..4).prop_map(
        |blocks| {
            let body: Vec<String> = blocks
                .into_iter()
                .map(|(namespace, items)| match namespace {
                    Some(ns) => format!("namespace {} {{ {} }}", ns, items.join("\n")),
                    None => items.join("\n"),
                })
                .collect();
            format!("namespace cppmm_bind {{\n{}\n}}\n", body.join("\n"))
        },
    )
}

fn decls(text: &str) -> Vec<BindDecl> {
    let mut decls = match lower_bindings(FileId::new(0), text, "cppmm_bind") {
        Ok(file) => file.decls,
        Err(diagnostic) => panic!("{}\n{}", diagnostic, text),
    };
    for decl in &mut decls {
        decl.erase_locations();
    }
    decls
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_print_then_parse_is_identity(text in arb_file()) {
        let first = decls(&text);
        let printed = print_bindings(&first, "cppmm_bind");
        let second = decls(&printed);
        prop_assert_eq!(&first, &second, "printed:\n{}", printed);
    }

    #[test]
    fn prop_printing_is_stable(text in arb_file()) {
        let printed = print_bindings(&decls(&text), "cppmm_bind");
        let reprinted = print_bindings(&decls(&printed), "cppmm_bind");
        prop_assert_eq!(printed, reprinted);
    }
}
