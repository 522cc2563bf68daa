//! Integration tests for the object text format
//!
//! Tests cover:
//! - Writing and reading single objects
//! - Shared references, cycles and inline mode
//! - Dummy and dangling references
//! - Unknown and legacy options
//! - Binary mode
//! - Parent links and graph traversal

mod common;

use common::{register_all, Linear, Node, Pair};
use plearn_core::graph::{collect_objects, read_object, write_object};
use plearn_core::prelude::*;
use plearn_core::{write_object_to_string, PStream, PointerMode, StreamMode};

fn node(name: &str) -> ObjRef {
    register_all();
    let obj = factory::new_object("Node").unwrap();
    obj.with_mut(|n: &mut Node| n.name = name.to_string()).unwrap();
    obj
}

fn children(obj: &ObjRef) -> Vec<ObjRef> {
    obj.with(|n: &Node| n.children.clone()).unwrap()
}

fn next(obj: &ObjRef) -> Option<ObjRef> {
    obj.with(|n: &Node| n.next.clone()).unwrap()
}

// ============================================================================
// Single objects
// ============================================================================

#[test]
fn test_pair_nosave_option_is_not_reloaded() {
    register_all();
    let obj = load_object_from_str("Pair(first=3; second=7)").unwrap();
    assert_eq!(obj.with(|p: &Pair| (p.first, p.second)).unwrap(), (3, 7.0));
    assert_eq!(obj.borrow().unwrap().options_to_save(), vec!["first"]);

    let text = obj.borrow().unwrap().as_string().unwrap();
    assert_eq!(text, "Pair(first = 3)");

    let reloaded = load_object_from_str(&text).unwrap();
    let (first, second, builds) = reloaded
        .with(|p: &Pair| (p.first, p.second, p.builds))
        .unwrap();
    assert_eq!(first, 3);
    assert_eq!(second, 0.0);
    assert_eq!(builds, 1);
}

#[test]
fn test_comments_and_separators_are_ignored() {
    register_all();
    let text = "# saved model\nLinear(\n  bias = 1.5, # constant\n  weights = [1, 2];\n)\n";
    let obj = load_object_from_str(text).unwrap();
    assert_eq!(obj.with(|l: &Linear| (l.bias, l.weights.clone())).unwrap(), (1.5, vec![1.0, 2.0]));
}

#[test]
fn test_rebuild_is_idempotent() {
    register_all();
    let obj = load_object_from_str("Linear(weights = [1, 2]; scale = 3)").unwrap();
    let before = {
        let guard = obj.borrow().unwrap();
        (guard.as_string().unwrap(), guard.get_option("cache").unwrap())
    };
    assert_eq!(before.1, "[3, 6]");
    obj.borrow_mut().unwrap().build().unwrap();
    obj.borrow_mut().unwrap().build().unwrap();
    let after = {
        let guard = obj.borrow().unwrap();
        (guard.as_string().unwrap(), guard.get_option("cache").unwrap())
    };
    assert_eq!(before, after);
    assert_eq!(obj.with(|l: &Linear| l.norm).unwrap(), 5.0);
}

#[test]
fn test_newread_checks_class() {
    register_all();
    let obj = factory::new_object("Pair").unwrap();
    let mut io = PStream::from_text("Pair(first = 8)");
    obj.borrow_mut().unwrap().newread(&mut io).unwrap();
    assert_eq!(obj.with(|p: &Pair| p.first).unwrap(), 8);

    let mut io = PStream::from_text("Node(name = \"x\")");
    let err = obj.borrow_mut().unwrap().newread(&mut io).unwrap_err();
    assert!(matches!(
        err,
        PLearnError::ClassMismatch { expected, found } if expected == "Pair" && found == "Node"
    ));
}

#[test]
fn test_unknown_class_in_stream() {
    register_all();
    let err = load_object_from_str("Mystery(a = 1)").unwrap_err();
    assert!(matches!(err.root_cause(), PLearnError::UnknownClass(name) if name == "Mystery"));
}

// ============================================================================
// Unknown and legacy options
// ============================================================================

#[test]
fn test_unknown_options_are_skipped() {
    register_all();
    let text = r#"Pair(first = 3; bogus = Foo(a = [1, 2]; b = "x;y)"); other = {k: [1]}; second = 4)"#;
    let obj = load_object_from_str(text).unwrap();
    assert_eq!(obj.with(|p: &Pair| (p.first, p.second)).unwrap(), (3, 4.0));
}

#[test]
fn test_definitions_inside_unknown_options_stay_referenceable() {
    register_all();
    let obj = load_object_from_str("Linear(oldsub = *1->Linear(bias = 2); sub = *1)").unwrap();
    let sub = obj.with(|l: &Linear| l.sub.clone()).unwrap().unwrap();
    assert_eq!(sub.with(|l: &Linear| l.bias).unwrap(), 2.0);

    // Unregistered wrappers are skipped as text, definitions inside them are not.
    let text = r#"Node(extra = Foo(x = *2->Node(name = "k"); y = [*0]); peer = *2)"#;
    let obj = load_object_from_str(text).unwrap();
    let peer = obj.with(|n: &Node| n.peer.clone()).unwrap().unwrap();
    assert_eq!(peer.with(|n: &Node| n.name.clone()).unwrap(), "k");
}

#[test]
fn test_legacy_option_is_read_but_discarded() {
    register_all();
    let obj = load_object_from_str("Linear(legacy = 5; bias = 2)").unwrap();
    assert_eq!(obj.with(|l: &Linear| (l.legacy, l.bias)).unwrap(), (0, 2.0));

    // Legacy values must still parse.
    assert!(load_object_from_str("Linear(legacy = [1, 2])").is_err());
}

#[test]
fn test_compound_names_in_stream() {
    register_all();
    let obj = load_object_from_str("Linear(weights = [1, 2]; weights[1] = 7; sub = Linear(); sub.bias = 3)").unwrap();
    let guard = obj.borrow().unwrap();
    assert_eq!(guard.get_option("weights").unwrap(), "[1, 7]");
    assert_eq!(guard.get_option("sub.bias").unwrap(), "3");
}

// ============================================================================
// Shared references
// ============================================================================

#[test]
fn test_shared_children_stay_shared() {
    let root = node("root");
    let a = node("a");
    root.with_mut(|n: &mut Node| n.children = vec![a.clone(), a.clone()]).unwrap();

    let text = write_object_to_string(&root).unwrap();
    assert_eq!(
        text,
        r#"*1->Node(name = "root"; next = *0; children = [*2->Node(name = "a"; next = *0; children = []; peer = *0), *2]; peer = *0)"#
    );

    let reloaded = load_object_from_str(&text).unwrap();
    let kids = children(&reloaded);
    assert_eq!(kids.len(), 2);
    assert!(kids[0].ptr_eq(&kids[1]));
    assert!(!kids[0].ptr_eq(&reloaded));
}

#[test]
fn test_inline_mode_duplicates_shared_children() {
    let root = node("root");
    let a = node("a");
    root.with_mut(|n: &mut Node| n.children = vec![a.clone(), a]).unwrap();

    let mut io = PStream::new()
        .with_mode(StreamMode::PlearnAscii)
        .with_pointer_mode(PointerMode::Inline);
    write_object(&mut io, &root).unwrap();
    let text = io.output_string().unwrap();
    assert!(!text.contains("->"));

    let reloaded = load_object_from_str(&text).unwrap();
    let kids = children(&reloaded);
    assert!(!kids[0].ptr_eq(&kids[1]));
    assert_eq!(kids[1].with(|n: &Node| n.name.clone()).unwrap(), "a");
}

#[test]
fn test_cycle_round_trip() {
    let a = node("a");
    let b = node("b");
    a.with_mut(|n: &mut Node| n.next = Some(b.clone())).unwrap();
    b.with_mut(|n: &mut Node| n.next = Some(a.clone())).unwrap();

    let text = write_object_to_string(&a).unwrap();
    assert!(text.contains("next = *1"));

    let reloaded = load_object_from_str(&text).unwrap();
    let second = next(&reloaded).unwrap();
    let back = next(&second).unwrap();
    assert!(back.ptr_eq(&reloaded));
    assert_eq!(second.with(|n: &Node| n.name.clone()).unwrap(), "b");

    // The object that closes the cycle gets its reader as parent.
    assert_eq!(second.with(|n: &Node| n.parent_name()).unwrap().as_deref(), Some("a"));
}

#[test]
fn test_inline_mode_rejects_cycles() {
    let a = node("a");
    let b = node("b");
    a.with_mut(|n: &mut Node| n.next = Some(b.clone())).unwrap();
    b.with_mut(|n: &mut Node| n.next = Some(a.clone())).unwrap();

    let mut io = PStream::new().with_pointer_mode(PointerMode::Inline);
    let err = write_object(&mut io, &a).unwrap_err();
    assert!(matches!(err.root_cause(), PLearnError::Cycle(class) if class == "Node"));
}

#[test]
fn test_null_reference() {
    register_all();
    let mut io = PStream::from_text("*0");
    assert!(read_object(&mut io).unwrap().is_none());
    assert!(load_object_from_str("*0").is_err());
}

// ============================================================================
// Dummy and dangling references
// ============================================================================

#[test]
fn test_top_level_dummy_reads_as_null() {
    register_all();
    let mut io = PStream::from_text("*4; *5->Node(name = \"n\")");
    assert!(read_object(&mut io).unwrap().is_none());
    io.skip_separators();
    let obj = read_object(&mut io).unwrap().unwrap();
    assert_eq!(obj.with(|n: &Node| n.name.clone()).unwrap(), "n");
}

#[test]
fn test_dereferencing_a_dummy_fails() {
    register_all();
    let mut io = PStream::from_text("*4; Node(next = *4)");
    assert!(read_object(&mut io).unwrap().is_none());
    io.skip_separators();
    let err = read_object(&mut io).unwrap_err();
    assert!(matches!(err.root_cause(), PLearnError::DummyReference(4)));
    assert!(err.to_string().contains("*4;"));
}

#[test]
fn test_undefined_reference_inside_a_definition_is_dangling() {
    register_all();
    let err = load_object_from_str("Node(next = *9; name = \"x\")").unwrap_err();
    assert!(matches!(err.root_cause(), PLearnError::DanglingReference(9)));

    let err = load_object_from_str("Node(name = \"x\"; next = *4;)").unwrap_err();
    assert!(matches!(err.root_cause(), PLearnError::DanglingReference(4)));
}

#[test]
fn test_dangling_reference_fails() {
    register_all();
    let err = load_object_from_str("Node(next = *9)").unwrap_err();
    assert!(matches!(err.root_cause(), PLearnError::DanglingReference(9)));
}

#[test]
fn test_backreference_to_object_defined_earlier() {
    register_all();
    let obj = load_object_from_str("Node(next = *3->Node(name = \"n\"); peer = *3)").unwrap();
    let (n, p) = obj.with(|n: &Node| (n.next.clone(), n.peer.clone())).unwrap();
    assert!(n.unwrap().ptr_eq(&p.unwrap()));
}

// ============================================================================
// Binary mode
// ============================================================================

#[test]
fn test_binary_round_trip() {
    register_all();
    let obj = load_object_from_str(
        "Linear(weights = [0.25, -1]; bias = 3.5; seed = 123456789012; trained = true; table = {a: 1})",
    )
    .unwrap();

    let mut out = PStream::new().with_mode(StreamMode::PlearnBinary);
    write_object(&mut out, &obj).unwrap();
    let bytes = out.take_output();
    assert!(!bytes.windows(3).any(|w| w == b"3.5"), "numbers must be written as binary");

    let mut input = PStream::from_bytes(bytes);
    let reloaded = read_object(&mut input).unwrap().unwrap();
    let guard = reloaded.borrow().unwrap();
    assert_eq!(guard.get_option("weights").unwrap(), "[0.25, -1]");
    assert_eq!(guard.get_option("bias").unwrap(), "3.5");
    assert_eq!(guard.get_option("seed").unwrap(), "123456789012");
    assert_eq!(guard.get_option("trained").unwrap(), "true");
    assert_eq!(guard.get_option("table").unwrap(), "{\"a\": 1}");
}

// ============================================================================
// Parents and traversal
// ============================================================================

#[test]
fn test_children_get_parent_link() {
    register_all();
    let root = load_object_from_str(
        r#"Node(name = "root"; children = [Node(name = "a")]; peer = Node(name = "p"))"#,
    )
    .unwrap();
    let kid = children(&root).remove(0);
    assert_eq!(kid.with(|n: &Node| n.parent_name()).unwrap().as_deref(), Some("root"));

    let peer = root.with(|n: &Node| n.peer.clone()).unwrap().unwrap();
    assert!(peer.with(|n: &Node| n.parent.is_none()).unwrap());
}

#[test]
fn test_collect_objects_skips_nontraversable() {
    register_all();
    let root = load_object_from_str(
        r#"Node(name = "root"; children = [Node(name = "a"), Node(name = "b")]; peer = Node(name = "p"))"#,
    )
    .unwrap();
    let names: Vec<String> = collect_objects(&root)
        .unwrap()
        .iter()
        .map(|o| o.with(|n: &Node| n.name.clone()).unwrap())
        .collect();
    assert_eq!(names, vec!["root", "a", "b"]);
}
