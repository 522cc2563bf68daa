//! Integration tests for remote method invocation
//!
//! Tests cover:
//! - Dispatch by name and arity, overloads and inheritance
//! - Methods shared by every object
//! - Free functions
//! - The request loop

mod common;

use common::{register_all, Linear};
use plearn_core::prelude::*;
use plearn_core::remote::{
    call_function, function0, function2, function_help_text, method0, register_function,
};
use plearn_core::{PStream, RemoteServer, StreamMode};

fn model() -> ObjRef {
    register_all();
    load_object_from_str("Linear(weights = [1, 2]; bias = 0.5)").unwrap()
}

fn call(obj: &ObjRef, method: &str, nargs: usize, args: &str) -> PResult<String> {
    let mut io = PStream::from_text(args).with_mode(StreamMode::PlearnAscii);
    obj.borrow_mut()?.call(method, nargs, &mut io)?;
    io.output_string()
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_call_by_arity() {
    let obj = model();
    assert_eq!(call(&obj, "predict", 1, "[1, 2]").unwrap(), "!R 1 5.5\n");
    assert_eq!(call(&obj, "predict", 2, "[1, 2] 2").unwrap(), "!R 1 11\n");
}

#[test]
fn test_wrong_arity_is_not_a_silent_overload() {
    let obj = model();
    let err = call(&obj, "predict", 3, "[1, 2] 2 2").unwrap_err();
    match err {
        PLearnError::ArityMismatch { class, name, arity, available } => {
            assert_eq!(class, "Linear");
            assert_eq!(name, "predict");
            assert_eq!(arity, 3);
            assert_eq!(available, vec![1, 2]);
        }
        other => panic!("expected an arity mismatch, got {}", other),
    }
}

#[test]
fn test_unknown_method() {
    let obj = model();
    let err = call(&obj, "fly", 0, "").unwrap_err();
    assert!(matches!(err, PLearnError::UnknownMethod { name, .. } if name == "fly"));
}

#[test]
fn test_inherited_and_overridden_methods() {
    let obj = model();
    assert_eq!(call(&obj, "getStage", 0, "").unwrap(), "!R 1 0\n");
    assert_eq!(call(&obj, "train", 0, "").unwrap(), "!R 0\n");
    // Linear's train shadows Learner's.
    assert_eq!(call(&obj, "getStage", 0, "").unwrap(), "!R 1 10\n");
    assert!(obj.with(|l: &Linear| l.base.trained).unwrap());
}

#[test]
fn test_multiple_results() {
    let obj = model();
    assert_eq!(call(&obj, "describe", 0, "").unwrap(), "!R 2 \"Linear\" 2\n");
}

#[test]
fn test_argument_and_method_errors() {
    let obj = model();
    let err = call(&obj, "predict", 1, "oops").unwrap_err();
    assert!(err.to_string().contains("reading argument arg0 (TVec<double>)"));

    let err = call(&obj, "predict", 1, "[1]").unwrap_err();
    assert!(matches!(err.root_cause(), PLearnError::Runtime(msg) if msg == "Expected 2 inputs, got 1"));
}

#[test]
fn test_object_results_follow_remote_transmit() {
    let obj = model();
    assert_eq!(call(&obj, "getSub", 0, "").unwrap(), "!R 1 *0\n");

    obj.borrow_mut()
        .unwrap()
        .set_option("sub", "Linear(weights = [4])")
        .unwrap();
    let saved = call(&obj, "getSub", 0, "").unwrap();
    assert!(saved.starts_with("!R 1 *1->Linear("));
    assert!(!saved.contains("cache"));

    let mut io = PStream::from_text("").with_mode(StreamMode::PlearnAscii);
    io.set_remote_transmit(true);
    obj.borrow_mut().unwrap().call("getSub", 0, &mut io).unwrap();
    assert!(io.output_string().unwrap().contains("cache = [4]"));
}

#[test]
fn test_duplicate_method_registration_is_refused() {
    fn zero(_: &mut Linear) -> PResult<i32> {
        Ok(0)
    }
    let mut map = RemoteMethodMap::new("Scratch", None);
    assert!(map.insert("zero", method0(zero, RemoteMethodDoc::new("first"))));
    assert!(!map.insert("zero", method0(zero, RemoteMethodDoc::new("second"))));
    assert_eq!(map.len(), 1);
    let help = map.method_help_text("zero", Some(0)).unwrap();
    assert!(help.contains("first"));
}

// ============================================================================
// Methods of every object
// ============================================================================

#[test]
fn test_root_methods() {
    let obj = model();
    assert_eq!(call(&obj, "classname", 0, "").unwrap(), "!R 1 \"Linear\"\n");
    assert_eq!(call(&obj, "getOption", 1, "bias").unwrap(), "!R 1 0.5\n");
    assert_eq!(call(&obj, "setOption", 2, "bias \"3\"").unwrap(), "!R 0\n");
    assert_eq!(call(&obj, "getOption", 1, "\"weights[1]\"").unwrap(), "!R 1 2\n");
    assert_eq!(
        call(&obj, "changeOptions", 1, "{bias: 1, seed: \"4\"}").unwrap(),
        "!R 0\n"
    );
    assert_eq!(obj.with(|l: &Linear| (l.bias, l.base.seed)).unwrap(), (1.0, 4));
    assert_eq!(call(&obj, "build", 0, "").unwrap(), "!R 0\n");

    let text = call(&obj, "asString", 0, "").unwrap();
    assert!(text.starts_with("!R 1 \"Linear(weights = [1, 2]; bias = 1;"));
}

#[test]
fn test_root_save_method() {
    let obj = model();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.plearn");
    let args = format!("\"{}\" plearn_ascii", path.display());
    assert_eq!(call(&obj, "save", 2, &args).unwrap(), "!R 0\n");
    let reloaded = plearn_core::load_object(&path).unwrap();
    assert_eq!(reloaded.with(|l: &Linear| l.weights.clone()).unwrap(), vec![1.0, 2.0]);
}

// ============================================================================
// Free functions
// ============================================================================

#[test]
fn test_free_functions() {
    register_all();
    let mut io = PStream::from_text("2 40 hello").with_mode(StreamMode::PlearnAscii);
    call_function("add", 2, &mut io).unwrap();
    call_function("shout", 1, &mut io).unwrap();
    assert_eq!(io.output_string().unwrap(), "!R 1 42\n!R 1 \"HELLO\"\n");

    let err = call_function("add", 1, &mut io).unwrap_err();
    assert!(matches!(err, PLearnError::ArityMismatch { available, .. } if available == vec![2]));

    assert!(function_help_text("add").contains("add(arg0: int, arg1: int) -> int"));
}

#[test]
fn test_duplicate_function_registration_is_refused() {
    fn one() -> PResult<i32> {
        Ok(1)
    }
    fn subtract(a: i32, b: i32) -> PResult<i32> {
        Ok(a - b)
    }
    register_all();
    assert!(!register_function(
        "add",
        function2(subtract, RemoteMethodDoc::new("Not an addition"))
    ));
    assert!(register_function("one_for_test", function0(one, RemoteMethodDoc::new("One"))));
    assert!(!register_function("one_for_test", function0(one, RemoteMethodDoc::new("One again"))));
}

// ============================================================================
// Request loop
// ============================================================================

#[test]
fn test_server_session() {
    register_all();
    let script = "\
!N 1 Linear(weights = [1, 2]; bias = 1)
!M 1 predict 1 [1, 1]
!M 1 getOption 1 bias
!M 2 predict 1 [1]
!F add 2 3 4
!M 1 describe 0
!D 1
!M 1 classname 0
!Q
!F add 2 1 1
";
    let mut server = RemoteServer::new();
    let mut io = PStream::from_text(script).with_mode(StreamMode::PlearnAscii);
    server.run(&mut io);
    let out = io.output_string().unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 8, "{}", out);
    assert_eq!(lines[0], "!R 0");
    assert_eq!(lines[1], "!R 1 4");
    assert_eq!(lines[2], "!R 1 1");
    assert!(lines[3].starts_with("!E \"No remote object with id 2"));
    assert_eq!(lines[4], "!R 1 7");
    assert_eq!(lines[5], "!R 2 \"Linear\" 2");
    assert_eq!(lines[6], "!R 0");
    assert!(lines[7].starts_with("!E "));
    assert!(server.is_empty());
}

#[test]
fn test_server_failed_call_leaves_no_partial_reply() {
    register_all();
    let mut server = RemoteServer::new();
    let mut io = PStream::from_text("!N 5 Linear(weights = [1])\n!M 5 predict 1 [1, 2]\n!M 5 getStage 0\n")
        .with_mode(StreamMode::PlearnAscii);
    server.run(&mut io);
    let out = io.output_string().unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "!R 0");
    assert!(lines[1].starts_with("!E ") && lines[1].contains("Expected 1 inputs, got 2"));
    assert_eq!(lines[2], "!R 1 0");
    assert!(server.object(5).is_some());
}

#[test]
fn test_serve_over_lines() {
    register_all();
    let input = "!N 1 Pair(first = 2)\n!M 1 getOption 1 first\n!Q\n";
    let mut written = Vec::new();
    RemoteServer::new().serve(input.as_bytes(), &mut written).unwrap();
    assert_eq!(String::from_utf8(written).unwrap(), "!R 0\n!R 1 2\n");
}
