//! User-defined types: construction, methods, inheritance, attribute
//! lookup order, modules, and lambdas.

use plasma::{
    BinaryOperation, ClassInformation, Context, FunctionInformation, Instruction, RaisedError, ValueId, ValueKind,
    VirtualMachine,
};
use pretty_assertions::assert_eq;

fn run(program: Vec<Instruction>) -> (VirtualMachine, Context, Result<ValueId, RaisedError>) {
    let mut vm = VirtualMachine::new();
    let mut context = vm.new_context();
    let result = vm.execute(&mut context, &program);
    (vm, context, result)
}

fn run_value(program: Vec<Instruction>) -> (VirtualMachine, Context, ValueId) {
    let (vm, context, result) = run(program);
    let value = result.expect("program should succeed");
    (vm, context, value)
}

/// A class whose constructor binds one nullary method returning a marker
/// string.
fn class_with_marker_method(class_name: &str, method_name: &str, marker: &str) -> Vec<Instruction> {
    vec![
        Instruction::NewClass(ClassInformation {
            name: class_name.to_owned(),
            n_bases: 0,
            body_length: 4,
        }),
        Instruction::NewClassFunction(FunctionInformation {
            name: method_name.to_owned(),
            arity: 0,
            body_length: 3,
        }),
        Instruction::NewString(marker.to_owned()),
        Instruction::Push,
        Instruction::Return(1),
    ]
}

fn call_method(receiver_name: &str, method_name: &str) -> Vec<Instruction> {
    vec![
        Instruction::GetIdentifier(receiver_name.to_owned()),
        Instruction::Push,
        Instruction::SelectNameFromObject(method_name.to_owned()),
        Instruction::Push,
        Instruction::MethodInvocation(0),
        Instruction::Push,
        Instruction::Return(1),
    ]
}

// =============================================================================
// 1. Construction and fields
// =============================================================================

/// Constructor statements run against the instance's attribute table.
#[test]
fn constructor_binds_instance_fields() {
    let (_vm, context, value) = run_value(vec![
        Instruction::NewClass(ClassInformation {
            name: "Point".to_owned(),
            n_bases: 0,
            body_length: 3,
        }),
        Instruction::NewInteger(7),
        Instruction::Push,
        Instruction::AssignIdentifier("x".to_owned()),
        Instruction::GetIdentifier("Point".to_owned()),
        Instruction::Push,
        Instruction::MethodInvocation(0),
        Instruction::Push,
        Instruction::SelectNameFromObject("x".to_owned()),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert_eq!(context.value(value).integer, 7);
}

/// Instances display their type's name.
#[test]
fn instance_carries_type_name() {
    let (_vm, context, value) = run_value(vec![
        Instruction::NewClass(ClassInformation {
            name: "Widget".to_owned(),
            n_bases: 0,
            body_length: 0,
        }),
        Instruction::GetIdentifier("Widget".to_owned()),
        Instruction::Push,
        Instruction::MethodInvocation(0),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert_eq!(context.value(value).kind, ValueKind::Object);
    assert_eq!(context.value(value).type_name, "Widget");
}

/// A method with an argument: `d.Twice(21)` doubles through the operator
/// protocol.
#[test]
fn method_with_argument() {
    let mut program = vec![
        Instruction::NewClass(ClassInformation {
            name: "Doubler".to_owned(),
            n_bases: 0,
            body_length: 9,
        }),
        Instruction::NewClassFunction(FunctionInformation {
            name: "Twice".to_owned(),
            arity: 1,
            body_length: 8,
        }),
        Instruction::LoadFunctionArguments(vec!["n".to_owned()]),
        Instruction::NewInteger(2),
        Instruction::Push,
        Instruction::GetIdentifier("n".to_owned()),
        Instruction::Push,
        Instruction::Binary(BinaryOperation::Mul),
        Instruction::Push,
        Instruction::Return(1),
        Instruction::GetIdentifier("Doubler".to_owned()),
        Instruction::Push,
        Instruction::MethodInvocation(0),
        Instruction::Push,
        Instruction::AssignIdentifier("d".to_owned()),
    ];
    program.extend([
        Instruction::NewInteger(21),
        Instruction::Push,
        Instruction::GetIdentifier("d".to_owned()),
        Instruction::Push,
        Instruction::SelectNameFromObject("Twice".to_owned()),
        Instruction::Push,
        Instruction::MethodInvocation(1),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    let (_vm, context, value) = run_value(program);
    assert_eq!(context.value(value).integer, 42);
}

// =============================================================================
// 2. Inheritance
// =============================================================================

/// A derived class inherits base methods through construction.
#[test]
fn derived_class_inherits_base_methods() {
    let mut program = class_with_marker_method("Base", "Greet", "base");
    program.extend([
        Instruction::GetIdentifier("Base".to_owned()),
        Instruction::Push,
        Instruction::NewClass(ClassInformation {
            name: "Derived".to_owned(),
            n_bases: 1,
            body_length: 0,
        }),
        Instruction::GetIdentifier("Derived".to_owned()),
        Instruction::Push,
        Instruction::MethodInvocation(0),
        Instruction::Push,
        Instruction::AssignIdentifier("d".to_owned()),
    ]);
    program.extend(call_method("d", "Greet"));
    let (_vm, context, value) = run_value(program);
    assert_eq!(context.value(value).string, "base");
}

/// A derived definition overrides the base one.
#[test]
fn derived_class_overrides_base_methods() {
    let mut program = class_with_marker_method("Base", "Greet", "base");
    program.extend([
        Instruction::GetIdentifier("Base".to_owned()),
        Instruction::Push,
        Instruction::NewClass(ClassInformation {
            name: "Derived".to_owned(),
            n_bases: 1,
            body_length: 4,
        }),
        Instruction::NewClassFunction(FunctionInformation {
            name: "Greet".to_owned(),
            arity: 0,
            body_length: 3,
        }),
        Instruction::NewString("derived".to_owned()),
        Instruction::Push,
        Instruction::Return(1),
        Instruction::GetIdentifier("Derived".to_owned()),
        Instruction::Push,
        Instruction::MethodInvocation(0),
        Instruction::Push,
        Instruction::AssignIdentifier("d".to_owned()),
    ]);
    program.extend(call_method("d", "Greet"));
    let (_vm, context, value) = run_value(program);
    assert_eq!(context.value(value).string, "derived");
}

/// With multiple bases the leftmost definition wins.
#[test]
fn leftmost_base_wins_method_resolution() {
    let mut program = class_with_marker_method("A", "Tag", "from-a");
    program.extend(class_with_marker_method("B", "Tag", "from-b"));
    program.extend([
        // Bases pop in declaration order, so push B first, A on top.
        Instruction::GetIdentifier("B".to_owned()),
        Instruction::Push,
        Instruction::GetIdentifier("A".to_owned()),
        Instruction::Push,
        Instruction::NewClass(ClassInformation {
            name: "C".to_owned(),
            n_bases: 2,
            body_length: 0,
        }),
        Instruction::GetIdentifier("C".to_owned()),
        Instruction::Push,
        Instruction::MethodInvocation(0),
        Instruction::Push,
        Instruction::AssignIdentifier("c".to_owned()),
    ]);
    program.extend(call_method("c", "Tag"));
    let (_vm, context, value) = run_value(program);
    assert_eq!(context.value(value).string, "from-a");
}

/// `implements` covers the type and its transitive ancestors.
#[test]
fn implements_walks_ancestry() {
    let mut program = class_with_marker_method("Base", "Greet", "base");
    program.extend([
        Instruction::GetIdentifier("Base".to_owned()),
        Instruction::Push,
        Instruction::NewClass(ClassInformation {
            name: "Derived".to_owned(),
            n_bases: 1,
            body_length: 0,
        }),
        Instruction::NewClass(ClassInformation {
            name: "Other".to_owned(),
            n_bases: 0,
            body_length: 0,
        }),
        Instruction::GetIdentifier("Derived".to_owned()),
        Instruction::Push,
        Instruction::MethodInvocation(0),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    let (_vm, context, instance) = run_value(program);
    let master = context.master();
    let base = context.get_self(master, "Base").expect("Base should be bound");
    let derived = context.get_self(master, "Derived").expect("Derived should be bound");
    let other = context.get_self(master, "Other").expect("Other should be bound");
    assert!(context.implements(instance, derived));
    assert!(context.implements(instance, base));
    assert!(!context.implements(instance, other));
    assert!(context.implements(derived, base));
}

// =============================================================================
// 3. Lookup order and caching
// =============================================================================

/// An instance binding shadows the method the constructor installed.
#[test]
fn instance_binding_shadows_method() {
    let mut program = class_with_marker_method("T", "Name", "method");
    program.extend([
        Instruction::GetIdentifier("T".to_owned()),
        Instruction::Push,
        Instruction::MethodInvocation(0),
        Instruction::Push,
        Instruction::AssignIdentifier("t".to_owned()),
        // t.Name = "field" (the value is pushed before the receiver).
        Instruction::NewString("field".to_owned()),
        Instruction::Push,
        Instruction::GetIdentifier("t".to_owned()),
        Instruction::Push,
        Instruction::AssignSelector("Name".to_owned()),
        Instruction::GetIdentifier("t".to_owned()),
        Instruction::Push,
        Instruction::SelectNameFromObject("Name".to_owned()),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    let (_vm, context, value) = run_value(program);
    assert_eq!(context.value(value).kind, ValueKind::String);
    assert_eq!(context.value(value).string, "field");
}

/// On-demand symbols materialize once and cache into the attribute table.
#[test]
fn on_demand_symbols_cache_after_first_lookup() {
    let mut vm = VirtualMachine::new();
    let mut context = vm.new_context();
    let number = vm.new_integer(&mut context, false, 9);
    assert_eq!(context.get_symbol_on(number, "ToString"), None, "nothing cached yet");
    let first = vm
        .find_attribute(&mut context, number, "ToString")
        .expect("lookup should succeed")
        .expect("integers expose ToString");
    let second = vm
        .find_attribute(&mut context, number, "ToString")
        .expect("lookup should succeed")
        .expect("integers expose ToString");
    assert_eq!(first, second, "the materialized method is cached");
    assert_eq!(context.get_symbol_on(number, "ToString"), Some(first));
}

// =============================================================================
// 4. Modules, lambdas, and index assignment
// =============================================================================

/// A module body runs in a fresh scope that becomes the module's
/// attribute table.
#[test]
fn module_bindings_become_attributes() {
    let (_vm, context, value) = run_value(vec![
        Instruction::NewModule(ClassInformation {
            name: "m".to_owned(),
            n_bases: 0,
            body_length: 3,
        }),
        Instruction::NewInteger(5),
        Instruction::Push,
        Instruction::AssignIdentifier("v".to_owned()),
        Instruction::GetIdentifier("m".to_owned()),
        Instruction::Push,
        Instruction::SelectNameFromObject("v".to_owned()),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert_eq!(context.value(value).integer, 5);
}

/// A lambda lands in the last-object register and is immediately callable.
#[test]
fn lambda_is_callable_from_last_object() {
    let (_vm, context, value) = run_value(vec![
        Instruction::NewInteger(5),
        Instruction::Push,
        Instruction::NewLambdaFunction(FunctionInformation {
            name: String::new(),
            arity: 1,
            body_length: 8,
        }),
        Instruction::LoadFunctionArguments(vec!["x".to_owned()]),
        Instruction::NewInteger(1),
        Instruction::Push,
        Instruction::GetIdentifier("x".to_owned()),
        Instruction::Push,
        Instruction::Binary(BinaryOperation::Add),
        Instruction::Push,
        Instruction::Return(1),
        Instruction::Push,
        Instruction::MethodInvocation(1),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert_eq!(context.value(value).integer, 6);
}

/// `a[1] = 99` goes through the receiver's Assign method.
#[test]
fn assign_index_updates_array() {
    let (_vm, context, value) = run_value(vec![
        Instruction::NewInteger(3),
        Instruction::Push,
        Instruction::NewInteger(2),
        Instruction::Push,
        Instruction::NewInteger(1),
        Instruction::Push,
        Instruction::NewArray(3),
        Instruction::Push,
        Instruction::AssignIdentifier("a".to_owned()),
        // element, receiver, index: AssignIndex pops index first.
        Instruction::NewInteger(99),
        Instruction::Push,
        Instruction::GetIdentifier("a".to_owned()),
        Instruction::Push,
        Instruction::NewInteger(1),
        Instruction::Push,
        Instruction::AssignIndex,
        Instruction::GetIdentifier("a".to_owned()),
        Instruction::Push,
        Instruction::NewInteger(1),
        Instruction::Push,
        Instruction::Index,
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert_eq!(context.value(value).integer, 99);
}

/// The reserved protection error kind is constructible and part of the
/// RuntimeError taxonomy.
#[test]
fn builtin_symbol_protection_error_shape() {
    let mut vm = VirtualMachine::new();
    let mut context = vm.new_context();
    let error = vm.new_builtin_symbol_protection_error(&mut context, "Type");
    let error_value = error.value();
    assert_eq!(context.value(error_value).type_name, "BuiltInSymbolProtectionError");
    let runtime_error = context
        .get_self(context.master(), "RuntimeError")
        .expect("RuntimeError should be seeded");
    assert!(context.implements(error_value, runtime_error));
}
