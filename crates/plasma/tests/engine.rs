//! Engine surface tests: literal producers, aggregates, name resolution,
//! calls, string rendering, tracing, reclamation, and stream serde.

use plasma::{
    BinaryOperation, Context, EngineOptions, FunctionInformation, Instruction, LoopInformation, OpCode, RaisedError,
    RecordingTracer, TraceEvent, ValueId, ValueKind, VirtualMachine,
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

// =============================================================================
// 1. Literal producers and singletons
// =============================================================================

#[test]
fn string_and_bytes_literals() {
    let (_vm, context, value) = run_value(vec![
        Instruction::NewString("hello".to_owned()),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert_eq!(context.value(value).kind, ValueKind::String);
    assert_eq!(context.value(value).string, "hello");

    let (_vm, context, value) = run_value(vec![
        Instruction::NewBytes(vec![1, 2, 3]),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert_eq!(context.value(value).kind, ValueKind::Bytes);
    assert_eq!(context.value(value).bytes, vec![1, 2, 3]);
}

#[test]
fn boolean_and_none_singletons() {
    let (vm, context, value) = run_value(vec![Instruction::GetTrue, Instruction::Push, Instruction::Return(1)]);
    assert_eq!(context.value(value).kind, ValueKind::Boolean);
    assert!(context.value(value).boolean);
    assert_eq!(value, vm.get_true(&context), "GetTrue answers the master singleton");

    let (vm, context, value) = run_value(vec![Instruction::GetNone, Instruction::Push, Instruction::Return(1)]);
    assert_eq!(context.value(value).kind, ValueKind::None);
    assert_eq!(value, vm.get_none(&context));
}

/// A stream that runs off its end answers a freshly allocated None.
#[test]
fn end_of_stream_returns_fresh_none() {
    let (vm, context, value) = run_value(vec![Instruction::Nop]);
    assert_eq!(context.value(value).kind, ValueKind::None);
    assert_ne!(value, vm.get_none(&context));
}

// =============================================================================
// 2. Name resolution
// =============================================================================

/// The S2 shape: an unbound identifier fails with the name in the message.
#[test]
fn unbound_identifier_fails() {
    let (_vm, context, result) = run(vec![
        Instruction::GetIdentifier("x".to_owned()),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    let error = result.expect_err("lookup should fail");
    let error_value = context.value(error.value());
    assert_eq!(error_value.type_name, "ObjectWithNameNotFoundError");
    assert!(error_value.string.contains("'x'"));
}

#[test]
fn assignment_binds_in_current_scope() {
    let (_vm, context, value) = run_value(vec![
        Instruction::NewInteger(42),
        Instruction::Push,
        Instruction::AssignIdentifier("answer".to_owned()),
        Instruction::GetIdentifier("answer".to_owned()),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert_eq!(context.value(value).integer, 42);
}

// =============================================================================
// 3. Aggregates
// =============================================================================

/// Aggregates preserve pop order as source order.
#[test]
fn tuple_preserves_pop_order() {
    let (_vm, context, value) = run_value(vec![
        Instruction::NewInteger(1),
        Instruction::Push,
        Instruction::NewInteger(2),
        Instruction::Push,
        Instruction::NewInteger(3),
        Instruction::Push,
        Instruction::NewTuple(3),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    let content: Vec<i64> = context
        .value(value)
        .content
        .iter()
        .map(|&element| context.value(element).integer)
        .collect();
    assert_eq!(content, vec![3, 2, 1]);
}

/// Later duplicate keys overwrite earlier ones, in pop order.
#[test]
fn hash_duplicate_keys_overwrite() {
    let (_vm, context, value) = run_value(vec![
        // Second pair (popped later): x -> 2.
        Instruction::NewInteger(2),
        Instruction::Push,
        Instruction::NewString("x".to_owned()),
        Instruction::Push,
        // First pair (popped first): x -> 1.
        Instruction::NewInteger(1),
        Instruction::Push,
        Instruction::NewString("x".to_owned()),
        Instruction::Push,
        Instruction::NewHash(2),
        Instruction::Push,
        Instruction::NewString("x".to_owned()),
        Instruction::Push,
        Instruction::Index,
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert_eq!(context.value(value).integer, 2);
}

#[test]
fn missing_hash_key_raises() {
    let (_vm, context, result) = run(vec![
        Instruction::NewHash(0),
        Instruction::Push,
        Instruction::NewString("ghost".to_owned()),
        Instruction::Push,
        Instruction::Index,
        Instruction::Push,
        Instruction::Return(1),
    ]);
    let error = result.expect_err("missing key should fail");
    assert!(context.value(error.value()).string.contains("ghost"));
}

/// Underflow while building an aggregate is reported, not a panic.
#[test]
fn aggregate_underflow_raises() {
    let (_vm, context, result) = run(vec![Instruction::NewTuple(2), Instruction::Push, Instruction::Return(1)]);
    let error = result.expect_err("tuple needs two stack values");
    assert_eq!(context.value(error.value()).type_name, "InvalidNumberOfArgumentsError");
}

// =============================================================================
// 4. Functions and calls
// =============================================================================

#[test]
fn functions_see_master_bindings() {
    let (_vm, context, value) = run_value(vec![
        Instruction::NewInteger(11),
        Instruction::Push,
        Instruction::AssignIdentifier("g".to_owned()),
        Instruction::NewFunction(FunctionInformation {
            name: "f".to_owned(),
            arity: 0,
            body_length: 3,
        }),
        Instruction::GetIdentifier("g".to_owned()),
        Instruction::Push,
        Instruction::Return(1),
        Instruction::GetIdentifier("f".to_owned()),
        Instruction::Push,
        Instruction::MethodInvocation(0),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert_eq!(context.value(value).integer, 11);
}

#[test]
fn arity_mismatch_raises() {
    let (_vm, context, result) = run(vec![
        Instruction::NewFunction(FunctionInformation {
            name: "f".to_owned(),
            arity: 1,
            body_length: 2,
        }),
        Instruction::LoadFunctionArguments(vec!["x".to_owned()]),
        Instruction::Return(0),
        Instruction::GetIdentifier("f".to_owned()),
        Instruction::Push,
        Instruction::MethodInvocation(0),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    let error = result.expect_err("wrong arity should fail");
    let error_value = context.value(error.value());
    assert_eq!(error_value.type_name, "InvalidNumberOfArgumentsError");
    assert!(error_value.string.contains("expected 1"));
}

#[test]
fn calling_a_non_callable_raises() {
    let (_vm, context, result) = run(vec![
        Instruction::NewInteger(3),
        Instruction::Push,
        Instruction::MethodInvocation(0),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    let error = result.expect_err("integers are not callable");
    assert_eq!(context.value(error.value()).type_name, "InvalidTypeError");
}

/// Return with several values packs a tuple in pop order.
#[test]
fn multi_value_return_packs_a_tuple() {
    let (_vm, context, value) = run_value(vec![
        Instruction::NewInteger(1),
        Instruction::Push,
        Instruction::NewInteger(2),
        Instruction::Push,
        Instruction::Return(2),
    ]);
    assert_eq!(context.value(value).kind, ValueKind::Tuple);
    let content: Vec<i64> = context
        .value(value)
        .content
        .iter()
        .map(|&element| context.value(element).integer)
        .collect();
    assert_eq!(content, vec![2, 1]);
}

// =============================================================================
// 5. Contains and string rendering
// =============================================================================

/// `2 in [1, 2, 3]` resolves Contains on the container.
#[test]
fn contains_dispatches_to_the_container() {
    let (_vm, context, value) = run_value(vec![
        Instruction::NewInteger(3),
        Instruction::Push,
        Instruction::NewInteger(2),
        Instruction::Push,
        Instruction::NewInteger(1),
        Instruction::Push,
        Instruction::NewArray(3),
        Instruction::Push,
        Instruction::NewInteger(2),
        Instruction::Push,
        Instruction::Binary(BinaryOperation::Contains),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert!(context.value(value).boolean);
}

fn to_string_of(producer: Instruction) -> String {
    let (_vm, context, value) = run_value(vec![
        producer,
        Instruction::Push,
        Instruction::SelectNameFromObject("ToString".to_owned()),
        Instruction::Push,
        Instruction::MethodInvocation(0),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    context.value(value).string.clone()
}

/// ToString(NewInteger(n)) equals the decimal representation of n.
#[test]
fn integer_to_string_round_trip() {
    assert_eq!(to_string_of(Instruction::NewInteger(42)), "42");
    assert_eq!(to_string_of(Instruction::NewInteger(-7)), "-7");
}

#[test]
fn float_and_singleton_to_string() {
    assert_eq!(to_string_of(Instruction::NewFloat(2.5)), "2.5");
    assert_eq!(to_string_of(Instruction::NewFloat(5.0)), "5.0");
    assert_eq!(to_string_of(Instruction::GetNone), "None");
    assert_eq!(to_string_of(Instruction::GetTrue), "True");
}

#[test]
fn string_concat_and_contains() {
    let (_vm, context, value) = run_value(vec![
        Instruction::NewString("bar".to_owned()),
        Instruction::Push,
        Instruction::NewString("foo".to_owned()),
        Instruction::Push,
        Instruction::Binary(BinaryOperation::Add),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert_eq!(context.value(value).string, "foobar");

    let (_vm, context, value) = run_value(vec![
        Instruction::NewString("plasma".to_owned()),
        Instruction::Push,
        Instruction::NewString("asm".to_owned()),
        Instruction::Push,
        Instruction::Binary(BinaryOperation::Contains),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert!(context.value(value).boolean);
}

// =============================================================================
// 6. Protected set and reclamation
// =============================================================================

/// Every operator handler restores the protected set on exit.
#[test]
fn protected_set_is_restored_after_execution() {
    let (_vm, context, _value) = run_value(vec![
        Instruction::NewInteger(2),
        Instruction::Push,
        Instruction::NewInteger(3),
        Instruction::Push,
        Instruction::Binary(BinaryOperation::Add),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert_eq!(context.memory_stats().protected_values, 0);
}

/// The protected set is restored on the error path too.
#[test]
fn protected_set_is_restored_after_failure() {
    let (_vm, context, result) = run(vec![
        Instruction::GetIdentifier("missing".to_owned()),
        Instruction::Push,
        Instruction::Return(1),
    ]);
    assert!(result.is_err());
    assert_eq!(context.memory_stats().protected_values, 0);
}

/// An explicit sweep reclaims unreachable values and keeps the engine
/// usable.
#[test]
fn collect_garbage_reclaims_unrooted_values() {
    let mut vm = VirtualMachine::new();
    let mut context = vm.new_context();
    for n in 0..64 {
        vm.new_integer(&mut context, false, n);
    }
    let before = context.memory_stats();
    let (reclaimed_values, _reclaimed_tables) = context.collect_garbage();
    assert!(reclaimed_values >= 64, "at least the unrooted integers go: {reclaimed_values}");
    let after = context.memory_stats();
    assert!(after.live_values < before.live_values);

    // The master seeding survives and the engine still runs.
    let result = vm.execute(
        &mut context,
        &[
            Instruction::NewInteger(2),
            Instruction::Push,
            Instruction::NewInteger(3),
            Instruction::Push,
            Instruction::Binary(BinaryOperation::Add),
            Instruction::Push,
            Instruction::Return(1),
        ],
    );
    let value = result.expect("engine should still work after a sweep");
    assert_eq!(context.value(value).integer, 5);
}

/// Memory pressure inside a long loop triggers automatic sweeps without
/// disturbing the program.
#[test]
fn automatic_sweep_under_pressure() {
    let tracer = RecordingTracer::new();
    let events = tracer.events();
    let mut vm = VirtualMachine::with_tracer(
        EngineOptions {
            initial_page_capacity: 16,
            page_growth: 2,
        },
        Box::new(tracer),
    );
    let mut context = vm.new_context();
    let program = vec![
        Instruction::NewInteger(0),
        Instruction::Push,
        Instruction::AssignIdentifier("x".to_owned()),
        Instruction::WhileLoop(Box::new(LoopInformation {
            condition: vec![
                Instruction::NewInteger(200),
                Instruction::Push,
                Instruction::GetIdentifier("x".to_owned()),
                Instruction::Push,
                Instruction::Binary(BinaryOperation::LessThan),
                Instruction::Push,
                Instruction::Return(1),
            ],
            body: vec![
                Instruction::NewInteger(1),
                Instruction::Push,
                Instruction::GetIdentifier("x".to_owned()),
                Instruction::Push,
                Instruction::Binary(BinaryOperation::Add),
                Instruction::Push,
                Instruction::AssignIdentifier("x".to_owned()),
            ],
            receivers: vec![],
        })),
        Instruction::GetIdentifier("x".to_owned()),
        Instruction::Push,
        Instruction::Return(1),
    ];
    let result = vm.execute(&mut context, &program);
    let value = result.expect("loop should complete");
    assert_eq!(context.value(value).integer, 200);
    let swept = events
        .borrow()
        .iter()
        .any(|event| matches!(event, TraceEvent::Sweep { .. }));
    assert!(swept, "small pages should force at least one sweep");
}

// =============================================================================
// 7. Tracing and stream serde
// =============================================================================

#[test]
fn recording_tracer_sees_dispatch_and_calls() {
    let tracer = RecordingTracer::new();
    let events = tracer.events();
    let mut vm = VirtualMachine::with_tracer(EngineOptions::default(), Box::new(tracer));
    let mut context = vm.new_context();
    vm.execute(
        &mut context,
        &[
            Instruction::NewInteger(2),
            Instruction::Push,
            Instruction::NewInteger(3),
            Instruction::Push,
            Instruction::Binary(BinaryOperation::Add),
            Instruction::Push,
            Instruction::Return(1),
        ],
    )
    .expect("program should succeed");
    let events = events.borrow();
    assert!(events.iter().any(|event| matches!(
        event,
        TraceEvent::Instruction {
            op_code: OpCode::Binary,
            ..
        }
    )));
    assert!(events.iter().any(|event| matches!(event, TraceEvent::Call { argument_count: 1 })));
}

/// Instruction streams survive a binary serde round-trip.
#[test]
fn stream_round_trips_through_postcard() {
    let program = vec![
        Instruction::NewInteger(2),
        Instruction::Push,
        Instruction::NewInteger(3),
        Instruction::Push,
        Instruction::Binary(BinaryOperation::Add),
        Instruction::Push,
        Instruction::Return(1),
    ];
    let bytes = postcard::to_allocvec(&program).expect("stream should serialize");
    let restored: Vec<Instruction> = postcard::from_bytes(&bytes).expect("stream should deserialize");
    assert_eq!(program, restored);

    let (_vm, context, result) = run(restored);
    let value = result.expect("restored stream should run");
    assert_eq!(context.value(value).integer, 5);
}
