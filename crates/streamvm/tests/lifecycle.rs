//! Symbol lifecycle and error-propagation tests at the engine boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use streamvm::prelude::*;

const CHECK_TYPE: StreamTypeId = StreamTypeId::new(30);

const PRODUCE: Opcode = Opcode::new(0);
const CHECK: Opcode = Opcode::new(1);
const BAD_ARITY: Opcode = Opcode::new(2);

/// Stream type for lifecycle probing.
///
/// `PRODUCE` defines each output with the value in `Operands::Size`;
/// `CHECK` asserts its single input carries the expected value (proving
/// the payload was resolved before execution began); `BAD_ARITY`
/// deliberately breaks the executor contract.
struct CheckType {
    checks_passed: Arc<AtomicU64>,
}

impl CheckType {
    fn produce(out: SymbolId, value: u64) -> InstructionMsg {
        InstructionMsg::new(CHECK_TYPE, PRODUCE)
            .with_outputs([out])
            .with_operands(Operands::Size(value))
    }

    fn check(input: SymbolId, expected: u64) -> InstructionMsg {
        InstructionMsg::new(CHECK_TYPE, CHECK)
            .with_inputs([input])
            .with_operands(Operands::Size(expected))
    }
}

impl StreamType for CheckType {
    fn id(&self) -> StreamTypeId {
        CHECK_TYPE
    }

    fn name(&self) -> &str {
        "check"
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<ExecOutputs> {
        match ctx.instr.opcode() {
            PRODUCE => {
                let value = ctx.instr.operands().size().unwrap_or(0);
                Ok(ctx
                    .instr
                    .outputs()
                    .iter()
                    .map(|_| Some(Arc::new(value) as Payload))
                    .collect())
            }
            CHECK => {
                let expected = ctx.instr.operands().size().unwrap_or(0);
                let seen = ctx.inputs[0]
                    .downcast_ref::<u64>()
                    .expect("input resolved with a u64 payload");
                assert_eq!(*seen, expected, "executed with a stale or missing input");
                self.checks_passed.fetch_add(1, Ordering::Relaxed);
                Ok(vec![])
            }
            BAD_ARITY => Ok(vec![None; ctx.instr.outputs().len() + 1]),
            op => Err(VmError::UnknownOpcode {
                stream_type: CHECK_TYPE,
                opcode: op,
            }),
        }
    }
}

fn check_vm() -> (VirtualMachine, Arc<AtomicU64>) {
    let checks_passed = Arc::new(AtomicU64::new(0));
    let vm = VirtualMachine::builder()
        .register(Arc::new(CheckType {
            checks_passed: Arc::clone(&checks_passed),
        }))
        .stream(StreamDesc::new(CHECK_TYPE, 2))
        .build()
        .expect("failed to build VM");
    (vm, checks_passed)
}

/// No instruction observes an unresolved payload: every consumer sees the
/// exact value its producer resolved, even across lanes.
#[test]
fn test_inputs_resolved_before_execution() {
    let (vm, checks_passed) = check_vm();

    let mut batch = Vec::new();
    for i in 0..16u64 {
        let sym = SymbolId::new(i);
        batch.push(CheckType::produce(sym, i * 7));
        batch.push(CheckType::check(sym, i * 7));
    }
    vm.submit(batch).expect("submit failed");
    vm.run_to_completion().expect("run failed");

    assert_eq!(checks_passed.load(Ordering::Relaxed), 16);
    assert!(vm.is_empty());
}

/// A second instruction defining an already-resolved symbol fails with
/// `AlreadyResolved`; the engine never silently overwrites the payload.
#[test]
fn test_double_definition_fails() {
    let (vm, checks_passed) = check_vm();

    let sym = SymbolId::new(5);
    vm.submit([
        CheckType::produce(sym, 1),
        CheckType::produce(sym, 2).with_lane_hint(0),
        // Keeps `sym` alive past the first definition; also proves the
        // first payload survived the failed second definition.
        CheckType::check(sym, 1),
    ])
    .expect("submit failed");

    let err = vm.run_to_completion().unwrap_err();
    assert_eq!(err, VmError::AlreadyResolved(sym));
    assert_eq!(checks_passed.load(Ordering::Relaxed), 0);
}

/// An executor returning the wrong output count is fatal.
#[test]
fn test_executor_contract_violation() {
    let (vm, _) = check_vm();

    vm.submit([InstructionMsg::new(CHECK_TYPE, BAD_ARITY).with_outputs([SymbolId::new(1)])])
        .expect("submit failed");

    let err = vm.run_to_completion().unwrap_err();
    assert!(matches!(
        err,
        VmError::ExecutorContractViolation {
            expected: 1,
            actual: 2,
            ..
        }
    ));
}

/// `is_empty` is true exactly when nothing is admitted and no symbol is
/// live.
#[test]
fn test_empty_iff_quiescent() {
    let (vm, _) = check_vm();
    assert!(vm.is_empty());

    vm.submit([CheckType::produce(SymbolId::new(1), 42)])
        .expect("submit failed");
    assert!(!vm.is_empty());

    vm.run_to_completion().expect("run failed");
    assert!(vm.is_empty());
}

/// A retired identifier can carry a fresh resource in a later batch.
#[test]
fn test_identifier_reuse_across_batches() {
    let (vm, checks_passed) = check_vm();
    let sym = SymbolId::new(9);

    for round in 0..3u64 {
        vm.submit([
            CheckType::produce(sym, round),
            CheckType::check(sym, round),
        ])
        .expect("submit failed");
        vm.run_to_completion().expect("run failed");
        assert!(vm.is_empty());
    }

    assert_eq!(checks_passed.load(Ordering::Relaxed), 3);
    assert_eq!(vm.stats().retired_symbols, 3);
}
