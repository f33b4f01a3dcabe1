//! Scheduler Dispatch Benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use std::sync::Arc;

use streamvm::prelude::*;

const BENCH_TYPE: StreamTypeId = StreamTypeId::new(50);
const PRODUCE: Opcode = Opcode::new(0);
const CONSUME: Opcode = Opcode::new(1);

/// Minimal executor: defines outputs with a unit payload, reads inputs.
struct BenchType;

impl StreamType for BenchType {
    fn id(&self) -> StreamTypeId {
        BENCH_TYPE
    }

    fn name(&self) -> &str {
        "bench"
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<ExecOutputs> {
        match ctx.instr.opcode() {
            PRODUCE => Ok(ctx
                .instr
                .outputs()
                .iter()
                .map(|_| Some(Arc::new(()) as Payload))
                .collect()),
            _ => Ok(vec![]),
        }
    }
}

fn bench_vm(lanes: usize) -> VirtualMachine {
    VirtualMachine::builder()
        .register(Arc::new(BenchType))
        .stream(StreamDesc::new(BENCH_TYPE, lanes))
        .build()
        .expect("failed to build bench VM")
}

fn independent_batch(count: u64) -> Vec<InstructionMsg> {
    (0..count)
        .map(|i| InstructionMsg::new(BENCH_TYPE, PRODUCE).with_outputs([SymbolId::new(i)]))
        .collect()
}

fn chain_batch(depth: u64) -> Vec<InstructionMsg> {
    (0..depth)
        .map(|i| {
            let instr = InstructionMsg::new(BENCH_TYPE, PRODUCE).with_outputs([SymbolId::new(i)]);
            if i == 0 {
                instr
            } else {
                instr.with_inputs([SymbolId::new(i - 1)])
            }
        })
        .collect()
}

fn bench_independent(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_independent");

    for count in [100u64, 1000].iter() {
        group.throughput(Throughput::Elements(*count));

        group.bench_function(format!("submit_drain_{}", count), |b| {
            let vm = bench_vm(4);

            b.iter(|| {
                vm.submit(independent_batch(*count)).unwrap();
                black_box(vm.run_to_completion().unwrap());
            });
        });
    }

    group.finish();
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_chain");

    for depth in [10u64, 100].iter() {
        group.throughput(Throughput::Elements(*depth));

        group.bench_function(format!("dependency_chain_{}", depth), |b| {
            let vm = bench_vm(1);

            b.iter(|| {
                vm.submit(chain_batch(*depth)).unwrap();
                black_box(vm.run_to_completion().unwrap());
            });
        });
    }

    group.finish();
}

fn bench_copy_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy_pipeline");
    group.throughput(Throughput::Bytes(1024 * 1024));

    group.bench_function("alloc_copy_1mib", |b| {
        let vm = VirtualMachine::builder()
            .with_host_defaults()
            .build()
            .expect("failed to build VM");

        b.iter(|| {
            let src = SymbolId::new(1);
            let dst = SymbolId::new(2);
            vm.submit([
                ControlStreamType::new_symbol(src),
                ControlStreamType::new_symbol(dst),
                HostStreamType::malloc_host(src, 1024 * 1024),
                DeviceStreamType::malloc(dst, 1024 * 1024),
                CopyH2DStreamType::copy(dst, src, 1024 * 1024),
            ])
            .unwrap();
            black_box(vm.run_to_completion().unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_independent, bench_chain, bench_copy_pipeline);
criterion_main!(benches);
