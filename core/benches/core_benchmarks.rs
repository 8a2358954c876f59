use criterion::{Criterion, black_box, criterion_group, criterion_main};

use firethorn_core::{AccessToken, ResourceTable, SlotTable};

// ---------------------------------------------------------------------------
// Slot table churn
// ---------------------------------------------------------------------------

fn bench_slot_insert_grow(c: &mut Criterion) {
    c.bench_function("slot_insert_1024_grow", |b| {
        b.iter(|| {
            let mut table = SlotTable::new();
            for i in 0..1024u32 {
                black_box(table.insert(black_box(i)));
            }
            table
        });
    });
}

fn bench_slot_insert_erase_cycle(c: &mut Criterion) {
    c.bench_function("slot_insert_erase_cycle", |b| {
        let mut table = SlotTable::new();
        b.iter(|| {
            let h = table.insert(black_box(7u64));
            black_box(table.remove(h));
        });
    });
}

fn bench_slot_get_hot(c: &mut Criterion) {
    let mut table = SlotTable::new();
    let handles: Vec<_> = (0..256u32).map(|i| table.insert(i)).collect();
    c.bench_function("slot_get_256", |b| {
        b.iter(|| {
            for &h in &handles {
                black_box(table.get(black_box(h)));
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Locked table and token checks
// ---------------------------------------------------------------------------

fn bench_locked_add_erase(c: &mut Criterion) {
    let table: ResourceTable<u64> = ResourceTable::new();
    c.bench_function("locked_add_erase", |b| {
        b.iter(|| {
            let h = table.adder().add(black_box(1));
            table.eraser().erase(h);
        });
    });
}

fn bench_token_gate(c: &mut Criterion) {
    let table: ResourceTable<u64> = ResourceTable::new();
    let handles: Vec<_> = (0..64).map(|i| table.adder().add(i)).collect();
    let mut token = AccessToken::new();
    for &h in &handles {
        token.permit(h);
    }
    c.bench_function("token_gated_get_mut_64", |b| {
        b.iter(|| {
            let mut guard = table.write();
            for &h in &handles {
                *black_box(guard.get_mut(h, &token)) += 1;
            }
        });
    });
}

criterion_group!(
    benches,
    bench_slot_insert_grow,
    bench_slot_insert_erase_cycle,
    bench_slot_get_hot,
    bench_locked_add_erase,
    bench_token_gate,
);
criterion_main!(benches);
