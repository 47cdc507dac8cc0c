//! PID 更新路径性能测试
//!
//! 调度线程每个周期对所有电机调用一次 `update`，这里测量单次调用开销。

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use strafe_control::{PidController, PidProfile, slew_step};

fn bench_pid_update(c: &mut Criterion) {
    let profile = PidProfile::new(0.8, 0.01, 0.2)
        .with_windup_limit(500.0)
        .with_leveling_error(5.0);
    let mut pid = PidController::new(-127.0, 127.0, profile).unwrap();
    pid.set_target(1000.0);

    let mut input = 0.0;
    c.bench_function("pid_update", |b| {
        b.iter(|| {
            input = (input + 1.0) % 1200.0;
            black_box(pid.update(black_box(input)).unwrap())
        })
    });
}

fn bench_slew_step(c: &mut Criterion) {
    c.bench_function("slew_step", |b| {
        b.iter(|| slew_step(black_box(40.0), black_box(10.0), black_box(100.0)))
    });
}

criterion_group!(benches, bench_pid_update, bench_slew_step);
criterion_main!(benches);
