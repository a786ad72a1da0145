use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, TimeZone, Utc};
use credo_auth::{AccessControlList, Identity, Passwords, Permission, Role};

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// `custom` followed by `i` spelled in base-26 letters.
fn custom_role_name(mut i: usize) -> String {
    let mut name = String::from("custom");
    loop {
        name.push(char::from(b'a' + (i % 26) as u8));
        i /= 26;
        if i == 0 {
            return name;
        }
    }
}

fn identity_with_roles(count: usize) -> Identity {
    let mut identity = Identity::new("bench", now());
    identity.add_roles([Role::parse("user").unwrap()]);
    identity.add_roles((0..count).map(|i| Role::parse(custom_role_name(i)).unwrap()));
    identity
}

fn identity_with_sessions(count: usize) -> Identity {
    let mut identity = Identity::new("bench", now());
    for i in 0..count {
        identity
            .new_session(Duration::hours(1), now() + Duration::seconds(i as i64))
            .unwrap();
    }
    identity
}

fn bench_acl_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("acl_check");

    let mut acl = AccessControlList::new();
    for i in 0..32 {
        acl.declare(format!("type{i}"));
    }
    let identity = identity_with_roles(0);
    let permissions = [Permission::Update, Permission::UpdateMine];

    group.bench_function("declared_type", |b| {
        b.iter(|| black_box(acl.check_identity(&identity, black_box("type7"), &permissions)));
    });
    group.bench_function("default_type", |b| {
        b.iter(|| black_box(acl.check_identity(&identity, black_box("undeclared"), &permissions)));
    });

    for roles in [1usize, 16, 64] {
        let identity = identity_with_roles(roles);
        group.bench_with_input(BenchmarkId::new("types_granting_search", roles), &identity, |b, identity| {
            b.iter(|| black_box(acl.types_granting_permission(Permission::Search, identity)));
        });
    }

    group.finish();
}

fn bench_session_purge(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_purge");

    for sessions in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(sessions as u64));
        group.bench_with_input(BenchmarkId::from_parameter(sessions), &sessions, |b, &sessions| {
            b.iter_batched(
                || identity_with_sessions(sessions),
                |mut identity| black_box(identity.purge_old_sessions(10)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_password(c: &mut Criterion) {
    let mut group = c.benchmark_group("password");
    let passwords = Passwords::default();

    group.bench_function("hash", |b| {
        b.iter(|| black_box(passwords.hash(black_box("correct horse battery staple"))));
    });

    let mut identity = Identity::new("bench", now());
    identity
        .change_password(&passwords, "correct horse battery staple", None, None)
        .unwrap();
    group.bench_function("challenge", |b| {
        b.iter(|| black_box(identity.challenge_password(&passwords, black_box("wrong horse"))));
    });

    group.finish();
}

criterion_group!(benches, bench_acl_check, bench_session_purge, bench_password);
criterion_main!(benches);
