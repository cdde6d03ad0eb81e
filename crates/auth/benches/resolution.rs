use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use gatehouse_auth::{
    Argon2Hasher, GroupStore, InMemoryPersistence, NewGroup, NewUser, Permission, PermissionName,
    PermissionRegistry, PermissionResolver, UserStore, UserStoreOptions,
};

/// A chain `level0 -> level1 -> ... -> level{depth-1}`, each granting one
/// permission, and a user that is a member of `level0` only.
fn setup_chain(depth: usize) -> (PermissionResolver, Arc<UserStore>) {
    let registry = Arc::new(PermissionRegistry::with_builtin());
    for i in 0..depth {
        registry
            .register(Permission::new(format!("PERM_{i}"), "bench"))
            .unwrap();
    }

    let persistence = Arc::new(InMemoryPersistence::new());
    let groups = Arc::new(GroupStore::new(registry, persistence.clone()).unwrap());
    for i in (0..depth).rev() {
        let mut group = NewGroup::new(format!("level{i}"), format!("Level {i}"))
            .permissions([PermissionName::new(format!("PERM_{i}"))]);
        if i + 1 < depth {
            group = group.subgroups([format!("level{}", i + 1)]);
        }
        groups.add_group(group).unwrap();
    }

    let users = UserStore::new(
        Arc::clone(&groups),
        persistence,
        UserStoreOptions {
            hasher: Arc::new(Argon2Hasher::low_cost()),
            ..Default::default()
        },
    )
    .unwrap();
    users
        .add_user(NewUser::new("bench", "pw").groups(["level0"]))
        .unwrap();

    (PermissionResolver::new(groups, Arc::clone(&users)), users)
}

fn bench_effective_permissions(c: &mut Criterion) {
    let mut group = c.benchmark_group("effective_permissions");

    for depth in [1usize, 8, 32, 128] {
        let (resolver, users) = setup_chain(depth);
        let user = users.find_user("bench").unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| black_box(resolver.effective_permissions(&user)));
        });
    }

    group.finish();
}

fn bench_has_permission(c: &mut Criterion) {
    let mut group = c.benchmark_group("has_permission");
    let (resolver, users) = setup_chain(64);
    let user = users.find_user("bench").unwrap();

    let deepest = PermissionName::new("PERM_63");
    group.bench_function("deepest_grant", |b| {
        b.iter(|| black_box(resolver.has_permission(&user, &deepest)));
    });

    let missing = PermissionName::ADMIN;
    group.bench_function("missing_grant", |b| {
        b.iter(|| black_box(resolver.has_permission(&user, &missing)));
    });

    group.finish();
}

criterion_group!(benches, bench_effective_permissions, bench_has_permission);
criterion_main!(benches);
