//! Randomized whole-table exercise: lattice algebra, flag/cardinality
//! recomputation, and garbage-collection soundness over a generated
//! population of types. Seeds are fixed so failures reproduce.

use std::collections::HashSet;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stoat::{BOOL, INT, REAL, TypeId, TypeKind, TypeTable};

fn pick(rng: &mut StdRng, pool: &[TypeId]) -> TypeId {
    pool[rng.gen_range(0..pool.len())]
}

/// Grow a population of `n` types over the primitives, mixing every
/// constructor. Returns every id created (with duplicates from hash
/// consing).
fn build_population(table: &mut TypeTable, rng: &mut StdRng, n: usize) -> Vec<TypeId> {
    let mut pool = vec![BOOL, INT, REAL];
    for _ in 0..n {
        let id = match rng.gen_range(0..5) {
            0 => table.bv_type(rng.gen_range(1u32..=80)),
            1 => table.new_scalar_type(rng.gen_range(1u32..=9)),
            2 => table.new_uninterpreted_type(),
            3 => {
                let arity = rng.gen_range(1..=3);
                let elems: Vec<TypeId> = (0..arity).map(|_| pick(rng, &pool)).collect();
                table.tuple_type(&elems)
            }
            _ => {
                let arity = rng.gen_range(1..=2);
                let domain: Vec<TypeId> = (0..arity).map(|_| pick(rng, &pool)).collect();
                let range = pick(rng, &pool);
                table.function_type(&domain, range)
            }
        };
        pool.push(id);
    }
    pool
}

#[test]
fn lattice_algebra_holds_on_random_population() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut table = TypeTable::new();
    let pool = build_population(&mut table, &mut rng, 150);

    for _ in 0..500 {
        let a = pick(&mut rng, &pool);
        let b = pick(&mut rng, &pool);

        // idempotence
        assert_eq!(table.join(a, a), Some(a));
        assert_eq!(table.meet(a, a), Some(a));

        // commutativity
        let join = table.join(a, b);
        assert_eq!(join, table.join(b, a));
        let meet = table.meet(a, b);
        assert_eq!(meet, table.meet(b, a));

        // meet <= a, b <= join when the bounds exist
        if let Some(m) = meet {
            assert!(table.is_subtype(m, a));
            assert!(table.is_subtype(m, b));
        }
        if let Some(j) = join {
            assert!(table.is_subtype(a, j));
            assert!(table.is_subtype(b, j));
        }

        // a <= b agrees with join(a, b) == b
        if table.is_subtype(a, b) && table.is_subtype(b, a) {
            assert_eq!(a, b);
        }
    }

    // transitivity over random triples
    for _ in 0..500 {
        let a = pick(&mut rng, &pool);
        let b = pick(&mut rng, &pool);
        let c = pick(&mut rng, &pool);
        if table.is_subtype(a, b) && table.is_subtype(b, c) {
            assert!(table.is_subtype(a, c));
        }
    }
}

/// Recompute the expected cardinality of a product, exactly.
fn product_card(table: &TypeTable, ids: &[TypeId]) -> u128 {
    ids.iter().map(|&id| table.card_of(id) as u128).product()
}

fn all_small(table: &TypeTable, ids: &[TypeId]) -> bool {
    ids.iter().all(|&id| table.is_small(id))
}

#[test]
fn stored_flags_and_cards_match_recomputation() {
    let mut rng = StdRng::seed_from_u64(0xf1a9);
    let mut table = TypeTable::new();
    let pool = build_population(&mut table, &mut rng, 200);

    for &id in &pool {
        match table.kind(id).clone() {
            TypeKind::Tuple(elems) => {
                let elems: Vec<TypeId> = elems.to_vec();
                assert_eq!(
                    table.is_finite(id),
                    elems.iter().all(|&e| table.is_finite(e))
                );
                assert_eq!(table.is_unit(id), elems.iter().all(|&e| table.is_unit(e)));
                assert_eq!(
                    table.is_maximal(id),
                    elems.iter().all(|&e| table.is_maximal(e))
                );
                assert_eq!(
                    table.is_minimal(id),
                    elems.iter().all(|&e| table.is_minimal(e))
                );

                let product = product_card(&table, &elems);
                let exact = all_small(&table, &elems) && product <= u32::MAX as u128;
                assert_eq!(table.is_small(id), exact);
                if exact {
                    assert_eq!(table.card_of(id) as u128, product);
                } else {
                    assert_eq!(table.card_of(id), u32::MAX);
                }
                assert_eq!(table.card_of(id), table.card_of_product(&elems));
            }
            TypeKind::Function { domain, range } => {
                let domain: Vec<TypeId> = domain.to_vec();
                assert_eq!(table.is_unit(id), table.is_unit(range));
                assert_eq!(table.is_maximal(id), table.is_maximal(range));
                assert_eq!(table.is_minimal(id), table.is_minimal(range));
                assert_eq!(
                    table.is_finite(id),
                    table.is_unit(range)
                        || (table.is_finite(range)
                            && domain.iter().all(|&d| table.is_finite(d)))
                );
                assert_eq!(
                    table.has_finite_domain(id),
                    domain.iter().all(|&d| table.is_finite(d))
                );
                assert_eq!(table.has_finite_range(id), table.is_finite(range));

                if table.is_unit(range) {
                    assert_eq!(table.card_of(id), 1);
                    assert!(table.is_small(id));
                } else if table.is_small(range) && all_small(&table, &domain) {
                    let exponent = product_card(&table, &domain);
                    let expected = if exponent >= 32 {
                        None
                    } else {
                        (table.card_of(range) as u128)
                            .checked_pow(exponent as u32)
                            .filter(|&p| p <= u32::MAX as u128)
                    };
                    match expected {
                        Some(card) => {
                            assert_eq!(table.card_of(id) as u128, card);
                            assert!(table.is_small(id));
                        }
                        None => {
                            assert_eq!(table.card_of(id), u32::MAX);
                            assert!(!table.is_small(id));
                        }
                    }
                } else {
                    assert_eq!(table.card_of(id), u32::MAX);
                    assert!(!table.is_small(id));
                }
            }
            _ => {}
        }
    }
}

/// Everything reachable from `roots` through tuple elements and function
/// domains/ranges.
fn reachable(table: &TypeTable, roots: &[TypeId]) -> HashSet<TypeId> {
    let mut seen: HashSet<TypeId> = roots.iter().copied().collect();
    let mut work: Vec<TypeId> = roots.to_vec();
    while let Some(id) = work.pop() {
        let children: Vec<TypeId> = match table.kind(id) {
            TypeKind::Tuple(elems) => elems.to_vec(),
            TypeKind::Function { domain, range } => {
                let mut children = domain.to_vec();
                children.push(*range);
                children
            }
            _ => Vec::new(),
        };
        for child in children {
            if seen.insert(child) {
                work.push(child);
            }
        }
    }
    seen
}

#[test]
fn gc_keeps_exactly_the_reachable_types() {
    let mut rng = StdRng::seed_from_u64(0x6c0);
    let mut table = TypeTable::new();
    let pool = build_population(&mut table, &mut rng, 300);

    // name a few, pin a few others
    let mut roots = vec![BOOL, INT, REAL];
    for i in 0..10 {
        let named = pick(&mut rng, &pool);
        table.set_name(named, Rc::from(format!("n{}", i).as_str()));
        roots.push(named);
    }
    let pinned: Vec<TypeId> = (0..10).map(|_| pick(&mut rng, &pool)).collect();
    roots.extend(&pinned);

    let expected = reachable(&table, &roots);
    for &id in &pinned {
        table.mark(id);
    }
    table.gc();

    assert_eq!(table.live_types() as usize, expected.len());
    for &id in &pool {
        assert_eq!(table.is_live(id), expected.contains(&id));
    }

    // survivors are intact: children live, hash-consing still dedupes
    for &id in &expected {
        match table.kind(id).clone() {
            TypeKind::Tuple(elems) => {
                let elems: Vec<TypeId> = elems.to_vec();
                assert!(elems.iter().all(|&e| table.is_live(e)));
                assert_eq!(table.tuple_type(&elems), id);
            }
            TypeKind::Function { domain, range } => {
                let domain: Vec<TypeId> = domain.to_vec();
                assert!(table.is_live(range));
                assert!(domain.iter().all(|&d| table.is_live(d)));
                assert_eq!(table.function_type(&domain, range), id);
            }
            TypeKind::Bitvector(width) => {
                assert_eq!(table.bv_type(width), id);
            }
            _ => {}
        }
    }

    // the lattice engine still answers over the survivors
    let survivors: Vec<TypeId> = expected.iter().copied().collect();
    for _ in 0..200 {
        let a = pick(&mut rng, &survivors);
        let b = pick(&mut rng, &survivors);
        assert_eq!(table.join(a, b), table.join(b, a));
        if let Some(j) = table.join(a, b) {
            assert!(table.is_subtype(a, j));
        }
    }
}

#[test]
fn bound_answers_are_stable_across_gc() {
    let mut rng = StdRng::seed_from_u64(0xab1e);
    let mut table = TypeTable::new();
    let pool = build_population(&mut table, &mut rng, 100);

    // record answers over a sample, keeping the operands and the bounds
    // themselves alive by name so ids must be stable across collection
    let mut sample = Vec::new();
    for i in 0..30 {
        let a = pick(&mut rng, &pool);
        let b = pick(&mut rng, &pool);
        table.set_name(a, Rc::from(format!("a{}", i).as_str()));
        table.set_name(b, Rc::from(format!("b{}", i).as_str()));
        let join = table.join(a, b);
        let meet = table.meet(a, b);
        if let Some(j) = join {
            table.set_name(j, Rc::from(format!("j{}", i).as_str()));
        }
        if let Some(m) = meet {
            table.set_name(m, Rc::from(format!("m{}", i).as_str()));
        }
        sample.push((a, b, join, meet));
    }

    table.gc();
    for &(a, b, join, meet) in &sample {
        assert_eq!(table.join(a, b), join);
        assert_eq!(table.meet(a, b), meet);
    }
}
