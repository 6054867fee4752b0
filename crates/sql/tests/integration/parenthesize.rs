use crate::common::{where_clause, RecordingSession};
use proptest::prelude::*;
use tessera_sql::{col, not, Predicate, MYSQL};

fn leaf() -> impl Strategy<Value = Predicate> {
    let field = prop::sample::select(vec!["id", "age", "first_name", "last_name"]);
    (field, any::<i64>(), 0..5u8).prop_map(|(f, v, op)| match op {
        0 => col(f).eq(v),
        1 => col(f).gt(v),
        2 => col(f).lt(v),
        3 => col(f).ge(v),
        _ => col(f).le(v),
    })
}

fn tree() -> impl Strategy<Value = Predicate> {
    leaf().prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.and(b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.or(b)),
            inner.prop_map(not),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_and_wraps_each_side_once(a in tree(), b in tree()) {
        let sess = RecordingSession::new(&MYSQL);
        let (sql_a, args_a) = where_clause(&sess, a.clone());
        let (sql_b, args_b) = where_clause(&sess, b.clone());
        let (sql, args) = where_clause(&sess, a.and(b));

        prop_assert_eq!(sql, format!("({}) AND ({})", sql_a, sql_b));
        let mut want = args_a;
        want.extend(args_b);
        prop_assert_eq!(args, want);
    }

    #[test]
    fn test_leaves_are_never_parenthesized(p in leaf()) {
        let sess = RecordingSession::new(&MYSQL);
        let (sql, args) = where_clause(&sess, p);
        prop_assert!(!sql.contains('('), "{}", sql);
        prop_assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_parentheses_balance(p in tree()) {
        let sess = RecordingSession::new(&MYSQL);
        let (sql, _) = where_clause(&sess, p);
        let mut depth = 0i32;
        for c in sql.chars() {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            prop_assert!(depth >= 0, "{}", sql);
        }
        prop_assert_eq!(depth, 0);
    }
}
