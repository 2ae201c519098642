//! Tests for the IndexVec module.

use super::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TestId(u32);

impl Idx for TestId {
    fn from_usize(idx: usize) -> Self {
        assert!(idx <= u32::MAX as usize);
        TestId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[test]
fn test_new_and_empty() {
    let vec: IndexVec<TestId, i32> = IndexVec::new();
    assert!(vec.is_empty());
    assert_eq!(vec.len(), 0);
}

#[test]
fn test_push_and_index() {
    let mut vec: IndexVec<TestId, i32> = IndexVec::new();
    let idx1 = vec.push(10);
    let idx2 = vec.push(20);
    let idx3 = vec.push(30);

    assert_eq!(vec[idx1], 10);
    assert_eq!(vec[idx2], 20);
    assert_eq!(vec[idx3], 30);
    assert_eq!(vec.len(), 3);
}

#[test]
fn test_get_in_and_out_of_bounds() {
    let mut vec: IndexVec<TestId, i32> = IndexVec::new();
    let idx = vec.push(10);

    assert_eq!(vec.get(idx), Some(&10));
    assert_eq!(vec.get(TestId(5)), None);
}

#[test]
fn test_get_or_fill_value() {
    let mut vec: IndexVec<TestId, u32> = IndexVec::new();
    vec.push(7);

    assert_eq!(vec.get_or(TestId(0), 0), 7);
    assert_eq!(vec.get_or(TestId(99), 0), 0);
}

#[test]
fn test_try_ensure_len_grows_and_fills() {
    let mut vec: IndexVec<TestId, u32> = IndexVec::new();
    vec.push(1);
    vec.try_ensure_len(4, 0).unwrap();

    assert!(vec.len() >= 4);
    assert_eq!(vec[TestId(0)], 1);
    assert_eq!(vec[TestId(3)], 0);
}

#[test]
fn test_try_ensure_len_shorter_is_noop() {
    let mut vec: IndexVec<TestId, u32> = IndexVec::new();
    vec.push(1);
    vec.push(2);
    let before = vec.len();
    vec.try_ensure_len(1, 0).unwrap();

    assert_eq!(vec.len(), before);
    assert_eq!(vec[TestId(1)], 2);
}

#[test]
fn test_iter_enumerated() {
    let mut vec: IndexVec<TestId, i32> = IndexVec::new();
    vec.push(10);
    vec.push(20);

    let pairs: Vec<(TestId, i32)> = vec.iter_enumerated().map(|(i, &v)| (i, v)).collect();
    assert_eq!(pairs, vec![(TestId(0), 10), (TestId(1), 20)]);
}

#[test]
fn test_index_mut() {
    let mut vec: IndexVec<TestId, i32> = IndexVec::new();
    let idx = vec.push(10);
    vec[idx] = 99;
    assert_eq!(vec[idx], 99);
}

define_idx!(MacroId);

#[test]
fn test_define_idx_macro() {
    let mut vec: IndexVec<MacroId, &str> = IndexVec::new();
    let idx = vec.push("hello");
    assert_eq!(vec[idx], "hello");
    assert_eq!(idx, MacroId(0));
}
