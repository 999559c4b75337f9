// IdentifierSet integration suite.
//
// Invariants exercised:
// - Membership: insert then lookup is present; remove then lookup is absent.
// - Replace: `old` leaves and `new` arrives in one step; `None` removes.
// - Destructors: every departing identifier is disposed exactly once.
// - Iteration: yields each member once; removal through the cursor.
use bitcache::{Error, Id, IdentifierSet};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

fn id(hex_digit: char) -> Id {
    hex_digit
        .to_string()
        .repeat(32)
        .parse()
        .expect("md5-sized hex digest")
}

fn recording_set() -> (IdentifierSet<Id>, Arc<Mutex<Vec<Id>>>) {
    let gone = Arc::new(Mutex::new(Vec::new()));
    let g = Arc::clone(&gone);
    let s = IdentifierSet::<Id>::builder()
        .destructor(move |id: Id| g.lock().unwrap().push(id))
        .build();
    (s, gone)
}

// Test: insert A, B, C; replace(B, D); clear.
// Verifies: count stays 3 across replace; B absent, D present; clear empties.
#[test]
fn replace_and_clear_scenario() {
    let (s, gone) = recording_set();
    for c in ['a', 'b', 'c'] {
        assert_eq!(s.insert(id(c)), Ok(true));
    }
    assert_eq!(s.count(), 3);

    s.replace(&id('b'), Some(id('d'))).unwrap();
    assert!(!s.lookup(&id('b')));
    assert!(s.lookup(&id('d')));
    assert_eq!(s.count(), 3);
    assert_eq!(*gone.lock().unwrap(), vec![id('b')]);

    s.clear();
    assert_eq!(s.count(), 0);
    assert_eq!(gone.lock().unwrap().len(), 4);
}

// Test: duplicate insert.
// Verifies: the set keeps one member and disposes the incoming duplicate.
#[test]
fn duplicate_insert_disposes_incoming_identifier() {
    let (s, gone) = recording_set();
    assert_eq!(s.insert(id('1')), Ok(true));
    assert_eq!(s.insert(id('1')), Ok(false));
    assert_eq!(s.count(), 1);
    assert_eq!(*gone.lock().unwrap(), vec![id('1')]);
}

// Test: replace with no successor degrades to removal.
#[test]
fn replace_with_none_removes() {
    let (s, gone) = recording_set();
    s.insert(id('e')).unwrap();
    s.replace(&id('e'), None).unwrap();
    assert!(s.is_empty());
    assert_eq!(gone.lock().unwrap().len(), 1);
    // Replacing an absent identifier is not an error.
    s.replace(&id('e'), None).unwrap();
    assert_eq!(gone.lock().unwrap().len(), 1);
}

// Test: lifecycle of a set built uninitialized.
#[test]
fn uninitialized_set_lifecycle() {
    let s: IdentifierSet<Id> = IdentifierSet::uninit();
    assert!(!s.is_live());
    assert_eq!(s.count(), 0);
    assert!(!s.lookup(&id('a')));
    assert_eq!(s.insert(id('a')), Err(Error::Uninitialized));
    assert!(matches!(s.iter(), Err(Error::Uninitialized)));

    s.init(None).unwrap();
    assert_eq!(s.init(None), Err(Error::AlreadyInitialized));
    s.insert(id('a')).unwrap();
    s.reset();
    assert!(!s.is_live());
    s.reset();
}

// Test: iteration with in-place removal.
// Verifies: every member is produced once; removed members are gone and
// disposed after done().
#[test]
fn iterate_and_remove_members() {
    let (s, gone) = recording_set();
    for c in "0123456789abcdef".chars() {
        s.insert(id(c)).unwrap();
    }
    let mut produced = BTreeSet::new();
    let mut it = s.iter().unwrap();
    while let Some(member) = it.next() {
        let member = *member;
        assert!(produced.insert(member));
        if member.as_bytes()[0] >= 0xaa {
            it.remove_current().unwrap();
        }
    }
    assert_eq!(it.position(), 16);
    assert_eq!(it.remaining(), 0);
    assert!(gone.lock().unwrap().is_empty());
    it.done();

    assert_eq!(produced.len(), 16);
    assert_eq!(s.count(), 10);
    assert_eq!(gone.lock().unwrap().len(), 6);
    for c in "abcdef".chars() {
        assert!(!s.lookup(&id(c)));
    }
}

// Test: dropping the set disposes what is left.
#[test]
fn drop_disposes_remaining_members() {
    let (s, gone) = recording_set();
    s.insert(id('1')).unwrap();
    s.insert(id('2')).unwrap();
    drop(s);
    let mut left = gone.lock().unwrap().clone();
    left.sort();
    assert_eq!(left, vec![id('1'), id('2')]);
}
