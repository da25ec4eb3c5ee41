use num_bigint::BigInt;

use super::leak_detector;
use super::obj::{Number, Obj};

fn keys(path: &[&str]) -> Vec<Obj> {
    path.iter().map(|k| Obj::new(*k)).collect()
}

#[test]
fn string_rep_is_generated_lazily() {
    let list = Obj::from_strs(&["a", "b c", ""]);
    assert_eq!(list.as_str(), "a {b c} {}");
    assert_eq!(Obj::from_int(-7).as_str(), "-7");
    assert_eq!(Obj::from_bool(true).as_str(), "1");
    assert_eq!(Obj::from_f64(2.0).as_str(), "2.0");
}

#[test]
fn shimmering_keeps_the_text() {
    let obj = Obj::new("0x10");
    assert_eq!(obj.int().unwrap(), BigInt::from(16));
    assert_eq!(obj.type_name(), "int");
    assert_eq!(obj.as_str(), "0x10");
}

#[test]
fn numeric_detection() {
    assert_eq!(Obj::new("12").number(), Some(Number::Int(BigInt::from(12))));
    assert_eq!(Obj::new("1.5").number(), Some(Number::Double(1.5)));
    assert_eq!(Obj::new("1 2").number(), None);
    assert_eq!(
        Obj::new("abc").int().unwrap_err(),
        "expected integer but got \"abc\""
    );
}

#[test]
fn booleans() {
    assert!(Obj::new("yes").boolean().unwrap());
    assert!(!Obj::new("0").boolean().unwrap());
    assert!(Obj::new("maybe").boolean().is_err());
}

#[test]
fn list_parsing_and_indexing() {
    let obj = Obj::new("1 {2 3} 4");
    assert_eq!(obj.list_len().unwrap(), 3);
    assert_eq!(obj.list_index(1).unwrap().unwrap().as_str(), "2 3");
    assert_eq!(obj.list_index(9).unwrap(), None);
    assert!(Obj::new("{oops").list().is_err());
}

#[test]
fn scalar_is_single_element_list() {
    let obj = Obj::from_int(5);
    assert_eq!(obj.list().unwrap(), vec![Obj::new("5")]);
}

#[test]
fn append_copies_shared_values() {
    let original = Obj::new("a b");
    let mut alias = original.clone();
    assert!(alias.is_shared());

    alias.list_append(Obj::new("c")).unwrap();

    assert_eq!(original.as_str(), "a b");
    assert_eq!(alias.as_str(), "a b c");
    assert!(!Obj::ptr_eq(&original, &alias));
    assert!(!alias.is_shared());
}

#[test]
fn append_to_unshared_value_mutates_in_place() {
    let mut obj = Obj::new("a");
    obj.list_append(Obj::new("b")).unwrap();
    let before = obj.clone();
    drop(before);
    obj.list_append(Obj::new("c")).unwrap();
    assert_eq!(obj.as_str(), "a b c");
}

#[test]
fn splice_and_remove() {
    let mut obj = Obj::new("a b c d");
    let removed = obj.list_splice(1, 2, vec![Obj::new("x")]).unwrap();
    assert_eq!(removed, keys(&["b", "c"]));
    assert_eq!(obj.as_str(), "a x d");
    assert_eq!(obj.list_remove(0).unwrap().as_str(), "a");
    assert!(obj.list_remove(5).is_err());
    obj.list_insert(99, Obj::new("z")).unwrap();
    assert_eq!(obj.as_str(), "x d z");
}

#[test]
fn dict_access_and_odd_lists() {
    let obj = Obj::new("a 1 b 2");
    assert_eq!(obj.dict_size().unwrap(), 2);
    assert_eq!(obj.dict_get("b").unwrap().unwrap().as_str(), "2");
    assert_eq!(
        Obj::new("a 1 b").dict_size().unwrap_err(),
        "missing value to go with key"
    );
}

#[test]
fn nested_dict_paths() {
    let mut d = Obj::new("a 1 b 2 c 3 d 4");
    let e = Obj::new("i i1 j j1 k k1");
    d.dict_put_path(&keys(&["m"]), e).unwrap();
    assert_eq!(d.as_str(), "a 1 b 2 c 3 d 4 m {i i1 j j1 k k1}");
    assert_eq!(
        d.dict_get_path(&keys(&["m", "k"])).unwrap().unwrap().as_str(),
        "k1"
    );

    d.dict_put_path(&keys(&["m", "z"]), Obj::new("zz")).unwrap();
    assert_eq!(
        d.dict_get_path(&keys(&["m", "z"])).unwrap().unwrap().as_str(),
        "zz"
    );
    assert_eq!(d.dict_get_path(&keys(&["q", "z"])).unwrap(), None);

    assert!(d.dict_remove_path(&keys(&["m", "i"])).unwrap());
    assert!(!d.dict_remove_path(&keys(&["nope"])).unwrap());
    assert!(d.dict_remove_path(&keys(&["nope", "x"])).is_err());
    assert_eq!(d.as_str(), "a 1 b 2 c 3 d 4 m {j j1 k k1 z zz}");
}

#[test]
fn dict_write_does_not_leak_into_alias() {
    let original = Obj::new("a 1");
    let mut alias = original.clone();
    alias.dict_put_path(&keys(&["b"]), Obj::new("2")).unwrap();
    assert_eq!(original.as_str(), "a 1");
    assert_eq!(alias.as_str(), "a 1 b 2");
}

#[test]
fn every_created_obj_is_released() {
    let before = leak_detector::snapshot();
    {
        let mut obj = Obj::new("a b");
        let alias = obj.clone();
        obj.list_append(Obj::new("c")).unwrap();
        drop(alias);
        let _ = obj.list().unwrap();
    }
    let after = leak_detector::snapshot();
    assert_eq!(
        after.objs_created - before.objs_created,
        after.objs_released - before.objs_released
    );
}

#[test]
fn bytes_view() {
    let obj = Obj::from_bytes(vec![0x41, 0xE9]);
    assert_eq!(obj.as_str(), "A\u{E9}");
    assert_eq!(obj.bytes(), vec![0x41, 0xE9]);
}
