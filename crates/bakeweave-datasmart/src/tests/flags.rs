use std::collections::BTreeMap;

use crate::data_smart::DataSmart;
use crate::variable_contents::VariableContents;
use crate::GetVarOptions;

#[test]
fn set_get_delete() {
    let mut d = DataSmart::new();
    d.set_var("A", "value").unwrap();
    d.set_var_flag("A", "flag1", "one");
    d.set_var_flag("A", "flag2", 2i64);

    assert_eq!(d.get_var_flag("A", "flag1").unwrap().unwrap(), "one");
    assert_eq!(d.get_var_flag("A", "flag2").unwrap().unwrap(), 2i64);

    d.del_var_flag("A", "flag1");
    assert_eq!(d.get_var_flag("A", "flag1").unwrap(), None);
    assert_eq!(d.get_var("A").unwrap().unwrap(), "value");
}

#[test]
fn expanded_flags() {
    let mut d = DataSmart::new();
    d.set_var("B", "b").unwrap();
    d.set_var_flag("A", "doc", "see ${B}");

    assert_eq!(d.get_var_flag("A", "doc").unwrap().unwrap(), "see b");
    assert_eq!(
        d.get_var_flag_opt("A", "doc", GetVarOptions::default().expand(false))
            .unwrap()
            .unwrap(),
        "see ${B}"
    );

    d.set_var_flag("A", "missing", "[${UNDEFINED}]");
    assert_eq!(d.get_var_flag("A", "missing").unwrap().unwrap(), "[]");
}

#[test]
fn flag_weak_default() {
    let mut d = DataSmart::new();
    d.weak_default_var_flag("A", "f", "weak");
    assert_eq!(d.get_var_flag("A", "f").unwrap().unwrap(), "weak");
    assert_eq!(
        d.get_var_flag_opt("A", "f", GetVarOptions::default().no_weak_default(true))
            .unwrap(),
        None
    );

    d.set_var_flag("A", "f", "strong");
    assert_eq!(d.get_var_flag("A", "f").unwrap().unwrap(), "strong");
}

#[test]
fn flags_without_value() {
    let mut d = DataSmart::new();
    d.set_var_flag("C", "export", 1i64);

    assert_eq!(d.get_var("C").unwrap(), None);
    assert!(d.keys().unwrap().contains(&"C".to_string()));
    assert_eq!(
        d.get_var_flags("C"),
        BTreeMap::from([("export".to_string(), VariableContents::Integer(1))])
    );
}

#[test]
fn export_list() {
    let mut d = DataSmart::new();
    d.set_var_flag("A", "export", 1i64);
    d.set_var_flag("B", "unexport", 1i64);
    d.set_var_flag("A", "export", 1i64);

    assert_eq!(
        d.get_var("__exportlist").unwrap().unwrap(),
        VariableContents::from(vec!["A", "B"])
    );
}
