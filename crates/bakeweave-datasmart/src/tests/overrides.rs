use crate::data_smart::DataSmart;
use crate::errors::DataSmartError;
use crate::macros::get_var;

fn setup() -> DataSmart {
    let mut d = DataSmart::new();
    d.set_var("OVERRIDES", "foo:bar:local").unwrap();
    d.set_var("TEST", "testvalue").unwrap();
    d
}

#[test]
fn no_override() {
    let d = setup();
    assert_eq!(get_var!(&d, "TEST").unwrap(), "testvalue");
}

#[test]
fn one_override() {
    let mut d = setup();
    d.set_var("TEST:bar", "testvalue2").unwrap();
    assert_eq!(get_var!(&d, "TEST").unwrap(), "testvalue2");
}

#[test]
fn one_override_unset() {
    let mut d = setup();
    d.set_var("TEST2:bar", "testvalue2").unwrap();
    assert_eq!(get_var!(&d, "TEST2").unwrap(), "testvalue2");

    let keys = d.keys().unwrap();
    assert!(keys.contains(&"TEST2".to_string()));
    assert!(keys.contains(&"TEST2:bar".to_string()));
}

#[test]
fn later_override_wins() {
    let mut d = setup();
    d.set_var("TEST:bar", "testvalue2").unwrap();
    d.set_var("TEST:local", "testvalue3").unwrap();
    d.set_var("TEST:foo", "testvalue4").unwrap();
    assert_eq!(get_var!(&d, "TEST").unwrap(), "testvalue3");
}

#[test]
fn combined_overrides() {
    let mut d = setup();
    d.set_var("TEST:local:bar", "testvalue3").unwrap();
    assert_eq!(get_var!(&d, "TEST").unwrap(), "testvalue3");

    d.set_var("TEST2:local:bar", "testvalue3").unwrap();
    assert_eq!(get_var!(&d, "TEST2").unwrap(), "testvalue3");

    // Only half of the chain is active
    d.set_var("TEST3:local:inactive", "nope").unwrap();
    assert_eq!(get_var!(&d, "TEST3"), None);
}

#[test]
fn expanded_key_override() {
    let mut d = setup();
    d.set_var("LOCAL", "local").unwrap();
    d.set_var("TEST:bar", "testvalue2").unwrap();
    d.set_var("TEST:${LOCAL}", "testvalue3").unwrap();
    d.set_var("TEST:foo", "testvalue4").unwrap();
    d.expand_keys().unwrap();
    assert_eq!(get_var!(&d, "TEST").unwrap(), "testvalue3");
}

#[test]
fn rename_override() {
    let mut d = DataSmart::new();
    d.set_var("ALTERNATIVE:ncurses-tools:class-target", "a").unwrap();
    d.set_var("OVERRIDES", "class-target").unwrap();
    d.rename_var("ALTERNATIVE:ncurses-tools", "ALTERNATIVE:lib32-ncurses-tools")
        .unwrap();
    assert_eq!(
        get_var!(&d, "ALTERNATIVE:lib32-ncurses-tools").unwrap(),
        "a"
    );
}

#[test]
fn underscore_override() {
    let mut d = setup();
    d.set_var("TEST:bar", "testvalue2").unwrap();
    d.set_var("TEST:some_val", "testvalue3").unwrap();
    d.set_var("TEST:foo", "testvalue4").unwrap();
    d.set_var("OVERRIDES", "foo:bar:some_val").unwrap();
    assert_eq!(get_var!(&d, "TEST").unwrap(), "testvalue3");
}

#[test]
fn remove_with_override() {
    let mut d = setup();
    d.set_var("TEST:bar", "testvalue2").unwrap();
    d.set_var("TEST:some_val", "testvalue3 testvalue5").unwrap();
    d.set_var("TEST:some_val:remove", "testvalue3").unwrap();
    d.set_var("TEST:foo", "testvalue4").unwrap();
    d.set_var("OVERRIDES", "foo:bar:some_val").unwrap();
    assert_eq!(get_var!(&d, "TEST").unwrap(), " testvalue5");
}

#[test]
fn overrides_from_later_assignments() {
    let mut d = DataSmart::new();
    d.set_var_parsing("RRECOMMENDS:${PN}", "a").unwrap();
    d.set_var_parsing("RRECOMMENDS:${PN}:libc", "b").unwrap();
    d.set_var_parsing("OVERRIDES", "libc:${PN}").unwrap();
    d.set_var_parsing("PN", "gtk+").unwrap();

    d.expand_keys().unwrap();
    assert_eq!(get_var!(&d, "RRECOMMENDS").unwrap(), "b");

    d.set_var("RRECOMMENDS:gtk+", "c").unwrap();
    assert_eq!(get_var!(&d, "RRECOMMENDS").unwrap(), "c");
}

#[test]
fn append_follows_active_variant() {
    let mut d = DataSmart::new();
    d.set_var_parsing("EXTRA_OECONF", "").unwrap();
    d.set_var_parsing("EXTRA_OECONF:class-target", "b").unwrap();
    d.set_var_parsing("EXTRA_OECONF:append", " c").unwrap();

    d.append_var("EXTRA_OECONF", " d").unwrap();
    assert_eq!(get_var!(&d, "EXTRA_OECONF").unwrap(), " c d");

    d.set_var("OVERRIDES", "class-target").unwrap();
    assert_eq!(get_var!(&d, "EXTRA_OECONF").unwrap(), "b c d");
}

#[test]
fn variant_referencing_base() {
    let mut d = DataSmart::new();
    d.set_var_parsing("DESCRIPTION", "A").unwrap();
    d.set_var_parsing("DESCRIPTION:${PN}-dev", "${DESCRIPTION} B").unwrap();
    d.set_var_parsing("PN", "bc").unwrap();

    d.expand_keys().unwrap();
    assert_eq!(get_var!(&d, "DESCRIPTION:bc-dev").unwrap(), "A B");

    d.set_var("DESCRIPTION", "E").unwrap();
    d.set_var("DESCRIPTION:bc-dev", "C D").unwrap();
    d.set_var("OVERRIDES", "bc-dev").unwrap();
    assert_eq!(get_var!(&d, "DESCRIPTION").unwrap(), "C D");
}

#[test]
fn api_write_drops_active_variants() {
    let mut d = DataSmart::new();
    d.set_var("OVERRIDES", "x").unwrap();
    d.set_var("A:x", "variant").unwrap();
    assert_eq!(get_var!(&d, "A").unwrap(), "variant");

    d.set_var("A", "plain").unwrap();
    assert_eq!(get_var!(&d, "A").unwrap(), "plain");
    assert_eq!(get_var!(&d, "A:x"), None);

    // A parser write keeps the variant
    d.set_var_parsing("A:x", "variant").unwrap();
    d.set_var_parsing("A", "plain").unwrap();
    assert_eq!(get_var!(&d, "A").unwrap(), "variant");
}

#[test]
fn overrides_can_reference_other_variables() {
    let mut d = DataSmart::new();
    d.set_var("OVERRIDES", "${MACHINEOVERRIDES}:${DISTROOVERRIDES}")
        .unwrap();
    d.set_var("MACHINEOVERRIDES", "qemux86").unwrap();
    d.set_var("DISTROOVERRIDES", "poky").unwrap();
    d.set_var("V:qemux86", "m").unwrap();
    d.set_var("V:poky", "d").unwrap();

    assert_eq!(
        d.overrides().unwrap().as_slice(),
        &["qemux86".to_string(), "poky".to_string()]
    );
    assert_eq!(get_var!(&d, "V").unwrap(), "d");

    d.set_var("DISTROOVERRIDES", "other").unwrap();
    assert_eq!(get_var!(&d, "V").unwrap(), "m");
}

#[test]
fn overrides_selected_by_overrides() {
    let mut d = DataSmart::new();
    d.set_var("OVERRIDES", "a:${EXTRA}").unwrap();
    d.set_var("EXTRA", "").unwrap();
    d.set_var("EXTRA:a", "b").unwrap();
    d.set_var("V:b", "from b").unwrap();

    assert_eq!(get_var!(&d, "V").unwrap(), "from b");
}

#[test]
fn unstable_overrides() {
    let mut d = DataSmart::new();
    d.set_var("OVERRIDES", "${X}").unwrap();
    d.set_var("X", "a").unwrap();
    d.set_var("X:a", "b").unwrap();
    d.set_var("X:b", "a").unwrap();

    let err = d.get_var("X").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DataSmartError>(),
        Some(DataSmartError::UnstableOverridesError { .. })
    ));
}
