mod flags;
mod overrides;

#[cfg(test)]
mod test {
    use crate::data_smart::DataSmart;
    use crate::errors::DataSmartError;
    use crate::macros::get_var;
    use crate::variable_contents::VariableContents;
    use crate::GetVarOptions;

    #[test]
    fn none() {
        let d = DataSmart::new();
        assert_eq!(get_var!(&d, "NOT_EXIST"), None);
    }

    #[test]
    fn simple_expansion() {
        let mut d = DataSmart::new();
        d.set_var("FOO", "foo").unwrap();
        d.set_var("BAR", "${FOO}bar").unwrap();

        assert_eq!(get_var!(&d, "BAR").unwrap(), "foobar");
        assert_eq!(d.expand("${FOO} ${BAR}").unwrap(), "foo foobar");
        assert_eq!(
            d.get_var_opt("BAR", GetVarOptions::default().expand(false))
                .unwrap()
                .unwrap(),
            "${FOO}bar"
        );
    }

    #[test]
    fn nested_reference_names() {
        let mut d = DataSmart::new();
        d.set_var("PN", "foo").unwrap();
        d.set_var("VAR_foo", "resolved").unwrap();
        assert_eq!(d.expand("${VAR_${PN}}").unwrap(), "resolved");
    }

    #[test]
    fn undefined_reference_expands_to_nothing() {
        let mut d = DataSmart::new();
        d.set_var("A", "x${UNDEFINED}y").unwrap();
        assert_eq!(get_var!(&d, "A").unwrap(), "xy");

        let parse = d.expand_with_refs("${UNDEFINED}", None).unwrap();
        assert!(parse.unresolved.contains("UNDEFINED"));
        assert!(parse.references.contains("UNDEFINED"));
    }

    #[test]
    fn inline_code_untouched() {
        let mut d = DataSmart::new();
        d.set_var("A", "${@d.getVar('B')} x").unwrap();
        assert_eq!(get_var!(&d, "A").unwrap(), "${@d.getVar('B')} x");
    }

    #[test]
    fn self_reference() {
        let mut d = DataSmart::new();
        d.set_var("A", "${A} more").unwrap();

        let err = d.get_var("A").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataSmartError>(),
            Some(DataSmartError::RecursiveReferenceError { var }) if var == "A"
        ));
    }

    #[test]
    fn indirect_self_reference() {
        let mut d = DataSmart::new();
        d.set_var("A", "${B}").unwrap();
        d.set_var("B", "${C}").unwrap();
        d.set_var("C", "${A}").unwrap();

        let err = d.get_var("B").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataSmartError>(),
            Some(DataSmartError::RecursiveReferenceError { .. })
        ));
    }

    #[test]
    fn repeated_reference_is_not_recursion() {
        let mut d = DataSmart::new();
        d.set_var("B", "b").unwrap();
        d.set_var("A", "${B}${B}").unwrap();
        d.set_var("C", "${A}-${B}").unwrap();
        assert_eq!(get_var!(&d, "C").unwrap(), "bb-b");
    }

    #[test]
    fn expand_as_own_value() {
        let mut d = DataSmart::new();
        d.set_var("A", "a").unwrap();
        assert_eq!(d.expand_with_varname("${A} b", "A[:=]").unwrap(), "a b");
        assert!(d.expand_with_varname("${A} b", "A").is_err());
    }

    #[test]
    fn own_value_after_cached_read() {
        let mut d = DataSmart::new();
        d.set_var("A", "a").unwrap();
        assert_eq!(get_var!(&d, "A").unwrap(), "a");
        assert_eq!(get_var!(&d, "A").unwrap(), "a");
        let err = d.expand_with_varname("${A} b", "A").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataSmartError>(),
            Some(DataSmartError::RecursiveReferenceError { var }) if var == "A"
        ));
    }

    #[test]
    fn weak_default() {
        let mut d = DataSmart::new();
        d.weak_default_var("A", "weak");
        assert_eq!(get_var!(&d, "A").unwrap(), "weak");
        assert_eq!(
            d.get_var_opt("A", GetVarOptions::default().no_weak_default(true))
                .unwrap(),
            None
        );

        d.set_var("A", "strong").unwrap();
        assert_eq!(get_var!(&d, "A").unwrap(), "strong");
    }

    #[test]
    fn non_string_values() {
        let mut d = DataSmart::new();
        d.set_var("N", 5i64).unwrap();
        d.set_var("L", vec!["a", "b"]).unwrap();

        assert_eq!(d.get_var("N").unwrap().unwrap(), 5i64);
        assert_eq!(
            d.get_var("L").unwrap().unwrap(),
            VariableContents::List(vec!["a".into(), "b".into()])
        );
        d.set_var("REF", "${L}").unwrap();
        assert_eq!(get_var!(&d, "REF").unwrap(), "a b");

        d.append_var("N", "x").unwrap();
        let err = d.get_var("N").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataSmartError>(),
            Some(DataSmartError::DataConversionError { .. })
        ));
    }

    #[test]
    fn writes_invalidate_cached_reads() {
        let mut d = DataSmart::new();
        d.set_var("A", "1").unwrap();
        d.set_var("B", "${A}").unwrap();
        assert_eq!(get_var!(&d, "B").unwrap(), "1");

        d.set_var("A", "2").unwrap();
        assert_eq!(get_var!(&d, "B").unwrap(), "2");

        d.del_var("A");
        assert_eq!(get_var!(&d, "B").unwrap(), "");
    }

    #[test]
    fn clones_are_independent() {
        let mut d1 = DataSmart::new();
        d1.set_var("A", "a").unwrap();
        d1.set_var_flag("A", "doc", "first");
        assert_eq!(get_var!(&d1, "A").unwrap(), "a");

        let mut d2 = d1.clone();
        d2.set_var("A", "b").unwrap();
        d2.set_var_flag("A", "doc", "second");
        d2.append_var("A", "c").unwrap();

        assert_eq!(get_var!(&d1, "A").unwrap(), "a");
        assert_eq!(d1.get_var_flag("A", "doc").unwrap().unwrap(), "first");
        assert_eq!(get_var!(&d2, "A").unwrap(), "bc");
    }

    #[test]
    fn shared_read_only_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DataSmart>();

        let mut d = DataSmart::new();
        d.set_var("OVERRIDES", "x").unwrap();
        d.set_var("A", "base").unwrap();
        d.set_var("A:x", "${B}").unwrap();
        d.set_var("B", "over").unwrap();

        std::thread::scope(|s| {
            let handles = (0..4)
                .map(|_| s.spawn(|| get_var!(&d, "A")))
                .collect::<Vec<_>>();
            for h in handles {
                assert_eq!(h.join().unwrap().unwrap(), "over");
            }
        });
    }
}
