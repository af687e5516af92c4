
use bakeweave_datasmart::DataSmart;

/// Expanded value of `var` as text.
pub(crate) fn get_var<S: AsRef<str>>(d: &DataSmart, var: S) -> Option<String> {
    d.get_var(var).ok().flatten().map(|v| v.to_string())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::get_var;
    use crate::evaluate::eval;

    #[test]
    fn doc_examples() {
        let d = eval(
            r#"
A = "1"
A:append = "2"
A:append = "3"
A += "4"
A .= "5"
        "#,
        );

        assert_eq!(get_var(&d, "A").unwrap(), "1 4523");
    }

    #[test]
    fn dumb() {
        let mut d = eval(
            r#"
TEST = "base"
TEST:append = "1"
TEST${B} = " wat"
TEST:append = "2"

B = ":append"

        "#,
        );

        d.expand_keys().unwrap();
        assert_eq!(get_var(&d, "TEST").unwrap(), "base12 wat");
    }
}
